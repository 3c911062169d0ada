//! Pattern-based source code scanner.

use crate::finding::{Finding, ScanResult, Severity};
use crate::scanner::{ScanError, ScanOptions, ScannerPlugin};
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

struct CodeCheck {
    id: &'static str,
    message: &'static str,
    recommendation: &'static str,
    patterns: Vec<Regex>,
}

impl CodeCheck {
    fn new(
        id: &'static str,
        message: &'static str,
        recommendation: &'static str,
        patterns: &[&str],
    ) -> Self {
        Self {
            id,
            message,
            recommendation,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
                .collect(),
        }
    }
}

static CHECKS: LazyLock<Vec<CodeCheck>> = LazyLock::new(|| {
    vec![
        CodeCheck::new(
            "code-001",
            "Potential hardcoded secret found",
            "Use environment variables or secure secret management",
            &[
                r#"password\s*=\s*['"][^'"]+['"]"#,
                r#"api_key\s*=\s*['"][^'"]+['"]"#,
                r#"secret\s*=\s*['"][^'"]+['"]"#,
                r#"token\s*=\s*['"][^'"]+['"]"#,
            ],
        ),
        CodeCheck::new(
            "code-002",
            "Potential SQL injection vulnerability",
            "Use parameterized queries or prepared statements",
            &[
                r"execute\s*\([^)]*\+",
                r"exec\s*\([^)]*\+",
                r"query\s*\([^)]*\+",
            ],
        ),
        CodeCheck::new(
            "code-003",
            "Potential XSS vulnerability",
            "Use proper output encoding and sanitization",
            &[
                r"innerHTML\s*=\s*[^;]+",
                r"document\.write\s*\([^)]+\)",
                r"eval\s*\([^)]+\)",
            ],
        ),
    ]
});

/// Run every check over `content`, reporting matches as `<file>:Line <n>`.
pub fn scan_source(file: &str, content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for check in CHECKS.iter() {
        for pattern in &check.patterns {
            for m in pattern.find_iter(content) {
                let line = content[..m.start()].matches('\n').count() + 1;
                findings.push(
                    Finding::failed(check.id, format!("{}:Line {}", file, line), check.message)
                        .with_severity(Severity::High)
                        .with_recommendation(check.recommendation),
                );
            }
        }
    }
    findings
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeScanner;

impl CodeScanner {
    pub const NAME: &'static str = "code";

    pub fn new() -> Self {
        Self
    }

    fn scan_directory(&self, dir: &Path) -> Vec<Finding> {
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        files
            .par_iter()
            .flat_map(|path| match std::fs::read_to_string(path) {
                Ok(content) => scan_source(&path.display().to_string(), &content),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                    vec![]
                }
            })
            .collect()
    }
}

impl ScannerPlugin for CodeScanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Source code security scanner"
    }

    fn supported_targets(&self) -> &[&'static str] {
        &["path"]
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let path = options.get_str("path").unwrap_or(target);
        let root = Path::new(path);
        if path.is_empty() || !root.exists() {
            return Ok(ScanResult::error(
                Self::NAME,
                target,
                path,
                "Invalid path provided",
            ));
        }

        let findings = if root.is_dir() {
            self.scan_directory(root)
        } else {
            match std::fs::read_to_string(root) {
                Ok(content) => scan_source(path, &content),
                Err(e) => {
                    warn!(path, error = %e, "Failed to read source file");
                    return Ok(ScanResult::error(
                        Self::NAME,
                        target,
                        path,
                        format!("Error scanning file: {}", e),
                    ));
                }
            }
        };
        debug!(path, findings = findings.len(), "Code scan complete");
        Ok(ScanResult::new(Self::NAME, target, findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::FindingStatus;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hardcoded_secret_line_numbers() {
        let code = "import os\n\nAPI_KEY = \"sk-123\"\npassword = 'hunter2'\n";
        let findings = scan_source("app.py", code);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.check_id == "code-001"));
        assert_eq!(findings[0].resource, "app.py:Line 4");
        assert_eq!(findings[1].resource, "app.py:Line 3");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(
            findings[0].recommendation.as_deref(),
            Some("Use environment variables or secure secret management")
        );
    }

    #[test]
    fn test_sql_injection_and_xss() {
        let code = "cursor.execute(\"SELECT * FROM t WHERE id=\" + uid)\nel.innerHTML = input;\n";
        let ids: Vec<_> = scan_source("x.js", code)
            .into_iter()
            .map(|f| f.check_id)
            .collect();
        assert_eq!(ids, vec!["code-002", "code-003"]);
    }

    #[test]
    fn test_parameterized_query_is_clean() {
        let code = "cursor.execute(\"SELECT * FROM t WHERE id = %s\", (uid,))\n";
        assert!(scan_source("db.py", code).is_empty());
    }

    #[test]
    fn test_missing_path_is_error_result() {
        let result = CodeScanner::new()
            .scan("repo", &ScanOptions::new().with("path", "/nonexistent/secaudit"))
            .unwrap();
        assert!(result.is_error());
        assert_eq!(result.findings()[0].check_id, "code-000");
        assert_eq!(result.findings()[0].message, "Invalid path provided");
    }

    #[test]
    fn test_scan_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "token = \"abc\"\n").unwrap();
        fs::create_dir(dir.path().join("web")).unwrap();
        fs::write(dir.path().join("web/b.js"), "document.write(user)\n").unwrap();
        fs::write(dir.path().join("clean.py"), "print('hi')\n").unwrap();

        let result = CodeScanner::new()
            .scan(&dir.path().display().to_string(), &ScanOptions::new())
            .unwrap();
        assert_eq!(result.summary().total, 2);
        assert!(result.findings().iter().all(|f| f.status == FindingStatus::Failed));
    }
}
