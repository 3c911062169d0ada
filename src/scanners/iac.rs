//! Infrastructure-as-code scanner backed by Checkov.

use super::common::{ToolConfig, array_field, severity_field, str_field};
use crate::finding::{Finding, FindingStatus, ScanResult, Severity};
use crate::scanner::{ScanError, ScanOptions, ScannerPlugin, tool_failure};
use serde_json::{Value, json};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Checkov exits 1 when any check failed.
const ACCEPTED_EXIT_CODES: &[i32] = &[0, 1];
const DETECT_DEPTH: usize = 3;

pub const FRAMEWORKS: &[&str] = &["terraform", "cloudformation", "kubernetes", "ansible"];

#[derive(Debug, Clone)]
pub struct IacScanner {
    tool: ToolConfig,
}

impl IacScanner {
    pub const NAME: &'static str = "iac";

    pub fn new() -> Self {
        Self {
            tool: ToolConfig::new("checkov"),
        }
    }
}

crate::impl_tool_scanner!(IacScanner);

/// Guess the IaC framework of a directory from the files it holds.
pub fn detect_framework(dir: &Path) -> Option<&'static str> {
    let files: Vec<_> = WalkDir::new(dir)
        .max_depth(DETECT_DEPTH)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    if files
        .iter()
        .any(|p| p.extension().is_some_and(|ext| ext == "tf"))
    {
        return Some("terraform");
    }

    for path in &files {
        let is_template = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json" | "template"));
        if !is_template {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        if content.contains("AWSTemplateFormatVersion") {
            return Some("cloudformation");
        }
        if content.contains("apiVersion:") && content.contains("kind:") {
            return Some("kubernetes");
        }
        if content.contains("hosts:") && content.contains("tasks:") {
            return Some("ansible");
        }
    }
    None
}

/// Checkov prints one report object, or a list of them when several frameworks ran.
fn reports(output: &Value) -> Vec<&Value> {
    match output {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn check_finding(check: &Value, status: FindingStatus) -> Finding {
    let check_id = str_field(check, &["check_id"]).unwrap_or("checkov");
    let resource = match (
        str_field(check, &["file_path"]),
        str_field(check, &["resource"]),
    ) {
        (Some(file), Some(resource)) => format!("{}:{}", file.trim_start_matches('/'), resource),
        (None, Some(resource)) => resource.to_string(),
        (Some(file), None) => file.to_string(),
        (None, None) => "unknown".to_string(),
    };
    let message = str_field(check, &["check_name"]).unwrap_or("");
    let severity = match severity_field(check, &["severity"]) {
        Severity::Unknown if status == FindingStatus::Failed => Severity::Medium,
        other => other,
    };
    let finding = Finding::new(check_id, resource, status, message).with_severity(severity);
    match str_field(check, &["guideline"]) {
        Some(guideline) => finding.with_recommendation(guideline),
        None => finding,
    }
}

/// Findings for every failed and passed check in a Checkov report.
pub fn findings_from_output(output: &Value) -> Vec<Finding> {
    let mut findings = Vec::new();
    for report in reports(output) {
        let Some(results) = report.get("results") else {
            continue;
        };
        findings.extend(
            array_field(results, "failed_checks")
                .iter()
                .map(|c| check_finding(c, FindingStatus::Failed)),
        );
        findings.extend(
            array_field(results, "passed_checks")
                .iter()
                .map(|c| check_finding(c, FindingStatus::Passed)),
        );
    }
    findings
}

/// Encryption checks as `{resource, check_id, encrypted}` entries.
pub fn storage_facts(findings: &[Finding]) -> Vec<Value> {
    findings
        .iter()
        .filter(|f| f.message.to_ascii_lowercase().contains("encrypt"))
        .map(|f| {
            json!({
                "resource": f.resource,
                "check_id": f.check_id,
                "encrypted": f.status == FindingStatus::Passed,
            })
        })
        .collect()
}

impl ScannerPlugin for IacScanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Infrastructure as Code security scanner"
    }

    fn supported_targets(&self) -> &[&'static str] {
        &["path"]
    }

    fn rule_category(&self) -> Option<&str> {
        Some("iac")
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let path = options.get_str("path").unwrap_or(target);
        let dir = Path::new(path);
        if path.is_empty() || !dir.exists() {
            return Ok(ScanResult::error(
                Self::NAME,
                target,
                path,
                "Invalid path provided",
            ));
        }

        let framework = match options.get_str("framework") {
            Some(framework) if FRAMEWORKS.contains(&framework) => Some(framework),
            Some(other) => {
                return Ok(ScanResult::error(
                    Self::NAME,
                    target,
                    path,
                    format!("Unsupported IaC framework: {}", other),
                ));
            }
            None => detect_framework(dir),
        };

        let flag = if dir.is_dir() { "-d" } else { "-f" };
        let mut args = vec![flag.to_string(), path.to_string(), "-o".into(), "json".into()];
        if let Some(framework) = framework {
            args.push("--framework".into());
            args.push(framework.to_string());
        }
        let invocation = self
            .tool
            .invocation(args, options)
            .accept_exit_codes(ACCEPTED_EXIT_CODES);
        let output = match self.tool.run_json(&invocation) {
            Ok(output) => output,
            Err(e) => return Ok(tool_failure(Self::NAME, target, &e)),
        };

        let findings = findings_from_output(&output);
        let storage = storage_facts(&findings);
        debug!(path, framework = ?framework, findings = findings.len(), "IaC scan complete");

        let mut result = ScanResult::new(Self::NAME, target, findings).with_fact("storage", storage);
        if let Some(framework) = framework {
            result = result.with_fact("framework", framework);
        }
        Ok(result)
    }
}
