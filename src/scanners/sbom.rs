//! Software bill of materials scanner backed by Syft.

use super::common::{ToolConfig, array_field, str_field};
use crate::config::SbomConfig;
use crate::finding::{Finding, FindingStatus, ScanResult, Severity};
use crate::scanner::{ScanError, ScanOptions, ScannerPlugin, tool_failure};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SbomScanner {
    tool: ToolConfig,
    licenses: SbomConfig,
}

impl SbomScanner {
    pub const NAME: &'static str = "sbom";

    pub fn new() -> Self {
        Self {
            tool: ToolConfig::new("syft"),
            licenses: SbomConfig::default(),
        }
    }

    pub fn with_license_policy(mut self, licenses: SbomConfig) -> Self {
        self.licenses = licenses;
        self
    }

    /// Findings for every artifact in a Syft JSON document.
    pub fn check_sbom(&self, sbom: &Value) -> Vec<Finding> {
        let artifacts = array_field(sbom, "artifacts");
        let mut findings = Vec::new();
        findings.extend(artifacts.iter().flat_map(check_vulnerabilities));
        findings.extend(artifacts.iter().filter_map(check_outdated));
        findings.extend(artifacts.iter().flat_map(|a| self.check_licenses(a)));
        findings
    }

    fn check_licenses(&self, artifact: &Value) -> Vec<Finding> {
        licenses(artifact)
            .into_iter()
            .filter_map(|license| {
                if self.licenses.restricted_licenses.iter().any(|l| l == &license) {
                    Some(
                        Finding::failed(
                            "sbom-003",
                            package_ref(artifact),
                            format!("Restricted license: {}", license),
                        )
                        .with_severity(Severity::Medium)
                        .with_recommendation(
                            "Consider using an alternative package with a more permissive license",
                        ),
                    )
                } else if !self.licenses.allowed_licenses.iter().any(|l| l == &license) {
                    Some(
                        Finding::new(
                            "sbom-003",
                            package_ref(artifact),
                            FindingStatus::Warning,
                            format!("Unknown license: {}", license),
                        )
                        .with_severity(Severity::Low)
                        .with_recommendation("Verify license compatibility with your project"),
                    )
                } else {
                    None
                }
            })
            .collect()
    }
}

crate::impl_tool_scanner!(SbomScanner);

/// `name@version`.
fn package_ref(artifact: &Value) -> String {
    format!(
        "{}@{}",
        str_field(artifact, &["name"]).unwrap_or("unknown"),
        str_field(artifact, &["version"]).unwrap_or("unknown")
    )
}

fn check_vulnerabilities(artifact: &Value) -> Vec<Finding> {
    array_field(artifact, "vulnerabilities")
        .iter()
        .map(|vuln| {
            let id = str_field(vuln, &["id"]).unwrap_or("unknown");
            let description = str_field(vuln, &["description"]).unwrap_or("");
            let severity = str_field(vuln, &["severity"])
                .map(Severity::normalize)
                .unwrap_or(Severity::High);
            Finding::failed(
                "sbom-001",
                package_ref(artifact),
                format!("Known vulnerability: {} - {}", id, description),
            )
            .with_severity(severity)
            .with_recommendation(format!(
                "Update to version {}",
                str_field(vuln, &["fixed_version"]).unwrap_or("latest")
            ))
        })
        .collect()
}

fn check_outdated(artifact: &Value) -> Option<Finding> {
    let latest = str_field(artifact, &["latest_version"])?;
    let current = str_field(artifact, &["version"]).unwrap_or("");
    if current == latest {
        return None;
    }
    Some(
        Finding::failed(
            "sbom-002",
            package_ref(artifact),
            format!(
                "Outdated dependency: Current version {}, Latest version {}",
                current, latest
            ),
        )
        .with_severity(Severity::Medium)
        .with_recommendation(format!("Update to version {}", latest)),
    )
}

/// Licenses as either a `license` string or a `licenses` list of strings or `{value}` objects.
fn licenses(artifact: &Value) -> Vec<String> {
    if let Some(license) = str_field(artifact, &["license"]) {
        return vec![license.to_string()];
    }
    array_field(artifact, "licenses")
        .iter()
        .filter_map(|l| match l {
            Value::String(s) => Some(s.as_str()),
            other => str_field(other, &["value", "spdxExpression"]),
        })
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ScannerPlugin for SbomScanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Software Bill of Materials security scanner"
    }

    fn supported_targets(&self) -> &[&'static str] {
        &["path"]
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let path = options.get_str("path").unwrap_or(target);
        if path.is_empty() || !Path::new(path).exists() {
            return Ok(ScanResult::error(
                Self::NAME,
                target,
                path,
                "Invalid path provided",
            ));
        }

        let invocation = self.tool.invocation([path, "-o", "json"], options);
        let sbom = match self.tool.run_json(&invocation) {
            Ok(sbom) => sbom,
            Err(e) => return Ok(tool_failure(Self::NAME, target, &e)),
        };
        let findings = self.check_sbom(&sbom);
        debug!(
            path,
            artifacts = array_field(&sbom, "artifacts").len(),
            findings = findings.len(),
            "SBOM scan complete"
        );
        Ok(ScanResult::new(Self::NAME, target, findings))
    }
}
