//! Compliance framework scanner.
//!
//! Cloud targets run Prowler with `--compliance`; `onprem` runs an OpenSCAP
//! XCCDF evaluation against a SCAP datastream.

use super::common::ToolConfig;
use super::prowler::Prowler;
use crate::config::ComplianceConfig;
use crate::external::ToolRunner;
use crate::finding::{Finding, FindingStatus, ScanResult, Severity};
use crate::scanner::{ScanError, ScanOptions, ScannerPlugin, tool_failure};
use std::sync::Arc;
use tracing::debug;

pub const COMPLIANCE_TARGETS: &[&str] = &["aws", "azure", "gcp", "onprem"];

/// oscap exits 2 when the evaluation ran and some rules failed.
const OSCAP_EXIT_CODES: &[i32] = &[0, 2];

/// Prowler's identifier for a framework on a provider.
pub fn prowler_compliance_id(framework: &str, provider: &str) -> String {
    let known = match (framework, provider) {
        ("cis", "aws") => "cis_2.0_aws",
        ("cis", "azure") => "cis_2.0_azure",
        ("cis", "gcp") => "cis_2.0_gcp",
        ("pci", "aws") => "pci_3.2.1_aws",
        ("hipaa", "aws") => "hipaa_aws",
        ("nist", "aws") => "nist_800_53_revision_5_aws",
        ("iso27001", "aws") => "iso27001_2013_aws",
        _ => return format!("{}_{}", framework, provider),
    };
    known.to_string()
}

/// The SCAP Security Guide profile for a framework.
pub fn oscap_profile(framework: &str) -> String {
    let profile = match framework {
        "pci" => "pci-dss",
        other => other,
    };
    format!("xccdf_org.ssgproject.content_profile_{}", profile)
}

/// Parse the `Title`/`Rule`/`Result` blocks oscap prints for each rule.
pub fn parse_oscap_output(stdout: &str, framework: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut title = String::new();
    let mut rule = String::new();

    for line in stdout.lines() {
        let Some((key, value)) = line.trim().split_once(char::is_whitespace) else {
            continue;
        };
        let value = value.trim();
        match key {
            "Title" => title = value.to_string(),
            "Rule" => rule = value.to_string(),
            "Result" => {
                let status = match value {
                    "pass" | "fixed" => FindingStatus::Passed,
                    "fail" => FindingStatus::Failed,
                    "error" => FindingStatus::Error,
                    "notapplicable" | "notselected" | "informational" => continue,
                    _ => FindingStatus::Warning,
                };
                let check_id = rule
                    .strip_prefix("xccdf_org.ssgproject.content_rule_")
                    .unwrap_or(&rule);
                let severity = if status == FindingStatus::Failed {
                    Severity::Medium
                } else {
                    Severity::Low
                };
                findings.push(
                    Finding::new(check_id, framework, status, std::mem::take(&mut title))
                        .with_severity(severity),
                );
                rule.clear();
            }
            _ => {}
        }
    }
    findings
}

#[derive(Debug, Clone)]
pub struct ComplianceScanner {
    prowler: Prowler,
    oscap: ToolConfig,
    frameworks: ComplianceConfig,
}

impl ComplianceScanner {
    pub const NAME: &'static str = "compliance";

    pub fn new() -> Self {
        Self {
            prowler: Prowler::new(),
            oscap: ToolConfig::new("oscap"),
            frameworks: ComplianceConfig::default(),
        }
    }

    pub fn with_frameworks(mut self, frameworks: ComplianceConfig) -> Self {
        self.frameworks = frameworks;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.prowler = self.prowler.with_runner(runner.clone());
        self.oscap = self.oscap.with_runner(runner);
        self
    }

    pub fn with_programs(mut self, prowler: impl Into<String>, oscap: impl Into<String>) -> Self {
        self.prowler = self.prowler.with_program(prowler);
        self.oscap = self.oscap.with_program(oscap);
        self
    }

    fn scan_onprem(&self, framework: &str, options: &ScanOptions) -> ScanResult {
        let Some(datastream) = options.get_str("datastream") else {
            return ScanResult::error(
                Self::NAME,
                "onprem",
                "onprem",
                "Missing required parameter: datastream",
            );
        };
        let profile = options
            .get_str("profile")
            .map(str::to_string)
            .unwrap_or_else(|| oscap_profile(framework));
        let invocation = self
            .oscap
            .invocation(["xccdf", "eval", "--profile", profile.as_str(), datastream], options)
            .accept_exit_codes(OSCAP_EXIT_CODES);
        match self.oscap.run(&invocation) {
            Ok(output) => ScanResult::new(
                Self::NAME,
                "onprem",
                parse_oscap_output(&output.stdout, framework),
            ),
            Err(e) => tool_failure(Self::NAME, "onprem", &e),
        }
    }
}

impl Default for ComplianceScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScannerPlugin for ComplianceScanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Compliance framework scanner"
    }

    fn supported_targets(&self) -> &[&'static str] {
        COMPLIANCE_TARGETS
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        if !COMPLIANCE_TARGETS.contains(&target) {
            return Ok(ScanResult::error(
                Self::NAME,
                target,
                target,
                format!(
                    "Unsupported target: {}. Must be one of {}",
                    target,
                    COMPLIANCE_TARGETS.join(", ")
                ),
            ));
        }
        let framework = options.get_str("framework").unwrap_or_default();
        let Some(framework_name) = self.frameworks.frameworks.get(framework) else {
            let known: Vec<&str> = self.frameworks.frameworks.keys().map(String::as_str).collect();
            return Ok(ScanResult::error(
                Self::NAME,
                target,
                target,
                format!(
                    "Unsupported framework: {}. Must be one of {}",
                    framework,
                    known.join(", ")
                ),
            ));
        };

        debug!(target, framework, "Running compliance scan");
        let result = if target == "onprem" {
            self.scan_onprem(framework, options)
        } else {
            let mut args = Vec::new();
            if let Some(profile) = options.get_str("profile") {
                args.extend(["--profile".to_string(), profile.to_string()]);
            }
            args.extend([
                "--compliance".to_string(),
                prowler_compliance_id(framework, target),
            ]);
            self.prowler.scan(Self::NAME, target, args, target, options)
        };
        Ok(result
            .with_fact("framework", framework)
            .with_fact("framework_name", framework_name.as_str()))
    }
}
