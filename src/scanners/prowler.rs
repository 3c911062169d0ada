//! Prowler invocation and output mapping.

use super::common::{ToolConfig, severity_field, status_field, str_field};
use crate::finding::{Finding, ScanResult};
use crate::scanner::{ScanOptions, tool_failure};
use serde_json::{Map, Value};
use tracing::debug;

/// Prowler exits 3 when it ran fine but some checks failed.
const ACCEPTED_EXIT_CODES: &[i32] = &[0, 3];

#[derive(Debug, Clone)]
pub struct Prowler {
    pub(crate) tool: ToolConfig,
}

impl Prowler {
    pub fn new() -> Self {
        Self {
            tool: ToolConfig::new("prowler"),
        }
    }

    /// Run `prowler <provider> <args>` and map its checks into a result for `scanner`.
    pub fn scan(
        &self,
        scanner: &str,
        provider: &str,
        args: Vec<String>,
        target: &str,
        options: &ScanOptions,
    ) -> ScanResult {
        let invocation = self
            .tool
            .invocation(
                std::iter::once(provider.to_string())
                    .chain(["-M".to_string(), "json".to_string()])
                    .chain(args),
                options,
            )
            .accept_exit_codes(ACCEPTED_EXIT_CODES);

        match self.tool.run_json(&invocation) {
            Ok(output) => {
                let findings = findings_from_output(&output, target);
                debug!(scanner, provider, findings = findings.len(), "Prowler scan complete");
                ScanResult::new(scanner, target, findings)
            }
            Err(e) => tool_failure(scanner, target, &e),
        }
    }
}

crate::impl_tool_scanner!(Prowler);

/// Accepts both the bare check array and the `{"findings": [...]}` envelope.
pub fn findings_from_output(output: &Value, fallback_resource: &str) -> Vec<Finding> {
    let checks = match output {
        Value::Array(items) => items.as_slice(),
        other => super::common::array_field(other, "findings"),
    };
    checks
        .iter()
        .map(|check| finding_from_check(check, fallback_resource))
        .collect()
}

fn finding_from_check(check: &Value, fallback_resource: &str) -> Finding {
    let check_id = str_field(check, &["CheckID", "check_id", "id"]).unwrap_or("prowler-check");
    let resource = str_field(check, &["ResourceId", "resource_id", "ResourceArn", "resource"])
        .unwrap_or(fallback_resource);
    let message = str_field(
        check,
        &["StatusExtended", "Message", "message", "CheckTitle", "title", "description"],
    )
    .unwrap_or("");

    let mut finding = Finding::new(
        check_id,
        resource,
        status_field(check, &["Status", "status"]),
        message,
    )
    .with_severity(severity_field(check, &["Severity", "severity"]));

    if let Some(text) = recommendation(check) {
        finding = finding.with_recommendation(text);
    }

    let mut evidence = Map::new();
    for (key, names) in [
        ("region", &["Region", "region"][..]),
        ("service", &["ServiceName", "Service", "service"][..]),
    ] {
        if let Some(value) = str_field(check, names) {
            evidence.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    if let Some(compliance) = check.get("Compliance").or_else(|| check.get("compliance"))
        && !compliance.is_null()
    {
        evidence.insert("compliance".to_string(), compliance.clone());
    }
    finding.with_evidence(evidence)
}

fn recommendation(check: &Value) -> Option<String> {
    match check.get("Remediation").or_else(|| check.get("remediation"))? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(remediation) => remediation
            .get("Recommendation")
            .and_then(|r| r.get("Text"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
