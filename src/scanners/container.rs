//! Container image scanner backed by Trivy.

use super::common::{ToolConfig, array_field, severity_field, str_field};
use crate::finding::{Finding, FindingStatus, ScanResult, Severity};
use crate::scanner::{ScanError, ScanOptions, ScannerPlugin, tool_failure};
use serde_json::{Map, Value};
use tracing::debug;

const SENSITIVE_ENV_MARKERS: &[&str] = &["PASSWORD", "SECRET", "KEY", "TOKEN"];

#[derive(Debug, Clone)]
pub struct ContainerScanner {
    tool: ToolConfig,
}

impl ContainerScanner {
    pub const NAME: &'static str = "container";

    pub fn new() -> Self {
        Self {
            tool: ToolConfig::new("trivy"),
        }
    }
}

crate::impl_tool_scanner!(ContainerScanner);

/// Findings from a Trivy image report.
pub fn findings_from_report(report: &Value, image: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for result in array_field(report, "Results") {
        let location = str_field(result, &["Target"]).unwrap_or(image);
        findings.extend(array_field(result, "Vulnerabilities").iter().map(vulnerability));
        findings.extend(
            array_field(result, "Misconfigurations")
                .iter()
                .map(|m| misconfiguration(m, location)),
        );
        findings.extend(
            array_field(result, "Secrets")
                .iter()
                .map(|s| secret(s, location)),
        );
    }
    if let Some(config) = image_config(report) {
        findings.extend(config_findings(config, image));
    }
    findings
}

fn vulnerability(vuln: &Value) -> Finding {
    let id = str_field(vuln, &["VulnerabilityID"]).unwrap_or("unknown");
    let package = str_field(vuln, &["PkgName"]).unwrap_or("unknown");
    let installed = str_field(vuln, &["InstalledVersion"]).unwrap_or("unknown");
    let title = str_field(vuln, &["Title", "Description"]).unwrap_or("");

    let mut evidence = Map::new();
    evidence.insert("vulnerability_id".into(), Value::String(id.to_string()));
    if let Some(fixed) = str_field(vuln, &["FixedVersion"]) {
        evidence.insert("fixed_version".into(), Value::String(fixed.to_string()));
    }

    let finding = Finding::failed(
        "container-001",
        format!("{}@{}", package, installed),
        format!("{}: {}", id, title),
    )
    .with_severity(severity_field(vuln, &["Severity"]))
    .with_evidence(evidence);

    match str_field(vuln, &["FixedVersion"]) {
        Some(fixed) => finding.with_recommendation(format!("Update {} to version {}", package, fixed)),
        None => finding,
    }
}

fn misconfiguration(misconfig: &Value, location: &str) -> Finding {
    let status = match str_field(misconfig, &["Status"]) {
        Some(s) => FindingStatus::normalize(s),
        None => FindingStatus::Failed,
    };
    let id = str_field(misconfig, &["ID", "AVDID"]).unwrap_or("misconfiguration");
    let message = str_field(misconfig, &["Message", "Title"]).unwrap_or("");
    let finding = Finding::new(
        "container-002",
        location,
        status,
        format!("{}: {}", id, message),
    )
    .with_severity(severity_field(misconfig, &["Severity"]));
    match str_field(misconfig, &["Resolution"]) {
        Some(resolution) => finding.with_recommendation(resolution),
        None => finding,
    }
}

fn secret(secret: &Value, location: &str) -> Finding {
    let title = str_field(secret, &["Title", "RuleID"]).unwrap_or("secret");
    let resource = match secret.get("StartLine").and_then(Value::as_u64) {
        Some(line) => format!("{}:Line {}", location, line),
        None => location.to_string(),
    };
    Finding::failed("container-003", resource, format!("Exposed secret: {}", title))
        .with_severity(match severity_field(secret, &["Severity"]) {
            Severity::Unknown => Severity::High,
            other => other,
        })
        .with_recommendation("Remove the secret from the image and rotate it")
}

fn image_config(report: &Value) -> Option<&Value> {
    report
        .get("Metadata")?
        .get("ImageConfig")?
        .get("config")
}

/// The user the image runs as, when the report carries an image config.
/// An empty or unset user inside the config means root.
pub fn image_user(report: &Value) -> Option<String> {
    image_config(report).map(|config| {
        let user = match str_field(config, &["User"]) {
            Some(user) if !runs_as_root(user) => user,
            _ => "root",
        };
        user.to_string()
    })
}

fn runs_as_root(user: &str) -> bool {
    let name = user.split(':').next().unwrap_or(user);
    name.is_empty() || name == "root" || name == "0"
}

fn config_findings(config: &Value, image: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    if str_field(config, &["User"]).is_none_or(runs_as_root) {
        findings.push(
            Finding::failed("container-002", image, "Container runs as root user")
                .with_severity(Severity::High)
                .with_recommendation("Set a non-root USER in the image"),
        );
    }

    if let Some(ports) = config.get("ExposedPorts").and_then(Value::as_object)
        && !ports.is_empty()
    {
        let ports: Vec<&str> = ports.keys().map(String::as_str).collect();
        findings.push(
            Finding::failed(
                "container-002",
                image,
                format!("Container exposes ports: {}", ports.join(", ")),
            )
            .with_severity(Severity::Medium),
        );
    }

    for var in array_field(config, "Env").iter().filter_map(Value::as_str) {
        let name = var.split('=').next().unwrap_or(var);
        let upper = name.to_ascii_uppercase();
        if SENSITIVE_ENV_MARKERS.iter().any(|m| upper.contains(m)) {
            findings.push(
                Finding::failed(
                    "container-002",
                    image,
                    format!("Container contains sensitive environment variable: {}", name),
                )
                .with_severity(Severity::High)
                .with_recommendation("Inject secrets at runtime instead of baking them into the image"),
            );
        }
    }
    findings
}

impl ScannerPlugin for ContainerScanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Container image security scanner using Trivy"
    }

    fn supported_targets(&self) -> &[&'static str] {
        &["image"]
    }

    fn rule_category(&self) -> Option<&str> {
        Some("container")
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let image = options.get_str("image").unwrap_or(target);
        if image.is_empty() {
            return Ok(ScanResult::error(
                Self::NAME,
                target,
                "image",
                "Missing required parameter: image",
            ));
        }

        let invocation = self.tool.invocation(
            [
                "image",
                "--format",
                "json",
                "--scanners",
                "vuln,misconfig,secret",
                image,
            ],
            options,
        );
        let report = match self.tool.run_json(&invocation) {
            Ok(report) => report,
            Err(e) => return Ok(tool_failure(Self::NAME, target, &e)),
        };

        let findings = findings_from_report(&report, image);
        debug!(image, findings = findings.len(), "Container scan complete");
        let result = ScanResult::new(Self::NAME, target, findings).with_fact("image", image);
        Ok(match image_user(&report) {
            Some(user) => result.with_fact("user", user),
            None => result,
        })
    }
}
