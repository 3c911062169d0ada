//! On-premises inventory scanner.
//!
//! Evaluates an inventory of hosts (open ports and named services) for
//! cleartext protocols and exposed data or admin services.

use super::common::{array_field, str_field};
use crate::finding::{Finding, ScanResult, Severity};
use crate::scanner::{ScanError, ScanOptions, ScannerPlugin};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

struct ServiceRule {
    service: &'static str,
    port: u64,
    check_id: &'static str,
    severity: Severity,
    recommendation: &'static str,
}

const CLEARTEXT: &str = "Replace with an encrypted protocol (SSH, SFTP, TLS)";
const EXPOSED: &str = "Restrict access with host firewall rules or a private network";

const SERVICE_RULES: &[ServiceRule] = &[
    ServiceRule { service: "ftp", port: 21, check_id: "on_prem-001", severity: Severity::High, recommendation: CLEARTEXT },
    ServiceRule { service: "telnet", port: 23, check_id: "on_prem-001", severity: Severity::High, recommendation: CLEARTEXT },
    ServiceRule { service: "tftp", port: 69, check_id: "on_prem-001", severity: Severity::High, recommendation: CLEARTEXT },
    ServiceRule { service: "rexec", port: 512, check_id: "on_prem-001", severity: Severity::High, recommendation: CLEARTEXT },
    ServiceRule { service: "rlogin", port: 513, check_id: "on_prem-001", severity: Severity::High, recommendation: CLEARTEXT },
    ServiceRule { service: "rsh", port: 514, check_id: "on_prem-001", severity: Severity::High, recommendation: CLEARTEXT },
    ServiceRule { service: "vnc", port: 5900, check_id: "on_prem-001", severity: Severity::Medium, recommendation: CLEARTEXT },
    ServiceRule { service: "smb", port: 445, check_id: "on_prem-002", severity: Severity::Medium, recommendation: EXPOSED },
    ServiceRule { service: "rdp", port: 3389, check_id: "on_prem-002", severity: Severity::Medium, recommendation: EXPOSED },
    ServiceRule { service: "mysql", port: 3306, check_id: "on_prem-002", severity: Severity::Medium, recommendation: EXPOSED },
    ServiceRule { service: "postgresql", port: 5432, check_id: "on_prem-002", severity: Severity::Medium, recommendation: EXPOSED },
    ServiceRule { service: "redis", port: 6379, check_id: "on_prem-002", severity: Severity::Medium, recommendation: EXPOSED },
    ServiceRule { service: "elasticsearch", port: 9200, check_id: "on_prem-002", severity: Severity::Medium, recommendation: EXPOSED },
    ServiceRule { service: "memcached", port: 11211, check_id: "on_prem-002", severity: Severity::Medium, recommendation: EXPOSED },
    ServiceRule { service: "mongodb", port: 27017, check_id: "on_prem-002", severity: Severity::Medium, recommendation: EXPOSED },
];

/// A port as `22`, `"22"` or `"22/tcp"`.
fn port_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.split('/').next()?.trim().parse().ok(),
        Value::Object(_) => value.get("port").and_then(port_number),
        _ => None,
    }
}

/// Named services on a host with the port they were observed on, if any.
fn observed_services(host: &Value) -> BTreeMap<String, Option<u64>> {
    array_field(host, "services")
        .iter()
        .filter_map(|s| match s {
            Value::String(name) => Some((name.to_ascii_lowercase(), None)),
            other => str_field(other, &["name", "service"])
                .map(|name| (name.to_ascii_lowercase(), port_number(other))),
        })
        .collect()
}

/// Evaluate one inventory host.
pub fn check_host(host: &Value) -> Vec<Finding> {
    let name = str_field(host, &["name", "host", "address", "ip"]).unwrap_or("unknown");
    let ports: BTreeSet<u64> = array_field(host, "ports")
        .iter()
        .chain(array_field(host, "services"))
        .filter_map(port_number)
        .collect();
    let services = observed_services(host);

    SERVICE_RULES
        .iter()
        .filter_map(|rule| {
            let port = if ports.contains(&rule.port) {
                rule.port
            } else {
                services.get(rule.service).copied()?.unwrap_or(rule.port)
            };
            Some(
                Finding::failed(
                    rule.check_id,
                    format!("{}:{}", name, port),
                    format!("{} service exposed on {}", rule.service, name),
                )
                .with_severity(rule.severity)
                .with_recommendation(rule.recommendation),
            )
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Failed to read inventory {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse inventory {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse inventory {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub fn load_inventory(path: &Path) -> Result<Value, InventoryError> {
    let content = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => {
            serde_yaml::from_str(&content).map_err(|source| InventoryError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => serde_json::from_str(&content).map_err(|source| InventoryError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OnPremScanner;

impl OnPremScanner {
    pub const NAME: &'static str = "on_prem";

    pub fn new() -> Self {
        Self
    }
}

impl ScannerPlugin for OnPremScanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "On-premises infrastructure scanner"
    }

    fn supported_targets(&self) -> &[&'static str] {
        &["inventory"]
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let inventory = match options.get_str("inventory") {
            Some(path) => match load_inventory(Path::new(path)) {
                Ok(inventory) => inventory,
                Err(e) => {
                    warn!(path, error = %e, "Inventory unavailable");
                    return Ok(ScanResult::error(Self::NAME, target, path, e.to_string()));
                }
            },
            None => json!({"hosts": options.get("hosts").cloned().unwrap_or(Value::Null)}),
        };

        let hosts = array_field(&inventory, "hosts");
        let findings: Vec<Finding> = hosts.iter().flat_map(check_host).collect();
        debug!(target, hosts = hosts.len(), findings = findings.len(), "On-prem scan complete");

        Ok(ScanResult::new(Self::NAME, target, findings)
            .with_fact("environment", "on_prem")
            .with_fact("hosts", hosts.len())
            .with_fact("config", options.params().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_check_host() {
        let host = json!({
            "name": "db01",
            "ports": [22, "3306/tcp"],
            "services": [{"name": "Telnet", "port": 2323}, "ssh"]
        });
        let findings = check_host(&host);
        let resources: Vec<_> = findings.iter().map(|f| f.resource.as_str()).collect();
        assert_eq!(resources, vec!["db01:2323", "db01:3306"]);
        assert_eq!(findings[0].check_id, "on_prem-001");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[1].check_id, "on_prem-002");
    }

    #[test]
    fn test_service_without_port_uses_default() {
        let findings = check_host(&json!({"name": "nas", "services": ["SMB"]}));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].resource, "nas:445");
    }

    #[test]
    fn test_default_port_wins_over_service_entry() {
        let host = json!({"name": "ftp01", "ports": [21], "services": [{"name": "ftp", "port": 2121}]});
        let findings = check_host(&host);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].resource, "ftp01:21");
    }

    #[test]
    fn test_hardened_host_is_clean() {
        assert!(check_host(&json!({"name": "web01", "ports": [22, 443]})).is_empty());
    }

    #[test]
    fn test_inline_hosts() {
        let options = ScanOptions::new().with("hosts", json!([{"host": "10.0.0.5", "ports": [21]}]));
        let result = OnPremScanner::new().scan("datacenter", &options).unwrap();
        assert_eq!(result.summary().failed, 1);
        assert_eq!(result.facts()["environment"], "on_prem");
        assert_eq!(result.facts()["hosts"], 1);
    }

    #[test]
    fn test_no_inventory_is_empty_result() {
        let result = OnPremScanner::new().scan("on_prem", &ScanOptions::new()).unwrap();
        assert!(result.findings().is_empty());
        assert!(!result.is_error());
    }

    #[test]
    fn test_yaml_inventory_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.yaml");
        fs::write(&path, "hosts:\n  - name: legacy\n    services: [ftp, rsh]\n").unwrap();
        let options = ScanOptions::new().with("inventory", path.display().to_string());
        let result = OnPremScanner::new().scan("on_prem", &options).unwrap();
        assert_eq!(result.summary().failed, 2);
    }

    #[test]
    fn test_load_inventory_errors() {
        let dir = TempDir::new().unwrap();
        let missing = load_inventory(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, InventoryError::Read { .. }));

        let yaml = dir.path().join("broken.yaml");
        fs::write(&yaml, "hosts: [unclosed").unwrap();
        assert!(matches!(load_inventory(&yaml), Err(InventoryError::Yaml { .. })));

        let json_path = dir.path().join("broken.json");
        fs::write(&json_path, "{").unwrap();
        let err = load_inventory(&json_path).unwrap_err();
        assert!(matches!(err, InventoryError::Json { .. }));
        assert!(err.to_string().starts_with("Failed to parse inventory"));
    }

    #[test]
    fn test_unreadable_inventory() {
        let options = ScanOptions::new().with("inventory", "/nonexistent/inventory.json");
        let result = OnPremScanner::new().scan("on_prem", &options).unwrap();
        assert!(result.is_error());
        assert_eq!(result.findings()[0].check_id, "on_prem-000");
    }
}
