//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ConfigError;
use crate::finding::Severity;

/// Main configuration structure for secaudit.
///
/// Passed explicitly to the orchestrator and scanners; nothing reads a
/// global instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanSettings,
    pub tools: ToolsConfig,
    /// Default options per provider or environment (`aws`, `azure`, `on_prem`, ...).
    /// A request's own config slice takes precedence key by key.
    pub providers: BTreeMap<String, Map<String, Value>>,
    pub rules: RulesConfig,
    pub sbom: SbomConfig,
    pub compliance: ComplianceConfig,
    pub monitoring: MonitoringConfig,
}

impl Config {
    pub fn provider_defaults(&self, name: &str) -> Map<String, Value> {
        self.providers.get(name).cloned().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.max_parallel == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scan.max_parallel",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Per external tool invocation. 0 disables the limit.
    pub timeout_secs: u64,
    /// Upper bound on concurrent provider/environment scans.
    pub max_parallel: usize,
    /// Fold rule violations into result findings.
    pub merge_violations: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_parallel: 4,
            merge_violations: false,
        }
    }
}

impl ScanSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Executable names or paths of the wrapped tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub prowler: String,
    pub trivy: String,
    pub checkov: String,
    pub syft: String,
    pub oscap: String,
    pub curl: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            prowler: "prowler".to_string(),
            trivy: "trivy".to_string(),
            checkov: "checkov".to_string(),
            syft: "syft".to_string(),
            oscap: "oscap".to_string(),
            curl: "curl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule files merged into the engine at start-up.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SbomConfig {
    pub allowed_licenses: Vec<String>,
    pub restricted_licenses: Vec<String>,
}

impl Default for SbomConfig {
    fn default() -> Self {
        Self {
            allowed_licenses: ["MIT", "Apache-2.0", "BSD-3-Clause"]
                .map(String::from)
                .to_vec(),
            restricted_licenses: ["GPL-3.0", "AGPL-3.0"].map(String::from).to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Framework id to display name.
    pub frameworks: BTreeMap<String, String>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        let frameworks = [
            ("cis", "Center for Internet Security"),
            ("pci", "Payment Card Industry"),
            ("hipaa", "Health Insurance Portability and Accountability Act"),
            ("nist", "National Institute of Standards and Technology"),
            ("iso27001", "ISO/IEC 27001"),
        ]
        .into_iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect();
        Self { frameworks }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Dispatch alerts after each command.
    pub enabled: bool,
    /// Lowest severity that raises an alert.
    pub alert_threshold: Severity,
    /// Scan history entries kept in memory. 0 disables tracking.
    pub history_limit: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            alert_threshold: Severity::High,
            history_limit: 100,
        }
    }
}
