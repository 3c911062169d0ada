//! Configuration layer for secaudit.
//!
//! - `types`: configuration sections and their defaults
//! - `loading`: file loading and project/global lookup

mod error;
mod loading;
mod types;

pub use error::ConfigError;
pub use types::{
    ComplianceConfig, Config, MonitoringConfig, RulesConfig, SbomConfig, ScanSettings,
    ToolsConfig,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.timeout_secs, 300);
        assert_eq!(config.scan.max_parallel, 4);
        assert!(!config.scan.merge_violations);
        assert_eq!(config.tools.prowler, "prowler");
        assert!(config.sbom.restricted_licenses.contains(&"GPL-3.0".to_string()));
        assert_eq!(config.compliance.frameworks.len(), 5);
    }

    #[test]
    fn test_timeout_zero_disables() {
        let mut scan = ScanSettings::default();
        assert_eq!(scan.timeout(), Some(Duration::from_secs(300)));
        scan.timeout_secs = 0;
        assert_eq!(scan.timeout(), None);
    }

    #[test]
    fn test_from_file_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "scan:\n  timeout_secs: 60\nproviders:\n  aws:\n    region: us-east-1\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.scan.timeout_secs, 60);
        assert_eq!(config.scan.max_parallel, 4);
        assert_eq!(config.provider_defaults("aws")["region"], "us-east-1");
        assert!(config.provider_defaults("gcp").is_empty());
    }

    #[test]
    fn test_monitoring_section() {
        let defaults = MonitoringConfig::default();
        assert!(!defaults.enabled);
        assert_eq!(defaults.alert_threshold, Severity::High);
        assert_eq!(defaults.history_limit, 100);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "monitoring:\n  enabled: true\n  alert_threshold: MEDIUM\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert!(config.monitoring.enabled);
        assert_eq!(config.monitoring.alert_threshold, Severity::Medium);
        assert_eq!(config.monitoring.history_limit, 100);
    }

    #[test]
    fn test_from_file_json_and_toml() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("c.json");
        fs::write(&json, r#"{"tools": {"trivy": "/opt/trivy"}}"#).unwrap();
        assert_eq!(Config::from_file(&json).unwrap().tools.trivy, "/opt/trivy");

        let toml = dir.path().join("c.toml");
        fs::write(&toml, "[sbom]\nallowed_licenses = [\"MIT\"]\n").unwrap();
        assert_eq!(
            Config::from_file(&toml).unwrap().sbom.allowed_licenses,
            vec!["MIT"]
        );
    }

    #[test]
    fn test_from_file_errors() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join("c.ini");
        fs::write(&ini, "x=1").unwrap();
        assert!(matches!(
            Config::from_file(&ini),
            Err(ConfigError::UnsupportedFormat(_, _))
        ));

        let bad = dir.path().join("c.yaml");
        fs::write(&bad, "scan: [").unwrap();
        assert!(matches!(
            Config::from_file(&bad),
            Err(ConfigError::ParseYaml { .. })
        ));

        let zero = dir.path().join("z.yaml");
        fs::write(&zero, "scan:\n  max_parallel: 0\n").unwrap();
        assert!(matches!(
            Config::from_file(&zero),
            Err(ConfigError::InvalidValue { .. })
        ));

        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/c.yaml")),
            Err(ConfigError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_load_project_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".secaudit.yaml"),
            "scan:\n  merge_violations: true\n",
        )
        .unwrap();
        let config = Config::load(Some(dir.path()));
        assert!(config.scan.merge_violations);
    }

    #[test]
    fn test_load_skips_broken_project_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".secaudit.yaml"), "scan: [").unwrap();
        fs::write(
            dir.path().join(".secaudit.json"),
            r#"{"scan": {"max_parallel": 2}}"#,
        )
        .unwrap();
        assert_eq!(Config::load(Some(dir.path())).scan.max_parallel, 2);
    }
}
