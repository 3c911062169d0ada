//! CLI integration tests.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    let mut c = cargo_bin_cmd!("secaudit");
    c.env_remove("RUST_LOG");
    c
}

/// Config pointing every external tool at a binary that does not exist.
fn offline_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    fs::write(
        &path,
        r#"
tools:
  prowler: secaudit-test-missing-prowler
  trivy: secaudit-test-missing-trivy
  checkov: secaudit-test-missing-checkov
  syft: secaudit-test-missing-syft
  oscap: secaudit-test-missing-oscap
  curl: secaudit-test-missing-curl
"#,
    )
    .unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

mod plugins {
    use super::*;

    #[test]
    fn test_lists_builtin_plugins() {
        cmd()
            .arg("plugins")
            .assert()
            .success()
            .stdout(predicate::str::contains("aws"))
            .stdout(predicate::str::contains("on_prem"))
            .stdout(predicate::str::contains("sbom"));
    }

    #[test]
    fn test_json_listing() {
        let output = cmd().args(["plugins", "-f", "json"]).output().unwrap();
        assert!(output.status.success());
        let plugins = stdout_json(&output);
        let names: Vec<&str> = plugins
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "api", "aws", "azure", "cloud", "code", "compliance", "container", "gcp", "iac",
                "on_prem", "sbom"
            ]
        );
    }
}

mod scan {
    use super::*;

    #[test]
    fn test_code_scan_finds_secret() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "password = \"hunter2\"\n").unwrap();

        let output = cmd()
            .args(["scan", "code", dir.path().to_str().unwrap(), "-f", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let result = stdout_json(&output);
        assert_eq!(result["scanner"], "code");
        assert_eq!(result["findings"][0]["check_id"], "code-001");
        assert_eq!(result["summary"]["failed"], 1);
    }

    #[test]
    fn test_monitoring_logs_alerts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "password = \"hunter2\"\n").unwrap();
        let config = dir.path().join("config.yaml");
        fs::write(&config, "monitoring:\n  enabled: true\n").unwrap();

        cmd()
            .args(["scan", "code", dir.path().to_str().unwrap(), "-f", "json", "--config"])
            .arg(&config)
            .assert()
            .success()
            .stderr(predicate::str::contains("[HIGH] code-001"));

        cmd()
            .args(["scan", "code", dir.path().to_str().unwrap(), "-f", "json"])
            .assert()
            .success()
            .stderr(predicate::str::contains("[HIGH]").not());
    }

    #[test]
    fn test_unknown_scanner_exits_2() {
        cmd()
            .args(["scan", "nope", "target"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("No scanner registered: nope"));
    }

    #[test]
    fn test_missing_tool_is_error_finding() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(dir.path());
        let output = cmd()
            .args(["scan", "container", "nginx:latest", "-f", "json", "--config"])
            .arg(&config)
            .output()
            .unwrap();
        assert!(output.status.success());
        let result = stdout_json(&output);
        assert_eq!(result["findings"][0]["check_id"], "container-000");
        assert_eq!(result["findings"][0]["status"], "error");
    }

    #[test]
    fn test_on_prem_inventory() {
        let dir = TempDir::new().unwrap();
        let inventory = dir.path().join("hosts.yaml");
        fs::write(
            &inventory,
            "hosts:\n  - name: legacy01\n    ports: [23, 22]\n",
        )
        .unwrap();

        cmd()
            .args(["scan", "on_prem", "datacenter", "-o"])
            .arg(format!("inventory={}", inventory.display()))
            .assert()
            .success()
            .stdout(predicate::str::contains("on_prem-001"))
            .stdout(predicate::str::contains("legacy01:23"));
    }
}

mod orchestration {
    use super::*;

    #[test]
    fn test_unsupported_provider_is_structured_error() {
        let output = cmd()
            .args(["multi-cloud", "aws,doesnotexist", "-f", "json"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        let error = stdout_json(&output);
        assert_eq!(
            error["error"],
            "Configuration error: Unsupported provider: doesnotexist"
        );
        assert_eq!(error["kind"], "configuration");
    }

    #[test]
    fn test_multi_cloud_with_missing_prowler() {
        let dir = TempDir::new().unwrap();
        let config = offline_config(dir.path());
        let output = cmd()
            .args(["multi-cloud", "aws,gcp", "-f", "json", "--service", "aws=s3", "--config"])
            .arg(&config)
            .output()
            .unwrap();
        assert!(output.status.success());
        let composite = stdout_json(&output);
        assert_eq!(composite["aws"]["findings"][0]["check_id"], "aws-000");
        assert_eq!(composite["gcp"]["findings"][0]["check_id"], "gcp-000");
        assert_eq!(composite["summary"]["error"], 2);
        assert_eq!(composite["services"]["aws"][0], "s3");
    }

    #[test]
    fn test_hybrid_on_prem() {
        let dir = TempDir::new().unwrap();
        let inventory = dir.path().join("hosts.json");
        fs::write(
            &inventory,
            r#"{"hosts": [{"name": "files01", "services": ["ftp"]}]}"#,
        )
        .unwrap();

        let output = cmd()
            .args(["hybrid", "on_prem", "-f", "json", "--connectivity", "--set"])
            .arg(format!("on_prem.inventory={}", inventory.display()))
            .output()
            .unwrap();
        assert!(output.status.success());
        let composite = stdout_json(&output);
        assert_eq!(composite["on_prem"]["findings"][0]["resource"], "files01:21");
        assert_eq!(composite["connectivity"]["status"], "checked");
        assert!(composite.get("firewalls").is_none());
    }

    #[test]
    fn test_hybrid_request_file() {
        let dir = TempDir::new().unwrap();
        let request = dir.path().join("request.yaml");
        fs::write(
            &request,
            "environments: [on_prem]\nconfig:\n  on_prem:\n    hosts: []\ncheck_firewalls: true\n",
        )
        .unwrap();

        let output = cmd()
            .args(["hybrid", "-f", "json", "--request"])
            .arg(&request)
            .output()
            .unwrap();
        assert!(output.status.success());
        let composite = stdout_json(&output);
        assert_eq!(composite["on_prem"]["summary"]["total"], 0);
        assert_eq!(composite["firewalls"]["status"], "checked");
    }

    #[test]
    fn test_terraform_requires_directory() {
        cmd()
            .args(["terraform", ""])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Terraform directory must be provided"));
    }

    #[test]
    fn test_custom_rules_need_id() {
        let dir = TempDir::new().unwrap();
        let rules = dir.path().join("rules.json");
        fs::write(&rules, r#"[{"name": "no id"}]"#).unwrap();
        cmd()
            .args(["image", "alpine:3", "--custom-rules"])
            .arg(&rules)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Invalid rule"));
    }

    #[cfg(unix)]
    #[test]
    fn test_image_gate_fails_on_high() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let report = r#"{"Results": [{"Target": "nginx", "Vulnerabilities": [{"VulnerabilityID": "CVE-2024-0001", "PkgName": "openssl", "InstalledVersion": "1.0", "FixedVersion": "1.1", "Severity": "HIGH"}]}]}"#;
        let script = dir.path().join("fake-trivy");
        fs::write(&script, format!("#!/bin/sh\ncat <<'JSON'\n{}\nJSON\n", report)).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let config = dir.path().join("config.yaml");
        fs::write(&config, format!("tools:\n  trivy: {}\n", script.display())).unwrap();

        let output = cmd()
            .args(["image", "nginx:1.25", "--fail-on-high", "-f", "json", "--config"])
            .arg(&config)
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));
        let result = stdout_json(&output);
        assert_eq!(result["findings"][0]["check_id"], "container-001");
        assert_eq!(result["fail_on_high"], true);
        assert_eq!(result["gate_failed"], true);

        cmd()
            .args(["image", "nginx:1.25", "-f", "json", "--config"])
            .arg(&config)
            .assert()
            .success();
    }
}

mod rules {
    use super::*;

    #[test]
    fn test_list_default_rules() {
        cmd()
            .args(["rules", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("container:"))
            .stdout(predicate::str::contains("root_container"))
            .stdout(predicate::str::contains("insecure_headers"));
    }

    #[test]
    fn test_list_single_category_json() {
        let output = cmd()
            .args(["rules", "list", "iac", "-f", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let file = stdout_json(&output);
        assert_eq!(file.as_object().unwrap().len(), 1);
        assert_eq!(file["iac"][0]["id"], "insecure_storage");
    }

    #[test]
    fn test_export_then_import() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.yaml");
        cmd()
            .args(["rules", "export"])
            .arg(&path)
            .assert()
            .success()
            .stderr(predicate::str::contains("Exported"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("root_container"));

        let custom = dir.path().join("custom.json");
        fs::write(
            &custom,
            r#"{"container": [{"id": "latest_tag", "description": "latest tag", "severity": "medium",
                "condition": {"matches": {"path": "image", "pattern": ":latest$"}}}]}"#,
        )
        .unwrap();
        let output = cmd()
            .args(["rules", "import", "-f", "json"])
            .arg(&custom)
            .output()
            .unwrap();
        assert!(output.status.success());
        let counts = stdout_json(&output);
        assert_eq!(counts["container"], 2);

        let output = cmd()
            .args(["rules", "import", "--replace", "-f", "json"])
            .arg(&custom)
            .output()
            .unwrap();
        assert_eq!(stdout_json(&output)["container"], 1);
    }

    #[test]
    fn test_import_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.txt");
        fs::write(&path, "").unwrap();
        cmd()
            .args(["rules", "import"])
            .arg(&path)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Unsupported format"));
    }
}
