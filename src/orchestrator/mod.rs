//! Orchestrator: fans requests out across registered scanners and merges the
//! results into one composite view.
//!
//! - `request`: multi-cloud, hybrid-cloud, terraform and image request types
//! - `result`: `CompositeResult` and `EnrichedResult`

pub mod request;
pub mod result;

pub use request::{ConfigSlices, HybridCloudRequest, ImageRequest, MultiCloudRequest, TerraformRequest};
pub use result::{CheckStatus, CiCdSettings, CompositeResult, EnrichedResult, RuntimeChecks};

use crate::config::Config;
use crate::error::{AuditError, Result};
use crate::external::{CancelFlag, ProcessRunner};
use crate::finding::ScanResult;
use crate::rules::{RuleCatalog, RuleDocument, RuleEngine, Violation, index_custom_rules};
use crate::scanner::{PluginRegistry, ScanOptions, ScannerPlugin};
use crate::scanners::{CLOUD_PROVIDERS, register_builtin};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Environments a hybrid-cloud scan accepts.
pub const HYBRID_ENVIRONMENTS: &[&str] = &["aws", "azure", "gcp", "on_prem"];

const TERRAFORM_SCANNER: &str = "iac";
const IMAGE_SCANNER: &str = "container";

/// Outcome of one fan-out target.
struct TargetOutcome {
    name: String,
    result: ScanResult,
    violations: Vec<Violation>,
    /// The scanner failed internally; `result` is a synthesized error result.
    failed: bool,
}

pub struct SecAudit {
    config: Config,
    registry: Arc<PluginRegistry>,
    engine: Arc<RuleEngine>,
    catalog: RuleCatalog,
    pool: ThreadPool,
    cancel: Option<CancelFlag>,
}

impl SecAudit {
    /// Orchestrator with every built-in scanner, running tools as child processes.
    /// Rule files listed in `config.rules.files` are merged into the default rules.
    pub fn new(config: Config) -> Result<Self> {
        let engine = Arc::new(RuleEngine::new());
        for path in &config.rules.files {
            engine.merge_rules_from_file(path)?;
        }
        let registry = Arc::new(PluginRegistry::new());
        register_builtin(&registry, &config, Arc::new(ProcessRunner::new()), engine.clone());
        Self::with_registry(config, registry, engine)
    }

    /// Orchestrator over an explicitly composed registry and rule engine.
    pub fn with_registry(
        config: Config,
        registry: Arc<PluginRegistry>,
        engine: Arc<RuleEngine>,
    ) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.scan.max_parallel)
            .thread_name(|i| format!("secaudit-scan-{}", i))
            .build()?;
        Ok(Self {
            config,
            registry,
            engine,
            catalog: RuleCatalog::new(),
            pool,
            cancel: None,
        })
    }

    /// Abort in-flight tool invocations when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    /// Store a rule document in the metadata catalog.
    pub fn add_rule(&self, rule: RuleDocument) -> Result<()> {
        self.catalog.add_rule(rule)
    }

    /// Catalog entries for the known subset of `ids`.
    pub fn resolve_rules<I, S>(&self, ids: I) -> BTreeMap<String, RuleDocument>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.catalog.resolve_rules(ids)
    }

    /// Run one registered scanner against one target and evaluate its rules.
    pub fn scan(
        &self,
        scanner: &str,
        target: &str,
        params: Map<String, Value>,
    ) -> Result<EnrichedResult> {
        let plugin = self.require_scanner(scanner)?;
        self.run_single(plugin, target, params)
    }

    pub fn scan_multi_cloud(&self, request: &MultiCloudRequest) -> Result<CompositeResult> {
        let scanners = self.resolve_targets(&request.providers, CLOUD_PROVIDERS, "provider")?;
        info!(providers = ?request.providers, "Starting multi-cloud scan");

        let mut composite = self.fan_out(scanners, &request.config)?;
        composite.rules = self.resolve_rules(&request.rules);
        composite.services = request.services.clone();
        Ok(composite)
    }

    pub fn scan_hybrid_cloud(&self, request: &HybridCloudRequest) -> Result<CompositeResult> {
        let scanners =
            self.resolve_targets(&request.environments, HYBRID_ENVIRONMENTS, "environment")?;
        info!(environments = ?request.environments, "Starting hybrid-cloud scan");

        let mut composite = self.fan_out(scanners, &request.config)?;
        composite.rules = self.resolve_rules(&request.rules);
        composite.components = request.components.clone();
        let stub = |requested: bool| requested.then_some(CheckStatus::CHECKED);
        composite.connectivity = stub(request.check_connectivity);
        composite.security_groups = stub(request.check_security_groups);
        composite.firewalls = stub(request.check_firewalls);
        Ok(composite)
    }

    pub fn scan_terraform(&self, request: &TerraformRequest) -> Result<EnrichedResult> {
        if request.directory.trim().is_empty() {
            return Err(AuditError::configuration(
                "Terraform directory must be provided",
            ));
        }
        let rules = index_custom_rules(&request.custom_rules)?;
        let scanner = self.require_scanner(TERRAFORM_SCANNER)?;

        let mut params = request.options.clone();
        params.insert("path".into(), Value::String(request.directory.clone()));
        params
            .entry("framework")
            .or_insert_with(|| Value::String("terraform".into()));

        let mut enriched = self.run_single(scanner, &request.directory, params)?;
        enriched.rules = rules;
        if request.ci_cd {
            enriched.ci_cd = Some(CiCdSettings {
                fail_on_high: request.fail_on_high,
            });
            enriched.sarif = Some(format!("Generated in {}", request.output_format));
            enriched.fail_on_high = Some(request.fail_on_high);
        }
        enriched.gate_failed = request.fail_on_high && enriched.has_severe_failures();
        Ok(enriched)
    }

    pub fn scan_image(&self, request: &ImageRequest) -> Result<EnrichedResult> {
        if request.image.trim().is_empty() {
            return Err(AuditError::configuration("Image name must be provided"));
        }
        let rules = index_custom_rules(&request.custom_rules)?;
        let scanner = self.require_scanner(IMAGE_SCANNER)?;

        let mut params = request.options.clone();
        params.insert("image".into(), Value::String(request.image.clone()));

        let mut enriched = self.run_single(scanner, &request.image, params)?;
        enriched.rules = rules;
        if request.runtime {
            enriched.runtime = Some(RuntimeChecks {
                processes: request.check_processes,
                network: request.check_network,
            });
        }
        if request.fail_on_high {
            enriched.fail_on_high = Some(true);
        }
        enriched.gate_failed = request.fail_on_high && enriched.has_severe_failures();
        Ok(enriched)
    }

    /// Check every requested name before scanning anything.
    fn resolve_targets(
        &self,
        names: &[String],
        allowed: &[&str],
        kind: &str,
    ) -> Result<Vec<(String, Arc<dyn ScannerPlugin>)>> {
        if names.is_empty() {
            return Err(AuditError::configuration(format!("No {} requested", kind)));
        }
        let mut scanners = Vec::with_capacity(names.len());
        for name in names {
            let plugin = allowed
                .contains(&name.as_str())
                .then(|| self.registry.get(name))
                .flatten()
                .ok_or_else(|| AuditError::configuration(format!("Unsupported {}: {}", kind, name)))?;
            if !scanners.iter().any(|(n, _): &(String, _)| n == name) {
                scanners.push((name.clone(), plugin));
            }
        }
        Ok(scanners)
    }

    fn require_scanner(&self, name: &str) -> Result<Arc<dyn ScannerPlugin>> {
        self.registry
            .get(name)
            .ok_or_else(|| AuditError::configuration(format!("No scanner registered: {}", name)))
    }

    fn options(&self, name: &str, params: Map<String, Value>) -> ScanOptions {
        ScanOptions::from_params(params)
            .with_defaults(&self.config.provider_defaults(name))
            .with_timeout(self.config.scan.timeout())
            .with_cancel(self.cancel.clone())
    }

    /// Run one scanner and evaluate its rule category.
    fn run_target(
        &self,
        name: &str,
        plugin: &dyn ScannerPlugin,
        params: Map<String, Value>,
    ) -> TargetOutcome {
        let options = self.options(name, params);
        let target = options.get_str("target").unwrap_or(name).to_string();
        debug!(scanner = name, target = %target, "Dispatching scan");

        let (mut result, failed) = match plugin.scan(&target, &options) {
            Ok(result) => (result, false),
            Err(e) => {
                warn!(scanner = name, target = %target, error = %e, "Scanner failed");
                (ScanResult::error(name, target.as_str(), name, e.to_string()), true)
            }
        };

        let violations = match plugin.rule_category() {
            Some(category) if !failed => self.engine.apply_rules(category, &result.rule_input()),
            _ => Vec::new(),
        };
        if self.config.scan.merge_violations && !violations.is_empty() {
            result.extend_findings(violations.iter().map(|v| v.to_finding(&target)));
        }

        TargetOutcome {
            name: name.to_string(),
            result,
            violations,
            failed,
        }
    }

    fn fan_out(
        &self,
        scanners: Vec<(String, Arc<dyn ScannerPlugin>)>,
        slices: &ConfigSlices,
    ) -> Result<CompositeResult> {
        let outcomes: Vec<TargetOutcome> = self.pool.install(|| {
            scanners
                .par_iter()
                .map(|(name, plugin)| {
                    let params = slices.get(name).cloned().unwrap_or_default();
                    self.run_target(name, plugin.as_ref(), params)
                })
                .collect()
        });

        if outcomes.iter().all(|o| o.failed) {
            let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
            return Err(AuditError::Execution {
                scanner: names.join(", "),
                message: "every scanner failed".to_string(),
            });
        }

        let mut results = BTreeMap::new();
        let mut violations = BTreeMap::new();
        for outcome in outcomes {
            if !outcome.violations.is_empty() {
                violations.insert(outcome.name.clone(), outcome.violations);
            }
            results.insert(outcome.name, outcome.result);
        }
        let mut composite = CompositeResult::new(results);
        composite.violations = violations;
        info!(
            targets = composite.results.len(),
            findings = composite.summary.total,
            risk_score = composite.summary.risk_score,
            "Scan complete"
        );
        Ok(composite)
    }

    fn run_single(
        &self,
        plugin: Arc<dyn ScannerPlugin>,
        target: &str,
        mut params: Map<String, Value>,
    ) -> Result<EnrichedResult> {
        let name = plugin.name().to_string();
        params
            .entry("target")
            .or_insert_with(|| Value::String(target.to_string()));
        let outcome = self.pool.install(|| self.run_target(&name, plugin.as_ref(), params));
        if outcome.failed {
            return Err(AuditError::Execution {
                scanner: name,
                message: outcome
                    .result
                    .findings()
                    .first()
                    .map(|f| f.message.clone())
                    .unwrap_or_default(),
            });
        }
        Ok(EnrichedResult::new(outcome.result, outcome.violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Finding, Severity};
    use crate::test_utils::fakes::{BrokenScanner, StaticScanner};
    use serde_json::json;

    fn orchestrator(plugins: Vec<Arc<dyn ScannerPlugin>>) -> SecAudit {
        let registry = Arc::new(PluginRegistry::new());
        for plugin in plugins {
            registry.register(plugin);
        }
        SecAudit::with_registry(Config::default(), registry, Arc::new(RuleEngine::new())).unwrap()
    }

    fn slice(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_multi_cloud_keys_and_slices() {
        let aws = Arc::new(StaticScanner::new("aws", vec![]));
        let azure = Arc::new(StaticScanner::new("azure", vec![]));
        let audit = orchestrator(vec![aws.clone(), azure.clone()]);

        let request = MultiCloudRequest::new(["aws", "azure"])
            .with_config("aws", slice(json!({"region": "us-east-1"})));
        let composite = audit.scan_multi_cloud(&request).unwrap();

        assert_eq!(composite.names(), vec!["aws", "azure"]);
        let calls = aws.calls.lock().unwrap();
        assert_eq!(calls[0].0, "aws");
        assert_eq!(calls[0].1["region"], "us-east-1");
        assert!(azure.calls.lock().unwrap()[0].1.is_empty());
    }

    #[test]
    fn test_unknown_provider_fails_fast() {
        let aws = Arc::new(StaticScanner::new("aws", vec![]));
        let audit = orchestrator(vec![aws.clone()]);
        let err = audit
            .scan_multi_cloud(&MultiCloudRequest::new(["aws", "doesnotexist"]))
            .unwrap_err();
        assert!(matches!(err, AuditError::Configuration(ref m) if m == "Unsupported provider: doesnotexist"));
        assert_eq!(aws.call_count(), 0);
    }

    #[test]
    fn test_allowed_but_unregistered_provider() {
        let audit = orchestrator(vec![]);
        assert!(matches!(
            audit.scan_multi_cloud(&MultiCloudRequest::new(["gcp"])),
            Err(AuditError::Configuration(_))
        ));
    }

    #[test]
    fn test_internal_failure_is_per_target() {
        let audit = orchestrator(vec![
            Arc::new(StaticScanner::new("aws", vec![])),
            Arc::new(BrokenScanner("azure")),
        ]);
        let composite = audit
            .scan_multi_cloud(&MultiCloudRequest::new(["aws", "azure"]))
            .unwrap();
        let azure = composite.get("azure").unwrap();
        assert!(azure.is_error());
        assert_eq!(azure.findings()[0].check_id, "azure-000");
        assert_eq!(composite.summary.error, 1);
    }

    #[test]
    fn test_total_failure_is_execution_error() {
        let audit = orchestrator(vec![Arc::new(BrokenScanner("aws"))]);
        assert!(matches!(
            audit.scan_multi_cloud(&MultiCloudRequest::new(["aws"])),
            Err(AuditError::Execution { .. })
        ));
    }

    #[test]
    fn test_rules_and_services_attached() {
        let audit = orchestrator(vec![Arc::new(StaticScanner::new("aws", vec![]))]);
        audit
            .add_rule(slice(json!({"id": "cis-1.1", "name": "Root MFA"})))
            .unwrap();
        let request = MultiCloudRequest::new(["aws"])
            .with_rules(["cis-1.1", "unknown"])
            .with_services("aws", vec!["s3".into()]);
        let composite = audit.scan_multi_cloud(&request).unwrap();
        assert_eq!(composite.rules.len(), 1);
        assert_eq!(composite.services["aws"], vec!["s3"]);
    }

    #[test]
    fn test_hybrid_stubs() {
        let audit = orchestrator(vec![
            Arc::new(StaticScanner::new("aws", vec![])),
            Arc::new(StaticScanner::new("on_prem", vec![])),
        ]);
        let request = HybridCloudRequest::new(["on_prem", "aws"])
            .with_config("on_prem", slice(json!({"servers": ["server1"]})))
            .with_checks(true, false, true);
        let composite = audit.scan_hybrid_cloud(&request).unwrap();
        assert_eq!(composite.names(), vec!["aws", "on_prem"]);
        assert_eq!(composite.connectivity, Some(CheckStatus::CHECKED));
        assert_eq!(composite.security_groups, None);
        assert_eq!(composite.firewalls, Some(CheckStatus::CHECKED));

        let err = audit
            .scan_hybrid_cloud(&HybridCloudRequest::new(["mainframe"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Unsupported environment: mainframe");
    }

    #[test]
    fn test_container_rules_applied() {
        let container = StaticScanner::new("container", vec![])
            .with_category("container")
            .with_fact("user", json!("root"));
        let audit = orchestrator(vec![Arc::new(container)]);
        let enriched = audit.scan_image(&ImageRequest::new("nginx:latest")).unwrap();
        assert_eq!(enriched.violations.len(), 1);
        assert_eq!(enriched.violations[0].name, "root_container");
        assert_eq!(enriched.result.summary().total, 0);
        assert!(!enriched.gate_failed);
    }

    #[test]
    fn test_merge_violations_into_findings() {
        let registry = Arc::new(PluginRegistry::new());
        registry.register(Arc::new(
            StaticScanner::new("container", vec![])
                .with_category("container")
                .with_fact("user", json!("root")),
        ));
        let mut config = Config::default();
        config.scan.merge_violations = true;
        let audit = SecAudit::with_registry(config, registry, Arc::new(RuleEngine::new())).unwrap();

        let enriched = audit
            .scan_image(&ImageRequest::new("nginx:latest").with_fail_on_high(true))
            .unwrap();
        assert_eq!(enriched.result.findings()[0].check_id, "root_container");
        assert!(enriched.gate_failed);
    }

    #[test]
    fn test_single_scan() {
        let code = Arc::new(StaticScanner::new("code", vec![]));
        let audit = orchestrator(vec![code.clone()]);
        let enriched = audit.scan("code", "./src", Map::new()).unwrap();
        assert_eq!(enriched.result.target(), "./src");
        assert_eq!(code.calls.lock().unwrap()[0].1["target"], "./src");

        assert!(matches!(
            audit.scan("missing", "x", Map::new()),
            Err(AuditError::Configuration(_))
        ));
        let broken = orchestrator(vec![Arc::new(BrokenScanner("code"))]);
        assert!(matches!(
            broken.scan("code", "./src", Map::new()),
            Err(AuditError::Execution { .. })
        ));
    }

    #[test]
    fn test_terraform_ci_cd_metadata() {
        let iac = Arc::new(StaticScanner::new(
            "iac",
            vec![Finding::failed("CKV_AWS_19", "main.tf", "unencrypted").with_severity(Severity::High)],
        ));
        let audit = orchestrator(vec![iac.clone()]);
        let request = TerraformRequest::new("infra")
            .with_custom_rules(vec![slice(json!({"id": "tf-001", "severity": "high"}))])
            .with_ci_cd(true, "sarif");
        let enriched = audit.scan_terraform(&request).unwrap();

        assert_eq!(enriched.ci_cd, Some(CiCdSettings { fail_on_high: true }));
        assert_eq!(enriched.sarif.as_deref(), Some("Generated in sarif"));
        assert_eq!(enriched.fail_on_high, Some(true));
        assert!(enriched.rules.contains_key("tf-001"));
        assert!(enriched.gate_failed);

        let calls = iac.calls.lock().unwrap();
        assert_eq!(calls[0].0, "infra");
        assert_eq!(calls[0].1["path"], "infra");
        assert_eq!(calls[0].1["framework"], "terraform");
    }

    #[test]
    fn test_terraform_validation() {
        let audit = orchestrator(vec![Arc::new(StaticScanner::new("iac", vec![]))]);
        assert!(matches!(
            audit.scan_terraform(&TerraformRequest::new("")),
            Err(AuditError::Configuration(_))
        ));
        let bad_rules = TerraformRequest::new("infra")
            .with_custom_rules(vec![slice(json!({"name": "no id"}))]);
        assert!(matches!(
            audit.scan_terraform(&bad_rules),
            Err(AuditError::Validation { .. })
        ));
    }

    #[test]
    fn test_image_runtime_metadata() {
        let audit = orchestrator(vec![Arc::new(StaticScanner::new("container", vec![]))]);
        let enriched = audit
            .scan_image(&ImageRequest::new("alpine:3").with_runtime(true, false))
            .unwrap();
        assert_eq!(
            enriched.runtime,
            Some(RuntimeChecks {
                processes: true,
                network: false
            })
        );
        assert!(enriched.fail_on_high.is_none());
    }

    #[test]
    fn test_provider_defaults_from_config() {
        let registry = Arc::new(PluginRegistry::new());
        let aws = Arc::new(StaticScanner::new("aws", vec![]));
        registry.register(aws.clone());
        let mut config = Config::default();
        config
            .providers
            .insert("aws".into(), slice(json!({"profile": "prod", "region": "eu-west-1"})));
        let audit = SecAudit::with_registry(config, registry, Arc::new(RuleEngine::new())).unwrap();

        let request = MultiCloudRequest::new(["aws"])
            .with_config("aws", slice(json!({"region": "us-east-1"})));
        audit.scan_multi_cloud(&request).unwrap();
        let calls = aws.calls.lock().unwrap();
        assert_eq!(calls[0].1["profile"], "prod");
        assert_eq!(calls[0].1["region"], "us-east-1");
    }
}
