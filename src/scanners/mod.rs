//! Built-in scanner plugins.
//!
//! Available scanners:
//! - `ProviderScanner` - `aws`, `azure`, `gcp` posture scans through Prowler
//! - `CloudScanner` - multi-provider `cloud` plugin, including Kubernetes
//! - `CodeScanner` - regex checks over source trees
//! - `ContainerScanner` - Trivy image scans
//! - `SbomScanner` - Syft bills of materials and license policy
//! - `IacScanner` - Checkov infrastructure-as-code scans
//! - `ComplianceScanner` - framework evaluation via Prowler or OpenSCAP
//! - `ApiScanner` - HTTP security headers and rate limiting
//! - `OnPremScanner` - on-premises inventory review

// Macros must be declared first to be available in other modules
#[macro_use]
pub mod macros;

pub mod api;
pub mod cloud;
pub mod code;
pub mod common;
pub mod compliance;
pub mod container;
pub mod iac;
pub mod on_prem;
pub mod prowler;
pub mod sbom;

pub use api::{ApiScanner, CurlProbe, HttpProbe, HttpResponse};
pub use cloud::{CLOUD_PROVIDERS, CloudScanner, ProviderScanner};
pub use code::CodeScanner;
pub use common::ToolConfig;
pub use compliance::ComplianceScanner;
pub use container::ContainerScanner;
pub use iac::IacScanner;
pub use on_prem::OnPremScanner;
pub use prowler::Prowler;
pub use sbom::SbomScanner;

use crate::config::Config;
use crate::external::ToolRunner;
use crate::rules::RuleEngine;
use crate::scanner::{PluginRegistry, ScannerPlugin};
use std::sync::Arc;
use tracing::debug;

/// Register every built-in scanner, wired to `config`'s tool paths and the given runner.
pub fn register_builtin(
    registry: &PluginRegistry,
    config: &Config,
    runner: Arc<dyn ToolRunner>,
    engine: Arc<RuleEngine>,
) {
    let tools = &config.tools;
    let plugins: Vec<Arc<dyn ScannerPlugin>> = vec![
        Arc::new(
            ProviderScanner::aws()
                .with_runner(runner.clone())
                .with_program(&tools.prowler),
        ),
        Arc::new(
            ProviderScanner::azure()
                .with_runner(runner.clone())
                .with_program(&tools.prowler),
        ),
        Arc::new(
            ProviderScanner::gcp()
                .with_runner(runner.clone())
                .with_program(&tools.prowler),
        ),
        Arc::new(
            CloudScanner::new()
                .with_runner(runner.clone())
                .with_program(&tools.prowler),
        ),
        Arc::new(CodeScanner::new()),
        Arc::new(
            ContainerScanner::new()
                .with_runner(runner.clone())
                .with_program(&tools.trivy),
        ),
        Arc::new(
            SbomScanner::new()
                .with_runner(runner.clone())
                .with_program(&tools.syft)
                .with_license_policy(config.sbom.clone()),
        ),
        Arc::new(
            IacScanner::new()
                .with_runner(runner.clone())
                .with_program(&tools.checkov),
        ),
        Arc::new(
            ComplianceScanner::new()
                .with_runner(runner.clone())
                .with_programs(&tools.prowler, &tools.oscap)
                .with_frameworks(config.compliance.clone()),
        ),
        Arc::new(
            ApiScanner::new()
                .with_probe(Arc::new(
                    CurlProbe::new()
                        .with_runner(runner)
                        .with_program(&tools.curl),
                ))
                .with_rule_engine(engine),
        ),
        Arc::new(OnPremScanner::new()),
    ];

    let count = plugins.len();
    for plugin in plugins {
        registry.register(plugin);
    }
    debug!(count, "Registered built-in scanners");
}
