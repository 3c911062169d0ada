//! secaudit: pluggable security scan orchestration.
//!
//! Scanners implement [`ScannerPlugin`] and report [`Finding`]s in one shared
//! model; [`RuleEngine`] evaluates rule categories against their results and
//! [`SecAudit`] fans requests out across registered scanners.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod external;
pub mod finding;
pub mod handlers;
pub mod monitor;
pub mod orchestrator;
pub mod reporter;
pub mod rules;
pub mod scanner;
pub mod scanners;
pub mod scoring;

#[cfg(test)]
pub mod test_utils;

pub use aggregator::{FindingCollector, Summary, summarize};
pub use cli::{Cli, OutputFormat};
pub use config::Config;
pub use error::{AuditError, Result};
pub use finding::{Finding, FindingStatus, ScanResult, Severity};
pub use monitor::{LogNotifier, Notifier, SecurityMonitor, format_alert};
pub use orchestrator::{
    CompositeResult, EnrichedResult, HybridCloudRequest, ImageRequest, MultiCloudRequest,
    SecAudit, TerraformRequest,
};
pub use reporter::{JsonReporter, Report, Reporter, TerminalReporter, YamlReporter};
pub use rules::{RuleEngine, Violation};
pub use scanner::{PluginRegistry, ScanError, ScanOptions, ScannerPlugin};
pub use scoring::{RiskLevel, risk_score};
