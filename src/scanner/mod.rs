//! Scanner abstraction.
//!
//! Every backend implements [`ScannerPlugin`] and returns a canonical
//! [`ScanResult`]. Expected failures come back as a result holding the
//! `<name>-000` error finding; only internal failures use [`ScanError`].

pub mod error;
pub mod options;
pub mod registry;

pub use error::ScanError;
pub use options::ScanOptions;
pub use registry::{PluginInfo, PluginRegistry};

use crate::external::ToolError;
use crate::finding::ScanResult;
use tracing::warn;

pub trait ScannerPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Kinds of target the scanner accepts (`account`, `path`, `image`, ...).
    fn supported_targets(&self) -> &[&'static str] {
        &[]
    }

    /// Rule category evaluated against this scanner's results, if any.
    fn rule_category(&self) -> Option<&str> {
        None
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError>;
}

/// Fold a tool failure into the scanner's error result.
pub fn tool_failure(scanner: &str, target: &str, err: &ToolError) -> ScanResult {
    warn!(scanner, target, program = err.program(), error = %err, "External tool failed");
    ScanResult::error(scanner, target, err.program(), err.to_string())
}
