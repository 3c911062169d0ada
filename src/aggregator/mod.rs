//! Aggregation layer.
//!
//! Turns raw findings into summaries:
//! - `summarize` derives status counts, the severity histogram and the risk score
//! - `FindingCollector` merges findings from several scanners for composite views
//!
//! Every `ScanResult` and every orchestrator aggregate gets its summary from here.

pub mod collector;
pub mod summary;

pub use crate::scoring::{RiskLevel, risk_score};
pub use collector::FindingCollector;
pub use summary::{Summary, summarize};
