//! External tool invocation.
//!
//! Scanners that wrap Prowler, Trivy, Checkov, Syft or curl go through a
//! [`ToolRunner`] so tests can script tool output and the process layer can
//! enforce timeouts and cancellation in one place.

mod error;
mod runner;

pub use error::ToolError;
pub use runner::{CancelFlag, ProcessRunner, ToolInvocation, ToolOutput, ToolRunner, parse_json_stdout};
