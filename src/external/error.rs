use std::time::Duration;
use thiserror::Error;

/// Why an external tool did not produce usable output.
///
/// Never crosses the scanner boundary; scanners fold it into a
/// `<scanner>-000` error finding.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0} not found. Please install it first.")]
    NotFound(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{0} was cancelled")]
    Cancelled(String),

    #[error("{program} exited with code {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} produced invalid JSON: {source}")]
    InvalidJson {
        program: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub fn program(&self) -> &str {
        match self {
            Self::NotFound(program) | Self::Cancelled(program) => program,
            Self::Spawn { program, .. }
            | Self::Timeout { program, .. }
            | Self::NonZeroExit { program, .. }
            | Self::InvalidJson { program, .. }
            | Self::Io { program, .. } => program,
        }
    }
}
