//! Error types for secaudit.
//!
//! `AuditError` is the caller-facing taxonomy:
//! - `Configuration`: bad or missing target, unsupported provider, missing parameter
//! - `Validation`: malformed rule or custom-rule map
//! - `Execution`: the orchestrator could not produce any result
//! - `Parse` / `Io`: rule-file and report I/O
//!
//! Expected scanner failures never show up here; they are folded into the
//! `ScanResult` as an error finding (see `crate::scanner`).

mod context;

pub use context::{IoOperation, ParseFormat};

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    /// Caller-fixable request problem. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rejected rule definition.
    #[error("Invalid rule {rule_id}: {message}")]
    Validation { rule_id: String, message: String },

    /// No scanner produced a result.
    #[error("Scan execution failed for {scanner}: {message}")]
    Execution { scanner: String, message: String },

    #[error("Failed to {operation} {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: IoOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        format: ParseFormat,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unsupported format for {}: {format}", .path.display())]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl AuditError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn validation(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: IoOperation::Read,
            source,
        }
    }

    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: IoOperation::Write,
            source,
        }
    }

    pub fn parse_error(
        path: impl Into<PathBuf>,
        format: ParseFormat,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            format,
            source: Box::new(source),
        }
    }

    /// Whether the caller can fix this by changing its request.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Validation { .. } | Self::UnsupportedFormat { .. }
        )
    }

    /// Get the root cause of the error chain.
    pub fn root_cause(&self) -> &dyn std::error::Error {
        let mut current: &dyn std::error::Error = self;
        while let Some(source) = current.source() {
            current = source;
        }
        current
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
