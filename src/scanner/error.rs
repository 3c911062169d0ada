//! Unexpected scanner failures.

use thiserror::Error;

/// An internal failure a scanner cannot express as an error finding.
///
/// Expected failures (missing path, tool not installed, timeout) are returned
/// as `Ok(ScanResult)` carrying the `<scanner>-000` finding instead.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{scanner}: {message}")]
    Internal { scanner: String, message: String },
}

impl ScanError {
    pub fn internal(scanner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal {
            scanner: scanner.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_display() {
        let err = ScanError::internal("aws", "panicked worker");
        assert_eq!(err.to_string(), "aws: panicked worker");
    }
}
