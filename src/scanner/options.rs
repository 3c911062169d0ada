use crate::external::CancelFlag;
use serde_json::{Map, Value};
use std::time::Duration;

/// Per-call scanner parameters.
///
/// `params` carries the scanner-specific keyword options (profile, region,
/// image, framework, ...); the contract fixes only the return shape, so each
/// scanner reads the keys it understands and ignores the rest.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    params: Map<String, Value>,
    timeout: Option<Duration>,
    cancel: Option<CancelFlag>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: Map<String, Value>) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<CancelFlag>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fill in keys from `defaults` that the call did not set.
    pub fn with_defaults(mut self, defaults: &Map<String, Value>) -> Self {
        for (key, value) in defaults {
            self.params
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancel(&self) -> Option<&CancelFlag> {
        self.cancel.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.params
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// A list option given as an array of strings or a comma-separated string.
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        match self.params.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}
