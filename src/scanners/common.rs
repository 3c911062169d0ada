//! Plumbing shared by the tool-backed scanners.

use crate::external::{ProcessRunner, ToolError, ToolInvocation, ToolOutput, ToolRunner, parse_json_stdout};
use crate::finding::{FindingStatus, Severity};
use crate::scanner::ScanOptions;
use serde_json::Value;
use std::sync::Arc;

/// The runner and executable a scanner shells out to.
#[derive(Clone)]
pub struct ToolConfig {
    runner: Arc<dyn ToolRunner>,
    program: String,
}

impl ToolConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            runner: Arc::new(ProcessRunner::new()),
            program: program.into(),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// An invocation of this tool carrying the call's timeout and cancel flag.
    pub fn invocation<I, S>(&self, args: I, options: &ScanOptions) -> ToolInvocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolInvocation::new(&self.program)
            .args(args)
            .with_timeout(options.timeout())
            .with_cancel(options.cancel().cloned())
    }

    pub fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.runner.run(invocation)
    }

    /// Run and parse stdout as JSON.
    pub fn run_json(&self, invocation: &ToolInvocation) -> Result<Value, ToolError> {
        let output = self.run(invocation)?;
        parse_json_stdout(&self.program, &output)
    }
}

impl std::fmt::Debug for ToolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolConfig")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

/// First string value among `keys`. Tool output mixes `CheckID` and `check_id` styles.
pub fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

pub fn severity_field(value: &Value, keys: &[&str]) -> Severity {
    str_field(value, keys).map(Severity::normalize).unwrap_or_default()
}

pub fn status_field(value: &Value, keys: &[&str]) -> FindingStatus {
    str_field(value, keys)
        .map(FindingStatus::normalize)
        .unwrap_or(FindingStatus::Warning)
}

/// Elements of the array at `key`, or nothing.
pub fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
