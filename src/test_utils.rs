#[cfg(test)]
pub mod fixtures {
    use crate::finding::{Finding, FindingStatus, Severity};

    pub fn finding_with_severity(severity: Severity) -> Finding {
        Finding::failed("test-001", "resource", "test message").with_severity(severity)
    }

    pub fn finding_with_status(status: FindingStatus) -> Finding {
        Finding::new("test-001", "resource", status, "test message").with_severity(Severity::Medium)
    }

    pub fn high_finding(check_id: &str) -> Finding {
        Finding::failed(check_id, "resource", "high severity issue").with_severity(Severity::High)
    }
}

#[cfg(test)]
pub mod fakes {
    use crate::external::{ToolError, ToolInvocation, ToolOutput, ToolRunner};
    use crate::finding::{Finding, ScanResult};
    use crate::scanner::{ScanError, ScanOptions, ScannerPlugin};
    use serde_json::{Map, Value};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Scanner returning a fixed finding list and recording its calls.
    pub struct StaticScanner {
        name: String,
        description: String,
        findings: Vec<Finding>,
        facts: Map<String, Value>,
        category: Option<String>,
        pub calls: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    impl StaticScanner {
        pub fn new(name: &str, findings: Vec<Finding>) -> Self {
            Self {
                name: name.to_string(),
                description: format!("{} test scanner", name),
                findings,
                facts: Map::new(),
                category: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_description(mut self, description: &str) -> Self {
            self.description = description.to_string();
            self
        }

        pub fn with_fact(mut self, key: &str, value: Value) -> Self {
            self.facts.insert(key.to_string(), value);
            self
        }

        pub fn with_category(mut self, category: &str) -> Self {
            self.category = Some(category.to_string());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ScannerPlugin for StaticScanner {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            &self.description
        }

        fn rule_category(&self) -> Option<&str> {
            self.category.as_deref()
        }

        fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
            self.calls
                .lock()
                .unwrap()
                .push((target.to_string(), options.params().clone()));
            Ok(ScanResult::new(&self.name, target, self.findings.clone())
                .with_facts(self.facts.clone()))
        }
    }

    /// Scanner whose every call is an internal failure.
    pub struct BrokenScanner(pub &'static str);

    impl ScannerPlugin for BrokenScanner {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn scan(&self, _target: &str, _options: &ScanOptions) -> Result<ScanResult, ScanError> {
            Err(ScanError::internal(self.0, "simulated internal failure"))
        }
    }

    enum Response {
        Output(ToolOutput),
        Error(fn(&str) -> ToolError),
    }

    /// Tool runner answering from a per-program script. Unscripted programs
    /// behave as if not installed.
    #[derive(Default)]
    pub struct ScriptedRunner {
        responses: BTreeMap<String, Response>,
        pub calls: Mutex<Vec<ToolInvocation>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_stdout(self, program: &str, stdout: &str) -> Self {
            self.with_output(program, 0, stdout)
        }

        pub fn with_output(mut self, program: &str, exit_code: i32, stdout: &str) -> Self {
            self.responses.insert(
                program.to_string(),
                Response::Output(ToolOutput {
                    exit_code,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                }),
            );
            self
        }

        pub fn with_error(mut self, program: &str, error: fn(&str) -> ToolError) -> Self {
            self.responses.insert(program.to_string(), Response::Error(error));
            self
        }

        pub fn invocations(&self) -> Vec<ToolInvocation> {
            self.calls.lock().unwrap().clone()
        }

        pub fn last_args(&self) -> Vec<String> {
            self.invocations()
                .last()
                .map(|i| i.args.clone())
                .unwrap_or_default()
        }
    }

    impl ToolRunner for ScriptedRunner {
        fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
            self.calls.lock().unwrap().push(invocation.clone());
            match self.responses.get(&invocation.program) {
                Some(Response::Output(output)) => {
                    if invocation.accept_exit_codes.contains(&output.exit_code) {
                        Ok(output.clone())
                    } else {
                        Err(ToolError::NonZeroExit {
                            program: invocation.program.clone(),
                            code: output.exit_code,
                            stderr: output.stderr.clone(),
                        })
                    }
                }
                Some(Response::Error(make)) => Err(make(&invocation.program)),
                None => Err(ToolError::NotFound(invocation.program.clone())),
            }
        }
    }
}
