use crate::reporter::{Report, Reporter};

pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for JsonReporter {
    fn report<R: Report>(&self, report: &R) -> String {
        serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize result: {}"}}"#, e))
    }
}

pub struct YamlReporter;

impl YamlReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for YamlReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for YamlReporter {
    fn report<R: Report>(&self, report: &R) -> String {
        serde_yaml::to_string(report)
            .unwrap_or_else(|e| format!("error: \"Failed to serialize result: {}\"\n", e))
    }
}
