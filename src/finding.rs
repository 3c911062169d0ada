//! Canonical finding model shared by every scanner.

use crate::aggregator::{Summary, summarize};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Unknown,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "unknown",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Normalize a tool-reported severity. Tools disagree on casing
    /// (`HIGH`, `High`, `high`), so matching is case-insensitive.
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            "low" | "info" | "informational" => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    /// High or critical.
    pub fn is_severe(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        Severity::normalize(value)
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Severity::normalize(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Passed,
    Failed,
    Error,
    Warning,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Passed => "passed",
            FindingStatus::Failed => "failed",
            FindingStatus::Error => "error",
            FindingStatus::Warning => "warning",
        }
    }

    /// Map a tool-reported status (`PASS`, `FAIL`, `MANUAL`, ...) to the canonical set.
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass" | "passed" | "ok" => FindingStatus::Passed,
            "fail" | "failed" => FindingStatus::Failed,
            "error" => FindingStatus::Error,
            _ => FindingStatus::Warning,
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single result of one scanner check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub check_id: String,
    pub resource: String,
    pub status: FindingStatus,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Map<String, Value>>,
}

impl Finding {
    pub fn new(
        check_id: impl Into<String>,
        resource: impl Into<String>,
        status: FindingStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check_id: check_id.into(),
            resource: resource.into(),
            status,
            message: message.into(),
            severity: Severity::Unknown,
            recommendation: None,
            evidence: None,
        }
    }

    pub fn failed(
        check_id: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(check_id, resource, FindingStatus::Failed, message)
    }

    pub fn passed(
        check_id: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(check_id, resource, FindingStatus::Passed, message)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn with_evidence(mut self, evidence: Map<String, Value>) -> Self {
        if !evidence.is_empty() {
            self.evidence = Some(evidence);
        }
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == FindingStatus::Failed
    }
}

/// Output of one `scan()` call. The summary is always derived from the
/// findings, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    #[serde(rename = "scanner")]
    scanner_name: String,
    target: String,
    findings: Vec<Finding>,
    summary: Summary,
    /// Scanner-specific observations exposed to rule conditions
    /// (e.g. the image user, probed headers, storage encryption flags).
    #[serde(skip_serializing_if = "Map::is_empty")]
    facts: Map<String, Value>,
}

impl ScanResult {
    pub fn new(
        scanner_name: impl Into<String>,
        target: impl Into<String>,
        findings: Vec<Finding>,
    ) -> Self {
        let summary = summarize(&findings);
        Self {
            scanner_name: scanner_name.into(),
            target: target.into(),
            findings,
            summary,
            facts: Map::new(),
        }
    }

    pub fn with_facts(mut self, facts: Map<String, Value>) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    pub fn facts(&self) -> &Map<String, Value> {
        &self.facts
    }

    /// A result carrying the scanner's `<name>-000` error finding. Used for
    /// expected failures (missing path, missing credentials, tool not found).
    pub fn error(
        scanner_name: &str,
        target: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let finding = Finding::new(
            sentinel_check_id(scanner_name),
            resource,
            FindingStatus::Error,
            message,
        );
        Self::new(scanner_name, target, vec![finding])
    }

    pub fn scanner_name(&self) -> &str {
        &self.scanner_name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Append findings and re-derive the summary.
    pub fn extend_findings(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
        self.summary = summarize(&self.findings);
    }

    /// True when the only thing this scan produced was its error sentinel.
    pub fn is_error(&self) -> bool {
        !self.findings.is_empty()
            && self
                .findings
                .iter()
                .all(|f| f.status == FindingStatus::Error)
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    /// The document rule conditions are evaluated against: the serialized
    /// result with its facts lifted to the top level.
    pub fn rule_input(&self) -> Value {
        let mut doc = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        doc.remove("facts");
        for (key, value) in &self.facts {
            doc.insert(key.clone(), value.clone());
        }
        Value::Object(doc)
    }
}

/// The `<scanner>-000` check id reserved for "scan could not complete".
pub fn sentinel_check_id(scanner_name: &str) -> String {
    format!("{}-000", scanner_name)
}
