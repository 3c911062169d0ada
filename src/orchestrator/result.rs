//! Orchestrator result types.

use crate::aggregator::{FindingCollector, Summary};
use crate::finding::ScanResult;
use crate::rules::{RuleDocument, Violation};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Placeholder entry for a hybrid-cloud check that was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckStatus {
    pub status: &'static str,
}

impl CheckStatus {
    pub const CHECKED: CheckStatus = CheckStatus { status: "checked" };
}

/// One entry per provider or environment plus the request's attachments.
///
/// Serializes flat: provider names are top-level keys next to `summary`,
/// `rules`, `services` and the other attachments.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeResult {
    #[serde(flatten)]
    pub results: BTreeMap<String, ScanResult>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub violations: BTreeMap<String, Vec<Violation>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, RuleDocument>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub components: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<CheckStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<CheckStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewalls: Option<CheckStatus>,
}

impl CompositeResult {
    pub fn new(results: BTreeMap<String, ScanResult>) -> Self {
        let mut collector = FindingCollector::new();
        for (name, result) in &results {
            collector.add_result(name, result);
        }
        Self {
            summary: collector.summary(),
            results,
            violations: BTreeMap::new(),
            rules: BTreeMap::new(),
            services: BTreeMap::new(),
            components: Map::new(),
            connectivity: None,
            security_groups: None,
            firewalls: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ScanResult> {
        self.results.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.results.keys().map(String::as_str).collect()
    }

    /// Findings or violations at high severity or above that failed.
    pub fn has_severe_failures(&self) -> bool {
        self.results.values().any(has_severe_failure)
            || self.violations.values().flatten().any(|v| v.severity.is_severe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CiCdSettings {
    pub fail_on_high: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuntimeChecks {
    pub processes: bool,
    pub network: bool,
}

/// A single-scanner result with the request's metadata attached.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub result: ScanResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, RuleDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_cd: Option<CiCdSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sarif: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_high: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeChecks>,
    /// Set when `fail_on_high` was requested and a severe failure exists.
    pub gate_failed: bool,
}

impl EnrichedResult {
    pub fn new(result: ScanResult, violations: Vec<Violation>) -> Self {
        Self {
            result,
            violations,
            rules: BTreeMap::new(),
            ci_cd: None,
            sarif: None,
            fail_on_high: None,
            runtime: None,
            gate_failed: false,
        }
    }

    pub fn has_severe_failures(&self) -> bool {
        has_severe_failure(&self.result) || self.violations.iter().any(|v| v.severity.is_severe())
    }
}

fn has_severe_failure(result: &ScanResult) -> bool {
    result
        .findings()
        .iter()
        .any(|f| f.is_failed() && f.severity.is_severe())
}
