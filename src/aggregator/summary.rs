//! Summary derivation for scan results.

use crate::finding::{Finding, FindingStatus, Severity};
use crate::scoring::{RiskLevel, risk_score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status counts, severity histogram and risk score over a finding set.
///
/// Only ever built by [`summarize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub failed: usize,
    pub passed: usize,
    pub error: usize,
    pub warning: usize,
    pub severity_histogram: BTreeMap<Severity, usize>,
    pub risk_score: f64,
}

impl Summary {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.severity_histogram.get(&severity).copied().unwrap_or(0)
    }
}

/// Derive the summary for a finding sequence. Every scanner and the
/// orchestrator's aggregate views go through this one function.
pub fn summarize(findings: &[Finding]) -> Summary {
    let mut severity_histogram: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    let (mut failed, mut passed, mut error, mut warning) = (0, 0, 0, 0);

    for finding in findings {
        match finding.status {
            FindingStatus::Failed => failed += 1,
            FindingStatus::Passed => passed += 1,
            FindingStatus::Error => error += 1,
            FindingStatus::Warning => warning += 1,
        }
        *severity_histogram.entry(finding.severity).or_default() += 1;
    }

    Summary {
        total: findings.len(),
        failed,
        passed,
        error,
        warning,
        severity_histogram,
        risk_score: risk_score(findings),
    }
}
