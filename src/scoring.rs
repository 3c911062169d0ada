use crate::finding::{Finding, Severity};
use serde::{Deserialize, Serialize};

/// Weight of a single finding, on a 0..=MAX_WEIGHT scale.
const HIGH_WEIGHT: u32 = 3;
const MEDIUM_WEIGHT: u32 = 2;
const LOW_WEIGHT: u32 = 1;
const MAX_WEIGHT: u32 = HIGH_WEIGHT;
const MAX_SCORE: f64 = 100.0;

/// Critical weighs the same as high; the normalization caps at MAX_WEIGHT anyway.
pub fn severity_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical | Severity::High => HIGH_WEIGHT,
        Severity::Medium => MEDIUM_WEIGHT,
        Severity::Low => LOW_WEIGHT,
        Severity::Unknown => 0,
    }
}

/// Severity-weighted risk over a finding set, in [0, 100], rounded to two decimals.
///
/// `min(1, sum(weight) / (3 * N)) * 100`; an empty set scores 0.
pub fn risk_score(findings: &[Finding]) -> f64 {
    if findings.is_empty() {
        return 0.0;
    }
    let total: u64 = findings
        .iter()
        .map(|f| u64::from(severity_weight(f.severity)))
        .sum();
    let max = u64::from(MAX_WEIGHT) * findings.len() as u64;
    let normalized = (total as f64 / max as f64).min(1.0);
    round2(normalized * MAX_SCORE)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Risk level based on score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score <= 0.0 {
            RiskLevel::Safe
        } else if score <= 25.0 {
            RiskLevel::Low
        } else if score <= 50.0 {
            RiskLevel::Medium
        } else if score <= 75.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
