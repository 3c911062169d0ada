//! Finding collector for aggregating results across scanners.

use crate::aggregator::summary::{Summary, summarize};
use crate::finding::{Finding, ScanResult, Severity};
use std::collections::BTreeMap;

/// Collects findings from multiple scan results, keeping per-scanner and
/// per-check indexes for composite views.
#[derive(Debug, Default)]
pub struct FindingCollector {
    findings: Vec<Finding>,
    by_source: BTreeMap<String, Vec<usize>>,
    by_check: BTreeMap<String, Vec<usize>>,
}

impl FindingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finding attributed to `source` (usually the provider or scanner name).
    pub fn add(&mut self, source: &str, finding: Finding) {
        let index = self.findings.len();
        self.by_source
            .entry(source.to_string())
            .or_default()
            .push(index);
        self.by_check
            .entry(finding.check_id.clone())
            .or_default()
            .push(index);
        self.findings.push(finding);
    }

    /// Add every finding of a scan result under `source`.
    pub fn add_result(&mut self, source: &str, result: &ScanResult) {
        for finding in result.findings() {
            self.add(source, finding.clone());
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn by_source(&self, source: &str) -> Vec<&Finding> {
        self.lookup(self.by_source.get(source))
    }

    pub fn by_check(&self, check_id: &str) -> Vec<&Finding> {
        self.lookup(self.by_check.get(check_id))
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect()
    }

    fn lookup(&self, indexes: Option<&Vec<usize>>) -> Vec<&Finding> {
        indexes
            .map(|idx| idx.iter().map(|i| &self.findings[*i]).collect())
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.findings.len()
    }

    pub fn sources_count(&self) -> usize {
        self.by_source.len()
    }

    pub fn checks_count(&self) -> usize {
        self.by_check.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// Aggregate summary over everything collected so far.
    pub fn summary(&self) -> Summary {
        summarize(&self.findings)
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::FindingStatus;

    fn make_finding(check_id: &str, severity: Severity) -> Finding {
        Finding::new(check_id, "resource", FindingStatus::Failed, "test").with_severity(severity)
    }

    #[test]
    fn test_collector_add() {
        let mut collector = FindingCollector::new();
        collector.add("aws", make_finding("aws-001", Severity::High));
        collector.add("aws", make_finding("aws-002", Severity::Medium));

        assert_eq!(collector.total(), 2);
        assert_eq!(collector.sources_count(), 1);
        assert_eq!(collector.checks_count(), 2);
    }

    #[test]
    fn test_collector_by_source_and_check() {
        let mut collector = FindingCollector::new();
        collector.add("aws", make_finding("cloud-001", Severity::High));
        collector.add("azure", make_finding("cloud-001", Severity::High));
        collector.add("azure", make_finding("cloud-002", Severity::Low));

        assert_eq!(collector.by_source("azure").len(), 2);
        assert_eq!(collector.by_source("gcp").len(), 0);
        assert_eq!(collector.by_check("cloud-001").len(), 2);
        assert_eq!(collector.by_severity(Severity::Low).len(), 1);
    }

    #[test]
    fn test_collector_add_result() {
        let result = ScanResult::new(
            "code",
            "src",
            vec![
                make_finding("code-001", Severity::High),
                make_finding("code-002", Severity::High),
            ],
        );
        let mut collector = FindingCollector::new();
        collector.add_result("code", &result);
        assert_eq!(collector.total(), 2);
        assert_eq!(collector.summary().failed, 2);
        assert_eq!(collector.summary().risk_score, 100.0);
    }

    #[test]
    fn test_collector_highest_severity() {
        let mut collector = FindingCollector::new();
        assert_eq!(collector.highest_severity(), None);
        collector.add("a", make_finding("x-001", Severity::Low));
        assert_eq!(collector.highest_severity(), Some(Severity::Low));
        collector.add("b", make_finding("x-002", Severity::Critical));
        assert_eq!(collector.highest_severity(), Some(Severity::Critical));
    }

    #[test]
    fn test_collector_into_findings() {
        let mut collector = FindingCollector::new();
        collector.add("a", make_finding("x-001", Severity::High));
        collector.add("b", make_finding("x-002", Severity::Medium));
        assert!(!collector.is_empty());
        assert_eq!(collector.into_findings().len(), 2);
    }
}
