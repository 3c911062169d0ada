//! Rendering of scan results.
//!
//! Every result shape the orchestrator produces implements [`Report`], so the
//! reporters stay independent of whether one scanner or many ran.

pub mod json;
pub mod terminal;

pub use json::{JsonReporter, YamlReporter};
pub use terminal::TerminalReporter;

use crate::aggregator::Summary;
use crate::finding::ScanResult;
use crate::orchestrator::{CompositeResult, EnrichedResult};
use crate::rules::Violation;
use serde::Serialize;

/// Read-only view over a renderable result.
pub trait Report: Serialize {
    /// `(label, result)` per scanner run, in display order.
    fn sections(&self) -> Vec<(&str, &ScanResult)>;

    /// Aggregate summary across all sections.
    fn summary(&self) -> &Summary;

    /// `(label, violation)` for every rule match.
    fn violations(&self) -> Vec<(&str, &Violation)> {
        Vec::new()
    }

    /// Set when a `fail_on_high` gate tripped.
    fn gate_failed(&self) -> bool {
        false
    }
}

pub trait Reporter {
    fn report<R: Report>(&self, report: &R) -> String;
}

impl Report for ScanResult {
    fn sections(&self) -> Vec<(&str, &ScanResult)> {
        vec![(self.scanner_name(), self)]
    }

    fn summary(&self) -> &Summary {
        ScanResult::summary(self)
    }
}

impl Report for CompositeResult {
    fn sections(&self) -> Vec<(&str, &ScanResult)> {
        self.results
            .iter()
            .map(|(name, result)| (name.as_str(), result))
            .collect()
    }

    fn summary(&self) -> &Summary {
        &self.summary
    }

    fn violations(&self) -> Vec<(&str, &Violation)> {
        self.violations
            .iter()
            .flat_map(|(name, list)| list.iter().map(move |v| (name.as_str(), v)))
            .collect()
    }
}

impl Report for EnrichedResult {
    fn sections(&self) -> Vec<(&str, &ScanResult)> {
        vec![(self.result.scanner_name(), &self.result)]
    }

    fn summary(&self) -> &Summary {
        self.result.summary()
    }

    fn violations(&self) -> Vec<(&str, &Violation)> {
        let name = self.result.scanner_name();
        self.violations.iter().map(|v| (name, v)).collect()
    }

    fn gate_failed(&self) -> bool {
        self.gate_failed
    }
}
