//! Alert dispatch and scan history.
//!
//! [`SecurityMonitor`] watches finished results: failed findings and rule
//! violations at or above the configured threshold are formatted as plain-text
//! alerts and handed to every registered [`Notifier`]. Transports live behind
//! that trait; the crate itself ships only [`LogNotifier`].

use crate::aggregator::Summary;
use crate::config::MonitoringConfig;
use crate::finding::{Finding, Severity};
use crate::reporter::Report;
use crate::rules::Violation;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_REMEDIATION: &str = "Review and mitigate.";

#[derive(Error, Debug)]
#[error("Notifier {notifier} failed: {message}")]
pub struct NotifyError {
    pub notifier: String,
    pub message: String,
}

impl NotifyError {
    pub fn new(notifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            notifier: notifier.into(),
            message: message.into(),
        }
    }
}

/// Receives pre-formatted alert text.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, alert: &str) -> Result<(), NotifyError>;
}

/// Writes alerts to the log at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, alert: &str) -> Result<(), NotifyError> {
        warn!(target: "secaudit::alert", "{}", alert.trim_end());
        Ok(())
    }
}

/// Alert text for one finding.
pub fn format_alert(finding: &Finding) -> String {
    format!(
        "[{severity}] {check}: {resource}\n\
         Description: {message}\n\
         Remediation: {remediation}\n\
         Severity: {severity}\n",
        severity = finding.severity,
        check = finding.check_id,
        resource = finding.resource,
        message = finding.message,
        remediation = finding.recommendation.as_deref().unwrap_or(DEFAULT_REMEDIATION),
    )
}

/// Alert text for one rule violation.
pub fn format_violation_alert(scope: &str, violation: &Violation) -> String {
    format!(
        "[{severity}] {rule}: {scope}\n\
         Description: {description}\n\
         Remediation: {DEFAULT_REMEDIATION}\n\
         Severity: {severity}\n",
        severity = violation.severity,
        rule = violation.rule_id,
        description = violation.description,
    )
}

/// Failed findings at or above `threshold`, with their section label.
pub fn alerting_findings<R: Report>(report: &R, threshold: Severity) -> Vec<(&str, &Finding)> {
    report
        .sections()
        .into_iter()
        .flat_map(|(label, result)| result.findings().iter().map(move |f| (label, f)))
        .filter(|(_, f)| f.is_failed() && f.severity >= threshold)
        .collect()
}

/// Whether anything in `report` reaches `threshold`.
pub fn exceeds_threshold<R: Report>(report: &R, threshold: Severity) -> bool {
    !alerting_findings(report, threshold).is_empty()
        || report
            .violations()
            .iter()
            .any(|(_, v)| v.severity >= threshold)
}

/// One tracked scan.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// Seconds since the Unix epoch.
    pub recorded_at: u64,
    pub scanner: String,
    pub target: String,
    pub summary: Summary,
    pub alerts: usize,
}

pub struct SecurityMonitor {
    threshold: Severity,
    history_limit: usize,
    notifiers: BTreeMap<String, Arc<dyn Notifier>>,
    history: Mutex<VecDeque<HistoryEntry>>,
}

impl SecurityMonitor {
    pub fn new(config: &MonitoringConfig) -> Self {
        Self {
            threshold: config.alert_threshold,
            history_limit: config.history_limit,
            notifiers: BTreeMap::new(),
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Registers `notifier` under its name, replacing any previous one.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.add_notifier(notifier);
        self
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) -> Option<Arc<dyn Notifier>> {
        self.notifiers.insert(notifier.name().to_string(), notifier)
    }

    pub fn remove_notifier(&mut self, name: &str) -> Option<Arc<dyn Notifier>> {
        self.notifiers.remove(name)
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    /// Every alert `report` would raise, in section order.
    pub fn alerts<R: Report>(&self, report: &R) -> Vec<String> {
        let findings = alerting_findings(report, self.threshold)
            .into_iter()
            .map(|(_, f)| format_alert(f));
        let violations = report
            .violations()
            .into_iter()
            .filter(|(_, v)| v.severity >= self.threshold)
            .map(|(scope, v)| format_violation_alert(scope, v));
        findings.chain(violations).collect()
    }

    /// Sends each alert to every notifier. A failing notifier is logged and
    /// does not stop delivery to the others. Returns the number of alerts.
    pub fn send_alerts<R: Report>(&self, report: &R) -> usize {
        let alerts = self.alerts(report);
        for alert in &alerts {
            self.dispatch(alert);
        }
        debug!(alerts = alerts.len(), notifiers = self.notifiers.len(), "Alerts dispatched");
        alerts.len()
    }

    fn dispatch(&self, alert: &str) {
        for (name, notifier) in &self.notifiers {
            if let Err(e) = notifier.send(alert) {
                warn!(notifier = %name, error = %e, "Alert delivery failed");
            }
        }
    }

    /// Records one history entry per section of `report`.
    pub fn track_scan<R: Report>(&self, report: &R, alerts: usize) {
        if self.history_limit == 0 {
            return;
        }
        let recorded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let mut history = self.history();
        for (label, result) in report.sections() {
            history.push_back(HistoryEntry {
                recorded_at,
                scanner: label.to_string(),
                target: result.target().to_string(),
                summary: result.summary().clone(),
                alerts,
            });
        }
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    /// Sends alerts for `report` and records it. Returns the number of alerts.
    pub fn observe<R: Report>(&self, report: &R) -> usize {
        let alerts = self.send_alerts(report);
        self.track_scan(report, alerts);
        alerts
    }

    /// Oldest first.
    pub fn scan_history(&self) -> Vec<HistoryEntry> {
        self.history().iter().cloned().collect()
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<HistoryEntry>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
