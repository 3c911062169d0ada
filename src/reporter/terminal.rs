use crate::finding::{Finding, FindingStatus, ScanResult, Severity};
use crate::reporter::{Report, Reporter};
use crate::rules::Violation;
use crate::scoring::RiskLevel;
use colored::Colorize;

pub struct TerminalReporter {
    verbose: bool,
    /// Lowest severity of failed findings shown outside verbose mode.
    min_severity: Severity,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            min_severity: Severity::Unknown,
        }
    }

    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    fn severity_color(&self, severity: Severity) -> colored::ColoredString {
        let label = format!("[{}]", severity);
        match severity {
            Severity::Critical => label.red().bold(),
            Severity::High => label.yellow().bold(),
            Severity::Medium => label.cyan(),
            Severity::Low => label.white(),
            Severity::Unknown => label.dimmed(),
        }
    }

    fn status_label(&self, status: FindingStatus) -> colored::ColoredString {
        match status {
            FindingStatus::Failed => "FAIL".red().bold(),
            FindingStatus::Error => "ERROR".red(),
            FindingStatus::Warning => "WARN".yellow(),
            FindingStatus::Passed => "PASS".green(),
        }
    }

    fn risk_level_color(&self, level: RiskLevel) -> colored::ColoredString {
        let label = level.as_str();
        match level {
            RiskLevel::Safe => label.green().bold(),
            RiskLevel::Low => label.white(),
            RiskLevel::Medium => label.cyan().bold(),
            RiskLevel::High => label.yellow().bold(),
            RiskLevel::Critical => label.red().bold(),
        }
    }

    fn is_shown(&self, finding: &Finding) -> bool {
        match finding.status {
            FindingStatus::Passed => self.verbose,
            FindingStatus::Failed => self.verbose || finding.severity >= self.min_severity,
            FindingStatus::Error | FindingStatus::Warning => true,
        }
    }

    fn format_finding(&self, finding: &Finding) -> String {
        let mut output = format!(
            "  {} {} {}: {}\n",
            self.status_label(finding.status),
            self.severity_color(finding.severity),
            finding.check_id,
            finding.message
        );
        output.push_str(&format!("    Resource: {}\n", finding.resource.dimmed()));
        if let Some(ref recommendation) = finding.recommendation {
            output.push_str(&format!("    Fix: {}\n", recommendation.green()));
        }
        if self.verbose
            && let Some(ref evidence) = finding.evidence
        {
            let evidence = serde_json::to_string(evidence).unwrap_or_default();
            output.push_str(&format!("    Evidence: {}\n", evidence.dimmed()));
        }
        output
    }

    fn format_section(&self, label: &str, result: &ScanResult) -> String {
        let mut output = format!(
            "{} {}\n",
            format!("[{}]", label).bold(),
            result.target()
        );
        let shown: Vec<&Finding> = result.findings().iter().filter(|f| self.is_shown(f)).collect();
        if shown.is_empty() {
            output.push_str(&format!("  {}\n", "No issues found.".green()));
        }
        for finding in shown {
            output.push_str(&self.format_finding(finding));
        }
        output
    }

    fn format_violation(&self, label: &str, violation: &Violation) -> String {
        format!(
            "  {} {} {}: {} ({})\n",
            "RULE".magenta().bold(),
            self.severity_color(violation.severity),
            violation.rule_id,
            violation.description,
            label
        )
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Reporter for TerminalReporter {
    fn report<R: Report>(&self, report: &R) -> String {
        let mut output = format!(
            "{}\n\n",
            format!("secaudit v{}", env!("CARGO_PKG_VERSION")).bold()
        );

        for (label, result) in report.sections() {
            output.push_str(&self.format_section(label, result));
            output.push('\n');
        }

        let violations = report.violations();
        if !violations.is_empty() {
            output.push_str(&format!("{}\n", "Rule violations:".bold()));
            for (label, violation) in violations {
                output.push_str(&self.format_violation(label, violation));
            }
            output.push('\n');
        }

        let summary = report.summary();
        output.push_str(&format!("{}\n", "━".repeat(50)));
        output.push_str(&format!(
            "Summary: {} finding(s): {} failed, {} passed, {} error(s), {} warning(s)\n",
            summary.total,
            summary.failed.to_string().red().bold(),
            summary.passed.to_string().green(),
            summary.error.to_string().red(),
            summary.warning.to_string().yellow()
        ));
        output.push_str(&format!(
            "Severity: {} critical, {} high, {} medium, {} low, {} unknown\n",
            summary.count(Severity::Critical).to_string().red().bold(),
            summary.count(Severity::High).to_string().yellow().bold(),
            summary.count(Severity::Medium).to_string().cyan(),
            summary.count(Severity::Low),
            summary.count(Severity::Unknown)
        ));
        output.push_str(&format!(
            "Risk score: {:.1}/100 ({})\n",
            summary.risk_score,
            self.risk_level_color(summary.risk_level())
        ));

        if report.gate_failed() {
            output.push_str(&format!(
                "\n{}\n",
                "Result: FAIL (high severity failures present)".red().bold()
            ));
        }

        output
    }
}
