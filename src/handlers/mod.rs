//! CLI command handlers
//!
//! Each handler turns parsed arguments into library calls and prints the
//! rendered result, separated from main.rs to enable unit testing.

mod rules;
mod scan;

pub use rules::handle_rules;
pub use scan::{
    handle_hybrid, handle_image, handle_multi_cloud, handle_plugins, handle_scan,
    handle_terraform,
};

use crate::cli::{Cli, Command, OutputFormat};
use crate::config::Config;
use crate::error::{AuditError, ParseFormat, Result};
use crate::reporter::{JsonReporter, Report, Reporter, TerminalReporter, YamlReporter};
use crate::rules::RuleDocument;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

/// Result type for handler functions that can be tested
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    Success,
    Error(u8),
}

impl HandlerResult {
    /// Exit status when a `fail_on_high` gate trips.
    pub const GATE_FAILED: HandlerResult = HandlerResult::Error(1);

    pub fn from_gate(gate_failed: bool) -> Self {
        if gate_failed {
            Self::GATE_FAILED
        } else {
            Self::Success
        }
    }
}

impl From<HandlerResult> for ExitCode {
    fn from(result: HandlerResult) -> Self {
        match result {
            HandlerResult::Success => ExitCode::SUCCESS,
            HandlerResult::Error(code) => ExitCode::from(code),
        }
    }
}

/// Dispatch a parsed command line. Errors exit with status 2.
pub fn run(cli: &Cli) -> ExitCode {
    let outcome = load_config(cli).and_then(|config| match &cli.command {
        Command::Plugins => handle_plugins(cli, config),
        Command::Scan {
            scanner,
            target,
            options,
        } => handle_scan(cli, config, scanner, target, options),
        Command::MultiCloud {
            providers,
            fan_out,
            services,
        } => handle_multi_cloud(cli, config, providers, fan_out, services),
        Command::Hybrid {
            environments,
            fan_out,
            connectivity,
            security_groups,
            firewalls,
        } => handle_hybrid(
            cli,
            config,
            environments,
            fan_out,
            (*connectivity, *security_groups, *firewalls),
        ),
        Command::Terraform {
            directory,
            gate,
            ci_cd,
            output_format,
        } => handle_terraform(cli, config, directory, gate, ci_cd.then_some(output_format.as_str())),
        Command::Image {
            image,
            gate,
            runtime,
            check_processes,
            check_network,
        } => handle_image(
            cli,
            config,
            image,
            gate,
            runtime.then_some((*check_processes, *check_network)),
        ),
        Command::Rules { action } => handle_rules(cli, config, action),
    });

    match outcome {
        Ok(result) => result.into(),
        Err(e) => {
            report_error(cli.format, &e);
            HandlerResult::Error(2).into()
        }
    }
}

/// `--config` file, else project or global configuration, with CLI overrides applied.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::load(std::env::current_dir().ok().as_deref()),
    };
    if let Some(timeout) = cli.timeout {
        config.scan.timeout_secs = timeout;
    }
    if let Some(max_parallel) = cli.max_parallel {
        config.scan.max_parallel = max_parallel;
    }
    if cli.merge_violations {
        config.scan.merge_violations = true;
    }
    config.rules.files.extend(cli.rule_files.iter().cloned());
    config.validate()?;
    debug!(scan = ?config.scan, rule_files = config.rules.files.len(), "Configuration ready");
    Ok(config)
}

pub fn render<R: Report>(format: OutputFormat, verbose: bool, report: &R) -> String {
    match format {
        OutputFormat::Text => TerminalReporter::new(verbose).report(report),
        OutputFormat::Json => JsonReporter::new().report(report),
        OutputFormat::Yaml => YamlReporter::new().report(report),
    }
}

/// One structured error object per failed command.
fn report_error(format: OutputFormat, err: &AuditError) {
    let object = json!({
        "error": err.to_string(),
        "kind": error_kind(err),
    });
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&object).unwrap_or_else(|_| object.to_string())
        ),
        OutputFormat::Yaml => print!(
            "{}",
            serde_yaml::to_string(&object).unwrap_or_else(|_| object.to_string())
        ),
        OutputFormat::Text => eprintln!("Error: {}", err),
    }
}

fn error_kind(err: &AuditError) -> &'static str {
    match err {
        AuditError::Configuration(_) | AuditError::Config(_) => "configuration",
        AuditError::Validation { .. } => "validation",
        AuditError::Execution { .. } | AuditError::ThreadPool(_) => "execution",
        AuditError::Io { .. } => "io",
        AuditError::Parse { .. }
        | AuditError::UnsupportedFormat { .. }
        | AuditError::Json(_)
        | AuditError::Yaml(_) => "parse",
    }
}

/// Read a JSON or YAML document, choosing the parser by extension.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let format = match ParseFormat::from_extension(ext) {
        Some(format @ (ParseFormat::Json | ParseFormat::Yaml)) => format,
        _ => {
            return Err(AuditError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: ext.to_string(),
            });
        }
    };
    let content = std::fs::read_to_string(path).map_err(|e| AuditError::read_error(path, e))?;
    match format {
        ParseFormat::Json => {
            serde_json::from_str(&content).map_err(|e| AuditError::parse_error(path, format, e))
        }
        _ => serde_yaml::from_str(&content).map_err(|e| AuditError::parse_error(path, format, e)),
    }
}

/// Rule documents from a JSON or YAML list.
pub fn read_rule_documents(path: &Path) -> Result<Vec<RuleDocument>> {
    read_document(path)
}

/// Collect `key=value` pairs into an option map. Later keys win.
pub fn option_map(pairs: &[(String, Value)]) -> Map<String, Value> {
    pairs.iter().cloned().collect()
}
