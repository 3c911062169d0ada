use crate::rules::RuleFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(
    name = "secaudit",
    version,
    about = "Pluggable security scan orchestrator",
    long_about = "secaudit runs cloud, container, IaC, SBOM, compliance, API, code and on-prem scanners \
                  behind one finding model, evaluates rule sets against the results and merges them \
                  into a single report."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (YAML, JSON or TOML). Defaults to project or global config
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Per-tool timeout in seconds (0 disables)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Maximum number of concurrent provider scans
    #[arg(long, global = true)]
    pub max_parallel: Option<usize>,

    /// Extra rule files merged into the rule engine
    #[arg(long = "rules", global = true)]
    pub rule_files: Vec<PathBuf>,

    /// Fold rule violations into result findings
    #[arg(long, global = true)]
    pub merge_violations: bool,

    /// Verbose output (debug logging, passed findings)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered scanner plugins
    Plugins,

    /// Run one scanner against one target
    Scan {
        /// Registered scanner name (see `plugins`)
        scanner: String,

        /// Scan target: a provider, path, image, URL or environment
        target: String,

        /// Scanner option as key=value (value parsed as JSON when possible)
        #[arg(short = 'o', long = "opt", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
    },

    /// Scan several cloud providers and merge the results
    MultiCloud {
        /// Providers to scan (aws, azure, gcp)
        #[arg(value_delimiter = ',')]
        providers: Vec<String>,

        #[command(flatten)]
        fan_out: FanOutArgs,

        /// Services to record for a provider as provider=service
        #[arg(long = "service", value_parser = parse_scoped_value)]
        services: Vec<(String, String)>,
    },

    /// Scan cloud and on-prem environments together
    Hybrid {
        /// Environments to scan (aws, azure, gcp, on_prem)
        #[arg(value_delimiter = ',')]
        environments: Vec<String>,

        #[command(flatten)]
        fan_out: FanOutArgs,

        /// Record a connectivity check
        #[arg(long)]
        connectivity: bool,

        /// Record a security group check
        #[arg(long)]
        security_groups: bool,

        /// Record a firewall check
        #[arg(long)]
        firewalls: bool,
    },

    /// Scan a Terraform directory
    Terraform {
        directory: String,

        #[command(flatten)]
        gate: GateArgs,

        /// Attach CI/CD metadata to the result
        #[arg(long)]
        ci_cd: bool,

        /// CI/CD report format recorded with the result
        #[arg(long, default_value = "json")]
        output_format: String,
    },

    /// Scan a container image
    Image {
        image: String,

        #[command(flatten)]
        gate: GateArgs,

        /// Record runtime checks
        #[arg(long)]
        runtime: bool,

        /// Runtime process check
        #[arg(long)]
        check_processes: bool,

        /// Runtime network check
        #[arg(long)]
        check_network: bool,
    },

    /// Inspect or exchange rule sets
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
}

/// Options shared by multi-cloud and hybrid scans.
#[derive(Args, Debug, Default)]
pub struct FanOutArgs {
    /// Read the whole request from a JSON or YAML file
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Per-target option as name.key=value
    #[arg(long = "set", value_parser = parse_scoped_option)]
    pub settings: Vec<(String, String, Value)>,

    /// Rule id to attach from the rule catalog
    #[arg(long = "rule")]
    pub rule_ids: Vec<String>,

    /// Rule documents for the catalog (JSON or YAML list with `id` fields)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

/// Options shared by terraform and image scans.
#[derive(Args, Debug, Default)]
pub struct GateArgs {
    /// Exit with status 1 when a high or critical failure is found
    #[arg(long)]
    pub fail_on_high: bool,

    /// Custom rule documents (JSON or YAML list with `id` fields)
    #[arg(long)]
    pub custom_rules: Option<PathBuf>,

    /// Scanner option as key=value
    #[arg(short = 'o', long = "opt", value_parser = parse_key_value)]
    pub options: Vec<(String, Value)>,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List rule categories and their rules
    List {
        /// Only this category
        category: Option<String>,
    },

    /// Write the current rule set to a file
    Export {
        path: PathBuf,

        /// Serialization format (defaults to the file extension)
        #[arg(long, value_enum)]
        rule_format: Option<RuleFormat>,
    },

    /// Validate a rule file and show what it would load
    Import {
        path: PathBuf,

        /// Replace categories instead of merging rules by id
        #[arg(long)]
        replace: bool,
    },
}

/// `key=value`, with the value parsed as JSON and falling back to a string.
pub fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// `scope.key=value`.
pub fn parse_scoped_option(raw: &str) -> Result<(String, String, Value), String> {
    let (path, value) = parse_key_value(raw)?;
    let (scope, key) = path
        .split_once('.')
        .filter(|(scope, key)| !scope.is_empty() && !key.is_empty())
        .ok_or_else(|| format!("expected name.key=value, got '{}'", raw))?;
    Ok((scope.to_string(), key.to_string(), value))
}

/// `scope=value` with a plain string value.
pub fn parse_scoped_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(scope, value)| !scope.is_empty() && !value.is_empty())
        .map(|(scope, value)| (scope.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}
