//! Scan command handlers.

use super::{HandlerResult, option_map, read_document, read_rule_documents, render};
use crate::cli::{Cli, FanOutArgs, GateArgs, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::{
    HybridCloudRequest, ImageRequest, MultiCloudRequest, SecAudit, TerraformRequest,
};
use crate::monitor::{LogNotifier, SecurityMonitor};
use crate::reporter::Report;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Prints `report`, then raises alerts for it when monitoring is enabled.
fn publish<R: Report>(cli: &Cli, audit: &SecAudit, report: &R) {
    println!("{}", render(cli.format, cli.verbose, report));
    let monitoring = &audit.config().monitoring;
    if monitoring.enabled {
        let alerts = SecurityMonitor::new(monitoring)
            .with_notifier(Arc::new(LogNotifier))
            .observe(report);
        info!(alerts, threshold = %monitoring.alert_threshold, "Monitoring pass complete");
    }
}

/// Orchestrator for `config`, with the catalog file loaded when one is given.
fn orchestrator(config: Config, fan_out: Option<&FanOutArgs>) -> Result<SecAudit> {
    let audit = SecAudit::new(config)?;
    if let Some(path) = fan_out.and_then(|f| f.catalog.as_deref()) {
        for rule in read_rule_documents(path)? {
            audit.add_rule(rule)?;
        }
    }
    Ok(audit)
}

pub fn handle_plugins(cli: &Cli, config: Config) -> Result<HandlerResult> {
    let audit = orchestrator(config, None)?;
    let plugins = audit.registry().list();
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plugins)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&plugins)?),
        OutputFormat::Text => {
            for plugin in plugins {
                let targets = if plugin.supported_targets.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", plugin.supported_targets.join(", "))
                };
                println!("{:<12} {}{}", plugin.name, plugin.description, targets);
            }
        }
    }
    Ok(HandlerResult::Success)
}

pub fn handle_scan(
    cli: &Cli,
    config: Config,
    scanner: &str,
    target: &str,
    options: &[(String, Value)],
) -> Result<HandlerResult> {
    info!(scanner, target, "Starting scan");
    let audit = orchestrator(config, None)?;
    let result = audit.scan(scanner, target, option_map(options))?;
    publish(cli, &audit, &result);
    Ok(HandlerResult::Success)
}

fn fan_out_request<T: serde::de::DeserializeOwned>(fan_out: &FanOutArgs) -> Result<Option<T>> {
    fan_out.request.as_deref().map(read_document::<T>).transpose()
}

pub fn handle_multi_cloud(
    cli: &Cli,
    config: Config,
    providers: &[String],
    fan_out: &FanOutArgs,
    services: &[(String, String)],
) -> Result<HandlerResult> {
    let request = match fan_out_request::<MultiCloudRequest>(fan_out)? {
        Some(request) => request,
        None => {
            let mut request = MultiCloudRequest::new(providers.iter().cloned())
                .with_rules(fan_out.rule_ids.iter().cloned());
            for (scope, key, value) in &fan_out.settings {
                request
                    .config
                    .entry(scope.clone())
                    .or_default()
                    .insert(key.clone(), value.clone());
            }
            for (provider, service) in services {
                request
                    .services
                    .entry(provider.clone())
                    .or_default()
                    .push(service.clone());
            }
            request
        }
    };
    let audit = orchestrator(config, Some(fan_out))?;
    let composite = audit.scan_multi_cloud(&request)?;
    publish(cli, &audit, &composite);
    Ok(HandlerResult::Success)
}

pub fn handle_hybrid(
    cli: &Cli,
    config: Config,
    environments: &[String],
    fan_out: &FanOutArgs,
    (connectivity, security_groups, firewalls): (bool, bool, bool),
) -> Result<HandlerResult> {
    let request = match fan_out_request::<HybridCloudRequest>(fan_out)? {
        Some(request) => request,
        None => {
            let mut request = HybridCloudRequest::new(environments.iter().cloned())
                .with_rules(fan_out.rule_ids.iter().cloned())
                .with_checks(connectivity, security_groups, firewalls);
            for (scope, key, value) in &fan_out.settings {
                request
                    .config
                    .entry(scope.clone())
                    .or_default()
                    .insert(key.clone(), value.clone());
            }
            request
        }
    };
    let audit = orchestrator(config, Some(fan_out))?;
    let composite = audit.scan_hybrid_cloud(&request)?;
    publish(cli, &audit, &composite);
    Ok(HandlerResult::Success)
}

fn custom_rules(gate: &GateArgs) -> Result<Vec<crate::rules::RuleDocument>> {
    match gate.custom_rules {
        Some(ref path) => read_rule_documents(path),
        None => Ok(Vec::new()),
    }
}

/// `ci_cd` carries the CI/CD output format when CI/CD metadata was requested.
pub fn handle_terraform(
    cli: &Cli,
    config: Config,
    directory: &str,
    gate: &GateArgs,
    ci_cd: Option<&str>,
) -> Result<HandlerResult> {
    let mut request = TerraformRequest::new(directory).with_custom_rules(custom_rules(gate)?);
    request.fail_on_high = gate.fail_on_high;
    if let Some(output_format) = ci_cd {
        request = request.with_ci_cd(gate.fail_on_high, output_format);
    }
    for (key, value) in &gate.options {
        request = request.with_option(key, value.clone());
    }

    let audit = orchestrator(config, None)?;
    let result = audit.scan_terraform(&request)?;
    publish(cli, &audit, &result);
    Ok(HandlerResult::from_gate(result.gate_failed))
}

/// `runtime` carries the process and network flags when runtime checks were requested.
pub fn handle_image(
    cli: &Cli,
    config: Config,
    image: &str,
    gate: &GateArgs,
    runtime: Option<(bool, bool)>,
) -> Result<HandlerResult> {
    let mut request = ImageRequest::new(image)
        .with_custom_rules(custom_rules(gate)?)
        .with_fail_on_high(gate.fail_on_high);
    if let Some((processes, network)) = runtime {
        request = request.with_runtime(processes, network);
    }
    for (key, value) in &gate.options {
        request = request.with_option(key, value.clone());
    }

    let audit = orchestrator(config, None)?;
    let result = audit.scan_image(&request)?;
    publish(cli, &audit, &result);
    Ok(HandlerResult::from_gate(result.gate_failed))
}
