//! Cloud posture scanners backed by Prowler.
//!
//! `ProviderScanner` is the per-provider plugin (`aws`, `azure`, `gcp`) used by
//! multi-cloud scans; `CloudScanner` is the multi-provider `cloud` plugin that
//! routes on its target and also covers Kubernetes clusters.

use super::prowler::Prowler;
use crate::external::ToolRunner;
use crate::finding::ScanResult;
use crate::scanner::{ScanError, ScanOptions, ScannerPlugin};
use std::sync::Arc;

pub const CLOUD_PROVIDERS: &[&str] = &["aws", "azure", "gcp"];

/// Provider-specific Prowler arguments from the scan options.
fn provider_args(provider: &str, options: &ScanOptions) -> Vec<String> {
    let mut args = Vec::new();
    let mut push = |flag: &str, value: &str| {
        args.push(flag.to_string());
        args.push(value.to_string());
    };
    match provider {
        "aws" => {
            if let Some(profile) = options.get_str("profile") {
                push("--profile", profile);
            }
            if let Some(region) = options.get_str("region") {
                push("--region", region);
            }
        }
        "azure" => {
            if let Some(subscription) = options.get_str("subscription") {
                push("--subscription-ids", subscription);
            }
        }
        "gcp" => {
            if let Some(project) = options.get_str("project") {
                push("--project-ids", project);
            }
        }
        _ => {}
    }
    common_args(&mut args, options);
    args
}

fn common_args(args: &mut Vec<String>, options: &ScanOptions) {
    let services = options.get_str_list("services");
    if !services.is_empty() {
        args.push("--services".to_string());
        args.extend(services);
    }
    let checks = options.get_str_list("checks");
    if !checks.is_empty() {
        args.push("--checks".to_string());
        args.extend(checks);
    }
    if let Some(framework) = options.get_str("compliance") {
        args.push("--compliance".to_string());
        args.push(framework.to_string());
    }
}

/// One cloud provider's posture scan.
#[derive(Debug, Clone)]
pub struct ProviderScanner {
    provider: &'static str,
    description: String,
    prowler: Prowler,
}

impl ProviderScanner {
    pub fn aws() -> Self {
        Self::new("aws", "AWS security scanner")
    }

    pub fn azure() -> Self {
        Self::new("azure", "Azure security scanner")
    }

    pub fn gcp() -> Self {
        Self::new("gcp", "GCP security scanner")
    }

    fn new(provider: &'static str, description: &str) -> Self {
        Self {
            provider,
            description: description.to_string(),
            prowler: Prowler::new(),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.prowler = self.prowler.with_runner(runner);
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.prowler = self.prowler.with_program(program);
        self
    }
}

impl ScannerPlugin for ProviderScanner {
    fn name(&self) -> &str {
        self.provider
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn supported_targets(&self) -> &[&'static str] {
        match self.provider {
            "aws" => &["account"],
            "azure" => &["subscription"],
            _ => &["project"],
        }
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let args = provider_args(self.provider, options);
        Ok(self
            .prowler
            .scan(self.provider, self.provider, args, target, options))
    }
}

/// Multi-provider plugin: the target names the provider or `kubernetes`.
#[derive(Debug, Clone, Default)]
pub struct CloudScanner {
    prowler: Prowler,
}

impl CloudScanner {
    pub const NAME: &'static str = "cloud";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.prowler = self.prowler.with_runner(runner);
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.prowler = self.prowler.with_program(program);
        self
    }

    fn scan_kubernetes(&self, options: &ScanOptions) -> ScanResult {
        let Some(cluster) = options.get_str("cluster") else {
            return ScanResult::error(
                Self::NAME,
                "kubernetes",
                "kubernetes",
                "Missing required parameter: cluster",
            );
        };
        let mut args = vec!["--cluster".to_string(), cluster.to_string()];
        if let Some(namespace) = options.get_str("namespace") {
            args.push("--namespace".to_string());
            args.push(namespace.to_string());
        }
        common_args(&mut args, options);
        self.prowler
            .scan(Self::NAME, "kubernetes", args, "kubernetes", options)
    }
}

impl ScannerPlugin for CloudScanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Cloud and Kubernetes security assessment using Prowler"
    }

    fn supported_targets(&self) -> &[&'static str] {
        &["aws", "azure", "gcp", "kubernetes"]
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        if target == "kubernetes" {
            return Ok(self.scan_kubernetes(options));
        }
        if !CLOUD_PROVIDERS.contains(&target) {
            return Ok(ScanResult::error(
                Self::NAME,
                target,
                target,
                format!("Unsupported target: {}", target),
            ));
        }
        let args = provider_args(target, options);
        Ok(self.prowler.scan(Self::NAME, target, args, target, options))
    }
}
