//! Orchestrator request types.
//!
//! Optional arguments are plain fields with builder setters; `Default` is the
//! empty request.

use crate::rules::RuleDocument;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Per-provider (or per-environment) option maps, keyed by name.
pub type ConfigSlices = BTreeMap<String, Map<String, Value>>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MultiCloudRequest {
    pub providers: Vec<String>,
    pub config: ConfigSlices,
    /// Catalog rule ids whose metadata is attached to the result.
    pub rules: Vec<String>,
    pub services: BTreeMap<String, Vec<String>>,
}

impl MultiCloudRequest {
    pub fn new<I, S>(providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            providers: providers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, provider: impl Into<String>, slice: Map<String, Value>) -> Self {
        self.config.insert(provider.into(), slice);
        self
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_services(mut self, provider: impl Into<String>, services: Vec<String>) -> Self {
        self.services.insert(provider.into(), services);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HybridCloudRequest {
    pub environments: Vec<String>,
    pub config: ConfigSlices,
    pub rules: Vec<String>,
    pub components: Map<String, Value>,
    pub check_connectivity: bool,
    pub check_security_groups: bool,
    pub check_firewalls: bool,
}

impl HybridCloudRequest {
    pub fn new<I, S>(environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            environments: environments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_config(
        mut self,
        environment: impl Into<String>,
        slice: Map<String, Value>,
    ) -> Self {
        self.config.insert(environment.into(), slice);
        self
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_components(mut self, components: Map<String, Value>) -> Self {
        self.components = components;
        self
    }

    pub fn with_checks(mut self, connectivity: bool, security_groups: bool, firewalls: bool) -> Self {
        self.check_connectivity = connectivity;
        self.check_security_groups = security_groups;
        self.check_firewalls = firewalls;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerraformRequest {
    pub directory: String,
    pub custom_rules: Vec<RuleDocument>,
    pub ci_cd: bool,
    pub fail_on_high: bool,
    pub output_format: String,
    /// Extra scanner options.
    pub options: Map<String, Value>,
}

impl Default for TerraformRequest {
    fn default() -> Self {
        Self {
            directory: String::new(),
            custom_rules: Vec::new(),
            ci_cd: false,
            fail_on_high: false,
            output_format: "json".to_string(),
            options: Map::new(),
        }
    }
}

impl TerraformRequest {
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn with_custom_rules(mut self, rules: Vec<RuleDocument>) -> Self {
        self.custom_rules = rules;
        self
    }

    pub fn with_ci_cd(mut self, fail_on_high: bool, output_format: impl Into<String>) -> Self {
        self.ci_cd = true;
        self.fail_on_high = fail_on_high;
        self.output_format = output_format.into();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageRequest {
    pub image: String,
    pub custom_rules: Vec<RuleDocument>,
    pub runtime: bool,
    pub check_processes: bool,
    pub check_network: bool,
    pub fail_on_high: bool,
    pub options: Map<String, Value>,
}

impl ImageRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    pub fn with_custom_rules(mut self, rules: Vec<RuleDocument>) -> Self {
        self.custom_rules = rules;
        self
    }

    pub fn with_runtime(mut self, check_processes: bool, check_network: bool) -> Self {
        self.runtime = true;
        self.check_processes = check_processes;
        self.check_network = check_network;
        self
    }

    pub fn with_fail_on_high(mut self, fail_on_high: bool) -> Self {
        self.fail_on_high = fail_on_high;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}
