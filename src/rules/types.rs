use crate::finding::{Finding, FindingStatus, Severity};
use crate::rules::condition::{Expr, RuleCondition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, categorized check applied to scan-result documents.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    /// Filled in by the engine when the rule is stored.
    pub category: String,
    /// Metadata-only rules (loaded without a condition) never match.
    pub condition: Option<RuleCondition>,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            severity,
            category: String::new(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_native<F>(self, condition: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, crate::rules::ConditionError> + Send + Sync + 'static,
    {
        self.with_condition(RuleCondition::native(condition))
    }

    pub fn with_expr(self, expr: Expr) -> Self {
        self.with_condition(RuleCondition::Expr(expr))
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Serializable view. Native conditions are dropped.
    pub fn meta(&self) -> RuleMeta {
        RuleMeta {
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            description: self.description.clone(),
            severity: self.severity,
            condition: self
                .condition
                .as_ref()
                .and_then(|c| c.as_expr())
                .cloned(),
        }
    }

    pub fn to_violation(&self) -> Violation {
        Violation {
            rule_id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            severity: self.severity,
            category: self.category.clone(),
        }
    }
}

/// Rule as written in rule files.
///
/// `id` defaults to `name` when omitted; one of the two is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
}

/// A matched rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(default)]
    pub rule_id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
}

impl Violation {
    /// Violations folded into a result's finding list use the rule id as check id.
    pub fn to_finding(&self, resource: &str) -> Finding {
        Finding::new(
            self.rule_id.clone(),
            resource,
            FindingStatus::Failed,
            self.description.clone(),
        )
        .with_severity(self.severity)
    }
}
