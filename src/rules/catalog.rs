//! Flat rule catalog kept by the orchestrator.
//!
//! Unlike [`RuleEngine`](crate::rules::RuleEngine) this never evaluates
//! anything: it stores caller-supplied rule documents by id so results can be
//! tagged with the metadata of the rules a request names.

use crate::error::{AuditError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

pub type RuleDocument = Map<String, Value>;

#[derive(Debug, Default)]
pub struct RuleCatalog {
    rules: RwLock<BTreeMap<String, RuleDocument>>,
}

impl RuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rule document under its `id`. Re-adding an id replaces it.
    pub fn add_rule(&self, rule: RuleDocument) -> Result<()> {
        let id = rule_id(&rule)?;
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, rule);
        Ok(())
    }

    /// The known subset of `ids`. Unknown ids are dropped.
    pub fn resolve_rules<I, S>(&self, ids: I) -> BTreeMap<String, RuleDocument>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        ids.into_iter()
            .filter_map(|id| {
                let id = id.as_ref();
                rules.get(id).map(|rule| (id.to_string(), rule.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Key caller-supplied custom rules by id. A rule without an id is rejected.
pub fn index_custom_rules(rules: &[RuleDocument]) -> Result<BTreeMap<String, RuleDocument>> {
    rules
        .iter()
        .map(|rule| Ok((rule_id(rule)?, rule.clone())))
        .collect()
}

fn rule_id(rule: &RuleDocument) -> Result<String> {
    match rule.get("id").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => Ok(id.to_string()),
        _ => Err(AuditError::validation(
            rule.get("name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>"),
            "rules must include an 'id' field",
        )),
    }
}
