use crate::error::{AuditError, Result};
use crate::rules::builtin;
use crate::rules::custom::{CustomRuleLoader, RuleFile, RuleFormat};
use crate::rules::types::{Rule, Violation};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};

/// Categorized rule store.
///
/// Reads (`apply_rules`, listing) share the lock; `add_rule`, `remove_rule`,
/// loads and clears take it exclusively.
pub struct RuleEngine {
    rules: RwLock<BTreeMap<String, Vec<Rule>>>,
}

impl RuleEngine {
    /// Engine seeded with the default rule set.
    pub fn new() -> Self {
        let engine = Self::empty();
        engine.load_defaults();
        engine
    }

    /// Engine with no categories at all.
    pub fn empty() -> Self {
        Self {
            rules: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Vec<Rule>>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Vec<Rule>>> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_defaults(&self) {
        let mut rules = self.write();
        for (category, defaults) in builtin::default_rules() {
            let list = rules.entry(category.to_string()).or_default();
            for rule in defaults {
                upsert(list, rule.with_category(category));
            }
        }
    }

    /// Create an empty category if it does not exist yet.
    pub fn register_category(&self, name: &str) {
        self.write().entry(name.to_string()).or_default();
    }

    /// Check a rule can be stored: non-empty id, name and description, and a condition.
    pub fn validate_rule(rule: &Rule) -> Result<()> {
        let missing = [
            ("id", rule.id.trim().is_empty()),
            ("name", rule.name.trim().is_empty()),
            ("description", rule.description.trim().is_empty()),
            ("condition", rule.condition.is_none()),
        ];
        match missing.iter().find(|(_, absent)| *absent) {
            Some((field, _)) => Err(AuditError::validation(
                if rule.id.is_empty() {
                    "<unnamed>"
                } else {
                    rule.id.as_str()
                },
                format!("missing required field '{}'", field),
            )),
            None => Ok(()),
        }
    }

    /// Add a validated rule. An existing rule with the same id in the
    /// category is replaced in place.
    pub fn add_rule(&self, category: &str, rule: Rule) -> Result<()> {
        Self::validate_rule(&rule)?;
        let rule = rule.with_category(category);
        debug!(category, rule = %rule.id, "Adding rule");
        upsert(self.write().entry(category.to_string()).or_default(), rule);
        Ok(())
    }

    /// Remove a rule by id. Unknown categories or ids are ignored.
    pub fn remove_rule(&self, category: &str, rule_id: &str) {
        if let Some(list) = self.write().get_mut(category) {
            list.retain(|r| r.id != rule_id);
        }
    }

    /// Evaluate every rule of `category` against `result`.
    ///
    /// A condition that errors is logged and skipped. Metadata-only rules never match.
    pub fn apply_rules(&self, category: &str, result: &Value) -> Vec<Violation> {
        let rules = match self.read().get(category) {
            Some(list) => list.clone(),
            None => {
                trace!(category, "No rules registered for category");
                return Vec::new();
            }
        };

        let mut violations = Vec::new();
        for rule in &rules {
            let Some(condition) = &rule.condition else {
                trace!(category, rule = %rule.id, "Skipping rule without condition");
                continue;
            };
            match condition.evaluate(result) {
                Ok(true) => violations.push(rule.to_violation()),
                Ok(false) => {}
                Err(e) => warn!(category, rule = %rule.id, error = %e, "Rule evaluation failed"),
            }
        }
        debug!(category, rules = rules.len(), violations = violations.len(), "Applied rules");
        violations
    }

    /// Import rules, replacing every category present in the file.
    pub fn load_rules_from_file(&self, path: &Path) -> Result<()> {
        let loaded = CustomRuleLoader::load_from_file(path)?;
        let mut rules = self.write();
        for (category, list) in loaded {
            debug!(category = %category, count = list.len(), path = %path.display(), "Replacing category");
            let mut fresh = Vec::with_capacity(list.len());
            for rule in list {
                upsert(&mut fresh, rule);
            }
            rules.insert(category, fresh);
        }
        Ok(())
    }

    /// Import rules, upserting by id into existing categories.
    pub fn merge_rules_from_file(&self, path: &Path) -> Result<()> {
        let loaded = CustomRuleLoader::load_from_file(path)?;
        let mut rules = self.write();
        for (category, list) in loaded {
            let target = rules.entry(category).or_default();
            for rule in list {
                upsert(target, rule);
            }
        }
        Ok(())
    }

    /// Export every category's rule metadata. Native conditions are not written.
    pub fn export_rules(&self, path: &Path, format: RuleFormat) -> Result<()> {
        CustomRuleLoader::write_to_file(path, &self.to_rule_file(), format)
    }

    pub fn to_rule_file(&self) -> RuleFile {
        self.read()
            .iter()
            .map(|(category, list)| (category.clone(), list.iter().map(Rule::meta).collect()))
            .collect()
    }

    pub fn get_categories(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn get_rules_for_category(&self, category: &str) -> Vec<Rule> {
        self.read().get(category).cloned().unwrap_or_default()
    }

    /// Clear one category, or everything when `None`. Clearing everything
    /// restores the default rule set.
    pub fn clear_rules(&self, category: Option<&str>) {
        match category {
            Some(category) => {
                if let Some(list) = self.write().get_mut(category) {
                    list.clear();
                }
            }
            None => {
                self.write().clear();
                self.load_defaults();
            }
        }
    }

    pub fn rule_count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert(list: &mut Vec<Rule>, rule: Rule) {
    match list.iter_mut().find(|r| r.id == rule.id) {
        Some(existing) => *existing = rule,
        None => list.push(rule),
    }
}
