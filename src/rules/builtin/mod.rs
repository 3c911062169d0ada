mod api;
mod container;
mod iac;

use crate::rules::types::Rule;

/// Categories seeded into every new engine.
pub const DEFAULT_CATEGORIES: &[&str] = &["api", "container", "iac"];

/// Default rule set, grouped by category.
pub fn default_rules() -> Vec<(&'static str, Vec<Rule>)> {
    vec![
        ("api", api::rules()),
        ("container", container::rules()),
        ("iac", iac::rules()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories_match_rules() {
        let categories: Vec<&str> = default_rules().iter().map(|(c, _)| *c).collect();
        assert_eq!(categories, DEFAULT_CATEGORIES);
    }

    #[test]
    fn test_default_rules_are_complete() {
        for (_, rules) in default_rules() {
            for rule in rules {
                assert!(!rule.id.is_empty());
                assert!(!rule.description.is_empty());
                assert!(rule.condition.is_some(), "{} has no condition", rule.id);
            }
        }
    }
}
