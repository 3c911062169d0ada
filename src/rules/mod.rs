pub mod builtin;
pub mod catalog;
pub mod condition;
pub mod custom;
pub mod engine;
pub mod types;

pub use catalog::{RuleCatalog, RuleDocument, index_custom_rules};
pub use condition::{Condition, ConditionError, Expr, RuleCondition};
pub use custom::{CustomRuleLoader, RuleFile, RuleFormat};
pub use engine::RuleEngine;
pub use types::{Rule, RuleMeta, Violation};
