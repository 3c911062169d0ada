use crate::finding::Severity;
use crate::rules::condition::lookup;
use crate::rules::types::Rule;
use serde_json::Value;

pub fn rules() -> Vec<Rule> {
    vec![root_container()]
}

fn root_container() -> Rule {
    Rule::new(
        "root_container",
        "root_container",
        "Container running as root",
        Severity::High,
    )
    .with_native(|doc| Ok(lookup(doc, "user").and_then(Value::as_str) == Some("root")))
}
