use crate::finding::Severity;
use crate::rules::condition::lookup;
use crate::rules::types::Rule;
use serde_json::Value;

pub fn rules() -> Vec<Rule> {
    vec![insecure_storage()]
}

/// `storage` is a list of `{encrypted, ...}` resources. An absent list matches nothing.
fn insecure_storage() -> Rule {
    Rule::new(
        "insecure_storage",
        "insecure_storage",
        "Storage without encryption",
        Severity::High,
    )
    .with_native(|doc| {
        let storage = lookup(doc, "storage")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(storage
            .iter()
            .any(|s| s.get("encrypted") == Some(&Value::Bool(false))))
    })
}
