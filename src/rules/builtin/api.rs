use crate::finding::Severity;
use crate::rules::condition::{is_truthy, members};
use crate::rules::types::Rule;

pub fn rules() -> Vec<Rule> {
    vec![insecure_headers(), rate_limit_missing()]
}

/// `headers` maps header name to `{present, secure}` probe results.
fn insecure_headers() -> Rule {
    Rule::new(
        "insecure_headers",
        "insecure_headers",
        "Missing or insecure security headers",
        Severity::High,
    )
    .with_native(|doc| {
        Ok(members(doc, "headers")?
            .into_iter()
            .any(|h| !is_truthy(h.get("present")) || !is_truthy(h.get("secure"))))
    })
}

/// `rate_limiting` maps endpoint to `{blocked}` after a request burst.
fn rate_limit_missing() -> Rule {
    Rule::new(
        "rate_limit_missing",
        "rate_limit_missing",
        "Rate limiting not implemented",
        Severity::Medium,
    )
    .with_native(|doc| {
        Ok(members(doc, "rate_limiting")?
            .into_iter()
            .any(|limit| !is_truthy(limit.get("blocked"))))
    })
}
