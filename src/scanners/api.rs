//! HTTP API scanner: security headers, unauthenticated access and rate limiting.
//!
//! Requests go through an [`HttpProbe`]; the default probe shells out to curl
//! so the scanner shares the tool runner's timeout and cancellation handling.

use super::common::ToolConfig;
use crate::external::ToolError;
use crate::finding::{Finding, FindingStatus, ScanResult, Severity};
use crate::rules::RuleEngine;
use crate::scanner::{ScanError, ScanOptions, ScannerPlugin, tool_failure};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_RATE_LIMIT_REQUESTS: u64 = 20;
const REQUEST_TIMEOUT_SECS: &str = "10";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names lowercased.
    pub headers: BTreeMap<String, String>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Issues a GET request and reports status and headers.
pub trait HttpProbe: Send + Sync {
    fn get(
        &self,
        url: &str,
        token: Option<&str>,
        options: &ScanOptions,
    ) -> Result<HttpResponse, ToolError>;
}

#[derive(Debug, Clone)]
pub struct CurlProbe {
    tool: ToolConfig,
}

impl CurlProbe {
    pub fn new() -> Self {
        Self {
            tool: ToolConfig::new("curl"),
        }
    }
}

crate::impl_tool_scanner!(CurlProbe);

impl HttpProbe for CurlProbe {
    fn get(
        &self,
        url: &str,
        token: Option<&str>,
        options: &ScanOptions,
    ) -> Result<HttpResponse, ToolError> {
        let mut args: Vec<String> = ["-s", "-S", "-D", "-", "-o", "/dev/null", "--max-time", REQUEST_TIMEOUT_SECS]
            .map(String::from)
            .to_vec();
        if let Some(token) = token {
            args.push("-H".into());
            args.push(format!("Authorization: Bearer {}", token));
        }
        args.push(url.to_string());
        let output = self.tool.run(&self.tool.invocation(args, options))?;
        Ok(parse_header_block(&output.stdout))
    }
}

/// Parse a `curl -D -` dump. After redirects only the last response counts.
pub fn parse_header_block(raw: &str) -> HttpResponse {
    let mut response = HttpResponse::default();
    for line in raw.lines().map(str::trim_end) {
        if line.starts_with("HTTP/") {
            response = HttpResponse {
                status: line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|code| code.parse().ok())
                    .unwrap_or(0),
                headers: BTreeMap::new(),
            };
        } else if let Some((name, value)) = line.split_once(':') {
            response
                .headers
                .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    response
}

struct HeaderCheck {
    key: &'static str,
    header: &'static str,
    secure: fn(&str) -> bool,
}

fn present_is_secure(_: &str) -> bool {
    true
}

fn frame_options_secure(value: &str) -> bool {
    matches!(value.to_ascii_uppercase().as_str(), "DENY" | "SAMEORIGIN")
}

fn content_type_options_secure(value: &str) -> bool {
    value.eq_ignore_ascii_case("nosniff")
}

fn xss_protection_secure(value: &str) -> bool {
    value.contains("1; mode=block")
}

const HEADER_CHECKS: &[HeaderCheck] = &[
    HeaderCheck {
        key: "csp",
        header: "Content-Security-Policy",
        secure: present_is_secure,
    },
    HeaderCheck {
        key: "hsts",
        header: "Strict-Transport-Security",
        secure: present_is_secure,
    },
    HeaderCheck {
        key: "x_frame_options",
        header: "X-Frame-Options",
        secure: frame_options_secure,
    },
    HeaderCheck {
        key: "x_content_type_options",
        header: "X-Content-Type-Options",
        secure: content_type_options_secure,
    },
    HeaderCheck {
        key: "x_xss_protection",
        header: "X-XSS-Protection",
        secure: xss_protection_secure,
    },
];

/// `{present, value, secure}` per checked header.
pub fn analyze_headers(response: &HttpResponse) -> Map<String, Value> {
    HEADER_CHECKS
        .iter()
        .map(|check| {
            let value = response.header(check.header).unwrap_or("");
            let present = !value.is_empty();
            (
                check.key.to_string(),
                json!({
                    "present": present,
                    "value": value,
                    "secure": present && (check.secure)(value),
                }),
            )
        })
        .collect()
}

fn header_findings(url: &str, headers: &Map<String, Value>) -> Vec<Finding> {
    HEADER_CHECKS
        .iter()
        .filter_map(|check| {
            let probe = headers.get(check.key)?;
            let present = probe["present"] == true;
            let secure = probe["secure"] == true;
            let finding = if !present {
                Finding::failed(
                    "api-001",
                    url,
                    format!("Missing security header: {}", check.header),
                )
                .with_recommendation(format!("Set the {} response header", check.header))
            } else if !secure {
                Finding::failed(
                    "api-001",
                    url,
                    format!(
                        "Insecure {} value: {}",
                        check.header,
                        probe["value"].as_str().unwrap_or("")
                    ),
                )
            } else {
                Finding::passed("api-001", url, format!("{} is set", check.header))
            };
            Some(finding.with_severity(Severity::Medium))
        })
        .collect()
}

pub struct ApiScanner {
    probe: Arc<dyn HttpProbe>,
    engine: Option<Arc<RuleEngine>>,
}

impl ApiScanner {
    pub const NAME: &'static str = "api";

    pub fn new() -> Self {
        Self {
            probe: Arc::new(CurlProbe::new()),
            engine: None,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HttpProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Evaluate the `api` rule category during the scan and report
    /// violations as findings.
    pub fn with_rule_engine(mut self, engine: Arc<RuleEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    fn rate_limit(
        &self,
        url: &str,
        token: Option<&str>,
        options: &ScanOptions,
        requests: u64,
    ) -> Result<Value, ToolError> {
        let mut blocked = false;
        let mut sent = 0;
        while sent < requests && !blocked {
            blocked = self.probe.get(url, token, options)?.status == 429;
            sent += 1;
        }
        Ok(json!({"requests": sent, "blocked": blocked, "vulnerable": !blocked}))
    }
}

impl Default for ApiScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScannerPlugin for ApiScanner {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "API security scanner"
    }

    fn supported_targets(&self) -> &[&'static str] {
        &["url"]
    }

    fn rule_category(&self) -> Option<&str> {
        match self.engine {
            Some(_) => None,
            None => Some("api"),
        }
    }

    fn scan(&self, target: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let url = options.get_str("url").unwrap_or(target);
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Ok(ScanResult::error(
                Self::NAME,
                target,
                url,
                "Invalid URL provided",
            ));
        }
        let token = options.get_str("auth_token");

        let response = match self.probe.get(url, token, options) {
            Ok(response) => response,
            Err(e) => return Ok(tool_failure(Self::NAME, target, &e)),
        };
        let headers = analyze_headers(&response);
        let mut findings = header_findings(url, &headers);

        let unauthenticated = token.is_none() && !matches!(response.status, 401 | 403);
        if unauthenticated {
            findings.push(
                Finding::new(
                    "api-002",
                    url,
                    FindingStatus::Warning,
                    format!("Endpoint answered {} without authentication", response.status),
                )
                .with_severity(Severity::Medium)
                .with_recommendation("Require authentication for API endpoints"),
            );
        }
        let authentication = json!({
            "token_auth": {"status": response.status, "vulnerable": unauthenticated}
        });

        let requests = options
            .get("rate_limit_requests")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_RATE_LIMIT_REQUESTS);
        let mut rate_limiting = Map::new();
        if requests > 0 {
            let basic = match self.rate_limit(url, token, options, requests) {
                Ok(basic) => basic,
                Err(e) => return Ok(tool_failure(Self::NAME, target, &e)),
            };
            let finding = if basic["blocked"] == true {
                Finding::passed("api-003", url, "Rate limiting enforced")
            } else {
                Finding::failed(
                    "api-003",
                    url,
                    format!("No rate limiting after {} requests", basic["requests"]),
                )
                .with_recommendation("Throttle clients with HTTP 429 responses")
            };
            findings.push(finding.with_severity(Severity::Medium));
            rate_limiting.insert("basic_rate_limit".to_string(), basic);
        }

        let mut result = ScanResult::new(Self::NAME, target, findings)
            .with_fact("status", response.status)
            .with_fact("headers", headers)
            .with_fact("authentication", authentication)
            .with_fact("rate_limiting", rate_limiting);

        if let Some(engine) = &self.engine {
            let violations = engine.apply_rules("api", &result.rule_input());
            debug!(url, violations = violations.len(), "Applied api rules");
            result.extend_findings(violations.iter().map(|v| v.to_finding(url)));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fakes::ScriptedRunner;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FakeProbe {
        responses: Mutex<VecDeque<HttpResponse>>,
        fallback: HttpResponse,
    }

    impl FakeProbe {
        fn new(fallback: HttpResponse) -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                fallback,
            }
        }

        fn then(self, response: HttpResponse) -> Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }
    }

    impl HttpProbe for FakeProbe {
        fn get(&self, _: &str, _: Option<&str>, _: &ScanOptions) -> Result<HttpResponse, ToolError> {
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone()))
        }
    }

    fn response(status: u16, headers: &[(&str, &str)]) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
        }
    }

    fn hardened() -> HttpResponse {
        response(
            401,
            &[
                ("Content-Security-Policy", "default-src 'self'"),
                ("Strict-Transport-Security", "max-age=63072000"),
                ("X-Frame-Options", "DENY"),
                ("X-Content-Type-Options", "nosniff"),
                ("X-XSS-Protection", "1; mode=block"),
            ],
        )
    }

    #[test]
    fn test_parse_header_block_keeps_last_response() {
        let raw = "HTTP/1.1 301 Moved Permanently\r\nLocation: https://x\r\n\r\nHTTP/2 200\r\nx-frame-options: SAMEORIGIN\r\ncontent-type: application/json\r\n\r\n";
        let parsed = parse_header_block(raw);
        assert_eq!(parsed.status, 200);
        assert_eq!(parsed.header("X-Frame-Options"), Some("SAMEORIGIN"));
        assert!(parsed.header("Location").is_none());
    }

    #[test]
    fn test_analyze_headers() {
        let headers = analyze_headers(&response(200, &[("X-Frame-Options", "ALLOW-FROM x")]));
        assert_eq!(headers["x_frame_options"]["present"], true);
        assert_eq!(headers["x_frame_options"]["secure"], false);
        assert_eq!(headers["csp"]["present"], false);
        assert_eq!(headers["csp"]["secure"], false);
    }

    #[test]
    fn test_hardened_endpoint() {
        let probe = FakeProbe::new(hardened())
            .then(hardened())
            .then(response(429, &[]));
        let scanner = ApiScanner::new()
            .with_probe(Arc::new(probe))
            .with_rule_engine(Arc::new(RuleEngine::new()));
        let result = scanner
            .scan("https://api.example.com", &ScanOptions::new())
            .unwrap();
        assert_eq!(result.summary().failed, 0);
        assert_eq!(result.facts()["rate_limiting"]["basic_rate_limit"]["blocked"], true);
        assert_eq!(scanner.rule_category(), None);
    }

    #[test]
    fn test_open_endpoint_triggers_rules() {
        let probe = FakeProbe::new(response(200, &[]));
        let scanner = ApiScanner::new()
            .with_probe(Arc::new(probe))
            .with_rule_engine(Arc::new(RuleEngine::new()));
        let result = scanner
            .scan(
                "https://api.example.com",
                &ScanOptions::new().with("rate_limit_requests", 5),
            )
            .unwrap();
        let ids: Vec<_> = result.findings().iter().map(|f| f.check_id.as_str()).collect();
        assert!(ids.contains(&"api-002"));
        assert!(ids.contains(&"insecure_headers"));
        assert!(ids.contains(&"rate_limit_missing"));
        assert_eq!(result.facts()["rate_limiting"]["basic_rate_limit"]["requests"], 5);
    }

    #[test]
    fn test_invalid_url() {
        let result = ApiScanner::new()
            .scan("ftp://example.com", &ScanOptions::new())
            .unwrap();
        assert_eq!(result.findings()[0].check_id, "api-000");
        assert_eq!(ApiScanner::new().rule_category(), Some("api"));
    }

    #[test]
    fn test_curl_probe_arguments() {
        let runner = Arc::new(
            ScriptedRunner::new().with_stdout("curl", "HTTP/1.1 204 No Content\r\n\r\n"),
        );
        let probe = CurlProbe::new().with_runner(runner.clone());
        let response = probe
            .get("https://x.test", Some("t0k"), &ScanOptions::new())
            .unwrap();
        assert_eq!(response.status, 204);
        let args = runner.last_args();
        assert_eq!(args.last().map(String::as_str), Some("https://x.test"));
        assert!(args.contains(&"Authorization: Bearer t0k".to_string()));
    }
}
