//! Rule conditions.
//!
//! A condition is a predicate over a scan-result document (`serde_json::Value`).
//! Built-in rules use native closures; rules loaded from files use [`Expr`],
//! a small data-only expression language that cannot execute code.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Raised by a condition that cannot be evaluated against a document.
#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("field '{path}' is not {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub trait Condition: Send + Sync {
    fn evaluate(&self, result: &Value) -> Result<bool, ConditionError>;
}

impl<F> Condition for F
where
    F: Fn(&Value) -> Result<bool, ConditionError> + Send + Sync,
{
    fn evaluate(&self, result: &Value) -> Result<bool, ConditionError> {
        self(result)
    }
}

/// The executable part of a rule.
#[derive(Clone)]
pub enum RuleCondition {
    /// Compiled into the binary. Not serializable.
    Native(Arc<dyn Condition>),
    /// Data expression, round-trips through rule files.
    Expr(Expr),
}

impl RuleCondition {
    pub fn native(condition: impl Condition + 'static) -> Self {
        Self::Native(Arc::new(condition))
    }

    pub fn evaluate(&self, result: &Value) -> Result<bool, ConditionError> {
        match self {
            Self::Native(condition) => condition.evaluate(result),
            Self::Expr(expr) => expr.evaluate(result),
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Self::Expr(expr) => Some(expr),
            Self::Native(_) => None,
        }
    }
}

impl fmt::Debug for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native(..)"),
            Self::Expr(expr) => f.debug_tuple("Expr").field(expr).finish(),
        }
    }
}

/// Expression language for file-defined rule conditions.
///
/// Paths are dotted (`headers.x-frame-options.present`); numeric segments
/// index arrays and the empty path is the current value.
///
/// ```yaml
/// condition:
///   any:
///     path: storage
///     when:
///       eq: { path: encrypted, value: false }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Missing fields compare as `null`.
    Eq { path: String, value: Value },
    Ne { path: String, value: Value },
    /// Present and not `null`.
    Exists { path: String },
    /// Array membership, substring, or object key.
    Contains { path: String, value: Value },
    Matches { path: String, pattern: String },
    /// Some element of an array (or value of an object) satisfies `when`.
    Any { path: String, when: Box<Expr> },
    /// Every element satisfies `when`. Vacuously true when empty.
    All { path: String, when: Box<Expr> },
    AllOf(Vec<Expr>),
    AnyOf(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn evaluate(&self, doc: &Value) -> Result<bool, ConditionError> {
        match self {
            Expr::Eq { path, value } => Ok(lookup(doc, path).unwrap_or(&Value::Null) == value),
            Expr::Ne { path, value } => Ok(lookup(doc, path).unwrap_or(&Value::Null) != value),
            Expr::Exists { path } => Ok(lookup(doc, path).is_some_and(|v| !v.is_null())),
            Expr::Contains { path, value } => contains(require(doc, path)?, path, value),
            Expr::Matches { path, pattern } => {
                let text = require(doc, path)?
                    .as_str()
                    .ok_or_else(|| ConditionError::TypeMismatch {
                        path: path.clone(),
                        expected: "a string",
                    })?;
                let re = Regex::new(pattern).map_err(|source| ConditionError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                Ok(re.is_match(text))
            }
            Expr::Any { path, when } => {
                for member in members(doc, path)? {
                    if when.evaluate(member)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::All { path, when } => {
                for member in members(doc, path)? {
                    if !when.evaluate(member)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::AllOf(exprs) => {
                for expr in exprs {
                    if !expr.evaluate(doc)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::AnyOf(exprs) => {
                for expr in exprs {
                    if expr.evaluate(doc)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::Not(expr) => Ok(!expr.evaluate(doc)?),
        }
    }
}

impl Condition for Expr {
    fn evaluate(&self, result: &Value) -> Result<bool, ConditionError> {
        Expr::evaluate(self, result)
    }
}

fn contains(haystack: &Value, path: &str, needle: &Value) -> Result<bool, ConditionError> {
    match haystack {
        Value::Array(items) => Ok(items.contains(needle)),
        Value::String(text) => needle
            .as_str()
            .map(|n| text.contains(n))
            .ok_or_else(|| ConditionError::TypeMismatch {
                path: path.to_string(),
                expected: "compared against a string",
            }),
        Value::Object(map) => Ok(needle.as_str().is_some_and(|key| map.contains_key(key))),
        _ => Err(ConditionError::TypeMismatch {
            path: path.to_string(),
            expected: "an array, string or object",
        }),
    }
}

/// Resolve a dotted path. `None` when any segment is absent.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Like [`lookup`], but a missing field is an error.
pub fn require<'a>(doc: &'a Value, path: &str) -> Result<&'a Value, ConditionError> {
    lookup(doc, path).ok_or_else(|| ConditionError::MissingField(path.to_string()))
}

/// Elements of an array or values of an object at `path`.
pub fn members<'a>(doc: &'a Value, path: &str) -> Result<Vec<&'a Value>, ConditionError> {
    match require(doc, path)? {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(map) => Ok(map.values().collect()),
        _ => Err(ConditionError::TypeMismatch {
            path: path.to_string(),
            expected: "an array or object",
        }),
    }
}

/// Truthiness of an optional field, the way loosely-typed tool output is usually read.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
