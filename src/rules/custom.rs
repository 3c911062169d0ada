//! Rule files: `{ "<category>": [ {id, name, description, severity, condition?} ] }`
//! in JSON or YAML.

use crate::error::{AuditError, ParseFormat, Result};
use crate::rules::types::{Rule, RuleMeta};
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk rule document, keyed by category.
pub type RuleFile = BTreeMap<String, Vec<RuleMeta>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RuleFormat {
    #[default]
    Json,
    Yaml,
}

impl RuleFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(AuditError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: other.to_string(),
            }),
        }
    }

    pub(crate) fn parse_format(self) -> ParseFormat {
        match self {
            Self::Json => ParseFormat::Json,
            Self::Yaml => ParseFormat::Yaml,
        }
    }
}

pub struct CustomRuleLoader;

impl CustomRuleLoader {
    /// Load rules from a JSON or YAML file, chosen by extension.
    pub fn load_from_file(path: &Path) -> Result<BTreeMap<String, Vec<Rule>>> {
        let format = RuleFormat::from_path(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|e| AuditError::read_error(path, e))?;
        let file = Self::parse(&content, format)
            .map_err(|e| match e {
                ParseFailure::Json(err) => AuditError::parse_error(path, format.parse_format(), err),
                ParseFailure::Yaml(err) => AuditError::parse_error(path, format.parse_format(), err),
            })?;
        Self::convert(file)
    }

    pub fn load_from_str(content: &str, format: RuleFormat) -> Result<BTreeMap<String, Vec<Rule>>> {
        let file = Self::parse(content, format).map_err(|e| match e {
            ParseFailure::Json(err) => AuditError::Json(err),
            ParseFailure::Yaml(err) => AuditError::Yaml(err),
        })?;
        Self::convert(file)
    }

    fn parse(content: &str, format: RuleFormat) -> std::result::Result<RuleFile, ParseFailure> {
        match format {
            RuleFormat::Json => serde_json::from_str(content).map_err(ParseFailure::Json),
            RuleFormat::Yaml => serde_yaml::from_str(content).map_err(ParseFailure::Yaml),
        }
    }

    fn convert(file: RuleFile) -> Result<BTreeMap<String, Vec<Rule>>> {
        file.into_iter()
            .map(|(category, metas)| {
                let rules = metas
                    .into_iter()
                    .map(|meta| Self::convert_meta(&category, meta))
                    .collect::<Result<Vec<_>>>()?;
                Ok((category, rules))
            })
            .collect()
    }

    /// Build a rule from its file form. `id` falls back to `name` and vice versa.
    pub fn convert_meta(category: &str, meta: RuleMeta) -> Result<Rule> {
        let id = meta
            .id
            .filter(|s| !s.is_empty())
            .or_else(|| meta.name.clone().filter(|s| !s.is_empty()))
            .ok_or_else(|| {
                AuditError::validation(
                    format!("{}/<unnamed>", category),
                    "rule has neither 'id' nor 'name'",
                )
            })?;
        let name = meta.name.filter(|s| !s.is_empty()).unwrap_or_else(|| id.clone());

        let mut rule = Rule::new(id, name, meta.description, meta.severity).with_category(category);
        if let Some(expr) = meta.condition {
            rule = rule.with_expr(expr);
        }
        Ok(rule)
    }

    pub fn write_to_file(path: &Path, file: &RuleFile, format: RuleFormat) -> Result<()> {
        let content = match format {
            RuleFormat::Json => serde_json::to_string_pretty(file)?,
            RuleFormat::Yaml => serde_yaml::to_string(file)?,
        };
        std::fs::write(path, content).map_err(|e| AuditError::write_error(path, e))
    }
}

enum ParseFailure {
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(RuleFormat::from_path(Path::new("r.json")).unwrap(), RuleFormat::Json);
        assert_eq!(RuleFormat::from_path(Path::new("r.YML")).unwrap(), RuleFormat::Yaml);
        assert!(matches!(
            RuleFormat::from_path(Path::new("r.toml")),
            Err(AuditError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_yaml_with_condition() {
        let yaml = r#"
container:
  - id: latest_tag
    name: latest_tag
    description: Image uses the latest tag
    severity: MEDIUM
    condition:
      matches: { path: target, pattern: ":latest$" }
"#;
        let rules = CustomRuleLoader::load_from_str(yaml, RuleFormat::Yaml).unwrap();
        let rule = &rules["container"][0];
        assert_eq!(rule.id, "latest_tag");
        assert_eq!(rule.category, "container");
        assert_eq!(rule.severity, Severity::Medium);
        assert!(rule.condition.is_some());
    }

    #[test]
    fn test_id_falls_back_to_name() {
        let json = r#"{"api": [{"name": "weak_cors", "description": "d", "severity": "low"}]}"#;
        let rules = CustomRuleLoader::load_from_str(json, RuleFormat::Json).unwrap();
        assert_eq!(rules["api"][0].id, "weak_cors");
        assert!(rules["api"][0].condition.is_none());
    }

    #[test]
    fn test_missing_id_and_name_is_validation_error() {
        let json = r#"{"api": [{"description": "d"}]}"#;
        let err = CustomRuleLoader::load_from_str(json, RuleFormat::Json).unwrap_err();
        assert!(matches!(err, AuditError::Validation { .. }));
    }

    #[test]
    fn test_load_from_file_parse_error_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = CustomRuleLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, AuditError::Parse { .. }));
        assert!(err.to_string().contains("rules.json"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = CustomRuleLoader::load_from_file(Path::new("/nonexistent/rules.yaml")).unwrap_err();
        assert!(matches!(err, AuditError::Io { .. }));
    }
}
