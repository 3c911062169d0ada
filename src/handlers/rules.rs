//! Rule set handlers.

use super::HandlerResult;
use crate::cli::{Cli, OutputFormat, RulesAction};
use crate::config::Config;
use crate::error::Result;
use crate::rules::{RuleEngine, RuleFile, RuleFormat};
use std::collections::BTreeMap;

pub fn handle_rules(cli: &Cli, config: Config, action: &RulesAction) -> Result<HandlerResult> {
    let engine = RuleEngine::new();
    for path in &config.rules.files {
        engine.merge_rules_from_file(path)?;
    }

    match action {
        RulesAction::List { category } => {
            let mut file = engine.to_rule_file();
            if let Some(category) = category {
                file.retain(|name, _| name == category);
            }
            print_rule_file(cli.format, &file)?;
        }
        RulesAction::Export { path, rule_format } => {
            let format = match rule_format {
                Some(format) => *format,
                None => RuleFormat::from_path(path)?,
            };
            engine.export_rules(path, format)?;
            eprintln!("Exported {} rule(s) to {}", engine.rule_count(), path.display());
        }
        RulesAction::Import { path, replace } => {
            if *replace {
                engine.load_rules_from_file(path)?;
            } else {
                engine.merge_rules_from_file(path)?;
            }
            let counts: BTreeMap<String, usize> = engine
                .get_categories()
                .into_iter()
                .map(|category| {
                    let count = engine.get_rules_for_category(&category).len();
                    (category, count)
                })
                .collect();
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&counts)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&counts)?),
                OutputFormat::Text => {
                    println!("Loaded {}:", path.display());
                    for (category, count) in counts {
                        println!("  {:<12} {} rule(s)", category, count);
                    }
                }
            }
        }
    }
    Ok(HandlerResult::Success)
}

fn print_rule_file(format: OutputFormat, file: &RuleFile) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(file)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(file)?),
        OutputFormat::Text => {
            for (category, rules) in file {
                println!("{}:", category);
                for rule in rules {
                    println!(
                        "  {:<24} [{}] {}",
                        rule.id.as_deref().unwrap_or_default(),
                        rule.severity,
                        rule.description
                    );
                }
            }
        }
    }
    Ok(())
}
