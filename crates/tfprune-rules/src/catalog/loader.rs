//! YAML rule loader
//!
//! Load rule catalogs from files, directories, or strings.

use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::RuleDef;
use super::CatalogRule;
use crate::logging::{self, Event};

/// Errors that can occur when loading YAML rules
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid rule: {0}")]
    Validation(String),
}

/// Load rules from a string holding either one rule or a list of rules
pub fn load_rules_from_string(yaml: &str) -> Result<Vec<CatalogRule>, LoadError> {
    let document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let defs: Vec<RuleDef> = if document.is_sequence() {
        serde_yaml::from_value(document)?
    } else {
        vec![serde_yaml::from_value(document)?]
    };

    let mut rules = Vec::with_capacity(defs.len());
    for def in defs {
        let rule = compile(def)?;
        if rules.iter().any(|r: &CatalogRule| r.name() == rule.name()) {
            return Err(LoadError::Validation(format!(
                "Rule '{}' is defined more than once",
                rule.name()
            )));
        }
        rules.push(rule);
    }

    Ok(rules)
}

/// Load YAML rules from a file
pub fn load_rules_from_file(path: &Path) -> Result<Vec<CatalogRule>, LoadError> {
    let content = fs::read_to_string(path)?;
    let rules = load_rules_from_string(&content)?;
    logging::record(Event::CatalogLoaded {
        path,
        rules: rules.len(),
    });
    Ok(rules)
}

/// Load all YAML rules from a directory, recursively
///
/// Files are visited in name order so the resulting rule order is stable.
/// A file that fails to load is skipped with a warning.
pub fn load_rules_from_dir(dir: &Path) -> Result<Vec<CatalogRule>, LoadError> {
    let mut all_rules = Vec::new();

    if !dir.is_dir() {
        return Err(LoadError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory not found: {}", dir.display()),
        )));
    }

    walk_dir(dir, &mut all_rules)?;

    Ok(all_rules)
}

fn walk_dir(dir: &Path, rules: &mut Vec<CatalogRule>) -> Result<(), LoadError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        paths.push(entry?.path());
    }
    paths.sort();

    for path in paths {
        if path.is_dir() {
            walk_dir(&path, rules)?;
        } else if let Some(ext) = path.extension() {
            if ext == "yaml" || ext == "yml" {
                match load_rules_from_file(&path) {
                    Ok(loaded) => rules.extend(loaded),
                    Err(e) => {
                        logging::record(Event::CatalogSkipped {
                            path: &path,
                            reason: &e.to_string(),
                        });
                        eprintln!("Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }
    }

    Ok(())
}

fn compile(def: RuleDef) -> Result<CatalogRule, LoadError> {
    let rule = def.to_rule().map_err(LoadError::Validation)?;
    Ok(CatalogRule {
        rule,
        category: def.category,
        tests: def.tests,
    })
}

/// Information about a loaded rule
#[derive(Debug, Clone)]
pub struct RuleInfo {
    pub name: String,
    pub description: String,
    pub category: String,
    pub resource: String,
    pub for_each: Option<String>,
    pub test_count: usize,
}

impl From<&CatalogRule> for RuleInfo {
    fn from(rule: &CatalogRule) -> Self {
        Self {
            name: rule.rule.name.clone(),
            description: rule.rule.description.clone(),
            category: rule.category.clone(),
            resource: rule.rule.resource.clone(),
            for_each: rule.rule.for_each.clone(),
            test_count: rule.tests.len(),
        }
    }
}
