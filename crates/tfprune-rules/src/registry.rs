//! Registry of available cleanup rules
//!
//! Holds the built-in catalog plus any user catalogs, in catalog order.
//! Rule order is significant to the engine, so every lookup that returns
//! several rules keeps that order.

use std::collections::HashSet;
use std::path::Path;

use tfprune_core::Document;

use crate::catalog::{
    load_rules_from_dir, load_rules_from_file, load_rules_from_string, verify_rules, CatalogRule,
    LoadError, RuleInfo, TestResult,
};
use crate::engine::{apply_rules, ApplyReport, DocumentError, Rule};

/// The built-in Google provider catalog
pub const BUILTIN_CATALOG: &str = include_str!("../rules/google.yaml");

/// Registry of all available cleanup rules
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<CatalogRule>,
}

impl RuleRegistry {
    /// Create a registry with the built-in rules
    pub fn new() -> Result<Self, LoadError> {
        let mut registry = Self::empty();
        registry.extend(load_rules_from_string(BUILTIN_CATALOG)?);
        Ok(registry)
    }

    /// Create a registry without any rules
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a rule
    ///
    /// A rule with the name of an already registered rule replaces it in place.
    pub fn register(&mut self, rule: CatalogRule) {
        match self.rules.iter_mut().find(|r| r.name() == rule.name()) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = CatalogRule>) {
        for rule in rules {
            self.register(rule);
        }
    }

    /// Load a catalog file or a directory of catalogs, returning how many rules it held
    pub fn load_path(&mut self, path: &Path) -> Result<usize, LoadError> {
        let rules = if path.is_dir() {
            load_rules_from_dir(path)?
        } else {
            load_rules_from_file(path)?
        };
        let count = rules.len();
        self.extend(rules);
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogRule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogRule> {
        self.rules.iter()
    }

    /// Get all rule names
    pub fn all_names(&self) -> Vec<&str> {
        self.rules.iter().map(CatalogRule::name).collect()
    }

    /// Get rules filtered by enabled names, in catalog order
    pub fn get_enabled(&self, enabled: &HashSet<String>) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| enabled.contains(r.name()))
            .map(|r| &r.rule)
            .collect()
    }

    /// Owned copies of the enabled rules, ready for [`apply_rules`]
    pub fn enabled_rules(&self, enabled: &HashSet<String>) -> Vec<Rule> {
        self.get_enabled(enabled).into_iter().cloned().collect()
    }

    /// Get all rules with their metadata (for --list-rules)
    pub fn list_rules(&self) -> Vec<RuleInfo> {
        self.rules.iter().map(RuleInfo::from).collect()
    }

    /// Run all enabled rules on a document
    pub fn apply_enabled(
        &self,
        document: &mut Document,
        enabled: &HashSet<String>,
    ) -> Result<ApplyReport, DocumentError> {
        apply_rules(document, &self.enabled_rules(enabled))
    }

    /// Run the inline tests of every registered rule
    pub fn verify(&self) -> Vec<TestResult> {
        verify_rules(&self.rules)
    }
}
