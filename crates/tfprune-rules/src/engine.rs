//! Rule engine
//!
//! Applies an ordered list of [`Rule`]s to a [`Document`]. Each rule visits
//! the top-level `resource` blocks whose type label matches, evaluates its
//! conditions on every scope (the resource body, or each instance of the
//! iterated nested block) and runs its actions where they hold.
//!
//! One firing that changes a scope counts as one modification, however many
//! attributes it touched. Errors from one (rule, scope) pair are collected
//! and evaluation carries on with the remaining scopes and rules.

use thiserror::Error;
use tfprune_core::{Block, Body, Document};

use crate::action::{execute, Action, ActionError};
use crate::condition::{evaluate, Condition};
use crate::logging::{self, Event};

/// A declarative cleanup rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub description: String,
    /// Resource type the rule targets, e.g. `google_container_cluster`
    pub resource: String,
    /// Nested block type to evaluate once per instance instead of the whole resource
    pub for_each: Option<String>,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

impl Rule {
    pub fn new(name: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            resource: resource.into(),
            for_each: None,
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn for_each(mut self, block_type: impl Into<String>) -> Self {
        self.for_each = Some(block_type.into());
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn then(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Whether this rule visits the given top-level block
    pub fn targets(&self, block: &Block) -> bool {
        block.ident() == "resource"
            && block.labels().first().map(String::as_str) == Some(self.resource.as_str())
    }
}

/// The document cannot be processed at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("resource block #{index} has no type label")]
    MissingResourceType { index: usize },
}

/// An action failure for one (rule, scope) pair
#[derive(Error, Debug, Clone, PartialEq)]
#[error("rule '{rule}' on {address} ({scope}): {source}")]
pub struct RuleError {
    pub rule: String,
    /// Address of the resource, e.g. `google_container_cluster.primary`
    pub address: String,
    /// `resource` or the iterated block instance, e.g. `node_pool[1]`
    pub scope: String,
    #[source]
    pub source: ActionError,
}

/// A rule firing that changed the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    pub rule: String,
    pub address: String,
    pub scope: String,
}

/// Outcome of [`apply_rules`]
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub modifications: usize,
    pub firings: Vec<Firing>,
    pub errors: Vec<RuleError>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        self.modifications > 0
    }

    /// Names of the rules that fired at least once, in firing order
    pub fn fired_rules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for firing in &self.firings {
            if !names.contains(&firing.rule.as_str()) {
                names.push(&firing.rule);
            }
        }
        names
    }

    fn record(&mut self, rule: &Rule, address: &str, scope: String, outcome: Result<bool, ActionError>) {
        match outcome {
            Ok(true) => {
                logging::record(Event::Fired {
                    rule: &rule.name,
                    address,
                    scope: &scope,
                });
                self.modifications += 1;
                self.firings.push(Firing {
                    rule: rule.name.clone(),
                    address: address.to_string(),
                    scope,
                });
            }
            Ok(false) => {}
            Err(source) => {
                logging::record(Event::RuleFailed {
                    rule: &rule.name,
                    address,
                    error: &source.to_string(),
                });
                self.errors.push(RuleError {
                    rule: rule.name.clone(),
                    address: address.to_string(),
                    scope,
                    source,
                });
            }
        }
    }
}

/// Apply `rules`, in order, to `document`
///
/// The document is checked before anything is changed; a structural problem
/// aborts the whole call. Action errors do not: they are collected in the
/// report next to the modifications that did succeed.
pub fn apply_rules(document: &mut Document, rules: &[Rule]) -> Result<ApplyReport, DocumentError> {
    validate(document)?;

    let resource_count = document.blocks().filter(|b| b.ident() == "resource").count();
    logging::record(Event::ApplyStarted {
        rules: rules.len(),
        resources: resource_count,
    });

    let mut report = ApplyReport::default();

    for rule in rules {
        let targets: Vec<usize> = document
            .blocks()
            .enumerate()
            .filter(|(_, block)| rule.targets(block))
            .map(|(index, _)| index)
            .collect();

        for index in targets {
            let Some(block) = document.body_mut().block_mut(index) else {
                continue;
            };
            let address = block.address();

            match &rule.for_each {
                None => fire(rule, block.body_mut(), &address, "resource".to_string(), &mut report),
                Some(block_type) => {
                    // Actions only touch the inside of an instance, so the
                    // positions of the instances stay valid
                    let instances = block.body().block_indices(block_type);
                    for (n, position) in instances.into_iter().enumerate() {
                        if let Some(instance) = block.body_mut().block_mut(position) {
                            let scope = format!("{}[{}]", block_type, n);
                            fire(rule, instance.body_mut(), &address, scope, &mut report);
                        }
                    }
                }
            }
        }
    }

    logging::record(Event::ApplyFinished {
        modifications: report.modifications,
        errors: report.errors.len(),
    });
    Ok(report)
}

fn fire(rule: &Rule, scope: &mut Body, address: &str, scope_name: String, report: &mut ApplyReport) {
    if evaluate(scope, &rule.conditions) {
        let outcome = execute(scope, &rule.actions);
        report.record(rule, address, scope_name, outcome);
    }
}

fn validate(document: &Document) -> Result<(), DocumentError> {
    for (index, block) in document.blocks().enumerate() {
        if block.ident() == "resource" && block.labels().is_empty() {
            return Err(DocumentError::MissingResourceType { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfprune_core::parse;

    fn path(s: &str) -> crate::path::Path {
        s.parse().unwrap()
    }

    const SOURCE: &str = r#"
resource "google_container_cluster" "a" {
  enable_autopilot = true
}

resource "google_container_cluster" "b" {
  enable_autopilot = true
}

resource "google_container_cluster_v2" "c" {
  enable_autopilot = true
}

data "google_container_cluster" "d" {
  enable_autopilot = true
}
"#;

    fn remove_autopilot() -> Rule {
        Rule::new("remove_autopilot", "google_container_cluster")
            .when(Condition::Exists(path("enable_autopilot")))
            .then(Action::RemoveAttribute(path("enable_autopilot")))
    }

    #[test]
    fn test_only_matching_resources_are_visited() {
        let mut document = parse(SOURCE).unwrap();
        let report = apply_rules(&mut document, &[remove_autopilot()]).unwrap();

        assert_eq!(report.modifications, 2);
        let addresses: Vec<&str> = report.firings.iter().map(|f| f.address.as_str()).collect();
        assert_eq!(addresses, vec!["google_container_cluster.a", "google_container_cluster.b"]);

        let untouched: Vec<&Block> = document
            .blocks()
            .filter(|b| b.labels()[0] != "google_container_cluster" || b.ident() == "data")
            .collect();
        assert_eq!(untouched.len(), 2);
        assert!(untouched.iter().all(|b| b.body().has_attribute("enable_autopilot")));
    }

    #[test]
    fn test_unconditional_rule() {
        let mut document = parse(SOURCE).unwrap();
        let rule = Rule::new("always", "google_container_cluster")
            .then(Action::RemoveAttribute(path("enable_autopilot")));
        assert_eq!(apply_rules(&mut document, &[rule.clone()]).unwrap().modifications, 2);
        assert_eq!(apply_rules(&mut document, &[rule]).unwrap().modifications, 0);
    }

    #[test]
    fn test_missing_resource_type_aborts_before_changes() {
        let source = "resource \"google_container_cluster\" \"a\" {\n  enable_autopilot = true\n}\nresource {\n}\n";
        let mut document = parse(source).unwrap();
        let err = apply_rules(&mut document, &[remove_autopilot()]).unwrap_err();
        assert_eq!(err, DocumentError::MissingResourceType { index: 1 });
        assert_eq!(document.to_string(), source);
    }

    #[test]
    fn test_rule_order_matters() {
        let source = "resource \"google_container_cluster\" \"a\" {\n  enable_autopilot = false\n  node_pool {\n  }\n}\n";
        let drop_false_marker = Rule::new("drop_false_marker", "google_container_cluster")
            .when(Condition::equals(path("enable_autopilot"), "false"))
            .then(Action::RemoveAttribute(path("enable_autopilot")));
        let conflicts = Rule::new("autopilot_conflicts", "google_container_cluster")
            .when(Condition::Exists(path("enable_autopilot")))
            .then(Action::RemoveBlock(path("node_pool")));

        let mut document = parse(source).unwrap();
        apply_rules(&mut document, &[drop_false_marker.clone(), conflicts.clone()]).unwrap();
        let cluster = document.blocks().next().unwrap();
        assert!(cluster.body().has_block("node_pool"));

        let mut document = parse(source).unwrap();
        apply_rules(&mut document, &[conflicts, drop_false_marker]).unwrap();
        let cluster = document.blocks().next().unwrap();
        assert!(!cluster.body().has_block("node_pool"));
    }

    #[test]
    fn test_report_helpers() {
        let mut document = parse(SOURCE).unwrap();
        let report = apply_rules(&mut document, &[remove_autopilot()]).unwrap();
        assert!(report.is_clean());
        assert!(report.has_changes());
        assert_eq!(report.fired_rules(), vec!["remove_autopilot"]);
        assert_eq!(report.firings[0].scope, "resource");
    }
}
