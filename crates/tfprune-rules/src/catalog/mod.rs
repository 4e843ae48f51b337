//! YAML rule catalogs
//!
//! Rules are data: a catalog file holds one rule or a list of rules, each
//! naming the resource type it targets, its conditions, its actions and
//! inline test cases.
//!
//! # Example YAML Rule
//!
//! ```yaml
//! name: gke_cluster_endpoint
//! description: Drop the computed endpoint of a cluster
//! category: google
//! resource: google_container_cluster
//!
//! when:
//!   - exists: endpoint
//!
//! then:
//!   - remove_attribute: endpoint
//!
//! tests:
//!   - input: |
//!       resource "google_container_cluster" "c" {
//!         endpoint = "10.0.0.1"
//!       }
//!     output: |
//!       resource "google_container_cluster" "c" {
//!       }
//! ```

pub mod loader;
pub mod schema;
pub mod verify;

pub use loader::{load_rules_from_dir, load_rules_from_file, load_rules_from_string, LoadError, RuleInfo};
pub use schema::{ActionDef, ConditionDef, RuleDef, Scalar, TestCase};
pub use verify::{verify_rule, verify_rules, TestOutcome, TestResult};

use crate::engine::Rule;

/// A rule loaded from a catalog, with its metadata and test cases
#[derive(Debug, Clone)]
pub struct CatalogRule {
    pub rule: Rule,
    pub category: String,
    pub tests: Vec<TestCase>,
}

impl CatalogRule {
    pub fn name(&self) -> &str {
        &self.rule.name
    }
}
