//! tfprune-rules: Declarative cleanup rules for Terraform configuration
//!
//! Rules are data. Each one names a resource type, a list of conditions and
//! a list of actions; the engine applies an ordered list of them to a parsed
//! [`Document`](tfprune_core::Document).
//!
//! Modules:
//! - path: Dotted paths into nested blocks
//! - condition: Exists / Absent / IsNull / Equals / Matches / Any / Not
//! - action: RemoveAttribute / RemoveBlock / Set / Copy
//! - engine: `apply_rules` and its report
//! - catalog: YAML rule files with inline tests
//! - registry: Built-in and user catalogs, selection by name

pub mod action;
pub mod catalog;
pub mod condition;
pub mod engine;
pub mod logging;
pub mod path;
pub mod registry;

pub use action::{execute, Action, ActionError};
pub use catalog::{CatalogRule, LoadError, RuleInfo, TestOutcome, TestResult};
pub use condition::{evaluate, Condition};
pub use engine::{apply_rules, ApplyReport, DocumentError, Firing, Rule, RuleError};
pub use path::{Path, PathError};
pub use registry::RuleRegistry;
