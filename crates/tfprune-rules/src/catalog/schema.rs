//! YAML rule schema definitions
//!
//! Defines the structure of YAML rule catalogs using serde for
//! deserialization, and the compilation of a definition into an engine
//! [`Rule`].

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::action::Action;
use crate::condition::Condition;
use crate::engine::Rule;
use crate::path::Path;

/// A complete YAML-defined cleanup rule
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    /// Unique rule identifier (e.g., "gke_node_pool_initial_node_count")
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Grouping used by listings (usually the provider)
    #[serde(default)]
    pub category: String,

    /// Resource type label the rule targets
    pub resource: String,

    /// Nested block type evaluated once per instance
    #[serde(default)]
    pub for_each: Option<String>,

    /// Conditions, all of which must hold
    #[serde(default)]
    pub when: Vec<ConditionDef>,

    /// Actions run in order when the conditions hold
    #[serde(default)]
    pub then: Vec<ActionDef>,

    #[serde(default)]
    pub tests: Vec<TestCase>,
}

/// One `when` entry: a map with a single key naming the condition
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Mapping")]
pub enum ConditionDef {
    Exists { exists: String },
    Absent { absent: String },
    IsNull { is_null: String },
    Equals { equals: PathValue },
    Matches { matches: PathPattern },
    Any { any: Vec<ConditionDef> },
    Not { not: Box<ConditionDef> },
}

/// One `then` entry: a map with a single key naming the action
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Mapping")]
pub enum ActionDef {
    RemoveAttribute { remove_attribute: String },
    RemoveBlock { remove_block: String },
    Set { set: PathValue },
    Copy { copy: CopyDef },
}

impl TryFrom<Mapping> for ConditionDef {
    type Error = String;

    fn try_from(entry: Mapping) -> Result<Self, Self::Error> {
        let (key, value) = single_entry(entry, "condition")?;
        Ok(match key.as_str() {
            "exists" => ConditionDef::Exists { exists: field(&key, value)? },
            "absent" => ConditionDef::Absent { absent: field(&key, value)? },
            "is_null" => ConditionDef::IsNull { is_null: field(&key, value)? },
            "equals" => ConditionDef::Equals { equals: field(&key, value)? },
            "matches" => ConditionDef::Matches { matches: field(&key, value)? },
            "any" => ConditionDef::Any { any: field(&key, value)? },
            "not" => ConditionDef::Not { not: field(&key, value)? },
            other => {
                return Err(format!(
                    "unknown condition `{}`, expected one of: exists, absent, is_null, equals, matches, any, not",
                    other
                ))
            }
        })
    }
}

impl TryFrom<Mapping> for ActionDef {
    type Error = String;

    fn try_from(entry: Mapping) -> Result<Self, Self::Error> {
        let (key, value) = single_entry(entry, "action")?;
        Ok(match key.as_str() {
            "remove_attribute" => ActionDef::RemoveAttribute {
                remove_attribute: field(&key, value)?,
            },
            "remove_block" => ActionDef::RemoveBlock {
                remove_block: field(&key, value)?,
            },
            "set" => ActionDef::Set { set: field(&key, value)? },
            "copy" => ActionDef::Copy { copy: field(&key, value)? },
            other => {
                return Err(format!(
                    "unknown action `{}`, expected one of: remove_attribute, remove_block, set, copy",
                    other
                ))
            }
        })
    }
}

/// The only key of a condition or action entry, with its value
fn single_entry(entry: Mapping, kind: &str) -> Result<(String, Value), String> {
    if entry.len() != 1 {
        let keys: Vec<String> = entry
            .keys()
            .map(|key| key.as_str().map(str::to_string).unwrap_or_else(|| format!("{:?}", key)))
            .collect();
        return Err(format!(
            "each {} must have exactly one key, found {}: {}",
            kind,
            keys.len(),
            keys.join(", ")
        ));
    }

    let mut entries = entry.into_iter();
    match entries.next() {
        Some((Value::String(key), value)) => Ok((key, value)),
        Some((key, _)) => Err(format!("{} name must be a string, found {:?}", kind, key)),
        None => Err(format!("empty {}", kind)),
    }
}

fn field<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, String> {
    serde_yaml::from_value(value).map_err(|e| format!("{}: {}", key, e))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathValue {
    pub path: String,
    pub value: Scalar,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathPattern {
    pub path: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyDef {
    pub from: String,
    pub to: String,
}

/// A scalar YAML value, turned into literal text for the engine
///
/// Quote versions and other dotted values: `1.10` unquoted is the float 1.1.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn to_literal_text(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }
}

/// Test case for rule validation
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    /// Input configuration
    pub input: String,

    /// Expected output; `None` means the rule must not change the input
    #[serde(default)]
    pub output: Option<String>,

    /// Skip this test case
    #[serde(default)]
    pub skip: bool,
}

impl RuleDef {
    /// Validate the rule structure
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Rule name is required".to_string());
        }
        if self.resource.trim().is_empty() {
            return Err(format!("Rule '{}' has no resource type", self.name));
        }
        if self.for_each.as_deref().is_some_and(|b| b.trim().is_empty()) {
            return Err(format!("Rule '{}' has an empty for_each", self.name));
        }
        if self.then.is_empty() {
            return Err(format!("Rule '{}' has no actions", self.name));
        }
        Ok(())
    }

    /// Compile into an engine rule, checking paths and patterns
    pub fn to_rule(&self) -> Result<Rule, String> {
        self.validate()?;

        let mut rule = Rule::new(&self.name, &self.resource).describe(&self.description);
        if let Some(block_type) = &self.for_each {
            rule = rule.for_each(block_type);
        }
        for condition in &self.when {
            rule = rule.when(condition.to_condition().map_err(|e| self.context(e))?);
        }
        for action in &self.then {
            rule = rule.then(action.to_action().map_err(|e| self.context(e))?);
        }
        Ok(rule)
    }

    fn context(&self, message: String) -> String {
        format!("Rule '{}': {}", self.name, message)
    }
}

impl ConditionDef {
    pub fn to_condition(&self) -> Result<Condition, String> {
        Ok(match self {
            ConditionDef::Exists { exists } => Condition::Exists(parse_path(exists)?),
            ConditionDef::Absent { absent } => Condition::Absent(parse_path(absent)?),
            ConditionDef::IsNull { is_null } => Condition::IsNull(parse_path(is_null)?),
            ConditionDef::Equals { equals } => {
                Condition::equals(parse_path(&equals.path)?, equals.value.to_literal_text())
            }
            ConditionDef::Matches { matches } => Condition::Matches {
                path: parse_path(&matches.path)?,
                pattern: Regex::new(&matches.pattern)
                    .map_err(|e| format!("invalid pattern '{}': {}", matches.pattern, e))?,
            },
            ConditionDef::Any { any } => Condition::Any(
                any.iter()
                    .map(ConditionDef::to_condition)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            ConditionDef::Not { not } => Condition::negate(not.to_condition()?),
        })
    }
}

impl ActionDef {
    pub fn to_action(&self) -> Result<Action, String> {
        Ok(match self {
            ActionDef::RemoveAttribute { remove_attribute } => {
                Action::RemoveAttribute(parse_path(remove_attribute)?)
            }
            ActionDef::RemoveBlock { remove_block } => Action::RemoveBlock(parse_path(remove_block)?),
            ActionDef::Set { set } => Action::set(parse_path(&set.path)?, set.value.to_literal_text()),
            ActionDef::Copy { copy } => Action::Copy {
                from: parse_path(&copy.from)?,
                to: parse_path(&copy.to)?,
            },
        })
    }
}

fn parse_path(text: &str) -> Result<Path, String> {
    text.parse::<Path>()
        .map_err(|e| format!("invalid path '{}': {}", text, e))
}
