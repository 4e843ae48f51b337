//! Conditions that decide whether a rule fires on a scope
//!
//! Evaluation never fails: a path that cannot be resolved, a non-literal
//! value or literal text that cannot be coerced all make a condition false.

use regex::Regex;
use tfprune_core::{coerce_into, Body};

use crate::path::{find_attribute, Path};

#[derive(Debug, Clone)]
pub enum Condition {
    /// The attribute is present (a `null` value counts as present)
    Exists(Path),

    /// The attribute is not present
    Absent(Path),

    /// The attribute is present and set to `null`
    IsNull(Path),

    /// The attribute holds a literal equal to `value` once `value` is coerced
    /// into the attribute's kind
    Equals { path: Path, value: String },

    /// The attribute holds a scalar literal whose text matches `pattern`
    Matches { path: Path, pattern: Regex },

    /// At least one of the nested conditions holds
    Any(Vec<Condition>),

    Not(Box<Condition>),
}

impl Condition {
    pub fn equals(path: Path, value: impl Into<String>) -> Self {
        Condition::Equals {
            path,
            value: value.into(),
        }
    }

    pub fn negate(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Check this condition against one scope
    pub fn is_satisfied(&self, scope: &Body) -> bool {
        match self {
            Condition::Exists(path) => find_attribute(scope, path).is_some(),
            Condition::Absent(path) => find_attribute(scope, path).is_none(),
            Condition::IsNull(path) => {
                find_attribute(scope, path).is_some_and(|a| a.value().is_null())
            }
            Condition::Equals { path, value } => {
                let Some(attribute) = find_attribute(scope, path) else {
                    return false;
                };
                let current = attribute.value();
                if !current.is_literal() {
                    return false;
                }
                match coerce_into(value, current.kind()) {
                    Ok(expected) => *current == expected,
                    Err(_) => false,
                }
            }
            Condition::Matches { path, pattern } => find_attribute(scope, path)
                .and_then(|a| a.value().scalar_text())
                .is_some_and(|text| pattern.is_match(&text)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.is_satisfied(scope)),
            Condition::Not(condition) => !condition.is_satisfied(scope),
        }
    }

    /// Paths this condition reads, for catalog listings
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Condition::Exists(path)
            | Condition::Absent(path)
            | Condition::IsNull(path)
            | Condition::Equals { path, .. }
            | Condition::Matches { path, .. } => vec![path],
            Condition::Any(conditions) => conditions.iter().flat_map(|c| c.paths()).collect(),
            Condition::Not(condition) => condition.paths(),
        }
    }
}

/// All conditions hold; an empty list always holds
///
/// Stops at the first condition that does not hold.
pub fn evaluate(scope: &Body, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| condition.is_satisfied(scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfprune_core::parse;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    fn scope() -> Body {
        let source = r#"
enable_autopilot   = false
min_master_version = null
node_version       = "1.27.5-gke.200"
disk_size_gb       = 50.50
network            = google_compute_network.vpc.id
labels             = { env = "prod" }

binary_authorization {
  enabled = true
}
"#;
        parse(source).unwrap().body().clone()
    }

    #[test]
    fn test_exists_and_absent() {
        let body = scope();
        assert!(Condition::Exists(path("node_version")).is_satisfied(&body));
        assert!(Condition::Exists(path("min_master_version")).is_satisfied(&body));
        assert!(Condition::Exists(path("binary_authorization.enabled")).is_satisfied(&body));
        assert!(!Condition::Exists(path("release_channel.channel")).is_satisfied(&body));
        assert!(Condition::Absent(path("release_channel.channel")).is_satisfied(&body));
        assert!(!Condition::Absent(path("node_version")).is_satisfied(&body));
    }

    #[test]
    fn test_is_null() {
        let body = scope();
        assert!(Condition::IsNull(path("min_master_version")).is_satisfied(&body));
        assert!(!Condition::IsNull(path("node_version")).is_satisfied(&body));
        assert!(!Condition::IsNull(path("missing")).is_satisfied(&body));
    }

    #[test]
    fn test_equals_uses_attribute_kind() {
        let body = scope();
        assert!(Condition::equals(path("enable_autopilot"), "false").is_satisfied(&body));
        assert!(!Condition::equals(path("enable_autopilot"), "true").is_satisfied(&body));
        assert!(Condition::equals(path("disk_size_gb"), "50.5").is_satisfied(&body));
        assert!(Condition::equals(path("node_version"), "1.27.5-gke.200").is_satisfied(&body));
        assert!(Condition::equals(path("binary_authorization.enabled"), "true").is_satisfied(&body));
        assert!(Condition::equals(path("labels"), "{ env = \"prod\" }").is_satisfied(&body));
    }

    #[test]
    fn test_equals_is_false_instead_of_failing() {
        let body = scope();
        // Not a bool
        assert!(!Condition::equals(path("enable_autopilot"), "no").is_satisfied(&body));
        // Not a number
        assert!(!Condition::equals(path("disk_size_gb"), "fifty").is_satisfied(&body));
        // Expressions are never equal
        assert!(!Condition::equals(path("network"), "google_compute_network.vpc.id").is_satisfied(&body));
        assert!(!Condition::equals(path("missing.value"), "x").is_satisfied(&body));
    }

    #[test]
    fn test_matches() {
        let body = scope();
        let pattern = Regex::new(r"^1\.27\.").unwrap();
        assert!(Condition::Matches {
            path: path("node_version"),
            pattern: pattern.clone(),
        }
        .is_satisfied(&body));
        assert!(!Condition::Matches {
            path: path("network"),
            pattern: Regex::new(".*").unwrap(),
        }
        .is_satisfied(&body));
    }

    #[test]
    fn test_any_and_not() {
        let body = scope();
        let absent_or_null = Condition::Any(vec![
            Condition::Absent(path("min_master_version")),
            Condition::IsNull(path("min_master_version")),
        ]);
        assert!(absent_or_null.is_satisfied(&body));
        assert!(!Condition::negate(absent_or_null).is_satisfied(&body));
        assert!(!Condition::Any(vec![]).is_satisfied(&body));
    }

    #[test]
    fn test_evaluate_is_conjunctive() {
        let body = scope();
        assert!(evaluate(&body, &[]));
        assert!(evaluate(
            &body,
            &[
                Condition::Exists(path("node_version")),
                Condition::equals(path("enable_autopilot"), "false"),
            ]
        ));
        assert!(!evaluate(
            &body,
            &[
                Condition::Exists(path("node_version")),
                Condition::Exists(path("missing")),
            ]
        ));
    }

    #[test]
    fn test_paths() {
        let condition = Condition::Any(vec![
            Condition::Absent(path("a")),
            Condition::negate(Condition::IsNull(path("b.c"))),
        ]);
        let paths: Vec<String> = condition.paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["a", "b.c"]);
    }
}
