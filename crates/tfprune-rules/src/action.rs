//! Actions a rule performs on a scope once its conditions hold

use thiserror::Error;
use tfprune_core::{coerce_into, coerce_literal, Body, CoercionError, EditError};

use crate::path::{ensure_parent, find_attribute, parent_mut, Path};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("cannot set '{path}': {source}")]
    Coercion {
        path: String,
        #[source]
        source: CoercionError,
    },

    #[error("cannot write '{path}': {source}")]
    Edit {
        path: String,
        #[source]
        source: EditError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Delete the attribute if it is present
    RemoveAttribute(Path),

    /// Delete every block of the final segment's type in the located body
    RemoveBlock(Path),

    /// Overwrite the attribute (coerced into its current kind) or create it
    /// along with any missing intermediate blocks
    Set { path: Path, value: String },

    /// Copy the value found at `from` into `to`, verbatim
    Copy { from: Path, to: Path },
}

impl Action {
    pub fn set(path: Path, value: impl Into<String>) -> Self {
        Action::Set {
            path,
            value: value.into(),
        }
    }

    /// Apply to one scope, returning whether anything changed
    pub fn apply(&self, scope: &mut Body) -> Result<bool, ActionError> {
        match self {
            Action::RemoveAttribute(path) => Ok(parent_mut(scope, path)
                .and_then(|body| body.remove_attribute(path.leaf()))
                .is_some()),
            Action::RemoveBlock(path) => Ok(parent_mut(scope, path)
                .map(|body| !body.remove_blocks(path.leaf()).is_empty())
                .unwrap_or(false)),
            Action::Set { path, value } => {
                let edit = |source| ActionError::Edit {
                    path: path.to_string(),
                    source,
                };
                let body = ensure_parent(scope, path).map_err(edit)?;
                match body.attribute_mut(path.leaf()) {
                    Some(attribute) => {
                        let coerced = coerce_into(value, attribute.value().kind()).map_err(
                            |source| ActionError::Coercion {
                                path: path.to_string(),
                                source,
                            },
                        )?;
                        attribute.set_value(coerced).map_err(edit)?;
                    }
                    None => body
                        .set_attribute(path.leaf(), coerce_literal(value))
                        .map_err(edit)?,
                }
                Ok(true)
            }
            Action::Copy { from, to } => {
                let Some(value) = find_attribute(scope, from).map(|a| a.value().clone()) else {
                    return Ok(false);
                };
                let edit = |source| ActionError::Edit {
                    path: to.to_string(),
                    source,
                };
                let body = ensure_parent(scope, to).map_err(edit)?;
                body.set_attribute(to.leaf(), value).map_err(edit)?;
                Ok(true)
            }
        }
    }
}

/// Run `actions` in order against one scope
///
/// Returns `true` when at least one action changed the scope. The first
/// error stops the remaining actions; changes already made are kept.
pub fn execute(scope: &mut Body, actions: &[Action]) -> Result<bool, ActionError> {
    let mut changed = false;
    for action in actions {
        changed |= action.apply(scope)?;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfprune_core::{parse, Value, ValueKind};

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    fn scope() -> Body {
        let source = r#"
enable_autopilot = true
node_version     = "1.27.5-gke.200"
disk_size_gb     = 100
network          = google_compute_network.vpc.id

node_config {
  machine_type = "e2-medium"
}
node_config {
  machine_type = "e2-small"
}
"#;
        parse(source).unwrap().body().clone()
    }

    #[test]
    fn test_remove_attribute() {
        let mut body = scope();
        let action = Action::RemoveAttribute(path("enable_autopilot"));
        assert_eq!(action.apply(&mut body), Ok(true));
        assert!(!body.has_attribute("enable_autopilot"));
        assert_eq!(action.apply(&mut body), Ok(false));
        assert_eq!(Action::RemoveAttribute(path("missing.block")).apply(&mut body), Ok(false));
    }

    #[test]
    fn test_remove_block_removes_all_instances() {
        let mut body = scope();
        let action = Action::RemoveBlock(path("node_config"));
        assert_eq!(action.apply(&mut body), Ok(true));
        assert_eq!(body.block_count("node_config"), 0);
        assert_eq!(action.apply(&mut body), Ok(false));
    }

    #[test]
    fn test_set_existing_coerces_into_kind() {
        let mut body = scope();
        assert_eq!(Action::set(path("disk_size_gb"), "50.5").apply(&mut body), Ok(true));
        assert_eq!(body.attribute("disk_size_gb").unwrap().value().kind(), ValueKind::Number);

        assert_eq!(Action::set(path("enable_autopilot"), "false").apply(&mut body), Ok(true));
        assert_eq!(body.attribute("enable_autopilot").unwrap().value(), &Value::Bool(false));

        // Strings stay strings even when the text looks like a number
        assert_eq!(Action::set(path("node_version"), "1").apply(&mut body), Ok(true));
        assert_eq!(body.attribute("node_version").unwrap().value(), &Value::from("1"));
    }

    #[test]
    fn test_set_counts_even_when_value_is_unchanged() {
        let mut body = scope();
        assert_eq!(Action::set(path("disk_size_gb"), "100").apply(&mut body), Ok(true));
    }

    #[test]
    fn test_set_coercion_failure() {
        let mut body = scope();
        let err = Action::set(path("disk_size_gb"), "lots").apply(&mut body).unwrap_err();
        assert!(matches!(err, ActionError::Coercion { ref path, .. } if path == "disk_size_gb"));
        assert_eq!(body.attribute("disk_size_gb").unwrap().value(), &Value::from(100i64));
    }

    #[test]
    fn test_set_creates_missing_blocks() {
        let mut body = scope();
        let action = Action::set(path("binary_authorization.evaluation_mode"), "DISABLED");
        assert_eq!(action.apply(&mut body), Ok(true));
        let block = body.first_block("binary_authorization").unwrap();
        assert_eq!(
            block.body().attribute("evaluation_mode").unwrap().value(),
            &Value::from("DISABLED")
        );

        let action = Action::set(path("binary_authorization.enabled"), "true");
        assert_eq!(action.apply(&mut body), Ok(true));
        assert_eq!(body.block_count("binary_authorization"), 1);
        let block = body.first_block("binary_authorization").unwrap();
        assert_eq!(block.body().attribute("enabled").unwrap().value(), &Value::Bool(true));
    }

    #[test]
    fn test_set_null() {
        let mut body = scope();
        assert_eq!(Action::set(path("network_policy"), "null").apply(&mut body), Ok(true));
        assert_eq!(body.attribute("network_policy").unwrap().value(), &Value::Null);

        let err = Action::set(path("enable_autopilot"), "null").apply(&mut body).unwrap_err();
        assert!(matches!(err, ActionError::Coercion { .. }));
    }

    #[test]
    fn test_copy() {
        let mut body = scope();
        let action = Action::Copy {
            from: path("node_version"),
            to: path("min_master_version"),
        };
        assert_eq!(action.apply(&mut body), Ok(true));
        assert_eq!(
            body.attribute("min_master_version").unwrap().value(),
            &Value::from("1.27.5-gke.200")
        );

        let action = Action::Copy {
            from: path("network"),
            to: path("private_cluster_config.network"),
        };
        assert_eq!(action.apply(&mut body), Ok(true));
        let copied = body.first_block("private_cluster_config").unwrap().body().attribute("network");
        assert_eq!(
            copied.unwrap().value().render(),
            "google_compute_network.vpc.id"
        );

        let action = Action::Copy {
            from: path("missing"),
            to: path("other"),
        };
        assert_eq!(action.apply(&mut body), Ok(false));
        assert!(!body.has_attribute("other"));
    }

    #[test]
    fn test_execute_reports_any_change() {
        let mut body = scope();
        let actions = vec![
            Action::RemoveAttribute(path("missing")),
            Action::RemoveAttribute(path("enable_autopilot")),
        ];
        assert_eq!(execute(&mut body, &actions), Ok(true));
        assert_eq!(execute(&mut body, &actions), Ok(false));
        assert_eq!(execute(&mut body, &[]), Ok(false));
    }

    #[test]
    fn test_execute_stops_at_first_error() {
        let mut body = scope();
        let actions = vec![
            Action::RemoveAttribute(path("enable_autopilot")),
            Action::set(path("disk_size_gb"), "lots"),
            Action::RemoveAttribute(path("node_version")),
        ];
        assert!(execute(&mut body, &actions).is_err());
        assert!(!body.has_attribute("enable_autopilot"));
        assert!(body.has_attribute("node_version"));
    }
}
