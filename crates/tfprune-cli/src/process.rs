//! File processing logic for tfprune

use anyhow::{Context, Result};
use std::path::Path;

use tfprune_core::parse;
use tfprune_rules::{apply_rules, Rule};

use crate::output::FiringInfo;

/// Result of processing a single file
#[derive(Debug)]
pub struct ProcessResult {
    /// Rule firings that changed the file
    pub firings: Vec<FiringInfo>,
    /// Action errors collected while applying the rules
    pub rule_errors: Vec<String>,
    /// Original source text
    pub old_source: String,
    /// New source text (only if a rule changed something)
    pub new_source: Option<String>,
}

/// Process a single Terraform file with the given rules
pub fn process_file(path: &Path, rules: &[Rule]) -> Result<ProcessResult> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    process_source(&source, rules).with_context(|| format!("Failed to process {}", path.display()))
}

/// Apply rules to configuration text
pub fn process_source(source: &str, rules: &[Rule]) -> Result<ProcessResult> {
    let mut document = parse(source).context("Parse error")?;
    let report = apply_rules(&mut document, rules)?;

    let firings = report
        .firings
        .iter()
        .map(|firing| FiringInfo {
            rule: firing.rule.clone(),
            resource: firing.address.clone(),
            scope: firing.scope.clone(),
        })
        .collect();
    let rule_errors = report.errors.iter().map(|e| e.to_string()).collect();

    let new_source = if report.has_changes() {
        Some(document.to_string())
    } else {
        None
    };

    Ok(ProcessResult {
        firings,
        rule_errors,
        old_source: source.to_string(),
        new_source,
    })
}

/// Write the processed result to the file
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfprune_rules::{Action, Condition};

    fn endpoint_rule() -> Rule {
        Rule::new("endpoint", "google_container_cluster")
            .when(Condition::Exists("endpoint".parse().unwrap()))
            .then(Action::RemoveAttribute("endpoint".parse().unwrap()))
    }

    #[test]
    fn test_process_source_with_changes() {
        let source = "resource \"google_container_cluster\" \"c\" {\n  name     = \"c\"\n  endpoint = \"10.0.0.1\"\n}\n";
        let result = process_source(source, &[endpoint_rule()]).unwrap();

        assert!(result.new_source.is_some());
        assert_eq!(result.firings.len(), 1);
        assert_eq!(result.firings[0].resource, "google_container_cluster.c");
        assert_eq!(
            result.new_source.as_deref(),
            Some("resource \"google_container_cluster\" \"c\" {\n  name     = \"c\"\n}\n")
        );
    }

    #[test]
    fn test_process_source_without_changes() {
        let source = "resource \"google_compute_instance\" \"vm\" {\n  endpoint = \"x\"\n}\n";
        let result = process_source(source, &[endpoint_rule()]).unwrap();
        assert!(result.new_source.is_none());
        assert!(result.firings.is_empty());
        assert_eq!(result.old_source, source);
    }

    #[test]
    fn test_process_source_parse_error() {
        let err = process_source("resource \"a\" \"b\" {\n", &[endpoint_rule()]).unwrap_err();
        assert!(format!("{:#}", err).starts_with("Parse error"));
    }

    #[test]
    fn test_process_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.tf");
        std::fs::write(
            &path,
            "resource \"google_container_cluster\" \"c\" {\n  name     = \"c\"\n  endpoint = \"1\"\n}\n",
        )
        .unwrap();

        let result = process_file(&path, &[endpoint_rule()]).unwrap();
        write_file(&path, result.new_source.as_deref().unwrap()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "resource \"google_container_cluster\" \"c\" {\n  name     = \"c\"\n}\n");
    }
}
