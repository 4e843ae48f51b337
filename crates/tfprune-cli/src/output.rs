//! Output formatting for tfprune
//!
//! Supports text (colored terminal), JSON and unified diff output formats.

use anyhow::Result;
use colored::*;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::Path;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Diff,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "diff" => Some(OutputFormat::Diff),
            _ => None,
        }
    }
}

/// One rule firing that changed a file
#[derive(Debug, Clone, Serialize)]
pub struct FiringInfo {
    pub rule: String,
    /// Resource address, e.g. `google_container_cluster.primary`
    pub resource: String,
    /// `resource` or an iterated block instance such as `node_pool[0]`
    pub scope: String,
}

/// Result of processing a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FiringInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rule_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    pub fn success(path: &Path, changes: Vec<FiringInfo>, rule_errors: Vec<String>) -> Self {
        Self {
            path: path.display().to_string(),
            changes,
            rule_errors,
            error: None,
        }
    }

    pub fn error(path: &Path, error: String) -> Self {
        Self {
            path: path.display().to_string(),
            changes: Vec::new(),
            rule_errors: Vec::new(),
            error: Some(error),
        }
    }

    #[cfg(test)]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    #[cfg(test)]
    pub fn has_error(&self) -> bool {
        self.error.is_some() || !self.rule_errors.is_empty()
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub files_processed: usize,
    pub files_with_changes: usize,
    pub total_modifications: usize,
    pub errors: usize,
}

/// Full JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub summary: Summary,
    pub files: Vec<FileResult>,
}

/// Reporter for accumulating and outputting results
pub struct Reporter {
    format: OutputFormat,
    verbose: bool,
    results: Vec<FileResult>,
    summary: Summary,
}

impl Reporter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            results: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Report a file with changes (in check mode - showing what would change)
    pub fn report_check(
        &mut self,
        path: &Path,
        changes: Vec<FiringInfo>,
        rule_errors: Vec<String>,
        old_source: &str,
        new_source: &str,
    ) {
        self.count_changes(&changes);

        match self.format {
            OutputFormat::Text => {
                println!("{}", path.display().to_string().bold());
                print_diff(old_source, new_source);
                println!();
                for change in &changes {
                    println!(
                        "  {} {} ({} {})",
                        "->".green(),
                        change.rule,
                        change.resource,
                        change.scope.dimmed()
                    );
                }
                println!();
            }
            OutputFormat::Diff => {
                print_unified_diff(path, old_source, new_source);
            }
            OutputFormat::Json => {
                // JSON output is handled in finish()
            }
        }

        self.report_rule_errors(path, &rule_errors);
        self.results.push(FileResult::success(path, changes, rule_errors));
    }

    /// Report a file after applying fixes
    pub fn report_fix(&mut self, path: &Path, changes: Vec<FiringInfo>, rule_errors: Vec<String>) {
        self.count_changes(&changes);

        if self.format == OutputFormat::Text {
            println!("{}", path.display().to_string().bold());
            println!("  {} Applied {} change(s)", "OK".green(), changes.len());
            println!();
        }

        self.report_rule_errors(path, &rule_errors);
        self.results.push(FileResult::success(path, changes, rule_errors));
    }

    /// Report a file that needed no changes
    pub fn report_skipped(&mut self, path: &Path, rule_errors: Vec<String>) {
        self.summary.files_processed += 1;
        if self.verbose && self.format == OutputFormat::Text {
            println!("{}: No changes needed", path.display());
        }
        self.report_rule_errors(path, &rule_errors);
        self.results.push(FileResult::success(path, vec![], rule_errors));
    }

    /// Report an error processing a file
    pub fn report_error(&mut self, path: &Path, error: &str) {
        self.summary.files_processed += 1;
        self.summary.errors += 1;

        if self.format == OutputFormat::Text {
            eprintln!("{}: {} - {}", "Warning".yellow(), path.display(), error);
        }

        self.results.push(FileResult::error(path, error.to_string()));
    }

    /// Print final summary/output
    pub fn finish(self, check_mode: bool) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                println!();
                println!("{}", "Summary".bold().underline());
                println!("  Files processed: {}", self.summary.files_processed);
                println!("  Files with changes: {}", self.summary.files_with_changes);
                println!("  Total modifications: {}", self.summary.total_modifications);
                if self.summary.errors > 0 {
                    println!("  Errors: {}", self.summary.errors);
                }

                if check_mode && self.summary.total_modifications > 0 {
                    println!();
                    println!("{}", "Run with --fix to apply changes".yellow());
                }
            }
            OutputFormat::Json => {
                let output = JsonOutput {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    summary: self.summary,
                    files: self.results,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Diff => {
                // Patch-compatible output has no summary
            }
        }
        Ok(())
    }

    /// Get summary for exit code determination
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    fn count_changes(&mut self, changes: &[FiringInfo]) {
        self.summary.files_processed += 1;
        self.summary.files_with_changes += 1;
        self.summary.total_modifications += changes.len();
    }

    fn report_rule_errors(&mut self, path: &Path, rule_errors: &[String]) {
        self.summary.errors += rule_errors.len();
        if self.format == OutputFormat::Text {
            for error in rule_errors {
                eprintln!("{}: {} - {}", "Rule error".red(), path.display(), error);
            }
        }
    }
}

/// Print the changed lines between old and new content
fn print_diff(old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let line = change.to_string_lossy();
        let line = line.trim_end_matches('\n');
        match change.tag() {
            ChangeTag::Delete => println!("  {}", format!("- {}", line).red()),
            ChangeTag::Insert => println!("  {}", format!("+ {}", line).green()),
            ChangeTag::Equal => {}
        }
    }
}

/// Print unified diff format (standard diff -u compatible)
fn print_unified_diff(path: &Path, old: &str, new: &str) {
    print!("{}", unified_diff(path, old, new));
}

fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let path_str = path.display().to_string();

    let mut out = String::new();
    out.push_str(&format!("--- a/{}\n", path_str));
    out.push_str(&format!("+++ b/{}\n", path_str));

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            out.push_str(&format!("{}{}", sign, change));
            if change.missing_newline() {
                out.push('\n');
            }
        }
    }
    out
}
