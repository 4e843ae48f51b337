//! tfprune CLI - removes provider-computed noise from exported Terraform
//!
//! Rules come from the built-in Google catalog plus any YAML catalogs given
//! with `--rules` or listed in `.tfprune.toml`. Use `--list-rules` to see them.

mod config;
mod output;
mod process;

use anyhow::Result;
use clap::Parser;
use colored::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use config::Config;
use output::{FiringInfo, OutputFormat, Reporter};
use process::{process_file, write_file};
use tfprune_rules::{logging, Rule, RuleRegistry, TestOutcome};

#[derive(Parser)]
#[command(name = "tfprune")]
#[command(version)]
#[command(about = "Clean up exported Terraform configuration with declarative rules")]
#[command(author = "tfprune contributors")]
struct Cli {
    /// Files or directories to process
    #[arg(required_unless_present_any = ["list_rules", "verify_rules"])]
    paths: Vec<PathBuf>,

    /// Check for changes without writing them (default mode)
    #[arg(long, conflicts_with = "fix")]
    check: bool,

    /// Write changes back to the files
    #[arg(long, conflicts_with = "check")]
    fix: bool,

    /// Show changes without applying them (alias for --check)
    #[arg(long, short = 'n', hide = true, conflicts_with = "fix")]
    dry_run: bool,

    /// Show verbose output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Rules to run (can be specified multiple times). Overrides config file.
    #[arg(long, short = 'r', value_name = "RULE")]
    rule: Vec<String>,

    /// Extra rule catalog file or directory (can be specified multiple times)
    #[arg(long = "rules", value_name = "PATH")]
    rules: Vec<PathBuf>,

    /// Do not load the built-in catalog
    #[arg(long)]
    no_builtin: bool,

    /// Output format: text, json, diff
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(long, conflicts_with = "format")]
    json: bool,

    /// Path to config file (default: auto-detect .tfprune.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    no_config: bool,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Run the inline tests of every loaded rule and exit
    #[arg(long)]
    verify_rules: bool,

    /// Write a debug log of rule firings to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Check is the default; `--check` and `--dry-run` only make it explicit
    fn check_mode(&self) -> bool {
        self.check || self.dry_run || !self.fix
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log_file {
        match logging::init(log_path) {
            Ok(()) => {
                if cli.verbose {
                    println!("{}: Journal writing to {}", "Debug".bold(), log_path.display());
                }
            }
            Err(e) => {
                eprintln!("{}: Failed to open journal: {}", "Warning".yellow(), e);
            }
        }
    }

    let config = if cli.no_config {
        Config::default()
    } else if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::discover(&std::env::current_dir()?)?
    };

    // Determine output format: CLI, then config, then text
    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        match cli.format.as_deref().or(config.output_format()) {
            Some(format) => OutputFormat::from_str(format).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid output format '{}'. Valid options: text, json, diff",
                    format
                )
            })?,
            None => OutputFormat::Text,
        }
    };

    if cli.verbose && output_format == OutputFormat::Text {
        if let Some(source) = config.source() {
            println!("{}: {}", "Using config".bold(), source.display());
        }
    }

    let registry = build_registry(&cli, &config)?;

    // Handle --list-rules
    if cli.list_rules {
        println!("{}", "Available rules:".bold());
        for info in registry.list_rules() {
            let scope = match &info.for_each {
                Some(block) => format!("{} / {}", info.resource, block),
                None => info.resource.clone(),
            };
            println!("  {} [{}] - {}", info.name.green(), scope.dimmed(), info.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Handle --verify-rules
    if cli.verify_rules {
        return Ok(verify_rules(&registry));
    }

    let all_rules = registry.all_names();

    // Validate rule names from CLI
    for rule in &cli.rule {
        if !all_rules.contains(&rule.as_str()) {
            eprintln!(
                "{}: Unknown rule '{}'. Use --list-rules to see available rules.",
                "Error".red(),
                rule
            );
            return Ok(ExitCode::from(1));
        }
    }

    let selection = config.select_rules(&all_rules, &cli.rule);
    for name in &selection.unknown {
        eprintln!(
            "{}: Configured rule '{}' is not defined by any loaded catalog",
            "Warning".yellow(),
            name
        );
    }
    let enabled_rules = registry.enabled_rules(&selection.names);

    if enabled_rules.is_empty() {
        eprintln!("{}: No rules enabled", "Error".red());
        return Ok(ExitCode::from(1));
    }

    let check_mode = cli.check_mode();
    let fix_mode = !check_mode;

    if cli.verbose && output_format == OutputFormat::Text {
        println!("{}: {}", "Mode".bold(), if fix_mode { "fix" } else { "check" });
        println!(
            "{}: {}",
            "Rules".bold(),
            enabled_rules
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!();
    }

    // Collect all file paths first
    let mut file_paths: Vec<PathBuf> = Vec::new();
    let mut missing_paths: Vec<PathBuf> = Vec::new();

    for path in &cli.paths {
        if path.is_file() {
            file_paths.push(path.clone());
        } else if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "tf"))
            {
                let file_path = entry.path();
                if !config.is_excluded(file_path) {
                    file_paths.push(file_path.to_path_buf());
                }
            }
        } else {
            missing_paths.push(path.clone());
        }
    }

    // Process files in parallel
    let results: Vec<FileOutcome> = file_paths
        .par_iter()
        .map(|path| process_file_to_outcome(path, &enabled_rules))
        .collect();

    // Sort results by path for deterministic output
    let mut sorted_results: Vec<_> = results.into_iter().zip(file_paths.iter()).collect();
    sorted_results.sort_by(|a, b| a.1.cmp(b.1));

    let mut reporter = Reporter::new(output_format, cli.verbose);

    for path in &missing_paths {
        if output_format == OutputFormat::Text {
            eprintln!("{}: Path does not exist: {}", "Warning".yellow(), path.display());
        }
    }

    for (outcome, path) in sorted_results {
        report_outcome(path, outcome, fix_mode, &mut reporter)?;
    }

    let summary = reporter.summary();
    let exit_code = if summary.errors > 0 {
        ExitCode::from(1)
    } else if check_mode && summary.files_with_changes > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    };

    reporter.finish(check_mode)?;

    Ok(exit_code)
}

/// Built-in catalog (unless disabled) followed by config and CLI catalogs
fn build_registry(cli: &Cli, config: &Config) -> Result<RuleRegistry> {
    let mut registry = if cli.no_builtin || !config.builtin() {
        RuleRegistry::empty()
    } else {
        RuleRegistry::new()?
    };

    let catalogs = config.catalogs().into_iter().chain(cli.rules.iter().cloned());

    for path in catalogs {
        let count = registry
            .load_path(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load rules from {}: {}", path.display(), e))?;
        if cli.verbose {
            println!("{}: {} rule(s) from {}", "Loaded".bold(), count, path.display());
        }
    }

    Ok(registry)
}

fn verify_rules(registry: &RuleRegistry) -> ExitCode {
    let results = registry.verify();
    let mut failed = 0;
    let mut skipped = 0;

    for result in &results {
        match &result.outcome {
            TestOutcome::Passed => {}
            TestOutcome::Skipped => skipped += 1,
            TestOutcome::Failed { expected, actual, error } => {
                failed += 1;
                println!("{} {} test #{}: {}", "FAIL".red(), result.rule, result.index, error);
                if let Some(expected) = expected {
                    println!("  {}\n{}", "expected:".bold(), expected);
                }
                if let Some(actual) = actual {
                    println!("  {}\n{}", "actual:".bold(), actual);
                }
            }
        }
    }

    let passed = results.len() - failed - skipped;
    println!(
        "{} passed, {} failed, {} skipped ({} rules)",
        passed.to_string().green(),
        failed.to_string().red(),
        skipped,
        registry.len()
    );

    if failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Result of processing a single file (for parallel processing)
enum FileOutcome {
    /// No rule changed the file
    NoChanges { rule_errors: Vec<String> },
    /// File has changes to report/apply
    HasChanges {
        firings: Vec<FiringInfo>,
        rule_errors: Vec<String>,
        old_source: String,
        new_source: String,
    },
    /// Read, parse or document error
    Error(String),
}

/// Process a file and return an outcome (no writes, suitable for parallel execution)
fn process_file_to_outcome(path: &Path, rules: &[Rule]) -> FileOutcome {
    match process_file(path, rules) {
        Ok(result) => match result.new_source {
            Some(new_source) => FileOutcome::HasChanges {
                firings: result.firings,
                rule_errors: result.rule_errors,
                old_source: result.old_source,
                new_source,
            },
            None => FileOutcome::NoChanges {
                rule_errors: result.rule_errors,
            },
        },
        Err(e) => FileOutcome::Error(format!("{:#}", e)),
    }
}

/// Report a file outcome and optionally apply fixes
fn report_outcome(
    path: &Path,
    outcome: FileOutcome,
    fix_mode: bool,
    reporter: &mut Reporter,
) -> Result<()> {
    match outcome {
        FileOutcome::NoChanges { rule_errors } => {
            reporter.report_skipped(path, rule_errors);
        }
        FileOutcome::HasChanges {
            firings,
            rule_errors,
            old_source,
            new_source,
        } => {
            if fix_mode {
                write_file(path, &new_source)?;
                reporter.report_fix(path, firings, rule_errors);
            } else {
                reporter.report_check(path, firings, rule_errors, &old_source, &new_source);
            }
        }
        FileOutcome::Error(msg) => {
            reporter.report_error(path, &msg);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_is_the_default_mode() {
        let cli = Cli::try_parse_from(["tfprune", "main.tf"]).unwrap();
        assert!(cli.check_mode());

        let cli = Cli::try_parse_from(["tfprune", "-n", "main.tf"]).unwrap();
        assert!(cli.dry_run);
        assert!(cli.check_mode());

        let cli = Cli::try_parse_from(["tfprune", "--check", "main.tf"]).unwrap();
        assert!(cli.check_mode());

        let cli = Cli::try_parse_from(["tfprune", "--fix", "main.tf"]).unwrap();
        assert!(!cli.check_mode());
    }

    #[test]
    fn test_fix_conflicts_with_check_modes() {
        assert!(Cli::try_parse_from(["tfprune", "--fix", "--check", "main.tf"]).is_err());
        assert!(Cli::try_parse_from(["tfprune", "--fix", "--dry-run", "main.tf"]).is_err());
    }

    #[test]
    fn test_paths_not_needed_for_listing() {
        assert!(Cli::try_parse_from(["tfprune", "--list-rules"]).is_ok());
        assert!(Cli::try_parse_from(["tfprune", "--verify-rules"]).is_ok());
        assert!(Cli::try_parse_from(["tfprune"]).is_err());
    }
}
