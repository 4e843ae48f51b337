//! `.tfprune.toml` support
//!
//! The file is looked up from the working directory upward. Catalog paths in
//! it are relative to the directory holding the file, and exclude patterns
//! are compiled once when it is loaded.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

pub const CONFIG_FILE: &str = ".tfprune.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Settings {
    rules: RuleSettings,
    paths: PathSettings,
    output: OutputSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RuleSettings {
    /// When set, only these rules run
    enabled: Option<Vec<String>>,
    disabled: Vec<String>,
    /// Extra catalog files or directories
    catalogs: Vec<PathBuf>,
    builtin: bool,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            enabled: None,
            disabled: Vec::new(),
            catalogs: Vec::new(),
            builtin: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PathSettings {
    exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OutputSettings {
    format: Option<String>,
}

/// A compiled `[paths] exclude` entry
#[derive(Debug)]
enum Exclude {
    /// `name/`: any directory called `name`
    Dir(String),
    /// Matched against the whole path and against the file name
    Glob(glob::Pattern),
}

impl Exclude {
    fn compile(pattern: &str) -> Result<Self> {
        match pattern.strip_suffix('/') {
            Some(dir) if !dir.contains('/') && !dir.is_empty() => Ok(Exclude::Dir(dir.to_string())),
            _ => glob::Pattern::new(pattern)
                .map(Exclude::Glob)
                .with_context(|| format!("Invalid exclude pattern '{}'", pattern)),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        match self {
            Exclude::Dir(name) => path
                .parent()
                .into_iter()
                .flat_map(Path::components)
                .any(|c| matches!(c, Component::Normal(part) if part == name.as_str())),
            Exclude::Glob(pattern) => {
                pattern.matches_path(path)
                    || path.file_name().is_some_and(|name| pattern.matches(&name.to_string_lossy()))
            }
        }
    }
}

/// Rules picked for a run, plus configured names no catalog defines
#[derive(Debug, Default)]
pub struct RuleSelection {
    pub names: HashSet<String>,
    pub unknown: Vec<String>,
}

/// Effective configuration of one run
#[derive(Debug)]
pub struct Config {
    settings: Settings,
    /// File the settings came from
    source: Option<PathBuf>,
    /// Directory relative catalog paths are resolved against
    base_dir: PathBuf,
    excludes: Vec<Exclude>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            source: None,
            base_dir: PathBuf::from("."),
            excludes: Vec::new(),
        }
    }
}

impl Config {
    /// Nearest `.tfprune.toml` at or above `start`, or the defaults
    pub fn discover(start: &Path) -> Result<Self> {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings: Settings =
            toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
        let excludes = settings
            .paths
            .exclude
            .iter()
            .map(|pattern| Exclude::compile(pattern))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("In {}", path.display()))?;

        let base_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            settings,
            source: Some(path.to_path_buf()),
            base_dir,
            excludes,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Whether the built-in catalog is loaded
    pub fn builtin(&self) -> bool {
        self.settings.rules.builtin
    }

    /// Configured catalogs, relative entries resolved against the config directory
    pub fn catalogs(&self) -> Vec<PathBuf> {
        self.settings
            .rules
            .catalogs
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { self.base_dir.join(p) })
            .collect()
    }

    pub fn output_format(&self) -> Option<&str> {
        self.settings.output.format.as_deref()
    }

    /// Pick the rules to run from the `available` names
    ///
    /// `--rule` names replace the configured selection entirely. Otherwise
    /// `enabled` (or every available rule) minus `disabled` is used, and
    /// configured names that no loaded catalog defines are reported back.
    pub fn select_rules(&self, available: &[&str], cli_rules: &[String]) -> RuleSelection {
        if !cli_rules.is_empty() {
            return RuleSelection {
                names: cli_rules.iter().cloned().collect(),
                unknown: Vec::new(),
            };
        }

        let rules = &self.settings.rules;
        let mut unknown: Vec<String> = rules
            .enabled
            .iter()
            .flatten()
            .chain(&rules.disabled)
            .filter(|name| !available.contains(&name.as_str()))
            .cloned()
            .collect();
        unknown.dedup();

        let names = available
            .iter()
            .copied()
            .filter(|&name| match &rules.enabled {
                Some(enabled) => enabled.iter().any(|e| e.as_str() == name),
                None => true,
            })
            .filter(|&name| !rules.disabled.iter().any(|d| d.as_str() == name))
            .map(str::to_string)
            .collect();

        RuleSelection { names, unknown }
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excludes.iter().any(|exclude| exclude.matches(path))
    }
}
