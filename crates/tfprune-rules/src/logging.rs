//! Run journal
//!
//! An optional file recording what happened while catalogs were loaded and
//! rules were applied. Callers describe what happened as an [`Event`]; nothing
//! is written until [`init`] has opened the journal.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

static JOURNAL: Mutex<Option<Journal>> = Mutex::new(None);

/// Something worth recording about a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    CatalogLoaded { path: &'a Path, rules: usize },
    CatalogSkipped { path: &'a Path, reason: &'a str },
    ApplyStarted { rules: usize, resources: usize },
    Fired { rule: &'a str, address: &'a str, scope: &'a str },
    RuleFailed { rule: &'a str, address: &'a str, error: &'a str },
    /// A path segment matched several blocks; the first one was used
    AmbiguousSegment { segment: &'a str, matches: usize },
    BlockCreated { segment: &'a str },
    ApplyFinished { modifications: usize, errors: usize },
}

impl Event<'_> {
    fn tag(&self) -> &'static str {
        match self {
            Event::CatalogLoaded { .. } | Event::CatalogSkipped { .. } => "catalog",
            Event::ApplyStarted { .. } | Event::ApplyFinished { .. } => "apply",
            Event::Fired { .. } | Event::RuleFailed { .. } => "rule",
            Event::AmbiguousSegment { .. } | Event::BlockCreated { .. } => "path",
        }
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::CatalogLoaded { path, rules } => {
                write!(f, "loaded {} rule(s) from {}", rules, path.display())
            }
            Event::CatalogSkipped { path, reason } => {
                write!(f, "skipped {}: {}", path.display(), reason)
            }
            Event::ApplyStarted { rules, resources } => {
                write!(f, "{} rule(s) against {} resource block(s)", rules, resources)
            }
            Event::Fired { rule, address, scope } => write!(f, "{} fired on {} ({})", rule, address, scope),
            Event::RuleFailed { rule, address, error } => {
                write!(f, "{} failed on {}: {}", rule, address, error)
            }
            Event::AmbiguousSegment { segment, matches } => {
                write!(f, "'{}' matches {} blocks, using the first", segment, matches)
            }
            Event::BlockCreated { segment } => write!(f, "created block '{}'", segment),
            Event::ApplyFinished { modifications, errors } => {
                write!(f, "done: {} modification(s), {} error(s)", modifications, errors)
            }
        }
    }
}

/// Destination of journal lines
struct Journal {
    out: Box<dyn Write + Send>,
}

impl Journal {
    fn write(&mut self, event: &Event<'_>) -> io::Result<()> {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        writeln!(self.out, "{} {:<7} {}", timestamp, event.tag(), event)?;
        self.out.flush()
    }
}

/// Open (truncating) the journal file; later events are appended to it
pub fn init(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    if let Ok(mut guard) = JOURNAL.lock() {
        *guard = Some(Journal {
            out: Box::new(BufWriter::new(file)),
        });
    }
    Ok(())
}

/// Record an event if the journal is open
///
/// Write failures are ignored; the journal never fails a run.
pub fn record(event: Event<'_>) {
    if let Ok(mut guard) = JOURNAL.lock() {
        if let Some(journal) = guard.as_mut() {
            let _ = journal.write(&event);
        }
    }
}

pub fn is_enabled() -> bool {
    JOURNAL.lock().map(|guard| guard.is_some()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_text() {
        let event = Event::Fired {
            rule: "gke_cluster_computed_fields",
            address: "google_container_cluster.primary",
            scope: "node_pool[1]",
        };
        assert_eq!(
            event.to_string(),
            "gke_cluster_computed_fields fired on google_container_cluster.primary (node_pool[1])"
        );
        assert_eq!(event.tag(), "rule");

        let event = Event::CatalogSkipped {
            path: Path::new("rules/bad.yaml"),
            reason: "Rule 'x': empty path",
        };
        assert_eq!(event.to_string(), "skipped rules/bad.yaml: Rule 'x': empty path");
    }

    #[test]
    fn test_journal_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let file = File::create(&path).unwrap();
        let mut journal = Journal {
            out: Box::new(file),
        };

        journal
            .write(&Event::ApplyStarted {
                rules: 3,
                resources: 2,
            })
            .unwrap();
        journal
            .write(&Event::AmbiguousSegment {
                segment: "node_pool",
                matches: 2,
            })
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("apply   3 rule(s) against 2 resource block(s)"));
        assert!(lines[1].contains(" path    'node_pool' matches 2 blocks"));
    }
}
