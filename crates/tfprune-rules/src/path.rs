//! Dotted attribute paths and their resolution inside a body
//!
//! Every segment but the last names a nested block type; the last names an
//! attribute (or, for block removal, a block type). A segment that matches
//! several blocks of the same type resolves to the first one in document
//! order.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tfprune_core::{is_identifier, Attribute, Body, EditError};

use crate::logging::{self, Event};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("'{segment}' in path '{path}' is not a valid name")]
    InvalidSegment { path: String, segment: String },
}

/// A non-empty sequence of segment names such as `binary_authorization.enabled`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn new(segments: Vec<String>) -> Result<Self, PathError> {
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(PathError::EmptySegment(segments.join(".")));
        }
        if let Some(segment) = segments.iter().find(|s| !is_identifier(s)) {
            return Err(PathError::InvalidSegment {
                path: segments.join("."),
                segment: segment.clone(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Block types walked before the final segment
    pub fn parents(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The final segment
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(PathError::Empty);
        }
        Path::new(s.split('.').map(|segment| segment.trim().to_string()).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// The attribute `path` points at, if every segment exists
///
/// A missing intermediate block is a soft failure: conditions read it as
/// "not there", removals as nothing to do.
pub fn find_attribute<'b>(scope: &'b Body, path: &Path) -> Option<&'b Attribute> {
    parent(scope, path)?.attribute(path.leaf())
}

/// Body holding the final segment, without creating anything
pub fn parent<'b>(scope: &'b Body, path: &Path) -> Option<&'b Body> {
    let mut body = scope;
    for segment in path.parents() {
        note_ambiguity(body, segment);
        body = body.first_block(segment)?.body();
    }
    Some(body)
}

pub fn parent_mut<'b>(scope: &'b mut Body, path: &Path) -> Option<&'b mut Body> {
    let mut body = scope;
    for segment in path.parents() {
        note_ambiguity(body, segment);
        body = body.first_block_mut(segment)?.body_mut();
    }
    Some(body)
}

/// Body holding the final segment, creating missing intermediate blocks
pub fn ensure_parent<'b>(scope: &'b mut Body, path: &Path) -> Result<&'b mut Body, EditError> {
    let mut body = scope;
    for segment in path.parents() {
        note_ambiguity(body, segment);
        let (block, created) = body.ensure_block(segment)?;
        if created {
            logging::record(Event::BlockCreated { segment });
        }
        body = block.body_mut();
    }
    Ok(body)
}

fn note_ambiguity(body: &Body, segment: &str) {
    if logging::is_enabled() {
        let matches = body.block_count(segment);
        if matches > 1 {
            logging::record(Event::AmbiguousSegment { segment, matches });
        }
    }
}
