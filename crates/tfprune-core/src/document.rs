//! Block-structured configuration tree
//!
//! A [`Document`] owns a root [`Body`]; every body holds uniquely named
//! [`Attribute`]s and an ordered list of nested [`Block`]s whose types may
//! repeat. Each node keeps the `hcl-edit` node it was read from (or was
//! realized as), so printing reproduces untouched text exactly.

use std::collections::HashSet;
use std::fmt;
use std::mem;

use hcl_edit::expr::Expression;
use hcl_edit::structure::{self as hcl, BlockLabel, Structure};
use hcl_edit::{Decorate, Span};

use crate::source::{self, EditError, ParseError};
use crate::value::Value;

/// A `name = value` entry of a body
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    value: Value,
    node: hcl::Attribute,
}

impl Attribute {
    fn from_hcl(node: hcl::Attribute) -> Self {
        Self {
            name: node.key.value().as_str().to_string(),
            value: Value::from_expression(&node.value),
            node,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the value, keeping the spacing and comments around it
    pub fn set_value(&mut self, value: Value) -> Result<(), EditError> {
        let mut expr: Expression = source::expression(&value)?;
        *expr.decor_mut() = self.node.value.decor().clone();
        self.node.value = expr;
        self.value = value;
        Ok(())
    }
}

/// A labeled structural node such as `resource "type" "name" { ... }`
#[derive(Debug, Clone)]
pub struct Block {
    ident: String,
    labels: Vec<String>,
    body: Body,
    /// Header and decor; the body lives in `body`
    node: hcl::Block,
}

impl Block {
    fn from_hcl(mut node: hcl::Block, depth: usize) -> Result<Self, BodyError> {
        let oneline = is_oneline(&node);
        let body = mem::take(&mut node.body);
        let labels = node
            .labels
            .iter()
            .map(|label| match label {
                BlockLabel::Ident(ident) => ident.value().as_str().to_string(),
                BlockLabel::String(s) => s.value().clone(),
            })
            .collect();

        Ok(Self {
            ident: node.ident.value().as_str().to_string(),
            labels,
            body: Body::from_hcl(body, depth + 1, oneline)?,
            node,
        })
    }

    /// Block type, e.g. `resource` or `node_pool`
    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Dotted address made of the labels, e.g. `google_container_cluster.primary`
    pub fn address(&self) -> String {
        if self.labels.is_empty() {
            self.ident.clone()
        } else {
            self.labels.join(".")
        }
    }

    fn to_hcl(&self) -> hcl::Block {
        let mut node = self.node.clone();
        node.body = self.body.to_hcl();
        node
    }
}

#[derive(Debug, Clone)]
enum Item {
    Attribute(Attribute),
    Block(Block),
}

/// Attributes and nested blocks of a block (or of the document root)
#[derive(Debug, Clone)]
pub struct Body {
    items: Vec<Item>,
    /// Decor and layout flags of the source body, without its structures
    shell: hcl::Body,
    /// Nesting level, used to indent created nodes
    depth: usize,
    /// Written on one line (`{ a = 1 }` or `{}`)
    oneline: bool,
}

/// Problems found while converting a parsed body
struct BodyError {
    offset: usize,
    message: String,
}

impl Body {
    fn from_hcl(mut node: hcl::Body, depth: usize, oneline: bool) -> Result<Self, BodyError> {
        let structures: Vec<Structure> = node.iter().cloned().collect();
        node.clear();

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(structures.len());
        for structure in structures {
            match structure {
                Structure::Attribute(attribute) => {
                    let name = attribute.key.value().as_str().to_string();
                    if !seen.insert(name.clone()) {
                        return Err(BodyError {
                            offset: attribute.span().map(|s| s.start).unwrap_or(0),
                            message: format!("duplicate attribute `{name}`"),
                        });
                    }
                    items.push(Item::Attribute(Attribute::from_hcl(attribute)));
                }
                Structure::Block(block) => items.push(Item::Block(Block::from_hcl(block, depth)?)),
            }
        }

        Ok(Self {
            items,
            shell: node,
            depth,
            oneline,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.items.iter().find_map(|item| match item {
            Item::Attribute(a) if a.name == name => Some(a),
            _ => None,
        })
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.items.iter_mut().find_map(|item| match item {
            Item::Attribute(a) if a.name == name => Some(a),
            _ => None,
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Set `name` to `value`, appending the attribute when it is absent
    pub fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), EditError> {
        if let Some(attribute) = self.attribute_mut(name) {
            return attribute.set_value(value);
        }

        let node = source::attribute_node(name, &value, self.depth)?;
        self.expand()?;
        self.items.push(Item::Attribute(Attribute {
            name: name.to_string(),
            value,
            node,
        }));
        Ok(())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let index = self
            .items
            .iter()
            .position(|item| matches!(item, Item::Attribute(a) if a.name == name))?;
        match self.items.remove(index) {
            Item::Attribute(attribute) => Some(attribute),
            Item::Block(_) => None,
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            Item::Block(b) => Some(b),
            Item::Attribute(_) => None,
        })
    }

    fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.items.iter_mut().filter_map(|item| match item {
            Item::Block(b) => Some(b),
            Item::Attribute(_) => None,
        })
    }

    pub fn blocks_of_type<'b>(&'b self, ident: &'b str) -> impl Iterator<Item = &'b Block> + 'b {
        self.blocks().filter(move |b| b.ident == ident)
    }

    pub fn has_block(&self, ident: &str) -> bool {
        self.blocks().any(|b| b.ident == ident)
    }

    pub fn block_count(&self, ident: &str) -> usize {
        self.blocks_of_type(ident).count()
    }

    /// First block of the given type in document order
    pub fn first_block(&self, ident: &str) -> Option<&Block> {
        self.blocks().find(|b| b.ident == ident)
    }

    pub fn first_block_mut(&mut self, ident: &str) -> Option<&mut Block> {
        self.blocks_mut().find(|b| b.ident == ident)
    }

    /// Positions (among this body's blocks) of every block of the given type
    pub fn block_indices(&self, ident: &str) -> Vec<usize> {
        self.blocks()
            .enumerate()
            .filter(|(_, b)| b.ident == ident)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks_mut().nth(index)
    }

    /// First block of the given type, appended empty when missing
    ///
    /// The flag is `true` when the block had to be created.
    pub fn ensure_block(&mut self, ident: &str) -> Result<(&mut Block, bool), EditError> {
        let existing = self
            .items
            .iter()
            .position(|item| matches!(item, Item::Block(b) if b.ident == ident));

        let (index, created) = match existing {
            Some(index) => (index, false),
            None => {
                let (node, shell) = source::block_node(ident, self.depth)?;
                self.expand()?;
                self.items.push(Item::Block(Block {
                    ident: ident.to_string(),
                    labels: Vec::new(),
                    body: Body {
                        items: Vec::new(),
                        shell,
                        depth: self.depth + 1,
                        oneline: false,
                    },
                    node,
                }));
                (self.items.len() - 1, true)
            }
        };

        match &mut self.items[index] {
            Item::Block(block) => Ok((block, created)),
            Item::Attribute(a) => Err(EditError::InvalidIdentifier(a.name.clone())),
        }
    }

    /// Remove every block of the given type
    pub fn remove_blocks(&mut self, ident: &str) -> Vec<Block> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for item in mem::take(&mut self.items) {
            match item {
                Item::Block(b) if b.ident == ident => removed.push(b),
                other => kept.push(other),
            }
        }
        self.items = kept;
        removed
    }

    /// Turn a one-line body into a multi-line one before it grows
    fn expand(&mut self) -> Result<(), EditError> {
        if !self.oneline || self.depth == 0 {
            return Ok(());
        }

        let (_, shell) = source::block_node("x", self.depth - 1)?;
        self.shell = shell;
        self.oneline = false;

        for item in &mut self.items {
            match item {
                Item::Attribute(a) => {
                    source::reindent(&mut a.node, self.depth);
                    a.node.value.decor_mut().set_suffix("");
                }
                Item::Block(b) => source::reindent(&mut b.node, self.depth),
            }
        }
        Ok(())
    }

    fn to_hcl(&self) -> hcl::Body {
        let mut body = self.shell.clone();
        for item in &self.items {
            match item {
                Item::Attribute(a) => body.push(a.node.clone()),
                Item::Block(b) => body.push(b.to_hcl()),
            }
        }
        body
    }
}

/// Whether a parsed block was written on a single line
fn is_oneline(node: &hcl::Block) -> bool {
    let mut bare = node.clone();
    *bare.decor_mut() = Default::default();
    !hcl::Body::from(vec![Structure::Block(bare)])
        .to_string()
        .trim_end()
        .contains('\n')
}

/// A parsed configuration file
#[derive(Debug, Clone)]
pub struct Document {
    body: Body,
    crlf: bool,
}

impl Document {
    pub(crate) fn from_hcl(body: hcl::Body, crlf: bool, text: &str) -> Result<Self, ParseError> {
        let body = Body::from_hcl(body, 0, false)
            .map_err(|err| ParseError::at(text, err.offset, err.message))?;
        Ok(Self { body, crlf })
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Top-level blocks in document order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.body.blocks()
    }

    pub(crate) fn crlf(&self) -> bool {
        self.crlf
    }

    pub(crate) fn to_hcl(&self) -> hcl::Body {
        self.body.to_hcl()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&source::print_document(self))
    }
}
