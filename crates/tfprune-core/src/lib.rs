//! tfprune-core: Configuration tree and values for Terraform cleanup
//!
//! This crate provides:
//! - `Value`: Literal and non-literal attribute values with text coercion
//! - `Document`, `Block`, `Body`, `Attribute`: The block-structured tree rules operate on
//! - `parse()`: Reads HCL through `hcl-edit` into a `Document`
//! - `print_document()`: Prints a `Document`, reproducing untouched source text exactly

pub mod document;
pub mod source;
pub mod value;

pub use document::{Attribute, Block, Body, Document};
pub use source::{is_identifier, parse, print_document, EditError, ParseError};
pub use value::{coerce_into, coerce_literal, CoercionError, Number, Value, ValueKind};
