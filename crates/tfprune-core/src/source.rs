//! Reading configuration text into a [`Document`] and writing it back
//!
//! Parsing and printing are done by `hcl-edit`, whose decor keeps the
//! whitespace and comments around every node. Nodes created by an edit are
//! realized from a small snippet of HCL text, so they carry the same kind of
//! decor as parsed ones.

use hcl_edit::expr::Expression;
use hcl_edit::parser::{parse_body, parse_expr};
use hcl_edit::structure::{self, Structure};
use hcl_edit::{Decor, Decorate, Ident};
use thiserror::Error;

use crate::document::Document;
use crate::value::Value;

const INDENT: &str = "  ";

/// The input is not well-formed configuration text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    /// Build an error for a byte offset into `source` (1-based line and column)
    pub(crate) fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let mut line = 1;
        let mut column = 1;

        for (i, ch) in source.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl From<hcl_edit::parser::Error> for ParseError {
    fn from(err: hcl_edit::parser::Error) -> Self {
        let location = err.location();
        Self {
            line: location.line(),
            column: location.column(),
            message: err.message().to_string(),
        }
    }
}

/// An edit would produce text that is not valid configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("{0:?} is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("{text:?} is not a valid expression: {message}")]
    InvalidExpression { text: String, message: String },
}

/// Whether `name` can be written as a bare attribute or block name
pub fn is_identifier(name: &str) -> bool {
    Ident::try_new(name).is_ok()
}

/// Parse configuration text into a [`Document`]
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let crlf = uses_crlf(source);
    let normalized;
    let text = if crlf {
        normalized = source.replace("\r\n", "\n");
        normalized.as_str()
    } else {
        source
    };

    let body = parse_body(text)?;
    Document::from_hcl(body, crlf, text)
}

/// Print a document back to configuration text
///
/// Files read with CRLF line endings are written back with CRLF, including
/// the lines of nodes added by edits.
pub fn print_document(document: &Document) -> String {
    let text = document.to_hcl().to_string();
    if document.crlf() {
        text.replace('\n', "\r\n")
    } else {
        text
    }
}

/// Every line break in the text is `\r\n`
fn uses_crlf(source: &str) -> bool {
    let bytes = source.as_bytes();
    let mut seen = false;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            if i == 0 || bytes[i - 1] != b'\r' {
                return false;
            }
            seen = true;
        }
    }
    seen
}

pub(crate) fn indent(depth: usize) -> String {
    INDENT.repeat(depth)
}

/// Expression for a value, without surrounding decor
pub(crate) fn expression(value: &Value) -> Result<Expression, EditError> {
    let text = value.render();
    let mut expr = parse_expr(&text).map_err(|err| EditError::InvalidExpression {
        message: err.message().to_string(),
        text: text.clone(),
    })?;
    *expr.decor_mut() = Decor::default();
    Ok(expr)
}

/// A fresh `name = value` line for a body at `depth`
pub(crate) fn attribute_node(
    name: &str,
    value: &Value,
    depth: usize,
) -> Result<structure::Attribute, EditError> {
    check_identifier(name)?;
    let text = format!("{}{} = {}\n", indent(depth), name, value.render());
    match realize(&text, depth)? {
        Structure::Attribute(attribute) => Ok(attribute),
        Structure::Block(_) => Err(EditError::InvalidIdentifier(name.to_string())),
    }
}

/// A fresh empty block for a body at `depth`
///
/// The body is returned separately with its structures removed; its decor
/// holds the indentation of the closing brace.
pub(crate) fn block_node(
    ident: &str,
    depth: usize,
) -> Result<(structure::Block, structure::Body), EditError> {
    check_identifier(ident)?;
    let pad = indent(depth);
    let text = format!("{pad}{ident} {{\n{pad}{INDENT}x = 0\n{pad}}}\n");
    match realize(&text, depth)? {
        Structure::Block(mut block) => {
            let mut body = std::mem::take(&mut block.body);
            body.clear();
            Ok((block, body))
        }
        Structure::Attribute(_) => Err(EditError::InvalidIdentifier(ident.to_string())),
    }
}

/// Give a node moved into a multi-line body the indentation of that body
pub(crate) fn reindent<T: Decorate>(node: &mut T, depth: usize) {
    *node.decor_mut() = Decor::new(indent(depth), "");
}

/// Parse one structure written after a placeholder line
///
/// Only the second structure is kept, so its decor holds exactly the
/// indentation written before it.
fn realize(text: &str, depth: usize) -> Result<Structure, EditError> {
    let snippet = format!("x = 0\n{text}");
    let body = parse_body(&snippet).map_err(|err| EditError::InvalidExpression {
        text: text.trim().to_string(),
        message: err.message().to_string(),
    })?;
    let structure = body.iter()
        .nth(1)
        .cloned()
        .ok_or_else(|| EditError::InvalidExpression {
            text: text.trim().to_string(),
            message: format!("no structure at depth {depth}"),
        });
    structure
}

fn check_identifier(name: &str) -> Result<(), EditError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(EditError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    const CLUSTER: &str = r#"# Generated by terraformer
resource "google_container_cluster" "primary" {
  name     = "primary"
  location = var.region # zone or region

  node_pool {
    name               = "default"
    initial_node_count = 3
    node_count         = 5
  }

  node_pool {
    initial_node_count = 2
  }

  binary_authorization {
    enabled         = true
    evaluation_mode = "PROJECT_SINGLETON_POLICY_ENFORCE"
  }
}

provider "google" {
  project = "demo"
}
"#;

    const SOURCE: &str = r#"resource "google_container_cluster" "c" {
  # computed by the API
  endpoint = "1.2.3.4"
  name     = "c" # keep me
}
"#;

    fn cluster_body(document: &mut Document) -> &mut crate::Body {
        document.body_mut().block_mut(0).unwrap().body_mut()
    }

    #[test]
    fn test_parse_structure() {
        let document = parse(CLUSTER).unwrap();
        let blocks: Vec<_> = document.blocks().collect();
        assert_eq!(blocks.len(), 2);

        let cluster = blocks[0];
        assert_eq!(cluster.ident(), "resource");
        assert_eq!(cluster.labels(), ["google_container_cluster", "primary"]);
        assert_eq!(cluster.body().block_count("node_pool"), 2);

        let name = cluster.body().attribute("name").unwrap();
        assert_eq!(name.value(), &Value::from("primary"));

        let location = cluster.body().attribute("location").unwrap();
        assert!(matches!(location.value(), Value::NonLiteral(raw) if raw == "var.region"));

        let pool = cluster.body().first_block("node_pool").unwrap();
        assert_eq!(
            pool.body().attribute("node_count").unwrap().value(),
            &Value::Number(Number::from(5i64))
        );

        assert_eq!(blocks[1].labels(), ["google"]);
    }

    #[test]
    fn test_round_trip_is_exact() {
        let document = parse(CLUSTER).unwrap();
        assert_eq!(document.to_string(), CLUSTER);
    }

    #[test]
    fn test_round_trip_awkward_layouts() {
        let sources = [
            "",
            "\n\n# only a comment\n",
            "a = 1 // trailing\r\nb = \"x\"\r\n",
            "locals { a = 1 }\n",
            "variable \"x\" {}\n",
            "resource \"a\" \"b\" { # why\n  tags = {\n    env = \"prod\" # inline\n  }\n}\n",
            "x = [\n  1, # first\n  2,\n]\n",
            "y = <<-EOT\n  hello ${var.name}\n  EOT\nz = 1\n",
            "/* block\n comment */\nblock {\n  a = 1 /* b */\n}\n",
            "m = var.enabled ? {\n  a = 1\n} : {}\n",
        ];
        for source in sources {
            let document = parse(source).unwrap_or_else(|e| panic!("{source:?}: {e}"));
            assert_eq!(document.to_string(), source);
        }
    }

    #[test]
    fn test_heredoc_is_non_literal() {
        let document = parse("y = <<EOT\nhello\nEOT\n").unwrap();
        let y = document.body().attribute("y").unwrap();
        assert!(matches!(y.value(), Value::NonLiteral(_)));
    }

    #[test]
    fn test_errors_carry_position() {
        let err = parse("resource \"a\" \"b\" {\n  name = \n}\n").unwrap_err();
        assert_eq!(err.line, 2);

        assert!(parse("resource \"a\" {\n").is_err());
        assert!(parse("a = \"open\n").is_err());
        assert!(parse("a = (1\n").is_err());
        assert!(parse("@\n").is_err());

        let err = parse("a = 1\na = 2\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("duplicate attribute"));
    }

    #[test]
    fn test_removed_attribute_takes_its_comments() {
        let mut document = parse(SOURCE).unwrap();
        cluster_body(&mut document).remove_attribute("endpoint");
        assert_eq!(
            document.to_string(),
            "resource \"google_container_cluster\" \"c\" {\n  name     = \"c\" # keep me\n}\n"
        );
    }

    #[test]
    fn test_modified_value_keeps_layout() {
        let mut document = parse(SOURCE).unwrap();
        cluster_body(&mut document)
            .attribute_mut("name")
            .unwrap()
            .set_value(Value::from("d"))
            .unwrap();
        assert_eq!(
            document.to_string(),
            SOURCE.replace("\"c\" # keep me", "\"d\" # keep me")
        );
    }

    #[test]
    fn test_created_attribute_is_appended() {
        let mut document = parse(SOURCE).unwrap();
        cluster_body(&mut document)
            .set_attribute("min_master_version", Value::from("1.27"))
            .unwrap();
        assert_eq!(
            document.to_string(),
            SOURCE.replace("}\n", "  min_master_version = \"1.27\"\n}\n")
        );
    }

    #[test]
    fn test_created_nested_block() {
        let source = "resource \"t\" \"n\" {\n  a = 1\n}\n";
        let mut document = parse(source).unwrap();
        let (block, created) = cluster_body(&mut document)
            .ensure_block("binary_authorization")
            .unwrap();
        assert!(created);
        block.body_mut().set_attribute("enabled", Value::Bool(true)).unwrap();
        assert_eq!(
            document.to_string(),
            "resource \"t\" \"n\" {\n  a = 1\n  binary_authorization {\n    enabled = true\n  }\n}\n"
        );
    }

    #[test]
    fn test_created_block_after_emptied_one_line_resource() {
        let mut document = parse("resource \"t\" \"n\" { a = 1 }\n").unwrap();
        let body = cluster_body(&mut document);
        body.remove_attribute("a");
        let (block, _) = body.ensure_block("b").unwrap();
        block.body_mut().set_attribute("c", Value::from("x")).unwrap();
        assert_eq!(
            document.to_string(),
            "resource \"t\" \"n\" {\n  b {\n    c = \"x\"\n  }\n}\n"
        );
    }

    #[test]
    fn test_one_line_block_gains_attribute() {
        let mut document = parse("locals { a = 1 }\n").unwrap();
        cluster_body(&mut document).set_attribute("b", Value::from(2i64)).unwrap();
        assert_eq!(document.to_string(), "locals {\n  a = 1\n  b = 2\n}\n");
    }

    #[test]
    fn test_removed_block() {
        let source = "resource \"a\" \"b\" {\n  x = 1\n\n  node_config {\n    machine_type = \"e2\"\n  }\n}\n";
        let mut document = parse(source).unwrap();
        cluster_body(&mut document).remove_blocks("node_config");
        assert_eq!(document.to_string(), "resource \"a\" \"b\" {\n  x = 1\n}\n");
    }

    #[test]
    fn test_crlf_is_kept_for_created_lines() {
        let source = "resource \"a\" \"b\" {\r\n  x = 1\r\n}\r\n";
        let mut document = parse(source).unwrap();
        cluster_body(&mut document)
            .set_attribute("min_master_version", Value::from(1i64))
            .unwrap();
        assert_eq!(
            document.to_string(),
            "resource \"a\" \"b\" {\r\n  x = 1\r\n  min_master_version = 1\r\n}\r\n"
        );
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let mut document = parse(SOURCE).unwrap();
        let body = cluster_body(&mut document);
        assert_eq!(
            body.set_attribute("not valid", Value::Null).unwrap_err(),
            EditError::InvalidIdentifier("not valid".to_string())
        );
        assert!(body.ensure_block("1abc").is_err());
        assert_eq!(document.to_string(), SOURCE);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("node_pool"));
        assert!(is_identifier("with-dash"));
        assert!(!is_identifier("two words"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
    }

    #[test]
    fn test_uses_crlf() {
        assert!(uses_crlf("a = 1\r\n"));
        assert!(!uses_crlf("a = 1\r\nb = 2\n"));
        assert!(!uses_crlf("a = 1"));
    }
}
