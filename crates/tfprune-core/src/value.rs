//! Attribute values and literal coercion
//!
//! A [`Value`] is either a literal (null, bool, number, string, list, object)
//! or a [`Value::NonLiteral`] holding the raw text of an expression the tool
//! does not evaluate (references, function calls, templates, ...).

use bigdecimal::BigDecimal;
use hcl_edit::expr::{Expression, ObjectKey};
use hcl_edit::{Decor, Decorate, Ident};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The kind of a [`Value`], used as a coercion hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    List,
    Object,
    NonLiteral,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Object => "object",
            ValueKind::NonLiteral => "expression",
        };
        f.write_str(name)
    }
}

/// Literal text could not be converted into the requested kind
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot coerce {text:?} into a {expected} value")]
pub struct CoercionError {
    pub text: String,
    pub expected: ValueKind,
}

/// An arbitrary-precision decimal that remembers how it was written
#[derive(Debug, Clone)]
pub struct Number {
    value: BigDecimal,
    text: String,
}

impl Number {
    /// Parse an HCL number literal (`42`, `-3`, `50.5`, `1e3`)
    pub fn parse(text: &str) -> Option<Self> {
        if !is_number_text(text) {
            return None;
        }
        let value = BigDecimal::from_str(text).ok()?;
        Some(Self {
            value,
            text: text.to_string(),
        })
    }

    /// The source text of the number
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Self {
            value: BigDecimal::from(n),
            text: n.to_string(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn is_number_text(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i > start
    };

    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    if !digits(&mut i) {
        return false;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        if !digits(&mut i) {
            return false;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        if !digits(&mut i) {
            return false;
        }
    }
    i == bytes.len()
}

/// The value held by an attribute
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    /// Object entries in source order
    Object(Vec<(String, Value)>),
    /// Raw text of an expression that is not a constant
    NonLiteral(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
            Value::NonLiteral(_) => ValueKind::NonLiteral,
        }
    }

    pub fn is_literal(&self) -> bool {
        !matches!(self, Value::NonLiteral(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Plain text of a scalar literal (strings unquoted), `None` otherwise
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.as_str().to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(_) | Value::Object(_) | Value::NonLiteral(_) => None,
        }
    }

    /// Interpret a parsed expression
    ///
    /// Constant expressions become literals. A collection holding anything
    /// that is not constant is kept whole as [`Value::NonLiteral`].
    pub fn from_expression(expr: &Expression) -> Value {
        match expr {
            Expression::Null(_) => Value::Null,
            Expression::Bool(b) => Value::Bool(*b.value()),
            Expression::String(s) => Value::String(s.value().clone()),
            Expression::Array(array) => {
                let items: Vec<Value> = array.iter().map(Value::from_expression).collect();
                if items.iter().all(Value::is_literal) {
                    Value::List(items)
                } else {
                    Value::NonLiteral(expression_text(expr))
                }
            }
            Expression::Object(object) => {
                let mut entries = Vec::new();
                for (key, value) in object.iter() {
                    let key = match key {
                        ObjectKey::Ident(ident) => ident.as_str().to_string(),
                        ObjectKey::Expression(Expression::String(s)) => s.value().clone(),
                        ObjectKey::Expression(_) => return Value::NonLiteral(expression_text(expr)),
                    };
                    let value = Value::from_expression(value.expr());
                    if !value.is_literal() {
                        return Value::NonLiteral(expression_text(expr));
                    }
                    entries.push((key, value));
                }
                Value::Object(entries)
            }
            // Numbers (negative ones parse as a unary operation) keep their text
            _ => {
                let text = expression_text(expr);
                match Number::parse(&text) {
                    Some(n) => Value::Number(n),
                    None => Value::NonLiteral(text),
                }
            }
        }
    }

    /// Render the value as HCL source text
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.as_str().to_string(),
            Value::String(s) => quote(s),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Object(entries) if entries.is_empty() => "{}".to_string(),
            Value::Object(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| {
                        let key = if Ident::try_new(key.as_str()).is_ok() {
                            key.clone()
                        } else {
                            quote(key)
                        };
                        format!("{} = {}", key, value.render())
                    })
                    .collect();
                format!("{{ {} }}", entries.join(", "))
            }
            Value::NonLiteral(raw) => raw.clone(),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality; a non-literal is never equal to anything
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.iter().any(|(k, v)| k == key && v == value))
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Coerce literal text without a type hint
///
/// Tries an exact `null`, `true` or `false`, then a number, and falls back
/// to a string.
pub fn coerce_literal(text: &str) -> Value {
    match text {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match Number::parse(text) {
            Some(n) => Value::Number(n),
            None => Value::String(text.to_string()),
        },
    }
}

/// Coerce literal text into the given kind
///
/// A `Null` or `NonLiteral` hint carries no type, so the text is coerced
/// without a hint.
pub fn coerce_into(text: &str, kind: ValueKind) -> Result<Value, CoercionError> {
    let mismatch = || CoercionError {
        text: text.to_string(),
        expected: kind,
    };

    match kind {
        ValueKind::Null | ValueKind::NonLiteral => Ok(coerce_literal(text)),
        ValueKind::Bool => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },
        ValueKind::Number => Number::parse(text).map(Value::Number).ok_or_else(mismatch),
        ValueKind::String => Ok(Value::String(text.to_string())),
        ValueKind::List | ValueKind::Object => match hcl_edit::parser::parse_expr(text) {
            Ok(expr) => {
                let value = Value::from_expression(&expr);
                if value.kind() == kind {
                    Ok(value)
                } else {
                    Err(mismatch())
                }
            }
            Err(_) => Err(mismatch()),
        },
    }
}

/// Source text of an expression without the whitespace and comments around it
fn expression_text(expr: &Expression) -> String {
    let mut bare = expr.clone();
    *bare.decor_mut() = Decor::default();
    bare.to_string().trim().to_string()
}

/// Quote and escape a string for HCL output
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
