//! Query values and input normalization
//!
//! Participants send inputs either as JSON scalars or as text such as
//! `"(1, 2)"`. Text is parsed into a structured [`Value`] before it is
//! validated or evaluated; text that is not a literal is left untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A query input or rule output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
    Tuple(Vec<Value>),
    /// Any other JSON (floats, null, objects); never valid for a rule
    Other(serde_json::Value),
}

impl Value {
    /// Parse literal text into a structured value.
    ///
    /// Integers (`"42"`, `"-3"`), booleans (`"True"`), and parenthesized or
    /// bracketed sequences (`"(1, 2)"`, `"[3, 4]"`) are recognized. Anything
    /// else is returned unchanged. Normalizing twice gives the same result as
    /// normalizing once.
    pub fn normalize(self) -> Value {
        match self {
            Value::Text(raw) => LiteralParser::parse(&raw).unwrap_or(Value::Text(raw)),
            other => other,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Short type name used in validation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Text(_) => "string",
            Value::Tuple(_) => "tuple",
            Value::Other(serde_json::Value::Number(n)) if n.is_f64() => "float",
            Value::Other(serde_json::Value::Number(_)) => "number",
            Value::Other(serde_json::Value::Null) => "null",
            Value::Other(serde_json::Value::Object(_)) => "object",
            Value::Other(_) => "value",
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "'{}'", s),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Other(raw) => write!(f, "{}", raw),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<i64>> for Value {
    fn from(items: Vec<i64>) -> Self {
        Value::Tuple(items.into_iter().map(Value::Int).collect())
    }
}

/// One answered input: a query result, a sample case, or a test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoPair {
    pub input: Value,
    pub output: Value,
}

impl IoPair {
    pub fn new(input: Value, output: Value) -> Self {
        Self { input, output }
    }
}

/// Deepest sequence nesting accepted in literal text
const MAX_NESTING: usize = 32;

/// Recursive-descent parser for the literal subset accepted as query text.
///
/// Quoted strings are only accepted inside sequences, so a top-level string
/// never unwraps into something that would parse differently a second time.
/// Nesting beyond [`MAX_NESTING`] makes the text unparsable.
struct LiteralParser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn parse(text: &'a str) -> Option<Value> {
        let mut parser = Self {
            src: text.as_bytes(),
            text,
            pos: 0,
            depth: 0,
        };
        let value = parser.value(true)?;
        parser.skip_ws();
        (parser.pos == parser.src.len()).then_some(value)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self, top_level: bool) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            b'(' => self.sequence(b')'),
            b'[' => self.sequence(b']'),
            b'\'' | b'"' if !top_level => self.quoted(),
            b'-' | b'+' | b'0'..=b'9' => self.integer(),
            _ => self.keyword(),
        }
    }

    fn sequence(&mut self, close: u8) -> Option<Value> {
        if self.depth == MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let value = self.sequence_items(close);
        self.depth -= 1;
        value
    }

    fn sequence_items(&mut self, close: u8) -> Option<Value> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_ws();
            if self.eat(close) {
                break;
            }
            items.push(self.value(false)?);
            self.skip_ws();
            if self.eat(b',') {
                saw_comma = true;
                continue;
            }
            if self.eat(close) {
                break;
            }
            return None;
        }

        // `(5)` is a parenthesized scalar, `(5,)` and `[5]` are sequences
        if close == b')' && items.len() == 1 && !saw_comma {
            return items.pop();
        }
        Some(Value::Tuple(items))
    }

    fn quoted(&mut self) -> Option<Value> {
        let quote = self.src[self.pos];
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\\' {
                return None;
            }
            if b == quote {
                let content = &self.text[start..self.pos];
                self.pos += 1;
                return Some(Value::Text(content.to_string()));
            }
            self.pos += 1;
        }
        None
    }

    fn integer(&mut self) -> Option<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return None;
        }
        self.text[start..self.pos].parse().ok().map(Value::Int)
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        match &self.text[start..self.pos] {
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            _ => None,
        }
    }
}
