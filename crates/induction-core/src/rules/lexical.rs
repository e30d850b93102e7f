//! Lexical rules over single lowercase words

use std::fmt;

use super::{RuleSpec, Schema};
use crate::value::Value;

/// Rule over one lowercase ASCII word
pub struct LexicalRule {
    name: &'static str,
    description: &'static str,
    min_len: usize,
    max_len: usize,
    output: Schema,
    eval: fn(&str) -> Value,
}

impl LexicalRule {
    pub fn new(
        name: &'static str,
        description: &'static str,
        output: Schema,
        eval: fn(&str) -> Value,
    ) -> Self {
        Self {
            name,
            description,
            min_len: 1,
            max_len: 20,
            output,
            eval,
        }
    }

    pub fn with_length(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    fn check(&self, input: &Value) -> Result<(), String> {
        let word = input
            .as_text()
            .ok_or_else(|| format!("expected a word, got {}", input.type_name()))?;
        if !word.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err("words may only contain lowercase letters a-z".to_string());
        }
        let len = word.len();
        if len < self.min_len || len > self.max_len {
            return Err(format!(
                "word length {} is outside the allowed range [{}, {}]",
                len, self.min_len, self.max_len
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for LexicalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexicalRule")
            .field("name", &self.name)
            .field("min_len", &self.min_len)
            .field("max_len", &self.max_len)
            .finish()
    }
}

impl RuleSpec for LexicalRule {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn predicate(&self, input: &Value) -> Option<Value> {
        self.check(input).ok()?;
        input.as_text().map(self.eval)
    }

    fn validate_input(&self, input: &Value) -> Result<(), String> {
        self.check(input)
    }

    fn input_spec(&self) -> Schema {
        Schema::Word {
            min_len: self.min_len,
            max_len: self.max_len,
        }
    }

    fn output_spec(&self) -> Schema {
        self.output.clone()
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

pub fn starts_with_vowel(word: &str) -> bool {
    word.chars().next().is_some_and(is_vowel)
}

pub fn has_double_letter(word: &str) -> bool {
    word.as_bytes().windows(2).any(|pair| pair[0] == pair[1])
}

pub fn vowel_count(word: &str) -> i64 {
    word.chars().filter(|c| is_vowel(*c)).count() as i64
}

pub fn is_palindrome(word: &str) -> bool {
    word.bytes().eq(word.bytes().rev())
}
