//! Rules over fixed-arity integer tuples

use std::fmt;

use super::{check_integer, RuleSpec, Schema, MISSING_PARENTHESES_HINT};
use crate::value::Value;

/// Domain shared by both tuple variants: `arity` integers in `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleDomain {
    pub arity: usize,
    pub min: i64,
    pub max: i64,
}

impl TupleDomain {
    pub fn new(arity: usize, min: i64, max: i64) -> Self {
        Self { arity, min, max }
    }

    fn extract(&self, input: &Value) -> Result<Vec<i64>, String> {
        let items = input.as_tuple().ok_or_else(|| {
            format!(
                "expected a tuple of {} integers such as (1, 2), got {}",
                self.arity,
                input.type_name()
            )
        })?;
        if items.len() != self.arity {
            return Err(format!(
                "expected a tuple of {} integers, got {} elements",
                self.arity,
                items.len()
            ));
        }
        items
            .iter()
            .map(|item| check_integer(item, self.min, self.max))
            .collect()
    }

    fn schema(&self) -> Schema {
        Schema::IntegerTuple {
            arity: self.arity,
            min: self.min,
            max: self.max,
        }
    }
}

/// Tuple in, category label out
pub struct TupleClassificationRule {
    name: &'static str,
    description: &'static str,
    domain: TupleDomain,
    labels: &'static [&'static str],
    classify: fn(&[i64]) -> &'static str,
}

impl TupleClassificationRule {
    pub fn new(
        name: &'static str,
        description: &'static str,
        domain: TupleDomain,
        labels: &'static [&'static str],
        classify: fn(&[i64]) -> &'static str,
    ) -> Self {
        Self {
            name,
            description,
            domain,
            labels,
            classify,
        }
    }
}

impl fmt::Debug for TupleClassificationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleClassificationRule")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("labels", &self.labels)
            .finish()
    }
}

impl RuleSpec for TupleClassificationRule {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn predicate(&self, input: &Value) -> Option<Value> {
        let items = self.domain.extract(input).ok()?;
        Some(Value::Text((self.classify)(&items).to_string()))
    }

    fn validate_input(&self, input: &Value) -> Result<(), String> {
        self.domain.extract(input).map(|_| ())
    }

    fn input_spec(&self) -> Schema {
        self.domain.schema()
    }

    fn output_spec(&self) -> Schema {
        Schema::Category {
            labels: self.labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn batch_overflow_hint(&self) -> Option<&'static str> {
        Some(MISSING_PARENTHESES_HINT)
    }
}

/// Tuple in, integer out
pub struct TupleIntegerRule {
    name: &'static str,
    description: &'static str,
    domain: TupleDomain,
    output: Schema,
    eval: fn(&[i64]) -> i64,
}

impl TupleIntegerRule {
    pub fn new(
        name: &'static str,
        description: &'static str,
        domain: TupleDomain,
        output: Schema,
        eval: fn(&[i64]) -> i64,
    ) -> Self {
        Self {
            name,
            description,
            domain,
            output,
            eval,
        }
    }
}

impl fmt::Debug for TupleIntegerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleIntegerRule")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .finish()
    }
}

impl RuleSpec for TupleIntegerRule {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn predicate(&self, input: &Value) -> Option<Value> {
        let items = self.domain.extract(input).ok()?;
        Some(Value::Int((self.eval)(&items)))
    }

    fn validate_input(&self, input: &Value) -> Result<(), String> {
        self.domain.extract(input).map(|_| ())
    }

    fn input_spec(&self) -> Schema {
        self.domain.schema()
    }

    fn output_spec(&self) -> Schema {
        self.output.clone()
    }

    fn batch_overflow_hint(&self) -> Option<&'static str> {
        Some(MISSING_PARENTHESES_HINT)
    }
}

pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
