//! Rule specifications
//!
//! A [`RuleSpec`] is one hidden rule: a deterministic predicate, the
//! validator that guards its domain, and the schema descriptors shown to the
//! participant. Variants differ only in the shape of their inputs and
//! outputs:
//!
//! - [`IntegerRule`]: scalar integer in, scalar out
//! - [`LexicalRule`]: lowercase word in, scalar out
//! - [`TupleClassificationRule`]: integer tuple in, category label out
//! - [`TupleIntegerRule`]: integer tuple in, integer out
//!
//! Callers only ever hold `Arc<dyn RuleSpec>` and never ask which variant
//! they have. Variant-specific diagnostics go through
//! [`RuleSpec::batch_overflow_hint`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

pub mod lexical;
pub mod numeric;
pub mod tuple;

pub use lexical::LexicalRule;
pub use numeric::IntegerRule;
pub use tuple::{TupleClassificationRule, TupleIntegerRule};

/// Shared handle to a rule; rules are immutable and shared across sessions
pub type RuleHandle = Arc<dyn RuleSpec>;

/// Message shown when a tuple task receives an oversized batch, which
/// almost always means the tuples were sent without their parentheses.
pub const MISSING_PARENTHESES_HINT: &str =
    "MISSING PARENTHESES: Wrap each tuple in parentheses, e.g. ['(1, 2)', ...].";

/// One hidden rule
pub trait RuleSpec: Send + Sync + fmt::Debug {
    /// Rule identity
    fn name(&self) -> &str;

    /// Official description, withheld from the participant until grading
    fn description(&self) -> &str;

    /// Evaluate the rule.
    ///
    /// Pure and deterministic. Returns `None` only for inputs that
    /// [`RuleSpec::validate_input`] rejects.
    fn predicate(&self, input: &Value) -> Option<Value>;

    /// Check that `input` is inside the rule's domain.
    ///
    /// The error message is shown to the participant verbatim and must not
    /// reveal anything about the rule itself.
    fn validate_input(&self, input: &Value) -> Result<(), String>;

    /// Shape of accepted inputs
    fn input_spec(&self) -> Schema;

    /// Shape of produced outputs
    fn output_spec(&self) -> Schema;

    /// Replacement message for an oversized batch, if this rule's input
    /// shape makes a specific mistake likely
    fn batch_overflow_hint(&self) -> Option<&'static str> {
        None
    }
}

/// Schema descriptor exposed to participants: shape and type, never values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    /// Integer within an inclusive range
    Integer {
        min: i64,
        max: i64,
    },
    /// True/false
    Boolean,
    /// Lowercase ASCII word
    Word {
        min_len: usize,
        max_len: usize,
    },
    /// Fixed-arity tuple of integers, each within an inclusive range
    IntegerTuple {
        arity: usize,
        min: i64,
        max: i64,
    },
    /// One of a closed set of labels
    Category {
        labels: Vec<String>,
    },
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Integer { min, max } => write!(f, "integer in [{}, {}]", min, max),
            Schema::Boolean => write!(f, "boolean"),
            Schema::Word { min_len, max_len } => {
                write!(f, "lowercase word of {}-{} letters", min_len, max_len)
            }
            Schema::IntegerTuple { arity, min, max } => {
                write!(f, "tuple of {} integers in [{}, {}]", arity, min, max)
            }
            Schema::Category { labels } => write!(f, "one of {}", labels.join(", ")),
        }
    }
}

/// Require an integer inside `[min, max]`
pub(crate) fn check_integer(value: &Value, min: i64, max: i64) -> Result<i64, String> {
    let n = value
        .as_int()
        .ok_or_else(|| format!("expected an integer, got {}", value.type_name()))?;
    if n < min || n > max {
        return Err(format!(
            "{} is outside the allowed range [{}, {}]",
            n, min, max
        ));
    }
    Ok(n)
}
