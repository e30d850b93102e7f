//! Query budget ledger
//!
//! Admission control for query batches. A batch is either answered in full,
//! consuming one query per input, or refused without touching the ledger.

use serde::Serialize;
use thiserror::Error;

use crate::catalog::TaskConfig;
use crate::rules::RuleSpec;
use crate::value::{IoPair, Value};
use crate::{InductionError, Result};

/// Why a batch was refused before any input was evaluated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchRejection {
    #[error("Query batch must contain at least one input.")]
    Empty,

    #[error("{}", too_large_message(.size, .limit, .hint))]
    TooLarge {
        size: usize,
        limit: usize,
        hint: Option<&'static str>,
    },

    #[error("No queries remaining.")]
    Exhausted,

    #[error("Only {remaining} queries remaining. Reduce batch size.")]
    Insufficient { requested: usize, remaining: usize },
}

fn too_large_message(size: &usize, limit: &usize, hint: &Option<&'static str>) -> String {
    match hint {
        Some(hint) => (*hint).to_string(),
        None => format!(
            "Batch size {} exceeds limit. You may query at most {} inputs.",
            size, limit
        ),
    }
}

impl BatchRejection {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Empty => "empty_batch",
            Self::TooLarge { .. } => "batch_too_large",
            Self::Exhausted => "budget_exhausted",
            Self::Insufficient { .. } => "budget_insufficient",
        }
    }

    /// Attach a rule-supplied diagnostic to a batch-size rejection
    pub fn with_hint(self, hint: Option<&'static str>) -> Self {
        match self {
            Self::TooLarge { size, limit, .. } => Self::TooLarge { size, limit, hint },
            other => other,
        }
    }
}

/// Per-session query counters and history
#[derive(Debug, Clone)]
pub struct QueryBudgetLedger {
    config: TaskConfig,
    queries_used: usize,
    history: Vec<IoPair>,
}

/// Ledger state after an accepted batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    pub results: Vec<IoPair>,
    pub queries_used: usize,
    pub queries_remaining: usize,
}

impl QueryBudgetLedger {
    pub fn new(config: TaskConfig) -> Self {
        Self {
            config,
            queries_used: 0,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> TaskConfig {
        self.config
    }

    pub fn queries_used(&self) -> usize {
        self.queries_used
    }

    pub fn history(&self) -> &[IoPair] {
        &self.history
    }

    pub fn remaining(&self) -> usize {
        self.config.total_queries.saturating_sub(self.queries_used)
    }

    /// Decide whether a batch of `batch_size` inputs may be evaluated.
    ///
    /// Checks run in a fixed order: empty batch, batch-size limit, exhausted
    /// budget, then insufficient budget.
    pub fn admit(&self, batch_size: usize) -> std::result::Result<(), BatchRejection> {
        if batch_size == 0 {
            return Err(BatchRejection::Empty);
        }
        if batch_size > self.config.query_batch_size {
            return Err(BatchRejection::TooLarge {
                size: batch_size,
                limit: self.config.query_batch_size,
                hint: None,
            });
        }
        let remaining = self.remaining();
        if remaining == 0 {
            return Err(BatchRejection::Exhausted);
        }
        if batch_size > remaining {
            return Err(BatchRejection::Insufficient {
                requested: batch_size,
                remaining,
            });
        }
        Ok(())
    }

    /// Admit, normalize, validate and evaluate a whole batch.
    ///
    /// Every input is validated and evaluated before the ledger changes, so a
    /// single bad input leaves `queries_used` and the history untouched.
    pub fn execute(&mut self, rule: &dyn RuleSpec, inputs: Vec<Value>) -> Result<Vec<IoPair>> {
        self.admit(inputs.len())
            .map_err(|rejection| rejection.with_hint(rule.batch_overflow_hint()))?;

        let mut answered = Vec::with_capacity(inputs.len());
        for raw in inputs {
            let input = raw.normalize();
            rule.validate_input(&input).map_err(|reason| InductionError::InvalidInput {
                input: input.to_string(),
                reason,
            })?;
            let output = rule
                .predicate(&input)
                .ok_or_else(|| InductionError::InvalidInput {
                    input: input.to_string(),
                    reason: "input is outside the rule's domain".to_string(),
                })?;
            answered.push(IoPair::new(input, output));
        }

        self.queries_used += answered.len();
        self.history.extend(answered.iter().cloned());
        Ok(answered)
    }

    /// Run [`Self::execute`] and report the ledger totals alongside the results
    pub fn query(&mut self, rule: &dyn RuleSpec, inputs: Vec<Value>) -> Result<QueryOutcome> {
        let results = self.execute(rule, inputs)?;
        Ok(QueryOutcome {
            results,
            queries_used: self.queries_used,
            queries_remaining: self.remaining(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::numeric::is_prime;
    use crate::rules::tuple::TupleDomain;
    use crate::rules::{IntegerRule, Schema, TupleIntegerRule, MISSING_PARENTHESES_HINT};
    use proptest::prelude::*;

    fn prime_rule() -> IntegerRule {
        IntegerRule::new(
            "is_prime",
            "1 if prime, 0 otherwise",
            (0, 1000),
            Schema::Integer { min: 0, max: 1 },
            |n| Value::Int(is_prime(n) as i64),
        )
    }

    fn config(total: usize, batch: usize) -> TaskConfig {
        TaskConfig::new(total, batch).unwrap()
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|n| Value::Int(*n)).collect()
    }

    #[test]
    fn test_oversized_batch_then_full_batch() {
        let rule = prime_rule();
        let mut ledger = QueryBudgetLedger::new(config(20, 5));

        let err = ledger.execute(&rule, ints(&[1, 2, 3, 4, 5, 6])).unwrap_err();
        assert!(matches!(
            err,
            InductionError::BatchRejected(BatchRejection::TooLarge { size: 6, limit: 5, .. })
        ));
        assert_eq!(
            err.to_string(),
            "Batch size 6 exceeds limit. You may query at most 5 inputs."
        );
        assert_eq!(ledger.queries_used(), 0);
        assert!(ledger.history().is_empty());

        let answered = ledger.execute(&rule, ints(&[2, 3, 4, 5, 6])).unwrap();
        assert_eq!(answered.len(), 5);
        assert_eq!(ledger.queries_used(), 5);
        assert_eq!(ledger.history().len(), 5);
        assert_eq!(ledger.remaining(), 15);
    }

    #[test]
    fn test_insufficient_budget() {
        let rule = prime_rule();
        let mut ledger = QueryBudgetLedger::new(config(5, 3));
        ledger.execute(&rule, ints(&[1, 2, 3])).unwrap();
        assert_eq!(ledger.remaining(), 2);

        let err = ledger.execute(&rule, ints(&[4, 5, 6])).unwrap_err();
        assert_eq!(err.to_string(), "Only 2 queries remaining. Reduce batch size.");
        assert_eq!(err.reason_code(), "budget_insufficient");
        assert_eq!(ledger.queries_used(), 3);
        assert_eq!(ledger.history().len(), 3);
    }

    #[test]
    fn test_exhausted_budget() {
        let rule = prime_rule();
        let mut ledger = QueryBudgetLedger::new(config(2, 2));
        ledger.execute(&rule, ints(&[7, 8])).unwrap();

        let err = ledger.execute(&rule, ints(&[9])).unwrap_err();
        assert_eq!(err.to_string(), "No queries remaining.");
        assert_eq!(ledger.queries_used(), 2);
    }

    #[test]
    fn test_rejection_priority() {
        let mut ledger = QueryBudgetLedger::new(config(3, 3));
        assert_eq!(ledger.admit(0), Err(BatchRejection::Empty));
        ledger.execute(&prime_rule(), ints(&[1, 2, 3])).unwrap();

        // batch-size limit is reported before the exhausted budget
        assert!(matches!(ledger.admit(4), Err(BatchRejection::TooLarge { .. })));
        assert_eq!(ledger.admit(1), Err(BatchRejection::Exhausted));
        assert_eq!(ledger.admit(0), Err(BatchRejection::Empty));
    }

    #[test]
    fn test_invalid_input_aborts_whole_batch() {
        let rule = prime_rule();
        let mut ledger = QueryBudgetLedger::new(config(20, 5));
        let batch = vec![Value::Int(2), Value::Text("abc".into()), Value::Int(4)];

        let err = ledger.execute(&rule, batch).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input abc: expected an integer, got string");
        assert_eq!(ledger.queries_used(), 0);
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn test_textual_inputs_are_normalized() {
        let rule = prime_rule();
        let mut ledger = QueryBudgetLedger::new(config(20, 5));
        let answered = ledger
            .execute(&rule, vec![Value::Text(" 13 ".into())])
            .unwrap();
        assert_eq!(answered[0], IoPair::new(Value::Int(13), Value::Int(1)));
    }

    #[test]
    fn test_tuple_rule_hint_replaces_size_message() {
        let rule = TupleIntegerRule::new(
            "pair_max",
            "the larger of the two numbers",
            TupleDomain::new(2, -100, 100),
            Schema::Integer { min: -100, max: 100 },
            |xs| xs[0].max(xs[1]),
        );
        let mut ledger = QueryBudgetLedger::new(config(20, 3));

        let err = ledger.execute(&rule, ints(&[1, 2, 3, 4])).unwrap_err();
        assert_eq!(err.to_string(), MISSING_PARENTHESES_HINT);
        assert_eq!(err.reason_code(), "batch_too_large");

        let outcome = ledger
            .query(&rule, vec![Value::Text("(1, 2)".into()), Value::Text("[9, -4]".into())])
            .unwrap();
        assert_eq!(outcome.results[0].output, Value::Int(2));
        assert_eq!(outcome.results[1].output, Value::Int(9));
        assert_eq!(outcome.queries_used, 2);
        assert_eq!(outcome.queries_remaining, 18);
    }

    proptest! {
        #[test]
        fn prop_ledger_counts_accepted_batches(
            batches in proptest::collection::vec(0usize..8, 0..20),
            total in 1usize..40,
            limit in 1usize..6,
        ) {
            let rule = prime_rule();
            let mut ledger = QueryBudgetLedger::new(config(total, limit));
            let mut accepted = 0usize;

            for size in batches {
                let before_used = ledger.queries_used();
                let before_len = ledger.history().len();
                let inputs: Vec<Value> = (0..size as i64).map(Value::Int).collect();
                match ledger.execute(&rule, inputs) {
                    Ok(answered) => {
                        prop_assert_eq!(answered.len(), size);
                        accepted += size;
                    }
                    Err(_) => {
                        prop_assert_eq!(ledger.queries_used(), before_used);
                        prop_assert_eq!(ledger.history().len(), before_len);
                    }
                }
                prop_assert_eq!(ledger.queries_used(), accepted);
                prop_assert_eq!(ledger.history().len(), ledger.queries_used());
                prop_assert!(ledger.queries_used() <= total);
            }
        }

        #[test]
        fn prop_predicate_is_deterministic(n in 0i64..=1000) {
            let rule = prime_rule();
            let input = Value::Int(n);
            prop_assert_eq!(rule.predicate(&input), rule.predicate(&input));
        }
    }
}
