//! Scalar integer rules

use std::fmt;

use super::{check_integer, RuleSpec, Schema};
use crate::value::Value;

/// Rule over a single integer in an inclusive range
pub struct IntegerRule {
    name: &'static str,
    description: &'static str,
    min: i64,
    max: i64,
    output: Schema,
    eval: fn(i64) -> Value,
}

impl IntegerRule {
    pub fn new(
        name: &'static str,
        description: &'static str,
        range: (i64, i64),
        output: Schema,
        eval: fn(i64) -> Value,
    ) -> Self {
        Self {
            name,
            description,
            min: range.0,
            max: range.1,
            output,
            eval,
        }
    }
}

impl fmt::Debug for IntegerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegerRule")
            .field("name", &self.name)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

impl RuleSpec for IntegerRule {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn predicate(&self, input: &Value) -> Option<Value> {
        let n = input.as_int()?;
        (self.min..=self.max).contains(&n).then(|| (self.eval)(n))
    }

    fn validate_input(&self, input: &Value) -> Result<(), String> {
        check_integer(input, self.min, self.max).map(|_| ())
    }

    fn input_spec(&self) -> Schema {
        Schema::Integer {
            min: self.min,
            max: self.max,
        }
    }

    fn output_spec(&self) -> Schema {
        self.output.clone()
    }
}

pub fn is_prime(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

pub fn digit_sum(n: i64) -> i64 {
    let mut rest = n.unsigned_abs();
    let mut sum = 0;
    while rest > 0 {
        sum += (rest % 10) as i64;
        rest /= 10;
    }
    sum
}

pub fn is_perfect_square(n: i64) -> bool {
    if n < 0 {
        return false;
    }
    let mut root = (n as f64).sqrt() as i64;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root * root == n
}

/// Steps for the Collatz sequence starting at `n` to reach 1
pub fn collatz_steps(n: i64) -> i64 {
    let mut current = n.max(1);
    let mut steps = 0;
    while current != 1 {
        current = if current % 2 == 0 {
            current / 2
        } else {
            3 * current + 1
        };
        steps += 1;
    }
    steps
}
