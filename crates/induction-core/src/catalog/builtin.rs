//! Built-in task library

use std::sync::Arc;

use super::{TaskCategory, TaskDefinition, TaskEntry, TaskTable};
use crate::rules::lexical::{has_double_letter, is_palindrome, starts_with_vowel, vowel_count};
use crate::rules::numeric::{collatz_steps, digit_sum, is_perfect_square, is_prime};
use crate::rules::tuple::{gcd, TupleDomain};
use crate::rules::{
    IntegerRule, LexicalRule, RuleHandle, Schema, TupleClassificationRule, TupleIntegerRule,
};
use crate::value::Value;

const BINARY: Schema = Schema::Integer { min: 0, max: 1 };

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|n| Value::Int(*n)).collect()
}

fn words(values: &[&str]) -> Vec<Value> {
    values.iter().map(|w| Value::from(*w)).collect()
}

fn pairs(values: &[(i64, i64)]) -> Vec<Value> {
    values.iter().map(|(a, b)| Value::from(vec![*a, *b])).collect()
}

fn task(
    category: TaskCategory,
    rule: RuleHandle,
    sample_inputs: Vec<Value>,
    test_inputs: Vec<Value>,
) -> TaskDefinition {
    TaskDefinition {
        category,
        rule,
        sample_inputs,
        test_inputs,
    }
}

pub fn definitions() -> Vec<TaskDefinition> {
    use TaskCategory::{Lexical, Numerical};

    vec![
        task(
            Numerical,
            Arc::new(IntegerRule::new(
                "is_prime",
                "1 if prime, 0 otherwise",
                (0, 1000),
                BINARY,
                |n| Value::Int(is_prime(n) as i64),
            )),
            ints(&[7, 9]),
            ints(&[2, 3, 4, 5, 6, 11, 15, 17, 21, 29, 49, 91, 97, 121, 997]),
        ),
        task(
            Numerical,
            Arc::new(IntegerRule::new(
                "is_even",
                "1 if the number is even, 0 if it is odd",
                (-1000, 1000),
                BINARY,
                |n| Value::Int((n % 2 == 0) as i64),
            )),
            ints(&[4, 7]),
            ints(&[-3, -2, 0, 1, 2, 13, 28, 99, 100, 555]),
        ),
        task(
            Numerical,
            Arc::new(IntegerRule::new(
                "digit_sum",
                "the sum of the decimal digits of the number",
                (0, 100_000),
                Schema::Integer { min: 0, max: 45 },
                |n| Value::Int(digit_sum(n)),
            )),
            ints(&[12, 305]),
            ints(&[0, 9, 10, 19, 99, 100, 4321, 99_999]),
        ),
        task(
            Numerical,
            Arc::new(IntegerRule::new(
                "is_perfect_square",
                "1 if the number is a perfect square, 0 otherwise",
                (0, 10_000),
                BINARY,
                |n| Value::Int(is_perfect_square(n) as i64),
            )),
            ints(&[16, 20]),
            ints(&[0, 1, 2, 4, 8, 9, 24, 25, 50, 81, 99, 144, 9_999]),
        ),
        task(
            Numerical,
            Arc::new(IntegerRule::new(
                "collatz_steps",
                "number of Collatz steps (halve if even, 3n+1 if odd) needed to reach 1",
                (1, 10_000),
                Schema::Integer { min: 0, max: 300 },
                |n| Value::Int(collatz_steps(n)),
            )),
            ints(&[1, 6]),
            ints(&[2, 3, 7, 8, 16, 27, 97, 128]),
        ),
        task(
            Numerical,
            Arc::new(TupleClassificationRule::new(
                "sum_is_even",
                "\"even\" if the two numbers add up to an even number, otherwise \"odd\"",
                TupleDomain::new(2, -100, 100),
                &["even", "odd"],
                |xs| {
                    if xs.iter().sum::<i64>() % 2 == 0 {
                        "even"
                    } else {
                        "odd"
                    }
                },
            )),
            pairs(&[(1, 3), (2, 5)]),
            pairs(&[(0, 0), (1, 1), (-1, 2), (10, 7), (-8, -4), (99, 100)]),
        ),
        task(
            Numerical,
            Arc::new(TupleClassificationRule::new(
                "is_ascending",
                "\"yes\" if the three numbers are in strictly increasing order, otherwise \"no\"",
                TupleDomain::new(3, -100, 100),
                &["yes", "no"],
                |xs| {
                    if xs.windows(2).all(|w| w[0] < w[1]) {
                        "yes"
                    } else {
                        "no"
                    }
                },
            )),
            vec![Value::from(vec![1, 2, 3]), Value::from(vec![3, 2, 1])],
            vec![
                Value::from(vec![-5, 0, 5]),
                Value::from(vec![1, 1, 2]),
                Value::from(vec![2, 9, 4]),
                Value::from(vec![-100, 50, 100]),
                Value::from(vec![0, 0, 0]),
            ],
        ),
        task(
            Numerical,
            Arc::new(TupleIntegerRule::new(
                "pair_max",
                "the larger of the two numbers",
                TupleDomain::new(2, -100, 100),
                Schema::Integer { min: -100, max: 100 },
                |xs| xs[0].max(xs[1]),
            )),
            pairs(&[(3, 8), (5, -2)]),
            pairs(&[(0, 0), (-7, -3), (42, 17), (-100, 100), (9, 9)]),
        ),
        task(
            Numerical,
            Arc::new(TupleIntegerRule::new(
                "pair_gcd",
                "the greatest common divisor of the two numbers",
                TupleDomain::new(2, 0, 1000),
                Schema::Integer { min: 0, max: 1000 },
                |xs| gcd(xs[0], xs[1]),
            )),
            pairs(&[(12, 18), (7, 5)]),
            pairs(&[(0, 9), (8, 12), (100, 75), (17, 34), (13, 13), (81, 27)]),
        ),
        task(
            Lexical,
            Arc::new(LexicalRule::new(
                "starts_with_vowel",
                "true if the word starts with a vowel (a, e, i, o, u), false otherwise",
                Schema::Boolean,
                |w| Value::Bool(starts_with_vowel(w)),
            )),
            words(&["apple", "tree"]),
            words(&["orange", "umbrella", "yak", "egg", "banana", "igloo", "sky"]),
        ),
        task(
            Lexical,
            Arc::new(LexicalRule::new(
                "has_double_letter",
                "true if the word contains the same letter twice in a row, false otherwise",
                Schema::Boolean,
                |w| Value::Bool(has_double_letter(w)),
            )),
            words(&["book", "cat"]),
            words(&["balloon", "apple", "dog", "letter", "abc", "aa", "zebra"]),
        ),
        task(
            Lexical,
            Arc::new(LexicalRule::new(
                "vowel_count",
                "the number of vowels (a, e, i, o, u) in the word",
                Schema::Integer { min: 0, max: 20 },
                |w| Value::Int(vowel_count(w)),
            )),
            words(&["banana", "sky"]),
            words(&["queue", "rhythm", "education", "a", "strength", "aeiou"]),
        ),
        task(
            Lexical,
            Arc::new(
                LexicalRule::new(
                    "is_palindrome",
                    "true if the word reads the same forwards and backwards, false otherwise",
                    Schema::Boolean,
                    |w| Value::Bool(is_palindrome(w)),
                )
                .with_length(1, 15),
            ),
            words(&["level", "house"]),
            words(&["racecar", "noon", "a", "ab", "refer", "rotator", "palindrome"]),
        ),
    ]
}

/// Budgets used when no task table file is configured
pub fn default_table() -> TaskTable {
    TaskTable {
        numerical: vec![
            TaskEntry::new("is_prime", 20, 5).with_name("Prime Numbers"),
            TaskEntry::new("is_even", 10, 5).with_name("Parity"),
            TaskEntry::new("digit_sum", 20, 5).with_name("Digits"),
            TaskEntry::new("is_perfect_square", 20, 5).with_name("Squares"),
            TaskEntry::new("collatz_steps", 30, 5).with_name("Sequences"),
            TaskEntry::new("sum_is_even", 20, 5).with_name("Pair Parity"),
            TaskEntry::new("is_ascending", 20, 5).with_name("Ordering"),
            TaskEntry::new("pair_max", 15, 5).with_name("Pairs"),
            TaskEntry::new("pair_gcd", 25, 5).with_name("Divisors"),
        ],
        lexical: vec![
            TaskEntry::new("starts_with_vowel", 15, 5).with_name("First Letters"),
            TaskEntry::new("has_double_letter", 20, 5).with_name("Doubles"),
            TaskEntry::new("vowel_count", 20, 5).with_name("Vowels"),
            TaskEntry::new("is_palindrome", 20, 5).with_name("Mirrors"),
        ],
    }
}
