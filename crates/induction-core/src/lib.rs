//! Induction Core - session and query-budget engine for rule induction tasks
//!
//! A participant probes a hidden deterministic rule through a budgeted query
//! interface, then submits a natural-language hypothesis that is graded
//! against the rule's withheld description.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    InductionService                        │
//! │                                                            │
//! │   TaskCatalog ──► SessionRegistry ──► Session              │
//! │   (RuleSpec +     (sharded map of     ├─ QueryBudgetLedger │
//! │    TaskConfig)     per-session locks) ├─ submissions       │
//! │                                       └─ status            │
//! │                                                            │
//! │   GradingOracle (async, outside the session lock)          │
//! │   SessionLogger (one record per finished session)          │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use induction_core::catalog::{TaskCatalog, TaskCategory};
//! use induction_core::ledger::QueryBudgetLedger;
//! use induction_core::value::Value;
//!
//! let catalog = TaskCatalog::builtin();
//! let binding = catalog.bind("is_prime", TaskCategory::Numerical).unwrap();
//!
//! let mut ledger = QueryBudgetLedger::new(binding.config);
//! let answered = ledger
//!     .execute(binding.rule.as_ref(), vec![Value::Int(7), Value::Text("9".into())])
//!     .unwrap();
//!
//! assert_eq!(answered[0].output, Value::Int(1));
//! assert_eq!(answered[1].output, Value::Int(0));
//! assert_eq!(ledger.queries_used(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod oracle;
pub mod registry;
pub mod rules;
pub mod service;
pub mod session;
pub mod value;

pub use catalog::{TaskBinding, TaskCatalog, TaskCategory, TaskConfig, TaskTable};
pub use error::{InductionError, Result};
pub use ledger::{BatchRejection, QueryBudgetLedger};
pub use logger::{JsonlSessionLogger, MemorySessionLogger, SessionLogger, SessionRecord};
pub use oracle::{GradingOracle, GradingRequest, GradingResult, LlmGradingOracle};
pub use registry::{SessionHandle, SessionRegistry};
pub use rules::{RuleSpec, Schema};
pub use service::{InductionService, ServiceSettings};
pub use session::{Session, SessionId, SessionStatus, Submission};
pub use value::{IoPair, Value};

/// Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
