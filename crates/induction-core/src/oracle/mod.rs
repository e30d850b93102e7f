//! Grading oracle contract
//!
//! The oracle decides whether a hypothesis describes the hidden rule. It is
//! the only nondeterministic component; the session engine treats it as a
//! black box and never lets a transport failure count as a verdict.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::value::IoPair;

pub mod llm;

pub use llm::{LlmGradingOracle, OracleModel};

/// Evidence handed to the oracle for one hypothesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingRequest {
    pub hypothesis: String,
    pub official_description: String,
    pub test_cases: Vec<IoPair>,
    pub sample_cases: Vec<IoPair>,
    pub query_history: Vec<IoPair>,
}

/// Oracle verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResult {
    pub success: bool,
    pub explanation: String,
}

/// Judge for hypotheses.
///
/// Must accept concise hypotheses that name the right concept and reject
/// vacuous or inconsistent ones. An `Err` means no verdict was reached.
#[async_trait]
pub trait GradingOracle: Send + Sync {
    async fn grade(&self, request: &GradingRequest) -> anyhow::Result<GradingResult>;
}
