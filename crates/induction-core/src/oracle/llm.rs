//! LLM grading oracle
//!
//! Grades hypotheses with a chat model behind an OpenAI-compatible
//! chat-completions endpoint (OpenRouter by default).
//!
//! # Usage
//!
//! ```text
//! let oracle = LlmGradingOracle::new(api_key, OracleModel::GeminiFlash);
//! let verdict = oracle.grade(&request).await?;
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GradingOracle, GradingRequest, GradingResult};
use crate::value::IoPair;

/// Default chat-completions endpoint
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a careful but fair grader verifying whether the human's \
    hypothesis matches the official rule. Use the rule description and all provided cases. \
    Accept concise descriptions when they unambiguously describe the same rule even if they \
    only name the underlying concept (e.g., \"primality\" for a prime/composite rule).";

const GRADING_GUIDELINES: &str = "Grading guidelines:\n\
    - Accept whenever the hypothesis would reproduce all outputs AND clearly refers to the exact rule, even if the wording is brief.\n\
    - Reject responses that are vacuous (e.g., \"the right rule\") or clearly inconsistent with the official rule.\n\
    - Treat exact references to the governing concept (like \"primality\" or \"parity\") as sufficient when that concept uniquely specifies the behavior.\n\
    - Semantic equivalents with clear logic are acceptable.\n\n\
    Answer format: respond with YES or NO as the first word, followed by a short justification.";

/// Grader model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleModel {
    /// Google Gemini 2.5 Flash
    GeminiFlash,
    /// Custom model ID
    Custom(String),
}

impl OracleModel {
    pub fn model_id(&self) -> &str {
        match self {
            Self::GeminiFlash => "google/gemini-2.5-flash",
            Self::Custom(id) => id,
        }
    }
}

impl From<&str> for OracleModel {
    fn from(id: &str) -> Self {
        match id {
            "google/gemini-2.5-flash" => Self::GeminiFlash,
            other => Self::Custom(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Oracle backed by a chat model
pub struct LlmGradingOracle {
    api_key: String,
    endpoint: String,
    model: OracleModel,
    http_client: reqwest::Client,
    temperature: f64,
    max_tokens: u32,
}

impl LlmGradingOracle {
    pub fn new(api_key: impl Into<String>, model: OracleModel) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model,
            http_client: reqwest::Client::new(),
            temperature: 0.0,
            max_tokens: 512,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Bound each HTTP round-trip; the service applies its own overall timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(self)
    }

    async fn request_completion(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.model_id().to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send grading request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Grader API error ({}): {}", status, error_text);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse grader response")?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Grader response contained no choices")
    }
}

impl std::fmt::Debug for LlmGradingOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGradingOracle")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[async_trait]
impl GradingOracle for LlmGradingOracle {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult> {
        let reply = self
            .request_completion(SYSTEM_PROMPT, &build_user_prompt(request))
            .await?;
        Ok(parse_verdict(&reply))
    }
}

/// Render a titled list of `input → output` lines
pub fn format_pairs(title: &str, pairs: &[IoPair]) -> String {
    if pairs.is_empty() {
        return format!("{}: none provided.", title);
    }
    let mut lines = vec![format!("{}:", title)];
    lines.extend(
        pairs
            .iter()
            .map(|pair| format!("- {} → {}", pair.input, pair.output)),
    );
    lines.join("\n")
}

pub fn build_user_prompt(request: &GradingRequest) -> String {
    format!(
        "Determine if the hypothesis is correct.\n\n\
         Official rule: {}\n\
         Hypothesis: {}\n\n\
         {}\n\n{}\n\n{}\n\n{}",
        request.official_description,
        request.hypothesis,
        format_pairs("Sample cases", &request.sample_cases),
        format_pairs("Held-out test cases", &request.test_cases),
        format_pairs("Human query history", &request.query_history),
        GRADING_GUIDELINES,
    )
}

/// A reply is a pass iff its first word is YES
pub fn parse_verdict(reply: &str) -> GradingResult {
    let text = reply.trim();
    GradingResult {
        success: text.to_uppercase().starts_with("YES"),
        explanation: text.to_string(),
    }
}
