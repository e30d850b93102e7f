//! Session lifecycle
//!
//! A session binds one participant to one task. It is `Active` until a
//! submission is graded correct, then `Terminated`; after that only `end`
//! is accepted. Ending terminates and closes the session for good.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::TaskBinding;
use crate::ledger::{QueryBudgetLedger, QueryOutcome};
use crate::logger::SessionRecord;
use crate::oracle::{GradingRequest, GradingResult};
use crate::rules::Schema;
use crate::value::{IoPair, Value};
use crate::{InductionError, Result};

/// Unique session identifier (random UUID, not guessable from other ids)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting queries and submissions
    Active,
    /// A submission succeeded; only `end` is accepted
    Terminated,
}

/// One graded hypothesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub hypothesis: String,
    /// `queries_used` when the evidence was handed to the grader
    pub queries_at_submission: usize,
    pub timestamp: DateTime<Utc>,
    pub grading_result: GradingResult,
}

/// What the participant sees when a session starts
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub session_id: SessionId,
    pub input_spec: Schema,
    pub output_spec: Schema,
    pub sample_cases: Vec<IoPair>,
    pub test_cases_count: usize,
    pub total_queries: usize,
    pub query_batch_size: usize,
}

/// Evidence captured under the session lock for an out-of-lock grading call
#[derive(Debug, Clone)]
pub struct GradingSnapshot {
    pub request: GradingRequest,
    pub queries_at_submission: usize,
}

/// Session - one participant's attempt at one task
#[derive(Debug)]
pub struct Session {
    /// Session ID
    pub id: SessionId,

    /// Participant name
    pub participant: String,

    /// Bound task
    pub task: TaskBinding,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    ledger: QueryBudgetLedger,
    submissions: Vec<Submission>,
    status: SessionStatus,
    log: LogState,
    closed: bool,
}

/// Where the session's log record stands
#[derive(Debug, Clone)]
enum LogState {
    Pending,
    /// Claimed by one caller; the write happens outside the session lock
    Writing,
    Written(SessionRecord),
}

impl Session {
    pub fn new(participant: impl Into<String>, task: TaskBinding) -> Self {
        Self {
            id: SessionId::new(),
            participant: participant.into(),
            ledger: QueryBudgetLedger::new(task.config),
            task,
            created_at: Utc::now(),
            submissions: Vec::new(),
            status: SessionStatus::Active,
            log: LogState::Pending,
            closed: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        !self.closed && self.status == SessionStatus::Active
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn queries_used(&self) -> usize {
        self.ledger.queries_used()
    }

    pub fn remaining(&self) -> usize {
        self.ledger.remaining()
    }

    pub fn query_history(&self) -> &[IoPair] {
        self.ledger.history()
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// True iff any submission was graded correct
    pub fn succeeded(&self) -> bool {
        self.submissions.iter().any(|s| s.grading_result.success)
    }

    /// Whether the session still owes the logger its record
    pub fn needs_flush(&self) -> bool {
        matches!(self.log, LogState::Pending)
    }

    /// Claim the pending flush and build its record. Returns `None` when the
    /// record is already written or another caller is writing it.
    pub fn begin_flush(&mut self, ended_at: DateTime<Utc>) -> Option<SessionRecord> {
        if !self.needs_flush() {
            return None;
        }
        self.log = LogState::Writing;
        Some(self.record(ended_at))
    }

    /// The claimed write landed
    pub fn finish_flush(&mut self, record: SessionRecord) {
        self.log = LogState::Written(record);
    }

    /// The claimed write failed; the next flush retries it
    pub fn abort_flush(&mut self) {
        if matches!(self.log, LogState::Writing) {
            self.log = LogState::Pending;
        }
    }

    /// The record handed to the logger, once written
    pub fn logged_record(&self) -> Option<&SessionRecord> {
        match &self.log {
            LogState::Written(record) => Some(record),
            _ => None,
        }
    }

    pub fn start_info(&self) -> SessionStart {
        SessionStart {
            session_id: self.id.clone(),
            input_spec: self.task.rule.input_spec(),
            output_spec: self.task.rule.output_spec(),
            sample_cases: self.task.sample_cases.as_ref().clone(),
            test_cases_count: self.task.test_cases.len(),
            total_queries: self.task.config.total_queries,
            query_batch_size: self.task.config.query_batch_size,
        }
    }

    /// Fail unless the session is still registered
    pub fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(InductionError::SessionNotFound(self.id.to_string()));
        }
        Ok(())
    }

    /// Fail unless the session accepts queries and submissions
    pub fn ensure_active(&self) -> Result<()> {
        self.ensure_open()?;
        if self.status == SessionStatus::Terminated {
            return Err(InductionError::SessionTerminated(self.id.to_string()));
        }
        Ok(())
    }

    /// Evaluate a batch against the bound rule
    pub fn query(&mut self, inputs: Vec<Value>) -> Result<QueryOutcome> {
        self.ensure_active()?;
        let batch_size = inputs.len();
        match self.ledger.query(self.task.rule.as_ref(), inputs) {
            Ok(outcome) => {
                tracing::debug!(
                    "Session {} answered {} inputs ({} remaining)",
                    self.id,
                    batch_size,
                    outcome.queries_remaining
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::debug!("Session {} rejected batch of {}: {}", self.id, batch_size, e);
                Err(e)
            }
        }
    }

    /// Capture the evidence the grader needs for `hypothesis`
    pub fn grading_snapshot(&self, hypothesis: &str) -> Result<GradingSnapshot> {
        self.ensure_active()?;
        if hypothesis.trim().is_empty() {
            return Err(InductionError::EmptyHypothesis);
        }
        Ok(GradingSnapshot {
            request: GradingRequest {
                hypothesis: hypothesis.to_string(),
                official_description: self.task.rule.description().to_string(),
                test_cases: self.task.test_cases.as_ref().clone(),
                sample_cases: self.task.sample_cases.as_ref().clone(),
                query_history: self.ledger.history().to_vec(),
            },
            queries_at_submission: self.ledger.queries_used(),
        })
    }

    /// Append a graded submission; a correct one terminates the session
    pub fn record_submission(
        &mut self,
        snapshot: &GradingSnapshot,
        result: GradingResult,
    ) -> Result<&Submission> {
        self.ensure_active()?;
        let success = result.success;
        self.submissions.push(Submission {
            hypothesis: snapshot.request.hypothesis.clone(),
            queries_at_submission: snapshot.queries_at_submission,
            timestamp: Utc::now(),
            grading_result: result,
        });

        if success {
            self.status = SessionStatus::Terminated;
            tracing::info!(
                "Session {} solved {} after {} queries",
                self.id,
                self.task.task_id,
                snapshot.queries_at_submission
            );
        } else {
            tracing::info!(
                "Session {} submission {} graded incorrect",
                self.id,
                self.submissions.len()
            );
        }

        Ok(&self.submissions[self.submissions.len() - 1])
    }

    /// End the session; later lookups fail with `SessionNotFound`
    pub fn close(&mut self) {
        self.status = SessionStatus::Terminated;
        self.closed = true;
    }

    /// Build the log record for this session as of `ended_at`
    pub fn record(&self, ended_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            session_id: self.id.clone(),
            user_name: self.participant.clone(),
            task_id: self.task.task_id.clone(),
            task_category: self.task.category,
            rule_description: self.task.rule.description().to_string(),
            queries_used: self.ledger.queries_used(),
            query_history: self.ledger.history().to_vec(),
            submissions: self.submissions.clone(),
            start_time: self.created_at,
            end_time: ended_at,
            success: self.succeeded(),
        }
    }
}
