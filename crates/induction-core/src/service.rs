//! Induction service
//!
//! Facade over the catalog, registry, oracle and logger implementing the
//! four participant operations: start, query, submit, end.
//!
//! Locking discipline: each operation takes the target session's mutex only
//! for in-memory work. `submit` snapshots the evidence, releases the lock,
//! grades (bounded by a semaphore and a timeout), then re-acquires the lock
//! to record the verdict. Log writes are claimed under the lock and run on
//! the blocking pool after it is released.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::catalog::{TaskCatalog, TaskCategory};
use crate::ledger::QueryOutcome;
use crate::logger::{SessionLogger, SessionRecord};
use crate::oracle::{GradingOracle, GradingRequest, GradingResult};
use crate::registry::SessionRegistry;
use crate::session::{SessionId, SessionStart};
use crate::value::Value;
use crate::{InductionError, Result};

/// Service tuning
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Upper bound on one grading call
    pub oracle_timeout: Duration,
    /// Grading calls allowed in flight at once
    pub max_concurrent_gradings: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            oracle_timeout: Duration::from_secs(60),
            max_concurrent_gradings: 8,
        }
    }
}

/// Result of a graded submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub explanation: String,
    /// The session is finished; only `end` remains
    pub task_complete: bool,
    pub submissions: usize,
}

/// Session engine
pub struct InductionService {
    catalog: Arc<TaskCatalog>,
    registry: SessionRegistry,
    oracle: Arc<dyn GradingOracle>,
    logger: Arc<dyn SessionLogger>,
    grading_permits: Semaphore,
    settings: ServiceSettings,
}

impl InductionService {
    pub fn new(
        catalog: Arc<TaskCatalog>,
        oracle: Arc<dyn GradingOracle>,
        logger: Arc<dyn SessionLogger>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            catalog,
            registry: SessionRegistry::new(),
            oracle,
            logger,
            grading_permits: Semaphore::new(settings.max_concurrent_gradings.max(1)),
            settings,
        }
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Bind a task and open a session for `participant`
    pub fn start_session(
        &self,
        participant: &str,
        task_id: &str,
        category: &str,
    ) -> Result<SessionStart> {
        let category: TaskCategory =
            category
                .parse()
                .map_err(|_| InductionError::InvalidTaskConfig {
                    task_id: task_id.to_string(),
                    category: category.to_string(),
                })?;
        let binding = self.catalog.bind(task_id, category)?;
        let (_, handle) = self.registry.create(participant, binding);
        let start = handle.lock().start_info();
        tracing::info!(
            "{} started {}/{} as session {}",
            participant,
            category,
            task_id,
            start.session_id
        );
        Ok(start)
    }

    /// Evaluate one batch of inputs
    pub fn query(&self, id: &SessionId, inputs: Vec<Value>) -> Result<QueryOutcome> {
        let handle = self.registry.get(id)?;
        let mut session = handle.lock();
        session.query(inputs)
    }

    /// Grade a hypothesis and record the verdict
    pub async fn submit(&self, id: &SessionId, hypothesis: &str) -> Result<SubmissionOutcome> {
        let snapshot = {
            let handle = self.registry.get(id)?;
            let session = handle.lock();
            session.grading_snapshot(hypothesis)?
        };

        let verdict = self.grade(&snapshot.request).await?;

        let handle = self.registry.get(id)?;
        let (success, submissions, pending) = {
            let mut session = handle.lock();
            let success = session
                .record_submission(&snapshot, verdict.clone())?
                .grading_result
                .success;
            let pending = if success {
                session.begin_flush(Utc::now())
            } else {
                None
            };
            (success, session.submissions().len(), pending)
        };

        if let Some(record) = pending {
            match self.append(record).await {
                Ok(record) => handle.lock().finish_flush(record),
                Err(e) => {
                    // record stays pending; `end` retries the flush
                    tracing::error!("Failed to log session {}: {}", id, e);
                    handle.lock().abort_flush();
                }
            }
        }

        Ok(SubmissionOutcome {
            success,
            explanation: verdict.explanation,
            task_complete: success,
            submissions,
        })
    }

    /// Flush the session log if still pending and remove the session.
    /// Returns the record that went to the logger.
    pub async fn end(&self, id: &SessionId) -> Result<SessionRecord> {
        let handle = self.registry.get(id)?;
        let pending = {
            let mut session = handle.lock();
            session.ensure_open()?;
            session.begin_flush(Utc::now())
        };

        let written = match pending {
            Some(record) => match self.append(record).await {
                Ok(record) => Some(record),
                Err(e) => {
                    handle.lock().abort_flush();
                    return Err(e);
                }
            },
            None => None,
        };

        let mut session = handle.lock();
        if let Some(record) = written {
            session.finish_flush(record);
        }
        session.ensure_open()?;
        session.close();
        self.registry.remove(id)?;

        tracing::info!("Session ended: {}", id);
        // a flush still in flight from `submit` has no record to hand back yet
        Ok(session
            .logged_record()
            .cloned()
            .unwrap_or_else(|| session.record(Utc::now())))
    }

    /// Grade under the concurrency bound; the timeout covers the wait for a
    /// permit as well as the call itself
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult> {
        let timeout = self.settings.oracle_timeout;
        let graded = tokio::time::timeout(timeout, async {
            let _permit = self
                .grading_permits
                .acquire()
                .await
                .map_err(|e| InductionError::OracleFailure(e.to_string()))?;
            self.oracle.grade(request).await.map_err(|e| {
                tracing::warn!("Grading call failed: {:#}", e);
                InductionError::OracleFailure(format!("{:#}", e))
            })
        })
        .await;

        match graded {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Grading call timed out after {:?}", timeout);
                Err(InductionError::OracleTimeout(timeout))
            }
        }
    }

    /// Write `record` on the blocking pool
    async fn append(&self, record: SessionRecord) -> Result<SessionRecord> {
        let logger = Arc::clone(&self.logger);
        let record = tokio::task::spawn_blocking(move || {
            logger.append(&record)?;
            Ok::<_, InductionError>(record)
        })
        .await
        .map_err(|e| InductionError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        tracing::info!(
            "Session {} logged ({} queries, success: {})",
            record.session_id,
            record.queries_used,
            record.success
        );
        Ok(record)
    }
}

impl std::fmt::Debug for InductionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InductionService")
            .field("sessions", &self.registry.len())
            .field("settings", &self.settings)
            .finish()
    }
}
