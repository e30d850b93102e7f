//! End-to-end session flows through `InductionService`

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use induction_core::catalog::{TaskEntry, TaskTable};
use induction_core::oracle::{GradingOracle, GradingRequest, GradingResult};
use induction_core::service::{InductionService, ServiceSettings};
use induction_core::{
    InductionError, JsonlSessionLogger, MemorySessionLogger, SessionHandle, SessionLogger,
    SessionRecord, SessionStatus, TaskCatalog, Value,
};

/// Accepts hypotheses that mention `concept`; remembers every request it saw
struct ConceptOracle {
    concept: &'static str,
    seen: Mutex<Vec<GradingRequest>>,
}

impl ConceptOracle {
    fn new(concept: &'static str) -> Self {
        Self {
            concept,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GradingOracle for ConceptOracle {
    async fn grade(&self, request: &GradingRequest) -> anyhow::Result<GradingResult> {
        self.seen.lock().push(request.clone());
        let success = request.hypothesis.to_lowercase().contains(self.concept);
        Ok(GradingResult {
            success,
            explanation: if success {
                format!("YES - names {}", self.concept)
            } else {
                "NO - the hypothesis is vacuous".to_string()
            },
        })
    }
}

struct BrokenOracle;

#[async_trait]
impl GradingOracle for BrokenOracle {
    async fn grade(&self, _request: &GradingRequest) -> anyhow::Result<GradingResult> {
        anyhow::bail!("Grader API error (503 Service Unavailable)")
    }
}

struct SlowOracle;

#[async_trait]
impl GradingOracle for SlowOracle {
    async fn grade(&self, _request: &GradingRequest) -> anyhow::Result<GradingResult> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(GradingResult {
            success: true,
            explanation: "YES".to_string(),
        })
    }
}

/// Counts grading calls in flight and the peak concurrency reached
#[derive(Default)]
struct CountingOracle {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl GradingOracle for CountingOracle {
    async fn grade(&self, _request: &GradingRequest) -> anyhow::Result<GradingResult> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(GradingResult {
            success: false,
            explanation: "NO".to_string(),
        })
    }
}

struct FailingLogger;

impl SessionLogger for FailingLogger {
    fn append(&self, _record: &SessionRecord) -> induction_core::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
    }
}

/// Grades correct after a fixed delay
struct DelayedOracle(Duration);

#[async_trait]
impl GradingOracle for DelayedOracle {
    async fn grade(&self, _request: &GradingRequest) -> anyhow::Result<GradingResult> {
        tokio::time::sleep(self.0).await;
        Ok(GradingResult {
            success: true,
            explanation: "YES".to_string(),
        })
    }
}

/// Records whether the watched session was unlocked during each append
#[derive(Default)]
struct LockCheckingLogger {
    watched: Mutex<Option<SessionHandle>>,
    unlocked: Mutex<Vec<bool>>,
    records: Mutex<Vec<SessionRecord>>,
}

impl SessionLogger for LockCheckingLogger {
    fn append(&self, record: &SessionRecord) -> induction_core::Result<()> {
        if let Some(handle) = self.watched.lock().as_ref() {
            self.unlocked.lock().push(handle.try_lock().is_some());
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}

fn prime_only_catalog(total_queries: usize, batch: usize) -> Arc<TaskCatalog> {
    let table = TaskTable {
        numerical: vec![TaskEntry::new("is_prime", total_queries, batch)],
        lexical: vec![],
    };
    Arc::new(TaskCatalog::with_table(table))
}

fn service_with(
    oracle: Arc<dyn GradingOracle>,
    logger: Arc<dyn SessionLogger>,
) -> InductionService {
    InductionService::new(
        prime_only_catalog(20, 5),
        oracle,
        logger,
        ServiceSettings::default(),
    )
}

#[tokio::test]
async fn test_correct_hypothesis_terminates_and_logs_once() {
    let oracle = Arc::new(ConceptOracle::new("prime"));
    let logger = Arc::new(MemorySessionLogger::new());
    let service = service_with(oracle.clone(), logger.clone());

    let start = service.start_session("ada", "is_prime", "numerical").unwrap();
    assert_eq!(start.total_queries, 20);
    assert_eq!(start.query_batch_size, 5);

    let id = start.session_id;
    service
        .query(&id, vec![Value::Int(7), Value::Int(8), Value::Text("11".into())])
        .unwrap();

    let outcome = service.submit(&id, "returns 1 if prime else 0").await.unwrap();
    assert!(outcome.success);
    assert!(outcome.task_complete);

    // the grader saw the withheld description, the test cases and the history
    let seen = oracle.seen.lock().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].official_description, "1 if prime, 0 otherwise");
    let expected: Vec<(i64, i64)> = vec![(2, 1), (3, 1), (4, 0), (5, 1), (6, 0)];
    let test_cases: Vec<(i64, i64)> = seen[0]
        .test_cases
        .iter()
        .take(5)
        .map(|pair| (pair.input.as_int().unwrap(), pair.output.as_int().unwrap()))
        .collect();
    assert_eq!(test_cases, expected);
    assert_eq!(seen[0].query_history.len(), 3);

    let handle = service.registry().get(&id).unwrap();
    assert_eq!(handle.lock().status(), SessionStatus::Terminated);

    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert_eq!(records[0].queries_used, 3);
    assert_eq!(records[0].submissions.len(), 1);
    assert_eq!(records[0].submissions[0].queries_at_submission, 3);

    // terminated sessions refuse further work
    let err = service.query(&id, vec![Value::Int(2)]).unwrap_err();
    assert!(err.is_not_found());
    let err = service.submit(&id, "primality").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(oracle.seen.lock().len(), 1);

    // end is valid exactly once and does not duplicate the record
    let ended = service.end(&id).await.unwrap();
    assert_eq!(logger.len(), 1);
    assert_eq!(ended, logger.records()[0]);
    assert!(matches!(
        service.end(&id).await,
        Err(InductionError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_vacuous_hypothesis_keeps_session_active() {
    let oracle = Arc::new(ConceptOracle::new("prime"));
    let logger = Arc::new(MemorySessionLogger::new());
    let service = service_with(oracle, logger.clone());

    let id = service
        .start_session("alan", "is_prime", "numerical")
        .unwrap()
        .session_id;
    service.query(&id, vec![Value::Int(4), Value::Int(5)]).unwrap();

    let outcome = service.submit(&id, "the right answer").await.unwrap();
    assert!(!outcome.success);
    assert!(!outcome.task_complete);
    assert_eq!(outcome.submissions, 1);

    {
        let handle = service.registry().get(&id).unwrap();
        let session = handle.lock();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.queries_used(), 2);
        assert_eq!(session.remaining(), 18);
    }
    assert!(logger.is_empty());

    // resubmission is allowed and queries may continue in between
    service.query(&id, vec![Value::Int(13)]).unwrap();
    let outcome = service.submit(&id, "still the right answer").await.unwrap();
    assert_eq!(outcome.submissions, 2);

    let record = service.end(&id).await.unwrap();
    assert!(!record.success);
    assert_eq!(record.submissions.len(), 2);
    assert_eq!(record.submissions[1].queries_at_submission, 3);
    assert_eq!(logger.len(), 1);
}

#[tokio::test]
async fn test_blank_hypothesis_never_reaches_the_grader() {
    let oracle = Arc::new(ConceptOracle::new("prime"));
    let service = service_with(oracle.clone(), Arc::new(MemorySessionLogger::new()));
    let id = service
        .start_session("ada", "is_prime", "numerical")
        .unwrap()
        .session_id;

    let err = service.submit(&id, "   ").await.unwrap_err();
    assert_eq!(err.reason_code(), "empty_hypothesis");
    assert!(oracle.seen.lock().is_empty());
}

#[tokio::test]
async fn test_oracle_failure_is_not_a_submission() {
    let logger = Arc::new(MemorySessionLogger::new());
    let service = service_with(Arc::new(BrokenOracle), logger.clone());
    let id = service
        .start_session("ada", "is_prime", "numerical")
        .unwrap()
        .session_id;

    let err = service.submit(&id, "primality").await.unwrap_err();
    assert!(matches!(err, InductionError::OracleFailure(_)));
    assert!(err.is_retryable());

    let handle = service.registry().get(&id).unwrap();
    let session = handle.lock();
    assert!(session.submissions().is_empty());
    assert!(session.is_active());
    assert!(logger.is_empty());
}

#[tokio::test]
async fn test_oracle_timeout_is_retryable() {
    let service = InductionService::new(
        prime_only_catalog(20, 5),
        Arc::new(SlowOracle),
        Arc::new(MemorySessionLogger::new()),
        ServiceSettings {
            oracle_timeout: Duration::from_millis(50),
            max_concurrent_gradings: 1,
        },
    );
    let id = service
        .start_session("ada", "is_prime", "numerical")
        .unwrap()
        .session_id;

    let err = service.submit(&id, "primality").await.unwrap_err();
    assert!(matches!(err, InductionError::OracleTimeout(_)));
    assert!(err.is_retryable());

    let handle = service.registry().get(&id).unwrap();
    assert!(handle.lock().submissions().is_empty());
}

#[tokio::test]
async fn test_waiting_for_a_grading_slot_counts_against_the_timeout() {
    // one slot, 200ms per grade, 300ms budget: the first caller fits, the
    // ones queued behind it run out of time while waiting or grading
    let service = Arc::new(InductionService::new(
        prime_only_catalog(20, 5),
        Arc::new(DelayedOracle(Duration::from_millis(200))),
        Arc::new(MemorySessionLogger::new()),
        ServiceSettings {
            oracle_timeout: Duration::from_millis(300),
            max_concurrent_gradings: 1,
        },
    ));

    let tasks: Vec<_> = (0..3)
        .map(|i| {
            let service = Arc::clone(&service);
            let id = service
                .start_session(&format!("user-{}", i), "is_prime", "numerical")
                .unwrap()
                .session_id;
            tokio::spawn(async move { service.submit(&id, "primality").await })
        })
        .collect();

    let outcomes: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();
    let solved = outcomes.iter().filter(|o| o.is_ok()).count();
    let timed_out = outcomes
        .iter()
        .filter(|o| matches!(o, Err(InductionError::OracleTimeout(_))))
        .count();
    assert_eq!(solved, 1);
    assert_eq!(timed_out, 2);
}

#[tokio::test]
async fn test_log_write_happens_outside_the_session_lock() {
    let logger = Arc::new(LockCheckingLogger::default());
    let service = service_with(Arc::new(ConceptOracle::new("prime")), logger.clone());

    let solved = service
        .start_session("ada", "is_prime", "numerical")
        .unwrap()
        .session_id;
    *logger.watched.lock() = Some(service.registry().get(&solved).unwrap());
    service.submit(&solved, "primality").await.unwrap();
    let ended = service.end(&solved).await.unwrap();
    assert_eq!(ended, logger.records.lock()[0]);

    let abandoned = service
        .start_session("alan", "is_prime", "numerical")
        .unwrap()
        .session_id;
    *logger.watched.lock() = Some(service.registry().get(&abandoned).unwrap());
    service.end(&abandoned).await.unwrap();

    assert_eq!(*logger.unlocked.lock(), vec![true, true]);
    assert_eq!(logger.records.lock().len(), 2);
}

#[tokio::test]
async fn test_grading_concurrency_is_bounded() {
    let oracle = Arc::new(CountingOracle::default());
    let service = Arc::new(InductionService::new(
        prime_only_catalog(20, 5),
        oracle.clone(),
        Arc::new(MemorySessionLogger::new()),
        ServiceSettings {
            oracle_timeout: Duration::from_secs(5),
            max_concurrent_gradings: 2,
        },
    ));

    let ids: Vec<_> = (0..6)
        .map(|i| {
            service
                .start_session(&format!("user-{}", i), "is_prime", "numerical")
                .unwrap()
                .session_id
        })
        .collect();

    let tasks: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.submit(&id, "a guess").await })
        })
        .collect();
    for outcome in futures::future::join_all(tasks).await {
        assert!(!outcome.unwrap().unwrap().success);
    }

    assert!(oracle.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(oracle.in_flight.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_queries_never_overspend() {
    let service = Arc::new(InductionService::new(
        prime_only_catalog(20, 5),
        Arc::new(ConceptOracle::new("prime")),
        Arc::new(MemorySessionLogger::new()),
        ServiceSettings::default(),
    ));
    let id = service
        .start_session("ada", "is_prime", "numerical")
        .unwrap()
        .session_id;

    let threads: Vec<_> = (0..16)
        .map(|i| {
            let service = Arc::clone(&service);
            let id = id.clone();
            std::thread::spawn(move || {
                let batch = (0..3).map(|j| Value::Int(i * 3 + j)).collect();
                service.query(&id, batch).is_ok()
            })
        })
        .collect();
    let accepted = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|ok| *ok)
        .count();

    let handle = service.registry().get(&id).unwrap();
    let session = handle.lock();
    // 6 batches of 3 fit in 20; the 7th would need 21
    assert_eq!(accepted, 6);
    assert_eq!(session.queries_used(), 18);
    assert_eq!(session.query_history().len(), 18);
    assert!(session.queries_used() <= 20);
}

#[test]
fn test_unknown_task_and_session() {
    let service = service_with(
        Arc::new(ConceptOracle::new("prime")),
        Arc::new(MemorySessionLogger::new()),
    );

    let err = service
        .start_session("ada", "is_even", "numerical")
        .unwrap_err();
    assert_eq!(err.to_string(), "Task is_even not found in numerical tasks");

    let err = service
        .start_session("ada", "is_prime", "lexical")
        .unwrap_err();
    assert!(matches!(err, InductionError::InvalidTaskConfig { .. }));

    let missing = induction_core::SessionId::new();
    assert!(matches!(
        service.query(&missing, vec![Value::Int(1)]),
        Err(InductionError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_log_write_is_retried_on_end() {
    let service = service_with(Arc::new(ConceptOracle::new("prime")), Arc::new(FailingLogger));
    let id = service
        .start_session("ada", "is_prime", "numerical")
        .unwrap()
        .session_id;

    // verdict is still reported even though the log write failed
    let outcome = service.submit(&id, "primality").await.unwrap();
    assert!(outcome.success);

    let err = service.end(&id).await.unwrap_err();
    assert_eq!(err.reason_code(), "io_error");
    // session stays registered so the flush can be retried
    assert!(service.registry().contains(&id));
}

#[tokio::test]
async fn test_jsonl_log_after_full_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("human_evaluations.jsonl");
    let logger = Arc::new(JsonlSessionLogger::open(&path).unwrap());
    let service = service_with(Arc::new(ConceptOracle::new("prime")), logger);

    let id = service
        .start_session("ada", "is_prime", "numerical")
        .unwrap()
        .session_id;
    service
        .query(&id, vec![Value::Text("(7)".into()), Value::Int(9)])
        .unwrap();
    service.submit(&id, "something about parity").await.unwrap();
    service.submit(&id, "checks primality").await.unwrap();
    let ended = service.end(&id).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);

    let record: SessionRecord = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record.session_id, id);
    assert_eq!(record.user_name, "ada");
    assert!(record.success);
    assert_eq!(record.submissions.len(), 2);
    assert!(!record.submissions[0].grading_result.success);
    assert_eq!(record.query_history[0].input, Value::Int(7));
    assert_eq!(record.query_history[0].output, Value::Int(1));
    assert!(record.end_time >= record.start_time);
    assert_eq!(ended, record);
}
