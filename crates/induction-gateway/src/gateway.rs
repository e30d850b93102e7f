//! Main Gateway implementation
//!
//! JSON-over-HTTP front for [`InductionService`]. Handlers decode the body,
//! call the service and let [`GatewayError`] shape failures.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use induction_core::oracle::{LlmGradingOracle, OracleModel};
use induction_core::{
    InductionService, JsonlSessionLogger, SessionId, TaskCatalog, TaskTable, Value,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::{GatewayError, Result};

/// Body of `POST /api/start-task`
#[derive(Debug, Deserialize)]
pub struct StartTaskRequest {
    pub user_name: String,
    pub task_id: String,
    pub task_category: String,
}

/// Body of `POST /api/query`
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub session_id: SessionId,
    #[serde(default)]
    pub inputs: Vec<Value>,
}

/// Body of `POST /api/submit-hypothesis`
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub session_id: SessionId,
    pub hypothesis: String,
}

/// Body of `POST /api/end-task`
#[derive(Debug, Deserialize)]
pub struct EndTaskRequest {
    pub session_id: SessionId,
}

/// Gateway state shared across handlers
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub service: Arc<InductionService>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, service: Arc<InductionService>) -> Self {
        Self { config, service }
    }

    /// Wire the catalog, LLM grader and JSONL log described by `config`
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        let catalog = match &config.tasks_path {
            Some(path) => {
                tracing::info!("Loading task table from {}", path);
                TaskCatalog::with_table(TaskTable::from_file(path)?)
            }
            None => TaskCatalog::builtin(),
        };
        catalog.validate()?;

        let settings = &config.oracle;
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            GatewayError::InvalidConfig(format!("{} is not set", settings.api_key_env))
        })?;
        let oracle = LlmGradingOracle::new(api_key, OracleModel::from(settings.model.as_str()))
            .with_endpoint(settings.endpoint.clone())
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens)
            .with_request_timeout(Duration::from_secs(settings.timeout_secs))
            .map_err(|e| GatewayError::Internal(format!("{:#}", e)))?;

        let logger = JsonlSessionLogger::open(&config.session_log_path)?;

        let service = InductionService::new(
            Arc::new(catalog),
            Arc::new(oracle),
            Arc::new(logger),
            config.service_settings(),
        );
        Ok(Self::new(config, Arc::new(service)))
    }
}

/// Main Gateway
#[derive(Debug)]
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    pub fn new(state: GatewayState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Create a gateway from configuration
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        Ok(Self::new(GatewayState::from_config(config)?))
    }

    /// Get gateway state
    pub fn state(&self) -> Arc<GatewayState> {
        self.state.clone()
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .route("/api/tasks", get(Self::handle_tasks))
            .route("/api/start-task", post(Self::handle_start_task))
            .route("/api/query", post(Self::handle_query))
            .route("/api/submit-hypothesis", post(Self::handle_submit))
            .route("/api/end-task", post(Self::handle_end_task))
            .layer(self.cors_layer())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the gateway server; returns on Ctrl+C
    pub async fn start(&self) -> Result<()> {
        let addr = self.state.config.socket_addr()?;
        let router = self.build_router();

        tracing::info!("Induction Gateway starting on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                }
                tracing::info!("Gateway shutdown initiated");
            })
            .await?;

        Ok(())
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins = &self.state.config.cors_origins;
        if origins.is_empty() {
            return CorsLayer::permissive();
        }

        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    }

    // HTTP handlers

    async fn handle_health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "healthy",
            "version": crate::VERSION,
            "sessions": state.service.registry().len(),
        }))
    }

    async fn handle_tasks(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
        Json(state.service.catalog().table().clone())
    }

    async fn handle_start_task(
        State(state): State<Arc<GatewayState>>,
        payload: std::result::Result<Json<StartTaskRequest>, JsonRejection>,
    ) -> Result<impl IntoResponse> {
        let request = decode(payload)?;
        let start = state.service.start_session(
            &request.user_name,
            &request.task_id,
            &request.task_category,
        )?;
        Ok(Json(start))
    }

    async fn handle_query(
        State(state): State<Arc<GatewayState>>,
        payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
    ) -> Result<impl IntoResponse> {
        let request = decode(payload)?;
        let outcome = state.service.query(&request.session_id, request.inputs)?;
        Ok(Json(outcome))
    }

    async fn handle_submit(
        State(state): State<Arc<GatewayState>>,
        payload: std::result::Result<Json<SubmitRequest>, JsonRejection>,
    ) -> Result<impl IntoResponse> {
        let request = decode(payload)?;
        let outcome = state
            .service
            .submit(&request.session_id, &request.hypothesis)
            .await?;
        Ok(Json(outcome))
    }

    async fn handle_end_task(
        State(state): State<Arc<GatewayState>>,
        payload: std::result::Result<Json<EndTaskRequest>, JsonRejection>,
    ) -> Result<impl IntoResponse> {
        let request = decode(payload)?;
        let record = state.service.end(&request.session_id).await?;
        Ok(Json(serde_json::json!({
            "success": true,
            "solved": record.success,
            "queries_used": record.queries_used,
            "submissions": record.submissions.len(),
        })))
    }
}

fn decode<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))
}
