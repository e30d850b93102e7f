//! Induction Gateway - HTTP surface for rule induction sessions
//!
//! Exposes the session engine in `induction-core` as a small JSON API used
//! by the evaluation front end.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Induction Gateway                   │
//! ├─────────────────────────────────────────────────────┤
//! │  POST /api/start-task        POST /api/query         │
//! │  POST /api/submit-hypothesis POST /api/end-task      │
//! │  GET  /api/tasks             GET  /health            │
//! │                       │                              │
//! │            ┌──────────▼──────────┐                   │
//! │            │  InductionService   │                   │
//! │            └──────────┬──────────┘                   │
//! │        ┌──────────────┼──────────────┐               │
//! │  ┌─────▼─────┐  ┌─────▼─────┐  ┌─────▼─────┐         │
//! │  │  Catalog  │  │  Grader   │  │ JSONL log │         │
//! │  └───────────┘  └───────────┘  └───────────┘         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod gateway;

pub use config::{GatewayConfig, OracleSettings};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayState};

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5001;

/// Default host
pub const DEFAULT_HOST: &str = "127.0.0.1";
