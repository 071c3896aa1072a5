//! # axiom-mdata-core
//!
//! Market-data ingestion core: a reconnecting broker WebSocket session that
//! decodes Level-1, Level-2, and OHLCV chart frames, batches them through a
//! bounded flush pipeline, and persists them to time-partitioned Postgres
//! tables while keeping subscriptions reconciled against a desired set
//! stored in the same database.
//!
//! ## Quick Start
//!
//! ```no_run
//! use axiom_mdata_core::config::Config;
//! use axiom_mdata_core::store::PgStore;
//!
//! # async fn run() -> axiom_mdata_core::error::Result<()> {
//! let config = Config::from_env()?;
//! let store = PgStore::connect(&config.db_url).await?;
//! // Wire a `TokenLifecycle`, a `WsStreamingSession`, and a `Supervisor`
//! // around `store` to start streaming; see `src/bin/axiom_core.rs`.
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod beque;
pub mod config;
pub mod constants;
pub mod decode;
pub mod diagnostics;
pub mod differ;
pub mod entities;
pub mod error;
pub mod flush;
pub mod store;
pub mod supervisor;
pub mod upstream;

pub use error::{CoreError, Result};
