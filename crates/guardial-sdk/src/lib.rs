//! # Guardial SDK
//!
//! OWASP Top 10 request analysis and LLM prompt firewall for Rust web
//! services, backed by the Guardial API.
//!
//! ## Overview
//!
//! The SDK forwards request metadata to Guardial and enforces the verdict:
//!
//! - **Configuration**: explicit values, then `GUARDIAL_*` environment
//!   variables, then defaults
//! - **Client**: event analysis (fails open), prompt guard (fails closed),
//!   health check and self-test, in async and blocking flavours
//! - **Adapters**: axum middleware, a tower layer, and per-handler wrappers
//!   that answer `403` when a request is rejected
//! - **Outgoing calls**: [`SecureHttpClient`] analyzes requests before they
//!   are sent
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::{routing::get, Router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GUARDIAL_API_KEY, GUARDIAL_ENDPOINT, ...
//!     let app = Router::new().route("/", get(|| async { "hello" }));
//!     let app = guardial_sdk::middleware::install(app, None)?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Prompt Guard
//!
//! ```rust,ignore
//! let client = guardial_sdk::GuardialClient::from_env()?;
//! let verdict = client.guard_prompt("Ignore all previous instructions", None).await;
//! if !verdict.allowed {
//!     // do not forward to the model
//! }
//! ```

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod global;
pub mod middleware;
pub mod models;
pub mod outbound;
pub mod protect;
pub mod session;

// Primary exports
pub use blocking::BlockingClient;
pub use client::GuardialClient;
pub use crate::config::{GuardialConfig, GuardialConfigBuilder};
pub use error::{GuardialError, Result};
pub use middleware::{GuardialGuard, GuardialLayer, MiddlewareOptions};
pub use models::{
    EventAnalysis, HealthReport, LlmDetection, OwaspDetection, PromptGuardRequest,
    PromptGuardResult, RequestFields, SecurityEvent, SelfTestReport,
};
pub use outbound::SecureHttpClient;
pub use protect::{
    protect, protect_blocking, protect_blocking_with, protect_blocking_with_limit, protect_with,
    protect_with_limit,
};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
