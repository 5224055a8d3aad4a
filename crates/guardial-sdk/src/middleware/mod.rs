//! Request interception
//!
//! ## Available Adapters
//!
//! - `guard`: axum middleware that returns a replacement 403 response
//! - `layer`: tower `Layer` that aborts the pipeline with a plain-text 403
//! - [`protect`](crate::protect): per-handler wrappers, async and blocking
//!
//! All adapters share one decision path: skip excluded paths, extract the
//! request, call [`GuardialClient::analyze_event`], then forward or reject.

pub mod guard;
pub mod layer;

pub use guard::{guardial_middleware, install, install_with, GuardialGuard};
pub use layer::{GuardialLayer, GuardialService};

use crate::client::GuardialClient;
use crate::extract;
use crate::models::EventAnalysis;
use axum::body::{Body, Bytes, HttpBody};
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http_body_util::LengthLimitError;
use serde_json::json;

/// Message returned to rejected clients.
pub const BLOCKED_MESSAGE: &str = "Request blocked by security policy";

/// Risk scores above this are logged even when the request is allowed.
pub const HIGH_RISK_SCORE: i64 = 50;

/// Path prefixes the axum middleware never analyzes.
pub const AXUM_EXCLUDED_PATHS: [&str; 3] = ["/health", "/docs", "/openapi.json"];

/// Path prefixes the tower layer never analyzes.
pub const TOWER_EXCLUDED_PATHS: [&str; 2] = ["/health", "/static"];

/// Largest request body buffered for analysis. Same as axum's `DefaultBodyLimit`.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Behaviour shared by the middleware adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareOptions {
    /// Requests whose path starts with one of these skip analysis.
    pub exclude_paths: Vec<String>,
    /// When false every request passes through untouched.
    pub enabled: bool,
    /// Bodies larger than this are rejected with 413 before analysis.
    pub max_body_bytes: usize,
}

impl MiddlewareOptions {
    /// Defaults for the axum middleware.
    pub fn axum() -> Self {
        Self::with_excluded(&AXUM_EXCLUDED_PATHS)
    }

    /// Defaults for the tower layer.
    pub fn tower() -> Self {
        Self::with_excluded(&TOWER_EXCLUDED_PATHS)
    }

    fn with_excluded(paths: &[&str]) -> Self {
        Self {
            exclude_paths: paths.iter().map(|p| p.to_string()).collect(),
            enabled: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Add another excluded path prefix.
    pub fn exclude(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_paths.push(prefix.into());
        self
    }

    /// Replace the excluded path prefixes.
    pub fn exclude_paths<I, P>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.exclude_paths = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Turn analysis on or off without removing the adapter.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the largest request body that will be buffered and analyzed.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Whether a request for `path` should be sent for analysis.
    pub fn should_analyze(&self, path: &str) -> bool {
        self.enabled && !extract::is_excluded(path, self.exclude_paths.as_slice())
    }
}

impl Default for MiddlewareOptions {
    fn default() -> Self {
        Self::axum()
    }
}

/// Extract, analyze and log one buffered request.
pub(crate) async fn evaluate(client: &GuardialClient, parts: &Parts, body: &Bytes) -> EventAnalysis {
    let analysis = client
        .analyze_event(extract::request_fields(parts, body))
        .await;
    log_verdict(parts, &analysis);
    analysis
}

pub(crate) fn log_verdict(parts: &Parts, analysis: &EventAnalysis) {
    if !analysis.allowed {
        tracing::warn!(
            method = %parts.method,
            path = parts.uri.path(),
            risk_score = ?analysis.risk_score,
            reasons = ?analysis.risk_reasons,
            "🚫 Request blocked by Guardial"
        );
    } else if analysis.risk_score.is_some_and(|score| score > HIGH_RISK_SCORE) {
        tracing::info!(
            method = %parts.method,
            path = parts.uri.path(),
            risk_score = ?analysis.risk_score,
            reasons = ?analysis.risk_reasons,
            "High-risk request detected"
        );
    }
}

/// 403 with the fixed JSON error body.
pub(crate) fn blocked_response() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": BLOCKED_MESSAGE })),
    )
        .into_response()
}

/// Why a request body could not be buffered for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyRejection {
    TooLarge,
    Unreadable,
}

impl BodyRejection {
    pub(crate) fn status(self) -> StatusCode {
        match self {
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unreadable => StatusCode::BAD_REQUEST,
        }
    }

    pub(crate) fn message(self) -> &'static str {
        match self {
            Self::TooLarge => "Request body too large",
            Self::Unreadable => "Failed to read request body",
        }
    }
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Buffer at most `limit` bytes of `body`.
pub(crate) async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, BodyRejection> {
    if body.size_hint().lower() > limit as u64 {
        tracing::debug!(limit, "request body exceeds analysis limit");
        return Err(BodyRejection::TooLarge);
    }

    axum::body::to_bytes(body, limit).await.map_err(|err| {
        let source = err.into_inner();
        if source.is::<LengthLimitError>() {
            tracing::debug!(limit, "request body exceeds analysis limit");
            BodyRejection::TooLarge
        } else {
            tracing::debug!(error = %source, "failed to buffer request body");
            BodyRejection::Unreadable
        }
    })
}
