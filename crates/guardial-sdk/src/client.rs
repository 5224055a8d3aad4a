//! Async client for the Guardial analysis API.
//!
//! Every operation makes exactly one HTTP round trip. The infallible methods
//! never surface remote-call errors: security events fail open, prompts fail
//! closed. The `try_*` variants return the raw error instead.

use crate::config::GuardialConfig;
use crate::error::{GuardialError, Result};
use crate::extract;
use crate::models::{
    EventAnalysis, HealthReport, PromptGuardRequest, PromptGuardResult, RequestFields,
    SecurityEvent, SelfTestReport,
};
use crate::outbound::SecureHttpClient;
use axum::http;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

pub(crate) const API_KEY_HEADER: &str = "X-API-Key";
pub(crate) const EVENTS_PATH: &str = "/api/events";
pub(crate) const LLM_GUARD_PATH: &str = "/api/llm/guard";
pub(crate) const HEALTH_PATH: &str = "/health";

/// Handle to the Guardial service. Cheap to clone; clones share the
/// connection pool and configuration.
#[derive(Debug, Clone)]
pub struct GuardialClient {
    config: Arc<GuardialConfig>,
    http: reqwest::Client,
}

impl GuardialClient {
    /// Create a client from a resolved configuration.
    pub fn new(config: GuardialConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// Create a client configured purely from `GUARDIAL_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GuardialConfig::from_env()?)
    }

    /// Effective configuration.
    pub fn config(&self) -> &GuardialConfig {
        &self.config
    }

    /// Complete extracted request fields into the event sent upstream.
    pub fn event(&self, fields: RequestFields) -> SecurityEvent {
        fields.into_event(&self.config.customer_id, &self.config.session_id)
    }

    /// Analyze an incoming request. Fails open.
    pub async fn analyze_event(&self, fields: RequestFields) -> EventAnalysis {
        let event = self.event(fields);
        match self.try_analyze_event(&event).await {
            Ok(analysis) => analysis,
            Err(err) => {
                log_failure(&self.config, "Analysis", &err);
                EventAnalysis::fallback(err.to_string())
            }
        }
    }

    /// Send a fully built security event and return the service verdict.
    pub async fn try_analyze_event(&self, event: &SecurityEvent) -> Result<EventAnalysis> {
        let response = self
            .http
            .post(endpoint_url(&self.config, EVENTS_PATH))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(event)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let analysis = EventAnalysis::from_response(decode_object(status, &body)?);

        if self.config.debug {
            tracing::debug!(
                allowed = analysis.allowed,
                risk_score = ?analysis.risk_score,
                path = %event.path,
                "Guardial security analysis completed"
            );
        }
        Ok(analysis)
    }

    /// Analyze a whole `http::Request`, returning any remote-call error.
    ///
    /// Used for outgoing calls, where the caller decides what a failed
    /// analysis means.
    pub async fn analyze_request<B: AsRef<[u8]>>(
        &self,
        request: &http::Request<B>,
    ) -> Result<EventAnalysis> {
        self.try_analyze_event(&self.event(extract::http_request_fields(request)))
            .await
    }

    /// HTTP client whose outgoing calls are analyzed before they are sent.
    pub fn secure_http_client(&self) -> Result<SecureHttpClient> {
        SecureHttpClient::new(self.clone())
    }

    /// Check an LLM prompt for injection and policy violations. Fails closed.
    pub async fn guard_prompt(
        &self,
        input: impl Into<String>,
        context: Option<Map<String, Value>>,
    ) -> PromptGuardResult {
        let request = prompt_request(input, context);
        match self.try_guard_prompt(&request).await {
            Ok(result) => result,
            Err(err) => {
                log_failure(&self.config, "LLM Guard", &err);
                PromptGuardResult::fallback(err.to_string())
            }
        }
    }

    /// Send a prompt and return the service verdict, or the error that
    /// [`guard_prompt`](Self::guard_prompt) would have turned into a block.
    pub async fn try_guard_prompt(&self, request: &PromptGuardRequest) -> Result<PromptGuardResult> {
        let response = self
            .http
            .post(endpoint_url(&self.config, LLM_GUARD_PATH))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let result = PromptGuardResult::from_response(decode_object(status, &body)?);

        if self.config.debug {
            tracing::debug!(
                allowed = result.allowed,
                reasons = ?result.reasons,
                "Guardial LLM guard analysis completed"
            );
        }
        Ok(result)
    }

    /// Call the service health endpoint.
    pub async fn health_check(&self) -> HealthReport {
        self.try_health_check()
            .await
            .unwrap_or_else(|err| HealthReport::failure(err.to_string()))
    }

    /// Call the service health endpoint without substituting a failure report.
    ///
    /// No API key is sent.
    pub async fn try_health_check(&self) -> Result<HealthReport> {
        let response = self
            .http
            .get(endpoint_url(&self.config, HEALTH_PATH))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        decode(status, &body)
    }

    /// Check connectivity and echo the effective configuration.
    pub async fn self_test(&self) -> SelfTestReport {
        self_test_report(&self.config, self.health_check().await)
    }
}

pub(crate) fn endpoint_url(config: &GuardialConfig, path: &str) -> String {
    format!("{}{}", config.endpoint, path)
}

pub(crate) fn prompt_request(
    input: impl Into<String>,
    context: Option<Map<String, Value>>,
) -> PromptGuardRequest {
    PromptGuardRequest {
        input: input.into(),
        context: context.unwrap_or_default(),
    }
}

/// Reject non-success statuses, then parse the body.
pub(crate) fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    if !status.is_success() {
        return Err(GuardialError::Status {
            status,
            body: body.to_string(),
        });
    }
    Ok(serde_json::from_str(body)?)
}

/// Like [`decode`], but the body must be a JSON object.
pub(crate) fn decode_object(status: StatusCode, body: &str) -> Result<Value> {
    let value: Value = decode(status, body)?;
    if !value.is_object() {
        return Err(GuardialError::Decode(<serde_json::Error as serde::de::Error>::custom(
            "expected a JSON object",
        )));
    }
    Ok(value)
}

pub(crate) fn log_failure(config: &GuardialConfig, operation: &str, err: &GuardialError) {
    if config.debug {
        tracing::warn!(operation, error = %err, "[Guardial SDK] {} failed", operation);
    }
}

pub(crate) fn self_test_report(config: &GuardialConfig, health: HealthReport) -> SelfTestReport {
    SelfTestReport {
        success: health.is_healthy(),
        endpoint: config.endpoint.clone(),
        customer_id: config.customer_id.clone(),
        health,
    }
}
