//! Blocking counterpart of [`GuardialClient`](crate::GuardialClient).
//!
//! Intended for synchronous hosts. Must not be constructed, called or
//! dropped from inside an async runtime; use the async client there.

use crate::client::{
    decode, decode_object, endpoint_url, log_failure, prompt_request, self_test_report,
    API_KEY_HEADER, EVENTS_PATH, HEALTH_PATH, LLM_GUARD_PATH,
};
use crate::config::GuardialConfig;
use crate::error::Result;
use crate::models::{
    EventAnalysis, HealthReport, PromptGuardRequest, PromptGuardResult, RequestFields,
    SecurityEvent, SelfTestReport,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Synchronous Guardial client with the same fallback policy as the async one.
#[derive(Debug, Clone)]
pub struct BlockingClient {
    config: Arc<GuardialConfig>,
    http: reqwest::blocking::Client,
}

impl BlockingClient {
    /// Create a client from a resolved configuration.
    pub fn new(config: GuardialConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
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
    pub fn analyze_event(&self, fields: RequestFields) -> EventAnalysis {
        let event = self.event(fields);
        self.try_analyze_event(&event).unwrap_or_else(|err| {
            log_failure(&self.config, "Analysis", &err);
            EventAnalysis::fallback(err.to_string())
        })
    }

    /// Send a fully built security event and return the service verdict.
    pub fn try_analyze_event(&self, event: &SecurityEvent) -> Result<EventAnalysis> {
        let request = self
            .http
            .post(endpoint_url(&self.config, EVENTS_PATH))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(event);
        send_object(request).map(EventAnalysis::from_response)
    }

    /// Check an LLM prompt. Fails closed.
    pub fn guard_prompt(
        &self,
        input: impl Into<String>,
        context: Option<Map<String, Value>>,
    ) -> PromptGuardResult {
        let request = prompt_request(input, context);
        self.try_guard_prompt(&request).unwrap_or_else(|err| {
            log_failure(&self.config, "LLM Guard", &err);
            PromptGuardResult::fallback(err.to_string())
        })
    }

    /// Send a prompt and return the service verdict, or the error that
    /// [`guard_prompt`](Self::guard_prompt) would have turned into a block.
    pub fn try_guard_prompt(&self, request: &PromptGuardRequest) -> Result<PromptGuardResult> {
        let request = self
            .http
            .post(endpoint_url(&self.config, LLM_GUARD_PATH))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(request);
        send_object(request).map(PromptGuardResult::from_response)
    }

    /// Call the service health endpoint.
    pub fn health_check(&self) -> HealthReport {
        self.try_health_check()
            .unwrap_or_else(|err| HealthReport::failure(err.to_string()))
    }

    /// Call the service health endpoint without substituting a failure report.
    pub fn try_health_check(&self) -> Result<HealthReport> {
        send(self.http.get(endpoint_url(&self.config, HEALTH_PATH)))
    }

    /// Check connectivity and echo the effective configuration.
    pub fn self_test(&self) -> SelfTestReport {
        self_test_report(&self.config, self.health_check())
    }
}

fn send<T: DeserializeOwned>(request: reqwest::blocking::RequestBuilder) -> Result<T> {
    let response = request.send()?;
    let status = response.status();
    let body = response.text()?;
    decode(status, &body)
}

fn send_object(request: reqwest::blocking::RequestBuilder) -> Result<Value> {
    let response = request.send()?;
    let status = response.status();
    let body = response.text()?;
    decode_object(status, &body)
}
