//! Analysis of outgoing HTTP calls.
//!
//! [`SecureHttpClient`] wraps a `reqwest::Client` and sends every request to
//! Guardial before it leaves the process. A rejected call fails with
//! [`GuardialError::Blocked`]. If the analysis itself fails, the call goes
//! ahead.
//!
//! ```rust,ignore
//! let http = guardial.secure_http_client()?;
//! let response = http.send(http.get("https://partner.example.com/v1/orders")).await?;
//! ```

use crate::client::{log_failure, GuardialClient};
use crate::error::{GuardialError, Result};
use crate::extract;
use reqwest::{IntoUrl, Method, RequestBuilder, Response};

/// `reqwest` client with a Guardial check in front of every call.
#[derive(Debug, Clone)]
pub struct SecureHttpClient {
    guardial: GuardialClient,
    http: reqwest::Client,
}

impl SecureHttpClient {
    /// Wrap a fresh `reqwest::Client` using the Guardial timeout.
    pub fn new(guardial: GuardialClient) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(guardial.config().timeout)
            .build()?;
        Ok(Self::with_http(guardial, http))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_http(guardial: GuardialClient, http: reqwest::Client) -> Self {
        Self { guardial, http }
    }

    /// Client used for analysis.
    pub fn guardial(&self) -> &GuardialClient {
        &self.guardial
    }

    /// Start a request; pass the builder to [`send`](Self::send).
    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Start a `GET` request.
    pub fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        self.http.get(url)
    }

    /// Start a `POST` request.
    pub fn post(&self, url: impl IntoUrl) -> RequestBuilder {
        self.http.post(url)
    }

    /// Build, analyze and send.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        self.execute(builder.build()?).await
    }

    /// Analyze and send an already built request.
    pub async fn execute(&self, request: reqwest::Request) -> Result<Response> {
        let event = self.guardial.event(extract::outgoing_fields(&request));
        match self.guardial.try_analyze_event(&event).await {
            Ok(analysis) if !analysis.allowed => {
                tracing::warn!(
                    method = %request.method(),
                    url = %request.url(),
                    reasons = ?analysis.risk_reasons,
                    "🚫 Outgoing request blocked by Guardial"
                );
                return Err(GuardialError::Blocked {
                    reasons: analysis.risk_reasons,
                });
            }
            Ok(_) => {}
            Err(err) => log_failure(self.guardial.config(), "Security analysis", &err),
        }

        let url = request.url().clone();
        let response = self.http.execute(request).await?;

        if self.guardial.config().debug {
            tracing::debug!(
                url = %url,
                status = response.status().as_u16(),
                "Outgoing request completed"
            );
        }
        Ok(response)
    }
}
