//! axum middleware.
//!
//! Registered once on a `Router`, it analyzes every request before the rest
//! of the pipeline runs. Rejected requests get a replacement 403 response;
//! allowed requests continue with their body intact and the
//! [`EventAnalysis`](crate::EventAnalysis) in the request extensions.

use super::{blocked_response, buffer_body, evaluate, MiddlewareOptions};
use crate::client::GuardialClient;
use crate::config::GuardialConfig;
use crate::error::Result;
use crate::global;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;

/// Middleware state: the client plus exclusion rules.
#[derive(Debug, Clone)]
pub struct GuardialGuard {
    client: GuardialClient,
    options: Arc<MiddlewareOptions>,
}

impl GuardialGuard {
    /// Middleware state for `client` with the given exclusion rules.
    pub fn new(client: GuardialClient, options: MiddlewareOptions) -> Self {
        Self {
            client,
            options: Arc::new(options),
        }
    }

    /// Client used for analysis.
    pub fn client(&self) -> &GuardialClient {
        &self.client
    }

    /// Exclusion and size rules in effect.
    pub fn options(&self) -> &MiddlewareOptions {
        &self.options
    }
}

/// Register Guardial on `router` using the shared client.
///
/// `config` is only used if the shared client has not been created yet.
///
/// ```rust,ignore
/// let app = guardial_sdk::middleware::install(Router::new().route("/", get(index)), None)?;
/// ```
pub fn install<S>(router: Router<S>, config: Option<GuardialConfig>) -> Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let client = global::client_with(config)?.clone();
    Ok(install_with(router, client, MiddlewareOptions::axum()))
}

/// Register Guardial on `router` with an explicit client and options.
pub fn install_with<S>(
    router: Router<S>,
    client: GuardialClient,
    options: MiddlewareOptions,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(
        GuardialGuard::new(client, options),
        guardial_middleware,
    ))
}

/// Analyze the request and either short-circuit with 403 or continue.
pub async fn guardial_middleware(
    State(guard): State<GuardialGuard>,
    request: Request,
    next: Next,
) -> Response {
    if !guard.options.should_analyze(request.uri().path()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match buffer_body(body, guard.options.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(rejection) => return rejection.into_response(),
    };

    let analysis = evaluate(&guard.client, &parts, &bytes).await;
    if !analysis.allowed {
        return blocked_response();
    }

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(analysis);
    next.run(request).await
}
