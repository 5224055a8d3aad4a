//! tower layer.
//!
//! Works with any tower-based HTTP stack whose inner service accepts
//! `http::Request<axum::body::Body>`. Acts as a pre-request hook: a rejected
//! request aborts the pipeline with a plain-text 403, everything else is
//! forwarded with its body intact.

use super::{buffer_body, evaluate, MiddlewareOptions, BLOCKED_MESSAGE};
use crate::client::GuardialClient;
use crate::config::GuardialConfig;
use crate::error::Result;
use crate::global;
use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use axum::BoxError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer that wraps services in [`GuardialService`].
#[derive(Debug, Clone)]
pub struct GuardialLayer {
    client: GuardialClient,
    options: Arc<MiddlewareOptions>,
}

impl GuardialLayer {
    /// Layer with tower defaults (`/health` and `/static` excluded).
    pub fn new(client: GuardialClient) -> Self {
        Self::with_options(client, MiddlewareOptions::tower())
    }

    pub fn with_options(client: GuardialClient, options: MiddlewareOptions) -> Self {
        Self {
            client,
            options: Arc::new(options),
        }
    }

    /// Layer backed by the shared client.
    ///
    /// `config` is only used if the shared client has not been created yet.
    pub fn from_config(config: Option<GuardialConfig>) -> Result<Self> {
        Ok(Self::new(global::client_with(config)?.clone()))
    }
}

impl<S> Layer<S> for GuardialLayer {
    type Service = GuardialService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GuardialService {
            inner,
            client: self.client.clone(),
            options: self.options.clone(),
        }
    }
}

/// Service produced by [`GuardialLayer`].
#[derive(Debug, Clone)]
pub struct GuardialService<S> {
    inner: S,
    client: GuardialClient,
    options: Arc<MiddlewareOptions>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GuardialService<S>
where
    S: Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: HttpBody<Data = axum::body::Bytes> + Send + 'static,
    ReqBody::Error: Into<BoxError>,
    ResBody: From<&'static str> + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // The clone is not ready; keep it and drive the one we polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let client = self.client.clone();
        let options = self.options.clone();
        let request = request.map(Body::new);

        Box::pin(async move {
            if !options.should_analyze(request.uri().path()) {
                return inner.call(request).await;
            }

            let (parts, body) = request.into_parts();
            let bytes = match buffer_body(body, options.max_body_bytes).await {
                Ok(bytes) => bytes,
                Err(rejection) => return Ok(abort(rejection.status(), rejection.message())),
            };

            let analysis = evaluate(&client, &parts, &bytes).await;
            if !analysis.allowed {
                return Ok(abort(StatusCode::FORBIDDEN, BLOCKED_MESSAGE));
            }

            let mut request = Request::from_parts(parts, Body::from(bytes));
            request.extensions_mut().insert(analysis);
            inner.call(request).await
        })
    }
}

/// Plain-text response that ends the pipeline.
fn abort<B: From<&'static str>>(status: StatusCode, message: &'static str) -> Response<B> {
    let mut response = Response::new(B::from(message));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
