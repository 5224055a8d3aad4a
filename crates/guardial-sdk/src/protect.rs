//! Per-handler protection.
//!
//! [`protect`] wraps an async axum handler and [`protect_blocking`] wraps a
//! synchronous `http` handler. Both run the same analysis before the
//! handler and answer 403 without calling it when the request is rejected.
//! The handler otherwise receives the original request unchanged.

use crate::blocking::BlockingClient;
use crate::client::GuardialClient;
use crate::error::Result;
use crate::extract;
use crate::global;
use crate::middleware::{
    blocked_response, buffer_body, evaluate, log_verdict, DEFAULT_MAX_BODY_BYTES,
};
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{self, header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;

/// Wrap an async handler using the shared client.
///
/// ```rust,ignore
/// async fn transfer(request: Request) -> impl IntoResponse { /* ... */ }
///
/// let app = Router::new().route("/transfer", post(guardial_sdk::protect(transfer)?));
/// ```
pub fn protect<H, Fut, R>(
    handler: H,
) -> Result<impl Fn(Request) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static>
where
    H: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    let client = global::client()?.clone();
    Ok(protect_with(client, handler))
}

/// Wrap an async handler using an explicit client.
///
/// Bodies over [`DEFAULT_MAX_BODY_BYTES`] are rejected with 413.
pub fn protect_with<H, Fut, R>(
    client: GuardialClient,
    handler: H,
) -> impl Fn(Request) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static
where
    H: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    protect_with_limit(client, DEFAULT_MAX_BODY_BYTES, handler)
}

/// Wrap an async handler, buffering at most `max_body_bytes` of each body.
pub fn protect_with_limit<H, Fut, R>(
    client: GuardialClient,
    max_body_bytes: usize,
    handler: H,
) -> impl Fn(Request) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static
where
    H: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    move |request: Request| {
        let client = client.clone();
        let handler = handler.clone();
        async move {
            let (parts, body) = request.into_parts();
            let bytes = match buffer_body(body, max_body_bytes).await {
                Ok(bytes) => bytes,
                Err(rejection) => return rejection.into_response(),
            };

            let analysis = evaluate(&client, &parts, &bytes).await;
            if !analysis.allowed {
                return blocked_response();
            }

            handler(Request::from_parts(parts, Body::from(bytes)))
                .await
                .into_response()
        }
        .boxed()
    }
}

/// Wrap a synchronous handler using the shared client's configuration.
///
/// The returned function performs a blocking HTTP call; do not invoke it
/// from inside an async runtime.
pub fn protect_blocking<H, B>(
    handler: H,
) -> Result<impl Fn(http::Request<Bytes>) -> http::Response<B> + Clone + Send + Sync + 'static>
where
    H: Fn(http::Request<Bytes>) -> http::Response<B> + Clone + Send + Sync + 'static,
    B: From<&'static str>,
{
    let client = BlockingClient::new(global::client()?.config().clone())?;
    Ok(protect_blocking_with(client, handler))
}

/// Wrap a synchronous handler using an explicit blocking client.
///
/// Bodies over [`DEFAULT_MAX_BODY_BYTES`] are rejected with 413.
pub fn protect_blocking_with<H, B>(
    client: BlockingClient,
    handler: H,
) -> impl Fn(http::Request<Bytes>) -> http::Response<B> + Clone + Send + Sync + 'static
where
    H: Fn(http::Request<Bytes>) -> http::Response<B> + Clone + Send + Sync + 'static,
    B: From<&'static str>,
{
    protect_blocking_with_limit(client, DEFAULT_MAX_BODY_BYTES, handler)
}

/// Wrap a synchronous handler, sending at most `max_body_bytes` of body for analysis.
pub fn protect_blocking_with_limit<H, B>(
    client: BlockingClient,
    max_body_bytes: usize,
    handler: H,
) -> impl Fn(http::Request<Bytes>) -> http::Response<B> + Clone + Send + Sync + 'static
where
    H: Fn(http::Request<Bytes>) -> http::Response<B> + Clone + Send + Sync + 'static,
    B: From<&'static str>,
{
    move |request: http::Request<Bytes>| {
        if request.body().len() > max_body_bytes {
            return json_response(StatusCode::PAYLOAD_TOO_LARGE, TOO_LARGE_JSON);
        }

        let (parts, body) = request.into_parts();
        let analysis = client.analyze_event(extract::request_fields(&parts, &body));
        log_verdict(&parts, &analysis);

        if !analysis.allowed {
            return json_response(StatusCode::FORBIDDEN, BLOCKED_JSON);
        }
        handler(http::Request::from_parts(parts, body))
    }
}

const BLOCKED_JSON: &str = r#"{"error":"Request blocked by security policy"}"#;
const TOO_LARGE_JSON: &str = r#"{"error":"Request body too large"}"#;

fn json_response<B: From<&'static str>>(status: StatusCode, body: &'static str) -> http::Response<B> {
    let mut response = http::Response::new(B::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
