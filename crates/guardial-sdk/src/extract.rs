//! Turning an `http::Request` into [`RequestFields`].

use crate::models::RequestFields;
use axum::extract::ConnectInfo;
use axum::http::{self, header, request::Parts, HeaderMap, Method, Uri};
use std::collections::HashMap;
use std::net::SocketAddr;

const FORWARDING_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "x-client-ip"];
const UNKNOWN_SOURCE: &str = "unknown";

/// Extract analysis fields from request head and buffered body.
pub fn request_fields(parts: &Parts, body: &[u8]) -> RequestFields {
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    build_fields(&parts.method, &parts.uri, &parts.headers, peer, body)
}

/// Extract analysis fields from a whole `http::Request` with a buffered body.
pub fn http_request_fields<B: AsRef<[u8]>>(request: &http::Request<B>) -> RequestFields {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    build_fields(
        request.method(),
        request.uri(),
        request.headers(),
        peer,
        request.body().as_ref(),
    )
}

/// Extract analysis fields from an outgoing `reqwest` request.
///
/// Streaming bodies are not read; they are reported as empty.
pub fn outgoing_fields(request: &reqwest::Request) -> RequestFields {
    let body = request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .unwrap_or_default();

    RequestFields {
        method: request.method().to_string(),
        path: request.url().path().to_string(),
        source_ip: client_ip(request.headers(), None),
        user_agent: user_agent(request.headers()),
        headers: header_map(request.headers()),
        query_params: request.url().query().map(str::to_string),
        request_body: body_text(body),
    }
}

fn build_fields(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    body: &[u8],
) -> RequestFields {
    RequestFields {
        method: method.to_string(),
        path: uri.path().to_string(),
        source_ip: client_ip(headers, peer),
        user_agent: user_agent(headers),
        headers: header_map(headers),
        query_params: uri.query().map(str::to_string),
        request_body: body_text(body),
    }
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn body_text(body: &[u8]) -> Option<String> {
    (!body.is_empty()).then(|| String::from_utf8_lossy(body).into_owned())
}

/// Best guess at the originating client address.
///
/// Proxy headers win over the socket peer; the first `X-Forwarded-For`
/// entry is the original client.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    FORWARDING_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

/// Flatten headers to name -> first readable value.
pub fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .keys()
        .filter_map(|name| {
            headers
                .get_all(name)
                .iter()
                .find_map(|value| value.to_str().ok())
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// Whether `path` starts with any of the excluded prefixes.
pub fn is_excluded<S: AsRef<str>>(path: &str, prefixes: &[S]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_request_fields() {
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/users?id=7&sort=asc")
            .header("user-agent", "Mozilla/5.0")
            .header("authorization", "Bearer abc")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 51000))));

        let fields = request_fields(&parts(request), br#"{"name":"x"}"#);

        assert_eq!(fields.method, "POST");
        assert_eq!(fields.path, "/api/users");
        assert_eq!(fields.source_ip, "192.168.1.20");
        assert_eq!(fields.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(fields.query_params.as_deref(), Some("id=7&sort=asc"));
        assert_eq!(fields.request_body.as_deref(), Some(r#"{"name":"x"}"#));
        assert_eq!(fields.headers.get("authorization").unwrap(), "Bearer abc");
        assert!(fields.has_auth());
    }

    #[test]
    fn test_empty_request() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let fields = request_fields(&parts(request), b"");

        assert_eq!(fields.method, "GET");
        assert_eq!(fields.source_ip, "unknown");
        assert!(fields.user_agent.is_none());
        assert!(fields.query_params.is_none());
        assert!(fields.request_body.is_none());
        assert!(!fields.has_auth());
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer = Some(SocketAddr::from(([10, 0, 0, 1], 443)));
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, peer), "10.0.0.1");

        headers.insert("x-client-ip", HeaderValue::from_static("198.51.100.3"));
        assert_eq!(client_ip(&headers, peer), "198.51.100.3");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, peer), "198.51.100.2");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.1.1.1"),
        );
        assert_eq!(client_ip(&headers, peer), "203.0.113.9");
    }

    #[test]
    fn test_header_map_keeps_first_value() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));

        let map = header_map(&headers);
        assert_eq!(map.get("accept").unwrap(), "text/html");
    }

    #[test]
    fn test_http_request_fields() {
        let request = Request::builder()
            .method("PUT")
            .uri("/profile?tab=security")
            .header("x-real-ip", "198.51.100.4")
            .body(axum::body::Bytes::from_static(b"name=bob"))
            .unwrap();

        let fields = http_request_fields(&request);

        assert_eq!(fields.method, "PUT");
        assert_eq!(fields.path, "/profile");
        assert_eq!(fields.query_params.as_deref(), Some("tab=security"));
        assert_eq!(fields.source_ip, "198.51.100.4");
        assert_eq!(fields.request_body.as_deref(), Some("name=bob"));
    }

    #[test]
    fn test_outgoing_fields() {
        let request = reqwest::Client::new()
            .post("https://partner.example.com/v1/orders?dry_run=true")
            .header("authorization", "Bearer t")
            .body("{\"sku\":\"A-1\"}")
            .build()
            .unwrap();

        let fields = outgoing_fields(&request);

        assert_eq!(fields.method, "POST");
        assert_eq!(fields.path, "/v1/orders");
        assert_eq!(fields.query_params.as_deref(), Some("dry_run=true"));
        assert_eq!(fields.source_ip, "unknown");
        assert_eq!(fields.request_body.as_deref(), Some("{\"sku\":\"A-1\"}"));
        assert!(fields.has_auth());
    }

    #[test]
    fn test_is_excluded() {
        let prefixes = ["/health", "/docs"];
        assert!(is_excluded("/health", &prefixes));
        assert!(is_excluded("/health/ready", &prefixes));
        assert!(is_excluded("/docs/index.html", &prefixes));
        assert!(!is_excluded("/api/health", &prefixes));
    }
}
