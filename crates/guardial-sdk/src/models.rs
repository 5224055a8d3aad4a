//! Wire types for the Guardial API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Header names that mark a request as carrying credentials.
pub const AUTH_HEADERS: [&str; 3] = ["authorization", "x-api-key", "x-auth-token"];

/// Request metadata sent to `POST /api/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub method: String,
    pub path: String,
    pub source_ip: String,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    pub query_params: String,
    pub request_body: String,
    pub customer_id: String,
    pub has_auth: bool,
    pub session_id: String,
}

/// Everything an adapter extracts from an incoming request.
///
/// The client turns this into a [`SecurityEvent`] by adding the customer and
/// session identifiers from its configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFields {
    pub method: String,
    pub path: String,
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
    pub query_params: Option<String>,
    pub request_body: Option<String>,
}

impl RequestFields {
    /// Whether any credential-carrying header is present.
    pub fn has_auth(&self) -> bool {
        self.headers
            .keys()
            .any(|name| AUTH_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
    }

    pub(crate) fn into_event(self, customer_id: &str, session_id: &str) -> SecurityEvent {
        let has_auth = self.has_auth();
        SecurityEvent {
            method: self.method,
            path: self.path,
            source_ip: self.source_ip,
            user_agent: self.user_agent.unwrap_or_default(),
            headers: self.headers,
            query_params: self.query_params.unwrap_or_default(),
            request_body: self.request_body.unwrap_or_default(),
            customer_id: customer_id.to_string(),
            has_auth,
            session_id: session_id.to_string(),
        }
    }
}

/// Prompt sent to `POST /api/llm/guard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptGuardRequest {
    pub input: String,
    /// Free-form context; always serialized, empty when not supplied.
    #[serde(default)]
    pub context: Map<String, Value>,
}

/// An OWASP Top 10 finding reported for a security event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwaspDetection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub owasp_category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owasp_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pattern_matched: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evidence: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendation: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub found_in: String,
}

/// Verdict for a security event.
///
/// Only `allowed` is relied upon; a response without it is treated as
/// allowed. The remaining fields are decoded when the service sends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAnalysis {
    #[serde(default = "allow")]
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub risk_score: Option<i64>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub risk_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub owasp_detected: Vec<OwaspDetection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<Value>,
    /// Set only on locally substituted results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventAnalysis {
    /// Result substituted when the service could not be reached. Fails open.
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            allowed: true,
            event_id: None,
            risk_score: None,
            risk_reasons: Vec::new(),
            action: None,
            owasp_detected: Vec::new(),
            processing_time_ms: None,
            error: Some(error.into()),
            extra: Map::new(),
        }
    }

    /// Whether this result was produced locally after a failed call.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Decode a service response.
    ///
    /// `allowed` is read on its own; when the remaining fields do not fit,
    /// they are kept raw in `extra` and the verdict still stands.
    pub fn from_response(value: Value) -> Self {
        let allowed = read_allowed(&value, true);
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::debug!(error = %err, "analysis details not decodable, keeping them raw");
                Self {
                    allowed,
                    error: None,
                    extra: into_object(value),
                    ..Self::fallback(String::new())
                }
            }
        }
    }
}

/// A prompt-policy violation reported by the LLM guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmDetection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rule_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pattern_matched: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evidence: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendation: String,
}

/// Verdict for an LLM prompt.
///
/// A response without `allowed` is treated as blocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptGuardResult {
    #[serde(default)]
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub reasons: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub detections: Vec<LlmDetection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<Value>,
    /// Set only on locally substituted results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PromptGuardResult {
    /// Result substituted when the service could not be reached. Fails closed.
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            allowed: false,
            action: None,
            reasons: Vec::new(),
            detections: Vec::new(),
            processing_time_ms: None,
            error: Some(error.into()),
            extra: Map::new(),
        }
    }

    /// Whether this result was produced locally after a failed call.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Decode a service response; see [`EventAnalysis::from_response`].
    pub fn from_response(value: Value) -> Self {
        let allowed = read_allowed(&value, false);
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(error = %err, "guard details not decodable, keeping them raw");
                Self {
                    allowed,
                    error: None,
                    extra: into_object(value),
                    ..Self::fallback(String::new())
                }
            }
        }
    }
}

/// Body returned by `GET /health`. The shape is owned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthReport(pub Map<String, Value>);

impl HealthReport {
    /// Report substituted when the health check fails.
    pub fn failure(error: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.insert("error".to_string(), Value::String(error.into()));
        Self(body)
    }

    /// Healthy means the report carries no `error` field.
    pub fn is_healthy(&self) -> bool {
        !self.0.contains_key("error")
    }
}

/// Outcome of [`GuardialClient::self_test`](crate::GuardialClient::self_test).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfTestReport {
    pub success: bool,
    pub endpoint: String,
    pub customer_id: String,
    pub health: HealthReport,
}

fn allow() -> bool {
    true
}

fn read_allowed(value: &Value, default: bool) -> bool {
    value
        .get("allowed")
        .and_then(Value::as_bool)
        .unwrap_or(default)
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `null` decodes as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integers, floats (rounded) and numeric strings. Anything else is `None`.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let score = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    };
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_auth_is_case_insensitive() {
        let mut fields = RequestFields::default();
        assert!(!fields.has_auth());

        fields
            .headers
            .insert("X-Auth-Token".to_string(), "t".to_string());
        assert!(fields.has_auth());
    }

    #[test]
    fn test_security_event_wire_shape() {
        let fields = RequestFields {
            method: "POST".to_string(),
            path: "/login".to_string(),
            source_ip: "10.0.0.1".to_string(),
            user_agent: None,
            headers: HashMap::from([("Authorization".to_string(), "Bearer x".to_string())]),
            query_params: Some("next=/home".to_string()),
            request_body: None,
        };

        let event = fields.into_event("acme", "session_1_abc");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({
                "method": "POST",
                "path": "/login",
                "source_ip": "10.0.0.1",
                "user_agent": "",
                "headers": { "Authorization": "Bearer x" },
                "query_params": "next=/home",
                "request_body": "",
                "customer_id": "acme",
                "has_auth": true,
                "session_id": "session_1_abc"
            })
        );
    }

    #[test]
    fn test_prompt_request_always_sends_context() {
        let request = PromptGuardRequest {
            input: "hello".to_string(),
            context: Map::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "input": "hello", "context": {} }));
    }

    #[test]
    fn test_event_analysis_defaults_to_allowed() {
        let analysis: EventAnalysis = serde_json::from_value(json!({})).unwrap();
        assert!(analysis.allowed);
        assert!(!analysis.is_fallback());
    }

    #[test]
    fn test_event_analysis_decodes_details() {
        let analysis: EventAnalysis = serde_json::from_value(json!({
            "event_id": "evt_1",
            "risk_score": 87,
            "risk_reasons": ["sql injection"],
            "action": "block",
            "allowed": false,
            "owasp_detected": [{
                "owasp_category": "A03",
                "owasp_title": "Injection",
                "severity": "high",
                "pattern_matched": "' OR 1=1",
                "evidence": "id=' OR 1=1",
                "recommendation": "use parameterized queries",
                "found_in": "query_params"
            }],
            "processing_time_ms": "3.2",
            "country": "NL"
        }))
        .unwrap();

        assert!(!analysis.allowed);
        assert_eq!(analysis.risk_score, Some(87));
        assert_eq!(analysis.owasp_detected[0].owasp_title, "Injection");
        assert_eq!(analysis.extra.get("country"), Some(&json!("NL")));
    }

    #[test]
    fn test_null_details_keep_the_verdict() {
        let analysis = EventAnalysis::from_response(json!({
            "event_id": "evt_1",
            "risk_score": 97,
            "risk_reasons": null,
            "action": "block",
            "allowed": false,
            "owasp_detected": null
        }));

        assert!(!analysis.allowed);
        assert!(!analysis.is_fallback());
        assert_eq!(analysis.risk_score, Some(97));
        assert!(analysis.risk_reasons.is_empty());
        assert!(analysis.owasp_detected.is_empty());

        let detection: OwaspDetection =
            serde_json::from_value(json!({ "owasp_category": "A03", "evidence": null })).unwrap();
        assert_eq!(detection.evidence, "");
    }

    #[test]
    fn test_fractional_risk_score_is_rounded() {
        let analysis = EventAnalysis::from_response(json!({ "allowed": true, "risk_score": 62.6 }));
        assert_eq!(analysis.risk_score, Some(63));

        let analysis = EventAnalysis::from_response(json!({ "allowed": true, "risk_score": "12" }));
        assert_eq!(analysis.risk_score, Some(12));
    }

    #[test]
    fn test_undecodable_details_keep_the_verdict() {
        let analysis = EventAnalysis::from_response(json!({
            "allowed": false,
            "event_id": 1234,
            "risk_reasons": "sql injection"
        }));

        assert!(!analysis.allowed);
        assert!(!analysis.is_fallback());
        assert_eq!(analysis.extra.get("event_id"), Some(&json!(1234)));

        let result = PromptGuardResult::from_response(json!({
            "allowed": true,
            "reasons": { "unexpected": "shape" }
        }));
        assert!(result.allowed);
        assert!(!result.is_fallback());
    }

    #[test]
    fn test_prompt_result_null_lists() {
        let result = PromptGuardResult::from_response(json!({
            "allowed": true,
            "reasons": null,
            "detections": null
        }));
        assert!(result.allowed);
        assert!(result.reasons.is_empty());
        assert!(result.detections.is_empty());
    }

    #[test]
    fn test_prompt_result_defaults_to_blocked() {
        let result: PromptGuardResult = serde_json::from_value(json!({})).unwrap();
        assert!(!result.allowed);
    }

    #[test]
    fn test_fallbacks_differ_by_call_type() {
        assert!(EventAnalysis::fallback("down").allowed);
        assert!(!PromptGuardResult::fallback("down").allowed);
    }

    #[test]
    fn test_health_report() {
        let healthy: HealthReport = serde_json::from_value(json!({ "status": "ok" })).unwrap();
        assert!(healthy.is_healthy());
        assert!(!HealthReport::failure("refused").is_healthy());
    }
}
