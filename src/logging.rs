use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap, HeaderValue, Uri, header},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value, json};
use tracing::Instrument;

use crate::{AppState, context::RequestIdentity};

// Size guard thresholds, applied after redaction.
const MAX_STRING_LEN: usize = 1000;
const MAX_ARRAY_ITEMS: usize = 10;
const MAX_MAP_KEYS: usize = 20;

/// request_logging
///
/// Wraps every request/response pair. Captures request metadata (method, URL,
/// headers, query params, parsed body, client address) and response metadata
/// (status, headers, body, duration), runs both through the redaction engine,
/// truncates oversized values, and emits tracing events at a severity derived
/// from the response status.
///
/// The middleware reads `subject_id` from the identity context purely for
/// correlation - it never forces principal resolution and never affects the
/// guard decision or handler outcome.
pub async fn request_logging(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let (parts, body) = request.into_parts();

    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // Correlation only: the unauthenticated subject claim, never a fetch.
    let subject_id = parts
        .extensions
        .get::<Arc<RequestIdentity>>()
        .and_then(|identity| identity.subject_id());

    let method = parts.method.clone();
    let uri = parts.uri.clone();
    let client_ip = client_ip(&parts.headers, &parts.extensions);
    let user_agent = header_str(&parts.headers, header::USER_AGENT);

    let content_type = header_str(&parts.headers, header::CONTENT_TYPE);
    let request_bytes = buffer_body(body).await;
    let request_body = body_value(&request_bytes, &content_type);
    let request_headers = headers_value(&parts.headers);
    let query_params = query_params_value(&uri);

    // Reassemble the request with the buffered body so the handler still
    // sees the full payload.
    let request = Request::from_parts(parts, Body::from(request_bytes));

    let span = tracing::info_span!(
        "http_request",
        req_id = %request_id,
        method = %method,
        path = %uri.path(),
        user_id = ?subject_id,
        ip = %client_ip,
    );

    async move {
        let policy = &state.policy;

        let request_log = truncate_large(json!({
            "method": method.as_str(),
            "url": policy.sanitize_url(&uri.to_string()),
            "headers": policy.redact_headers(&request_headers),
            "query_params": policy.redact_query_params(&query_params),
            "body": policy.redact(&request_body),
            "user_agent": user_agent,
            "remote_addr": client_ip,
        }));
        tracing::debug!(request = %request_log, "incoming request");

        let response = next.run(request).await;

        let elapsed = started.elapsed();
        let duration_ms = (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0;
        let status = response.status();

        let (mut response_parts, response_body) = response.into_parts();
        let response_content_type = header_str(&response_parts.headers, header::CONTENT_TYPE);
        let response_bytes = buffer_body(response_body).await;

        // Server-error bodies are skipped; non-JSON bodies are not worth logging.
        let response_body_log =
            if status.as_u16() < 500 && response_content_type.contains("application/json") {
                policy.redact(&body_value(&response_bytes, &response_content_type))
            } else {
                Value::Null
            };

        if let Ok(value) = HeaderValue::from_str(&format!("{}", elapsed.as_secs_f64())) {
            response_parts.headers.insert("x-process-time", value);
        }

        let response_log = truncate_large(json!({
            "status_code": status.as_u16(),
            "headers": policy.redact_headers(&headers_value(&response_parts.headers)),
            "body": response_body_log,
            "process_time_ms": duration_ms,
        }));

        // Severity tracks the outcome: 5xx is the loudest level available,
        // 4xx is elevated, everything else is informational.
        if status.as_u16() >= 500 {
            tracing::error!(status = status.as_u16(), duration_ms, response = %response_log, "request failed");
        } else if status.as_u16() >= 400 {
            tracing::warn!(status = status.as_u16(), duration_ms, response = %response_log, "request rejected");
        } else {
            tracing::info!(status = status.as_u16(), duration_ms, response = %response_log, "request completed");
        }

        Response::from_parts(response_parts, Body::from(response_bytes))
    }
    .instrument(span)
    .await
}

/// truncate_large
///
/// The size guard for log payloads: oversized strings, sequences, and maps
/// are cut down with a marker noting the original size. Applied after
/// redaction so a truncated value can never reveal what redaction removed.
pub fn truncate_large(value: Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > MAX_STRING_LEN => {
            let total = s.chars().count();
            let head: String = s.chars().take(MAX_STRING_LEN).collect();
            json!(format!("{}... [TRUNCATED - {} total chars]", head, total))
        }
        Value::Array(items) => {
            let total = items.len();
            let mut kept: Vec<Value> = items
                .into_iter()
                .take(MAX_ARRAY_ITEMS)
                .map(truncate_large)
                .collect();
            if total > MAX_ARRAY_ITEMS {
                kept.push(json!(format!("... [TRUNCATED - {} total items]", total)));
            }
            Value::Array(kept)
        }
        Value::Object(map) => {
            let total = map.len();
            let mut kept = Map::new();
            for (key, entry) in map.into_iter().take(MAX_MAP_KEYS) {
                kept.insert(key, truncate_large(entry));
            }
            if total > MAX_MAP_KEYS {
                kept.insert(
                    "...".to_string(),
                    json!(format!("[TRUNCATED - {} total keys]", total)),
                );
            }
            Value::Object(kept)
        }
        other => other,
    }
}

/// Buffers a request or response body in full. A body that cannot be read is
/// logged and treated as empty - the log pipeline must never fail a request.
async fn buffer_body(body: Body) -> Bytes {
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("failed to buffer body for logging: {}", err);
            Bytes::new()
        }
    }
}

/// Renders a body for logging: JSON payloads are parsed into a structure so
/// redaction can walk them; anything else falls back to a lossy string
/// rendering rather than failing.
fn body_value(bytes: &Bytes, content_type: &str) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    if content_type.contains("application/json") {
        if let Ok(parsed) = serde_json::from_slice::<Value>(bytes) {
            return parsed;
        }
    }
    json!(String::from_utf8_lossy(bytes))
}

fn headers_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        map.insert(
            name.as_str().to_string(),
            json!(String::from_utf8_lossy(value.as_bytes())),
        );
    }
    Value::Object(map)
}

fn query_params_value(uri: &Uri) -> Value {
    let mut map = Map::new();
    if let Some(query) = uri.query() {
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some((key, value)) => map.insert(key.to_string(), json!(value)),
                None => map.insert(pair.to_string(), json!("")),
            };
        }
    }
    Value::Object(map)
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Client address resolution: proxy headers first (first hop of
/// X-Forwarded-For, then X-Real-IP), falling back to the socket address when
/// the server was started with connect info.
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            return first.trim().to_string();
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
