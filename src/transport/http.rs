//! HTTP transport over reqwest.
//!
//! One client serves both seams:
//! - `TabularBackend`: `POST {base}/api/query` with the wire request
//! - `FunctionTransport`: `POST {base}{route}` with the function body
//!
//! Status mapping: 401/403 is `Authorization`, connection failures and
//! timeouts are `Transport`, any other non-2xx is `Domain`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::functions::invoker::FunctionTransport;
use crate::functions::registry::RemoteFunction;
use crate::query::client::TabularBackend;
use crate::query::request::QueryRequest;
use crate::query::table::Table;

pub const QUERY_ROUTE: &str = "/api/query";

pub struct HttpBackend {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, route: &str) -> String {
        join_url(&self.base_url, route)
    }

    async fn post(&self, route: &str, body: &Value, headers: HeaderMap, auth: bool) -> Result<Value> {
        let mut request = self.client.post(self.url(route)).headers(headers).json(body);
        if auth {
            match &self.access_token {
                Some(token) => request = request.header(AUTHORIZATION, format!("Bearer {}", token)),
                None => {
                    return Err(ApiError::Authorization {
                        service: route.to_string(),
                        message: "no access token configured".to_string(),
                        missing_permissions: Vec::new(),
                    })
                }
            }
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let err = status_error(status, route, &text);
            log::warn!("HTTP_ERROR route={} status={} kind={}", route, status.as_u16(), err.kind());
            return Err(err);
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn query(&self, wire: Value) -> Result<Value> {
        let envelope = self.post(QUERY_ROUTE, &wire, HeaderMap::new(), true).await?;
        ApiError::from_envelope(into_envelope(envelope))
    }
}

#[async_trait]
impl TabularBackend for HttpBackend {
    async fn select(&self, request: &QueryRequest) -> Result<Vec<Value>> {
        rows_of(self.query(request.to_wire("select")).await?)
    }

    async fn count(&self, request: &QueryRequest) -> Result<usize> {
        count_of(&self.query(request.to_wire("count")).await?)
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>> {
        let wire = json!({ "action": "insert", "table": table, "rows": rows });
        rows_of(self.query(wire).await?)
    }

    async fn update(&self, target: &QueryRequest, patch: &Value) -> Result<Vec<Value>> {
        let mut wire = target.without_window().to_wire("update");
        wire["patch"] = patch.clone();
        rows_of(self.query(wire).await?)
    }

    async fn delete(&self, target: &QueryRequest) -> Result<Vec<Value>> {
        rows_of(self.query(target.without_window().to_wire("delete")).await?)
    }
}

#[async_trait]
impl FunctionTransport for HttpBackend {
    async fn send(
        &self,
        function: RemoteFunction,
        body: &Value,
        headers: &BTreeMap<String, String>,
    ) -> Result<Value> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::validation("headers", e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::validation("headers", e.to_string()))?;
            header_map.insert(name, value);
        }

        let response = self
            .post(function.route(), body, header_map, function.requires_auth())
            .await
            .map_err(|e| match e {
                ApiError::Authorization {
                    message,
                    missing_permissions,
                    ..
                } => ApiError::Authorization {
                    service: function.name().to_string(),
                    message,
                    missing_permissions,
                },
                other => other,
            })?;
        Ok(into_envelope(response))
    }
}

pub fn join_url(base: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

/// Wrap a bare response body as `{data: body}`; pass envelopes through.
pub fn into_envelope(body: Value) -> Value {
    match &body {
        Value::Object(map) if map.contains_key("data") || map.contains_key("error") => body,
        _ => json!({ "data": body }),
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Transport(format!("request timed out: {}", e))
    } else if e.is_connect() {
        ApiError::Transport(format!("connection failed: {}", e))
    } else {
        ApiError::Transport(e.to_string())
    }
}

/// Map a non-2xx response to an error, using the body's message when it
/// has one.
pub fn status_error(status: StatusCode, service: &str, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let detail = parsed
        .as_ref()
        .and_then(|v| v.get("error").cloned().or_else(|| Some(v.clone())));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let missing = detail
            .as_ref()
            .and_then(|d| d.get("missingPermissions"))
            .and_then(|m| serde_json::from_value::<Vec<String>>(m.clone()).ok())
            .unwrap_or_default();
        let mut err = ApiError::authorization(service, missing);
        if let (ApiError::Authorization { message, .. }, Some(m)) = (&mut err, message_of(detail.as_ref())) {
            *message = m;
        }
        return err;
    }

    let message = message_of(detail.as_ref()).unwrap_or_else(|| {
        if body.trim().is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            body.trim().to_string()
        }
    });
    ApiError::Domain(message)
}

fn message_of(detail: Option<&Value>) -> Option<String> {
    match detail? {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    }
}

fn rows_of(data: Value) -> Result<Vec<Value>> {
    match data {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![data]),
        other => Err(ApiError::Decode(format!("expected rows, got {}", other))),
    }
}

/// Counts arrive either as a bare number or as `{count: n}`.
fn count_of(data: &Value) -> Result<usize> {
    let n = match data {
        Value::Object(map) => map.get("count").and_then(Value::as_u64),
        other => other.as_u64(),
    };
    n.map(|n| n as usize)
        .ok_or_else(|| ApiError::Decode(format!("expected a count, got {}", data)))
}
