//! Remote function invocation.
//!
//! `FunctionTransport` is the wire seam; it returns the raw `{data, error}`
//! envelope. `FunctionInvoker` adds the tenant context to the body, logs the
//! round trip and turns the envelope into a `Result`.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::context::scope::ScopeContext;
use crate::error::{ApiError, Result};
use crate::query::client::TabularBackend;
use crate::query::service::DataService;

use super::registry::RemoteFunction;
use super::report::ScanReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[async_trait]
pub trait FunctionTransport: Send + Sync {
    /// Send one invocation and return the response envelope.
    async fn send(
        &self,
        function: RemoteFunction,
        body: &Value,
        headers: &BTreeMap<String, String>,
    ) -> Result<Value>;
}

pub struct FunctionInvoker<T> {
    transport: T,
}

impl<T: FunctionTransport> FunctionInvoker<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Invoke `function` on behalf of `scope`.
    ///
    /// `body` must be a JSON object or null. `organizationId` is always set
    /// from the scope; `accountId` is set when an account is selected and
    /// the body does not name one.
    pub async fn invoke(&self, scope: &ScopeContext, function: RemoteFunction, body: Value) -> Result<Value> {
        self.invoke_with_headers(scope, function, body, &BTreeMap::new())
            .await
    }

    /// Like [`FunctionInvoker::invoke`], sending `headers` as well.
    ///
    /// The generated `x-request-id` replaces a caller-supplied one.
    pub async fn invoke_with_headers(
        &self,
        scope: &ScopeContext,
        function: RemoteFunction,
        body: Value,
        headers: &BTreeMap<String, String>,
    ) -> Result<Value> {
        let body = scoped_body(scope, body)?;
        let ctx = scope.request_log_context();
        let mut headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        if let Some(request_id) = &ctx.request_id {
            headers.insert(REQUEST_ID_HEADER.to_string(), request_id.clone());
        }

        let started = Instant::now();
        crate::log_info!(ctx, "INVOKE_START", function = function.name());

        let outcome = self
            .transport
            .send(function, &body, &headers)
            .await
            .and_then(ApiError::from_envelope)
            .map_err(|e| attribute_service(e, function));

        match outcome {
            Ok(data) => {
                crate::log_info!(
                    ctx,
                    "INVOKE_COMPLETE",
                    function = function.name(),
                    elapsed_ms = started.elapsed().as_millis()
                );
                Ok(data)
            }
            Err(e) => {
                crate::log_warn!(
                    ctx,
                    "INVOKE_FAILED",
                    function = function.name(),
                    kind = e.kind(),
                    error = e.to_string()
                );
                Err(e)
            }
        }
    }

    pub async fn invoke_as<R: DeserializeOwned>(
        &self,
        scope: &ScopeContext,
        function: RemoteFunction,
        body: Value,
    ) -> Result<R> {
        let data = self.invoke(scope, function, body).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Run an analysis job and invalidate the reads it makes stale.
    ///
    /// Permission gaps inside the payload come back in the report; they do
    /// not fail the call.
    pub async fn run_job<B: TabularBackend>(
        &self,
        service: &DataService<B>,
        scope: &ScopeContext,
        function: RemoteFunction,
        body: Value,
    ) -> Result<ScanReport> {
        let data = self.invoke(scope, function, body).await?;
        let report = ScanReport::from_payload(data);
        if report.has_permission_errors() {
            crate::log_warn!(
                scope.log_context(),
                "JOB_PARTIAL",
                function = function.name(),
                failed_checks = report.permission_errors.len()
            );
        }
        service.invalidate(&scope.tenant, &function.affects());
        Ok(report)
    }
}

fn scoped_body(scope: &ScopeContext, body: Value) -> Result<Value> {
    let mut map = match body {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => return Err(ApiError::validation("body", "function body must be a JSON object")),
    };
    map.insert(
        "organizationId".to_string(),
        Value::String(scope.tenant.as_str().to_string()),
    );
    if let Some(account) = &scope.account {
        map.entry("accountId")
            .or_insert_with(|| Value::String(account.as_str().to_string()));
    }
    Ok(Value::Object(map))
}

fn attribute_service(err: ApiError, function: RemoteFunction) -> ApiError {
    match err {
        ApiError::Authorization {
            service,
            message,
            missing_permissions,
        } if service == "unknown" => ApiError::Authorization {
            service: function.name().to_string(),
            message,
            missing_permissions,
        },
        other => other,
    }
}
