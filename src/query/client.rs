//! Tabular query client.
//!
//! `TabularBackend` is the seam to the remote tabular endpoint; the client
//! adds typed decoding, tenant stamping on writes and request logging. The
//! client holds no cache.

use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::scope::ScopeContext;
use crate::error::{ApiError, Result};
use crate::logging::structured::LogContext;

use super::filter::ORGANIZATION_COLUMN;
use super::request::QueryRequest;
use super::table::Table;

/// Operations offered by the tabular endpoint.
///
/// "No rows" is `Ok(vec![])`; `Err` is reserved for transport and
/// authorization failures and rejected requests.
#[async_trait]
pub trait TabularBackend: Send + Sync {
    async fn select(&self, request: &QueryRequest) -> Result<Vec<Value>>;
    async fn count(&self, request: &QueryRequest) -> Result<usize>;
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>>;
    async fn update(&self, target: &QueryRequest, patch: &Value) -> Result<Vec<Value>>;
    async fn delete(&self, target: &QueryRequest) -> Result<Vec<Value>>;
}

/// Typed wrapper around a [`TabularBackend`].
pub struct QueryClient<B> {
    backend: B,
}

impl<B: TabularBackend> QueryClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Select rows and decode each into `T`.
    pub async fn select<T: DeserializeOwned>(&self, request: &QueryRequest) -> Result<Vec<T>> {
        let rows = self.select_rows(request).await?;
        decode_rows(rows)
    }

    pub async fn select_rows(&self, request: &QueryRequest) -> Result<Vec<Value>> {
        let ctx = request_log_context(request);
        let started = Instant::now();
        crate::log_debug!(
            ctx,
            "QUERY_SELECT",
            table = request.table().name(),
            limit = request.effective_limit(),
            offset = request.offset_value()
        );

        match self.backend.select(request).await {
            Ok(rows) => {
                crate::log_debug!(
                    ctx,
                    "QUERY_COMPLETE",
                    table = request.table().name(),
                    rows = rows.len(),
                    elapsed_ms = started.elapsed().as_millis()
                );
                Ok(rows)
            }
            Err(e) => {
                crate::log_warn!(
                    ctx,
                    "QUERY_FAILED",
                    table = request.table().name(),
                    kind = e.kind(),
                    error = e.to_string()
                );
                Err(e)
            }
        }
    }

    /// Number of rows matching the request's predicates.
    pub async fn count(&self, request: &QueryRequest) -> Result<usize> {
        let ctx = request_log_context(request);
        let count = self.backend.count(&request.count_request()).await?;
        crate::log_debug!(ctx, "QUERY_COUNT", table = request.table().name(), count = count);
        Ok(count)
    }

    /// Insert one row into a tenant-scoped table.
    ///
    /// `organization_id` is stamped from the scope, as is the account column
    /// when an account is selected and the row leaves it unset. A row that
    /// names a different organization is rejected.
    pub async fn insert<R: Serialize>(&self, scope: &ScopeContext, table: Table, row: &R) -> Result<Vec<Value>> {
        let row = stamp_row(scope, table, serde_json::to_value(row)?)?;
        let ctx = scope.log_context();
        let inserted = self.backend.insert(table, vec![row]).await.map_err(|e| {
            crate::log_warn!(ctx, "INSERT_FAILED", table = table.name(), error = e.to_string());
            e
        })?;
        crate::log_info!(ctx, "INSERT_COMPLETE", table = table.name(), rows = inserted.len());
        Ok(inserted)
    }

    /// Apply `patch` to every row matching `target`.
    pub async fn update<P: Serialize>(&self, target: &QueryRequest, patch: &P) -> Result<Vec<Value>> {
        let patch = serde_json::to_value(patch)?;
        let fields = match &patch {
            Value::Object(map) => map,
            _ => return Err(ApiError::validation("patch", "update patch must be an object")),
        };
        if fields.is_empty() {
            return Err(ApiError::validation("patch", "update patch is empty"));
        }
        if fields.contains_key(ORGANIZATION_COLUMN) {
            return Err(ApiError::validation(
                ORGANIZATION_COLUMN,
                "rows cannot be moved between organizations",
            ));
        }

        let ctx = request_log_context(target);
        let updated = self.backend.update(target, &patch).await?;
        crate::log_info!(ctx, "UPDATE_COMPLETE", table = target.table().name(), rows = updated.len());
        Ok(updated)
    }

    pub async fn delete(&self, target: &QueryRequest) -> Result<Vec<Value>> {
        let ctx = request_log_context(target);
        let deleted = self.backend.delete(target).await?;
        crate::log_info!(ctx, "DELETE_COMPLETE", table = target.table().name(), rows = deleted.len());
        Ok(deleted)
    }
}

/// Decode JSON rows into `T`, failing on the first malformed row.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(ApiError::from))
        .collect()
}

/// Stamp tenant (and selected account) onto a row bound for `table`.
pub fn stamp_row(scope: &ScopeContext, table: Table, row: Value) -> Result<Value> {
    if !table.is_tenant_scoped() {
        return Err(ApiError::validation(
            "table",
            format!("'{}' is not writable through a tenant scope", table),
        ));
    }
    let mut map = match row {
        Value::Object(map) => map,
        _ => return Err(ApiError::validation("row", "row must be a JSON object")),
    };

    match map.get(ORGANIZATION_COLUMN) {
        None | Some(Value::Null) => {}
        Some(Value::String(org)) if org == scope.tenant.as_str() => {}
        Some(_) => {
            return Err(ApiError::validation(
                ORGANIZATION_COLUMN,
                "row belongs to a different organization",
            ))
        }
    }
    map.insert(
        ORGANIZATION_COLUMN.to_string(),
        Value::from(scope.tenant.as_str()),
    );

    if let (Some(column), Some(account)) = (table.account_column(), &scope.account) {
        let unset = matches!(map.get(column), None | Some(Value::Null));
        if unset {
            map.insert(column.to_string(), Value::from(account.as_str()));
        }
    }

    Ok(Value::Object(map))
}

fn request_log_context(request: &QueryRequest) -> LogContext {
    let org = request.tenant().map(|t| t.as_str()).unwrap_or("global");
    LogContext::new(org)
}
