//! In-process tabular backend.
//!
//! Applies the same predicate, order and window semantics as the remote
//! endpoint over JSON rows held in memory.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, Result};

use super::client::TabularBackend;
use super::filter::{FilterValue, QueryFilter, Range};
use super::request::QueryRequest;
use super::table::Table;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows verbatim.
    pub fn seed(&self, table: Table, rows: Vec<Value>) {
        self.tables.write().entry(table).or_default().extend(rows);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.read().get(&table).cloned().unwrap_or_default()
    }

    fn matching(&self, request: &QueryRequest) -> Vec<Value> {
        let filter = request.filter();
        self.tables
            .read()
            .get(&request.table())
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_filter(row, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TabularBackend for MemoryBackend {
    async fn select(&self, request: &QueryRequest) -> Result<Vec<Value>> {
        let mut rows = self.matching(request);

        if let Some(order) = request.order_by() {
            rows.sort_by(|a, b| {
                let ord = compare_optional(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        let offset = request.offset_value();
        let rows = rows.into_iter().skip(offset);
        Ok(match request.effective_limit() {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }

    async fn count(&self, request: &QueryRequest) -> Result<usize> {
        Ok(self.matching(request).len())
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>> {
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let mut map = match row {
                Value::Object(map) => map,
                _ => return Err(ApiError::validation("row", "row must be a JSON object")),
            };
            map.entry("id")
                .or_insert_with(|| Value::from(Uuid::new_v4().to_string()));
            map.entry("created_at")
                .or_insert_with(|| Value::from(Utc::now().to_rfc3339()));
            inserted.push(Value::Object(map));
        }
        self.tables
            .write()
            .entry(table)
            .or_default()
            .extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update(&self, target: &QueryRequest, patch: &Value) -> Result<Vec<Value>> {
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(ApiError::validation("patch", "update patch must be an object")),
        };
        let filter = target.filter();
        let mut tables = self.tables.write();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(&target.table()) {
            for row in rows.iter_mut().filter(|row| matches_filter(row, &filter)) {
                if let Value::Object(map) = row {
                    for (k, v) in patch {
                        map.insert(k.clone(), v.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, target: &QueryRequest) -> Result<Vec<Value>> {
        let filter = target.filter();
        let mut tables = self.tables.write();
        let mut deleted = Vec::new();
        if let Some(rows) = tables.get_mut(&target.table()) {
            rows.retain(|row| {
                if matches_filter(row, &filter) {
                    deleted.push(row.clone());
                    false
                } else {
                    true
                }
            });
        }
        Ok(deleted)
    }
}

/// True when `row` satisfies every predicate.
pub fn matches_filter(row: &Value, filter: &QueryFilter) -> bool {
    filter.iter().all(|(field, predicate)| {
        let value = match row.get(field) {
            Some(v) if !v.is_null() => v,
            _ => return false,
        };
        match predicate {
            FilterValue::Eq(expected) => compare_values(value, expected) == Some(Ordering::Equal),
            FilterValue::Range(range) => in_range(value, range),
        }
    })
}

fn in_range(value: &Value, range: &Range) -> bool {
    let check = |bound: &Option<Value>, ok: fn(Ordering) -> bool| match bound {
        None => true,
        Some(b) => compare_values(value, b).map(ok).unwrap_or(false),
    };
    check(&range.gte, |o| o != Ordering::Less)
        && check(&range.lte, |o| o != Ordering::Greater)
        && check(&range.gt, |o| o == Ordering::Greater)
        && check(&range.lt, |o| o == Ordering::Less)
}

/// Numbers compare numerically, strings lexicographically (ISO dates sort
/// correctly), booleans by value; mixed kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    // Nulls and missing values sort last.
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
