//! Equality and range predicates.
//!
//! Predicates are ANDed. A field carries either one literal (equality) or
//! one range object, never both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::scope::{ScopeContext, TenantId};
use crate::error::{ApiError, Result};

/// Tenant partition column present on every scoped table.
pub const ORGANIZATION_COLUMN: &str = "organization_id";

/// Sentinel enum-filter value meaning "no filter on this dimension".
pub const ALL_SENTINEL: &str = "all";

/// Range comparison bounds; any subset may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
}

impl Range {
    pub fn gte(value: impl Into<Value>) -> Self {
        Self {
            gte: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Self {
            lte: Some(value.into()),
            ..Self::default()
        }
    }

    /// Inclusive `[from, to]`.
    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self {
            gte: Some(from.into()),
            lte: Some(to.into()),
            ..Self::default()
        }
    }

    pub fn and_lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn and_gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.lte.is_none() && self.gt.is_none() && self.lt.is_none()
    }
}

/// Predicate on a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Eq(Value),
    Range(Range),
}

/// Field → predicate map; keys are kept sorted so serialized filters are
/// stable cache-key material.
pub type QueryFilter = BTreeMap<String, FilterValue>;

/// Filter that always carries the tenant partition.
///
/// The only constructors take a [`TenantId`] or [`ScopeContext`], so a
/// tenant-scoped query cannot be expressed without one.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgScopedFilter {
    tenant: TenantId,
    predicates: QueryFilter,
}

impl OrgScopedFilter {
    pub fn new(tenant: &TenantId) -> Self {
        Self {
            tenant: tenant.clone(),
            predicates: QueryFilter::new(),
        }
    }

    /// Tenant filter plus the account partition when one is selected.
    pub fn for_scope(scope: &ScopeContext, account_column: Option<&str>) -> Self {
        let mut filter = Self::new(&scope.tenant);
        if let (Some(column), Some(account)) = (account_column, &scope.account) {
            filter
                .predicates
                .insert(column.to_string(), FilterValue::Eq(Value::from(account.as_str())));
        }
        filter
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        insert_predicate(&mut self.predicates, field, FilterValue::Eq(value.into()))?;
        Ok(self)
    }

    pub fn range(mut self, field: &str, range: Range) -> Result<Self> {
        insert_predicate(&mut self.predicates, field, FilterValue::Range(range))?;
        Ok(self)
    }

    pub fn predicates(&self) -> &QueryFilter {
        &self.predicates
    }

    /// Full predicate map as sent on the wire, tenant column included.
    pub fn to_filter(&self) -> QueryFilter {
        let mut filter = self.predicates.clone();
        filter.insert(
            ORGANIZATION_COLUMN.to_string(),
            FilterValue::Eq(Value::from(self.tenant.as_str())),
        );
        filter
    }
}

/// Add a predicate to `filter`, enforcing one comparison style per field.
///
/// The tenant column is reserved; it comes only from the scope.
pub fn insert_predicate(filter: &mut QueryFilter, field: &str, value: FilterValue) -> Result<()> {
    let field = field.trim();
    if field.is_empty() {
        return Err(ApiError::validation("filter", "field name must not be empty"));
    }
    if field == ORGANIZATION_COLUMN {
        return Err(ApiError::validation(
            ORGANIZATION_COLUMN,
            "tenant filter is set from the request scope",
        ));
    }
    if let FilterValue::Range(range) = &value {
        if range.is_empty() {
            return Err(ApiError::validation(field, "range filter needs at least one bound"));
        }
    }

    let existing = filter.get(field).cloned();
    match (existing, value) {
        (None, value) => {
            filter.insert(field.to_string(), value);
            Ok(())
        }
        (Some(FilterValue::Eq(_)), FilterValue::Eq(v)) => {
            filter.insert(field.to_string(), FilterValue::Eq(v));
            Ok(())
        }
        (Some(FilterValue::Range(existing)), FilterValue::Range(extra)) => {
            let merged = Range {
                gte: extra.gte.or(existing.gte),
                lte: extra.lte.or(existing.lte),
                gt: extra.gt.or(existing.gt),
                lt: extra.lt.or(existing.lt),
            };
            filter.insert(field.to_string(), FilterValue::Range(merged));
            Ok(())
        }
        _ => Err(ApiError::validation(
            field,
            "cannot combine equality and range on the same field",
        )),
    }
}

/// True when an enum filter value means "no filter".
pub fn is_all_sentinel(value: &str) -> bool {
    value.trim().is_empty() || value.trim().eq_ignore_ascii_case(ALL_SENTINEL)
}
