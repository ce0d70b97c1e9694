//! Query requests against the tabular endpoint.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};

use crate::context::scope::{ScopeContext, TenantId};
use crate::error::{ApiError, Result};

use super::filter::{insert_predicate, is_all_sentinel, FilterValue, OrgScopedFilter, QueryFilter, Range};
use super::table::{EntityTag, Table};

/// Sort order for a select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicates {
    Scoped(OrgScopedFilter),
    Global(QueryFilter),
}

/// A select/count/update/delete target: table, predicates, order, window.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    table: Table,
    select: Option<String>,
    predicates: Predicates,
    order: Option<Order>,
    limit: Option<usize>,
    offset: Option<usize>,
    unbounded: bool,
    depends_on: BTreeSet<EntityTag>,
}

impl QueryRequest {
    /// Request against a tenant-scoped table for the given scope.
    ///
    /// The account partition is added when the scope selects an account.
    pub fn scoped(table: Table, scope: &ScopeContext) -> Result<Self> {
        if !table.is_tenant_scoped() {
            return Err(ApiError::validation(
                "table",
                format!("'{}' is not tenant scoped; use QueryRequest::global", table),
            ));
        }
        let filter = OrgScopedFilter::for_scope(scope, table.account_column());
        Ok(Self::from_predicates(table, Predicates::Scoped(filter)))
    }

    /// Request against a table shared across tenants.
    ///
    /// Fails for tenant-scoped tables: those need an organization id.
    pub fn global(table: Table) -> Result<Self> {
        if table.is_tenant_scoped() {
            return Err(ApiError::validation(
                "organization_id",
                format!("'{}' is tenant scoped and requires an organization id", table),
            ));
        }
        Ok(Self::from_predicates(table, Predicates::Global(QueryFilter::new())))
    }

    fn from_predicates(table: Table, predicates: Predicates) -> Self {
        let mut depends_on = BTreeSet::new();
        depends_on.insert(table.tag());
        Self {
            table,
            select: None,
            predicates,
            order: None,
            limit: None,
            offset: None,
            unbounded: false,
            depends_on,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.predicates = match self.predicates {
            Predicates::Scoped(f) => Predicates::Scoped(f.eq(field, value)?),
            Predicates::Global(mut f) => {
                insert_predicate(&mut f, field, FilterValue::Eq(value.into()))?;
                Predicates::Global(f)
            }
        };
        Ok(self)
    }

    /// Equality on an enum dimension, skipped for the `"all"` sentinel.
    pub fn eq_unless_all(self, field: &str, value: &str) -> Result<Self> {
        if is_all_sentinel(value) {
            return Ok(self);
        }
        self.eq(field, value)
    }

    pub fn range(mut self, field: &str, range: Range) -> Result<Self> {
        self.predicates = match self.predicates {
            Predicates::Scoped(f) => Predicates::Scoped(f.range(field, range)?),
            Predicates::Global(mut f) => {
                insert_predicate(&mut f, field, FilterValue::Range(range))?;
                Predicates::Global(f)
            }
        };
        Ok(self)
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Page window for a 1-based page number.
    pub fn page(self, page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        self.limit(page_size).offset((page - 1).saturating_mul(page_size))
    }

    /// Declare an extra entity type this read depends on.
    pub fn depends_on(mut self, tag: EntityTag) -> Self {
        self.depends_on.insert(tag);
        self
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn tenant(&self) -> Option<&TenantId> {
        match &self.predicates {
            Predicates::Scoped(f) => Some(f.tenant()),
            Predicates::Global(_) => None,
        }
    }

    pub fn tags(&self) -> &BTreeSet<EntityTag> {
        &self.depends_on
    }

    pub fn order_by(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn offset_value(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// Explicit limit, else the table's default (`None` = unbounded).
    ///
    /// Requests built by [`QueryRequest::without_window`] skip the default.
    pub fn effective_limit(&self) -> Option<usize> {
        match (self.limit, self.unbounded) {
            (Some(limit), _) => Some(limit),
            (None, true) => None,
            (None, false) => self.table.default_limit(),
        }
    }

    /// Full predicate map, tenant column included for scoped tables.
    pub fn filter(&self) -> QueryFilter {
        match &self.predicates {
            Predicates::Scoped(f) => f.to_filter(),
            Predicates::Global(f) => f.clone(),
        }
    }

    /// Same table and predicates, without order or window.
    pub fn count_request(&self) -> Self {
        Self {
            table: self.table,
            select: None,
            predicates: self.predicates.clone(),
            order: None,
            limit: None,
            offset: None,
            unbounded: false,
            depends_on: self.depends_on.clone(),
        }
    }

    /// Same table, predicates and order with no window and no default
    /// limit, for client-side paging over the full filtered set.
    pub fn without_window(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            unbounded: true,
            ..self.clone()
        }
    }

    /// Wire body for the tabular endpoint.
    ///
    /// Order and window are only sent with `select`.
    pub fn to_wire(&self, action: &str) -> Value {
        let mut body = json!({
            "action": action,
            "table": self.table.name(),
            "eq": self.filter(),
        });
        if let Value::Object(map) = &mut body {
            if let Some(select) = &self.select {
                map.insert("select".to_string(), Value::from(select.as_str()));
            }
            if action != "select" {
                return body;
            }
            if let Some(order) = &self.order {
                map.insert("order".to_string(), json!(order));
            }
            if let Some(limit) = self.effective_limit() {
                map.insert("limit".to_string(), Value::from(limit));
            }
            if let Some(offset) = self.offset {
                map.insert("offset".to_string(), Value::from(offset));
            }
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::ORGANIZATION_COLUMN;

    fn scope() -> ScopeContext {
        ScopeContext::from_ids("org-1", Some("123456789012")).unwrap()
    }

    #[test]
    fn test_scoped_request_carries_tenant() {
        let request = QueryRequest::scoped(Table::Findings, &scope()).unwrap();
        let filter = request.filter();
        assert_eq!(
            filter.get(ORGANIZATION_COLUMN),
            Some(&FilterValue::Eq(Value::from("org-1")))
        );
        assert_eq!(request.tenant().unwrap().as_str(), "org-1");
    }

    #[test]
    fn test_global_request_refused_for_tenant_table() {
        let err = QueryRequest::global(Table::Findings).unwrap_err();
        assert!(matches!(err, ApiError::Validation { ref field, .. } if field == ORGANIZATION_COLUMN));
    }

    #[test]
    fn test_scoped_request_refused_for_global_table() {
        assert!(QueryRequest::scoped(Table::Organizations, &scope()).is_err());
        assert!(QueryRequest::global(Table::Organizations).is_ok());
    }

    #[test]
    fn test_wire_shape() {
        let request = QueryRequest::scoped(Table::Findings, &scope())
            .unwrap()
            .eq("status", "open")
            .unwrap()
            .order("created_at", false)
            .page(2, 10);
        let wire = request.to_wire("select");
        assert_eq!(wire["table"], "findings");
        assert_eq!(wire["eq"]["organization_id"], "org-1");
        assert_eq!(wire["eq"]["aws_account_id"], "123456789012");
        assert_eq!(wire["eq"]["status"], "open");
        assert_eq!(wire["order"]["column"], "created_at");
        assert_eq!(wire["order"]["ascending"], false);
        assert_eq!(wire["limit"], 10);
        assert_eq!(wire["offset"], 10);
    }

    #[test]
    fn test_default_limit_applied() {
        let findings = QueryRequest::scoped(Table::Findings, &scope()).unwrap();
        assert_eq!(findings.to_wire("select")["limit"], 100);

        let costs = QueryRequest::scoped(Table::DailyCosts, &scope()).unwrap();
        assert!(costs.to_wire("select").get("limit").is_none());
    }

    #[test]
    fn test_without_window_skips_default_limit() {
        let request = QueryRequest::scoped(Table::Findings, &scope())
            .unwrap()
            .order("created_at", false)
            .page(2, 10)
            .without_window();
        assert_eq!(request.effective_limit(), None);
        assert_eq!(request.offset_value(), 0);
        let wire = request.to_wire("select");
        assert!(wire.get("limit").is_none());
        assert_eq!(wire["order"]["column"], "created_at");

        assert_eq!(request.limit(20).effective_limit(), Some(20));
    }

    #[test]
    fn test_huge_page_number_saturates() {
        let request = QueryRequest::scoped(Table::Findings, &scope())
            .unwrap()
            .page(usize::MAX, 50);
        assert_eq!(request.offset_value(), usize::MAX);
        assert_eq!(request.effective_limit(), Some(50));
    }

    #[test]
    fn test_eq_unless_all() {
        let request = QueryRequest::scoped(Table::Findings, &scope())
            .unwrap()
            .eq_unless_all("severity", "all")
            .unwrap();
        assert!(!request.filter().contains_key("severity"));
    }

    #[test]
    fn test_count_request_drops_window() {
        let request = QueryRequest::scoped(Table::Findings, &scope())
            .unwrap()
            .order("created_at", false)
            .page(3, 25);
        let count = request.count_request();
        assert!(count.order_by().is_none());
        assert_eq!(count.offset_value(), 0);
        assert_eq!(count.filter(), request.filter());
    }

    #[test]
    fn test_depends_on_includes_own_tag() {
        let request = QueryRequest::scoped(Table::RemediationTickets, &scope())
            .unwrap()
            .depends_on(EntityTag::Findings);
        assert!(request.tags().contains(&EntityTag::Tickets));
        assert!(request.tags().contains(&EntityTag::Findings));
    }
}
