//! Writes and the entity tags they affect.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};

use crate::context::scope::{ScopeContext, TenantId};
use crate::error::{ApiError, Result};

use super::models::{FindingStatus, TicketPriority, TicketStatus};
use super::request::QueryRequest;
use super::table::{EntityTag, Table};

#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    Insert { scope: ScopeContext, row: Value },
    Update { target: QueryRequest, patch: Value },
    Delete { target: QueryRequest },
}

/// A write plus the tags whose cached reads it makes stale.
///
/// The table's own tag is always included.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    table: Table,
    tenant: TenantId,
    kind: MutationKind,
    affects: BTreeSet<EntityTag>,
}

impl Mutation {
    pub fn insert<R: Serialize>(scope: &ScopeContext, table: Table, row: &R) -> Result<Self> {
        if !table.is_tenant_scoped() {
            return Err(ApiError::validation("table", format!("'{}' is not tenant scoped", table)));
        }
        Ok(Self::build(
            table,
            scope.tenant.clone(),
            MutationKind::Insert {
                scope: scope.clone(),
                row: serde_json::to_value(row)?,
            },
        ))
    }

    pub fn update<P: Serialize>(target: QueryRequest, patch: &P) -> Result<Self> {
        let tenant = scoped_tenant(&target)?;
        let patch = serde_json::to_value(patch)?;
        Ok(Self::build(target.table(), tenant, MutationKind::Update { target, patch }))
    }

    pub fn delete(target: QueryRequest) -> Result<Self> {
        let tenant = scoped_tenant(&target)?;
        Ok(Self::build(target.table(), tenant, MutationKind::Delete { target }))
    }

    fn build(table: Table, tenant: TenantId, kind: MutationKind) -> Self {
        let mut affects = BTreeSet::new();
        affects.insert(table.tag());
        Self {
            table,
            tenant,
            kind,
            affects,
        }
    }

    /// Declare another entity type whose reads this write changes.
    pub fn also_affects(mut self, tag: EntityTag) -> Self {
        self.affects.insert(tag);
        self
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn kind(&self) -> &MutationKind {
        &self.kind
    }

    pub fn affects(&self) -> &BTreeSet<EntityTag> {
        &self.affects
    }

    /// Move one finding to a new lifecycle status.
    pub fn update_finding_status(scope: &ScopeContext, finding_id: &str, status: FindingStatus) -> Result<Self> {
        let target = QueryRequest::scoped(Table::Findings, scope)?.eq("id", finding_id)?;
        Self::update(target, &json!({ "status": status }))
    }

    /// Open a remediation ticket, optionally linked to a finding.
    ///
    /// Finding lists show the linked ticket, so finding reads are affected
    /// too.
    pub fn create_ticket(scope: &ScopeContext, draft: &TicketDraft) -> Result<Self> {
        crate::validation::require_non_empty("title", &draft.title)?;
        let row = json!({
            "title": draft.title.trim(),
            "description": draft.description,
            "priority": draft.priority,
            "status": TicketStatus::Open,
            "finding_id": draft.finding_id,
        });
        let mutation = Self::insert(scope, Table::RemediationTickets, &row)?;
        Ok(if draft.finding_id.is_some() {
            mutation.also_affects(EntityTag::Findings)
        } else {
            mutation
        })
    }

    pub fn update_ticket_status(scope: &ScopeContext, ticket_id: &str, status: TicketStatus) -> Result<Self> {
        let target = QueryRequest::scoped(Table::RemediationTickets, scope)?.eq("id", ticket_id)?;
        Self::update(target, &json!({ "status": status }))
    }
}

/// Input for a new remediation ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: TicketPriority,
    pub finding_id: Option<String>,
}

fn scoped_tenant(target: &QueryRequest) -> Result<TenantId> {
    target.tenant().cloned().ok_or_else(|| {
        ApiError::validation(
            "table",
            format!("'{}' is not writable through a tenant scope", target.table()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ScopeContext {
        ScopeContext::from_ids("org-1", None).unwrap()
    }

    #[test]
    fn test_update_affects_own_tag() {
        let m = Mutation::update_finding_status(&scope(), "f-1", FindingStatus::Resolved).unwrap();
        assert_eq!(m.affects(), &BTreeSet::from([EntityTag::Findings]));
        match m.kind() {
            MutationKind::Update { patch, .. } => assert_eq!(patch["status"], "resolved"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_linked_ticket_affects_findings() {
        let draft = TicketDraft {
            title: "Close port 22".to_string(),
            description: None,
            priority: TicketPriority::High,
            finding_id: Some("f-1".to_string()),
        };
        let m = Mutation::create_ticket(&scope(), &draft).unwrap();
        assert!(m.affects().contains(&EntityTag::Tickets));
        assert!(m.affects().contains(&EntityTag::Findings));
    }

    #[test]
    fn test_ticket_requires_title() {
        let draft = TicketDraft {
            title: "  ".to_string(),
            description: None,
            priority: TicketPriority::Low,
            finding_id: None,
        };
        let err = Mutation::create_ticket(&scope(), &draft).unwrap_err();
        assert!(matches!(err, ApiError::Validation { ref field, .. } if field == "title"));
    }

    #[test]
    fn test_global_writes_rejected() {
        let target = QueryRequest::global(Table::Organizations).unwrap();
        assert!(Mutation::delete(target).is_err());
    }
}
