//! Tenant and account scope.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::logging::structured::LogContext;

/// Organization identifier; the data-isolation boundary.
///
/// Cannot be constructed empty, so anything holding a `TenantId` holds a
/// usable partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ApiError::validation("organization_id", "organization id is required"));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TenantId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        TenantId::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Connected cloud account within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ApiError::validation("account_id", "account id must not be empty"));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Explicit tenant/account selection for one view or request.
///
/// `account == None` is the "all accounts" view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeContext {
    pub tenant: TenantId,
    pub account: Option<AccountId>,
}

impl ScopeContext {
    pub fn new(tenant: TenantId, account: Option<AccountId>) -> Self {
        Self { tenant, account }
    }

    /// Build from raw ids as handed over by the session provider.
    /// An empty account id or `"all"` selects every account.
    pub fn from_ids(tenant: &str, account: Option<&str>) -> Result<Self> {
        let tenant = TenantId::new(tenant)?;
        let account = match account.map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(id) => Some(AccountId::new(id)?),
        };
        Ok(Self { tenant, account })
    }

    pub fn all_accounts(tenant: TenantId) -> Self {
        Self {
            tenant,
            account: None,
        }
    }

    pub fn with_account(&self, account: Option<AccountId>) -> Self {
        Self {
            tenant: self.tenant.clone(),
            account,
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(self.tenant.as_str()).with_account(self.account.as_ref().map(|a| a.as_str()))
    }

    /// Log context tagged with a fresh short request id.
    pub fn request_log_context(&self) -> LogContext {
        let request_id = format!("req-{}", &Uuid::new_v4().to_string()[..8]);
        self.log_context().with_request(&request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_rejects_blank() {
        assert!(TenantId::new("").is_err());
        assert!(TenantId::new("   ").is_err());
        assert_eq!(TenantId::new(" org-1 ").unwrap().as_str(), "org-1");
    }

    #[test]
    fn test_tenant_deserialize_validates() {
        let ok: TenantId = serde_json::from_str(r#""org-1""#).unwrap();
        assert_eq!(ok.as_str(), "org-1");
        assert!(serde_json::from_str::<TenantId>(r#""""#).is_err());
    }

    #[test]
    fn test_scope_from_ids() {
        let scope = ScopeContext::from_ids("org-1", Some("all")).unwrap();
        assert!(scope.account.is_none());

        let scope = ScopeContext::from_ids("org-1", Some("123456789012")).unwrap();
        assert_eq!(scope.account.unwrap().as_str(), "123456789012");

        assert!(ScopeContext::from_ids("", None).is_err());
    }

    #[test]
    fn test_request_log_context() {
        let scope = ScopeContext::from_ids("org-1", None).unwrap();
        let ctx = scope.request_log_context();
        assert!(ctx.request_id.unwrap().starts_with("req-"));
    }
}
