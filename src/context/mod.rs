//! Request scoping.
//!
//! Tenant and account selection are passed explicitly to every query
//! rather than read from ambient state:
//! - `scope` - tenant/account identifiers and the per-request scope
//! - `guard` - external-id guard for saves that must not commit stale data

pub mod guard;
pub mod scope;

pub use guard::*;
pub use scope::*;
