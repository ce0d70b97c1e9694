//! EVO UDS Core - Tenant-scoped data layer for the EVO cloud dashboard
//!
//! This crate provides the query, pagination and aggregation core behind the
//! dashboard views. The implementation prioritizes:
//!
//! 1. **Isolation** - No tenant-scoped query can be built without an organization id
//! 2. **Logging** - Every remote call logged with org, account and request id
//! 3. **Explicit errors** - Every call returns a `Result`, never a `{data, error}` pair
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `context` - Tenant/account scope and the guarded-save token
//! - `query` - Query builder, client, cache, mutations and paged queries
//! - `functions` - Remote function registry, invoker and scan poller
//! - `transport` - HTTP backend for the tabular and function endpoints
//! - `pagination` - Per-view filter/pagination state machine
//! - `aggregation` - Monthly rollups, trends, security score, dedup
//! - `export` - CSV export of displayed rows
//! - `validation` - Client-side input checks
//! - `logging` - Structured logging with scope context

pub mod aggregation;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod functions;
pub mod logging;
pub mod pagination;
pub mod query;
pub mod transport;
pub mod validation;

#[cfg(feature = "python")]
mod python;

pub use config::ClientConfig;
pub use context::{SaveGuard, ScopeContext, TenantId};
pub use error::{ApiError, Result};
pub use functions::{FunctionInvoker, RemoteFunction, ScanPoller};
pub use query::{DataService, PagedQuery, PaginationMode, QueryClient, QueryRequest, Table};
pub use transport::HttpBackend;

/// Initialize the process-wide logger. Safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}
