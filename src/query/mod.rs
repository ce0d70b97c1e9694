//! Tabular query layer.
//!
//! Tenant-scoped requests against the tabular endpoint:
//! - `table` / `filter` / `request` - request building; tenant filters are structural
//! - `client` - backend seam and typed client
//! - `memory` - in-process backend
//! - `cache` / `service` / `mutation` - cached reads and tag invalidation
//! - `paged` - client- and server-side pagination behind one interface
//! - `models` - domain rows

pub mod cache;
pub mod client;
pub mod filter;
pub mod memory;
pub mod models;
pub mod mutation;
pub mod paged;
pub mod request;
pub mod service;
pub mod table;

pub use cache::*;
pub use client::*;
pub use filter::*;
pub use memory::*;
pub use models::*;
pub use mutation::*;
pub use paged::*;
pub use request::*;
pub use service::*;
pub use table::*;
