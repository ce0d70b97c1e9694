//! Remote function layer.
//!
//! Provides:
//! - The registry of named server-side functions and their routes
//! - An invoker that scopes, logs and unwraps each call
//! - Partial-success scan reports
//! - Scan status polling

pub mod invoker;
pub mod poller;
pub mod registry;
pub mod report;

pub use invoker::*;
pub use poller::*;
pub use registry::*;
pub use report::*;
