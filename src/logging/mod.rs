//! Structured logging with tenant context.
//!
//! Provides logging macros and utilities that include the organization,
//! account and request id in every log message for easy correlation.

pub mod structured;

pub use structured::*;
