//! Network transports for the tabular and function endpoints.

pub mod http;

pub use http::*;
