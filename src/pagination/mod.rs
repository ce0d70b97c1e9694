//! Filter and pagination state.
//!
//! - `state` - per-view search/enum filters and page window
//! - `search` - which fields of a row free-text search and enum filters see

pub mod search;
pub mod state;

pub use search::*;
pub use state::*;
