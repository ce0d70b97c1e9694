//! Client-side aggregation over fetched rows.
//!
//! All functions are pure and recompute from scratch:
//! - Monthly cost rollups and service totals
//! - Trend deltas between periods
//! - Weighted-penalty security score
//! - Recommendation deduplication

pub mod dedup;
pub mod monthly;
pub mod score;
pub mod trend;

pub use dedup::*;
pub use monthly::*;
pub use score::*;
pub use trend::*;
