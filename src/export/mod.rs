//! Export of displayed rows.

pub mod field;
pub mod writer;

pub use field::*;
pub use writer::*;
