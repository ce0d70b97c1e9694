//! Client-side input validation.
//!
//! Rejects malformed input before any network call:
//! - Role ARNs and AWS account ids for account onboarding
//! - External ids for the cross-account trust policy
//! - Required free-text fields

pub mod credentials;

pub use credentials::*;
