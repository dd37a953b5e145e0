//! API-compatible types.
//!
//! The types in this module are serialised the way clients expect, e.g.:
//!
//! - Field names are the Spanish ones used by the frontend.
//! - Dates are serialised as `YYYY-MM-DD` strings.

pub mod auth;
pub mod candidate;
pub mod pagination;
pub mod vote;
pub mod voter;
