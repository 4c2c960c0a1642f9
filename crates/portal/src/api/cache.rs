//! Cache types for policy backend responses.
//!
//! Only the policy catalog is cached. Applications, claims, and payments
//! are mutable per-user state and always read through.

use crate::api::types::{Policy, PolicyPage};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Policy(Box<Policy>),
    Policies(PolicyPage),
    Popular(Vec<Policy>),
}
