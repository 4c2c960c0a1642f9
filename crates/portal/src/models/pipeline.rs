//! Quote-to-application pipeline state.
//!
//! A quote is only valid for the policy it was computed against. The
//! handoff stored in the session carries the policy ID alongside the
//! priced quote so the application step can refuse a stale or swapped
//! quote instead of silently submitting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aegis_core::PolicyId;

use crate::services::quote::{Quote, QuoteInput};

/// A priced quote parked in the session between quoting and applying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteHandoff {
    /// The policy the quote was computed against.
    pub policy_id: PolicyId,
    /// Denormalized policy title for the application record.
    pub policy_title: String,
    /// The applicant profile that was priced.
    pub input: QuoteInput,
    /// The resulting premiums.
    pub quote: Quote,
    /// When the quote was computed.
    pub quoted_at: DateTime<Utc>,
}

impl QuoteHandoff {
    /// Whether this handoff belongs to the given policy.
    #[must_use]
    pub fn matches(&self, policy_id: &PolicyId) -> bool {
        self.policy_id == *policy_id
    }
}
