//! Domain models for the portal.
//!
//! Session-held state only; everything durable lives in the policy
//! backend and is typed in [`crate::api::types`].

pub mod pipeline;
pub mod session;

pub use pipeline::QuoteHandoff;
pub use session::CurrentUser;
