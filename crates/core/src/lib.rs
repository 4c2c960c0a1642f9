//! Aegis Core - Shared types library.
//!
//! This crate provides common types used across all Aegis components:
//! - `portal` - Role-gated insurance portal (customers, agents, admins)
//! - `cli` - Command-line tools for inspection and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no sessions,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, roles, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
