//! Portal services.
//!
//! Pure domain logic and orchestration, kept out of the route handlers so
//! it can be tested without HTTP.

pub mod pipeline;
pub mod quote;
pub mod roles;
