//! Application services (use cases).
//!
//! These services compose domain types and outbound ports into the
//! instance lifecycle: identity resolution, port allocation, credential
//! generation, readiness polling, registry reconciliation and the
//! `start`/`stop`/`list`/`shell` controller that ties them together.

pub mod credential;
pub mod health;
pub mod identity;
pub mod lifecycle;
pub mod lock;
pub mod ports;
pub mod registry;
