//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`runtime`]: In-memory [`Runtime`](crate::port::outbound::runtime::Runtime)
//!   that records launches and can be told to fail.
//! - [`probe`]: Scripted readiness probe.
//! - [`ports`]: Port probe over a fixed busy set.
//! - [`registry`]: In-memory registry with failure injection.
//! - [`records`]: In-memory record store.
//! - [`harness`]: A [`Lifecycle`](crate::application::lifecycle::Lifecycle)
//!   wired to all of the above.

pub mod harness;
pub mod ports;
pub mod probe;
pub mod records;
pub mod registry;
pub mod runtime;
