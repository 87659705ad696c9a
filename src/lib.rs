//! modelctl - lifecycle orchestration for GPU model-inference instances.
//!
//! Starts, stops, lists and debug-shells into inference services running as
//! Apptainer instances on a single host, and keeps a central model registry
//! pointed at each instance's live endpoint and credential.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Instance ids, roles, descriptors, records and registry entries
//! - [`port`] - Traits for the runtime backend, registry, probes and record store
//! - [`adapter`] - Apptainer, HTTP and file-backed implementations, plus the CLI
//! - [`application`] - Identity, ports, credentials, health, registry sync and
//!   the lifecycle controller
//! - [`infrastructure`] - Settings, logging and wiring
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - In-memory fakes for every port, for integration tests
//!
//! # Example
//!
//! ```no_run
//! use modelctl::application::identity;
//!
//! let descriptor = identity::resolve(std::path::Path::new("models/llama-3.yaml"))?;
//! assert_eq!(descriptor.id.as_str(), "llama-3");
//! # Ok::<(), modelctl::error::Error>(())
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
