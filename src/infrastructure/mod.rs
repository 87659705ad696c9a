//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! orchestration logic.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Settings loading, validation and logging

pub mod bootstrap;
pub mod config;
