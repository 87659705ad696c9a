//! Outbound ports (driven side): interfaces implemented by outbound adapters.

pub mod probe;
pub mod records;
pub mod registry;
pub mod runtime;
