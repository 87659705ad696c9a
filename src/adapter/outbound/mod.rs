//! Outbound adapters (driven side).

pub mod apptainer;
pub mod http;
pub mod records;
pub mod registry;
pub mod tcp;
