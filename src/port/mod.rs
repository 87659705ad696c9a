//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the extension points of the orchestrator. Each external
//! collaborator (container runtime, model registry, HTTP readiness surface,
//! local TCP stack, instance bookkeeping) sits behind one trait so the
//! lifecycle logic can be exercised against in-memory fakes.
//!
//! ```text
//!                      ┌───────────────────────┐
//!                      │  Lifecycle controller │
//!                      └───────────┬───────────┘
//!        ┌──────────────┬──────────┼───────────┬──────────────┐
//!        ▼              ▼          ▼           ▼              ▼
//!   ┌─────────┐   ┌──────────┐ ┌───────┐ ┌───────────┐ ┌─────────────┐
//!   │ Runtime │   │ Registry │ │ Probe │ │ PortProbe │ │ RecordStore │
//!   └─────────┘   └──────────┘ └───────┘ └───────────┘ └─────────────┘
//! ```

pub mod outbound;
