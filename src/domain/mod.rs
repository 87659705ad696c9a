//! Backend-agnostic domain types for managed inference instances.

pub mod credential;
pub mod descriptor;
pub mod id;
pub mod record;
pub mod registry;
pub mod role;
pub mod status;
pub mod unit;

pub use credential::Credential;
pub use descriptor::InstanceDescriptor;
pub use id::InstanceId;
pub use record::{InstanceRecord, RecordState};
pub use registry::{EntryPatch, NewEntry, RegistryEntry, SyncOutcome};
pub use role::{InstanceKind, Role};
pub use status::{InstanceStatus, ListedState, UnitStatus};
pub use unit::{LaunchSpec, Mount, ShellSpec, UnitInfo, UnitLogs};
