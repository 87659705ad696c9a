//! Instance bookkeeping port.

use crate::domain::{InstanceId, InstanceRecord};
use crate::error::Result;

/// Storage for [`InstanceRecord`]s, keyed by instance id.
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record for `record.id`.
    fn save(&self, record: &InstanceRecord) -> Result<()>;

    /// Remove the record. Removing a missing record succeeds.
    fn remove(&self, id: &InstanceId) -> Result<()>;

    fn all(&self) -> Result<Vec<InstanceRecord>>;
}
