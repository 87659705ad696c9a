//! In-memory record store.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::domain::{InstanceId, InstanceRecord};
use crate::error::Result;
use crate::port::outbound::records::RecordStore;

#[derive(Debug, Default)]
pub struct MemoryRecords {
    records: Mutex<BTreeMap<InstanceId, InstanceRecord>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<InstanceRecord> {
        self.records.lock().get(&InstanceId::new(id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordStore for MemoryRecords {
    fn save(&self, record: &InstanceRecord) -> Result<()> {
        self.records
            .lock()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, id: &InstanceId) -> Result<()> {
        self.records.lock().remove(id);
        Ok(())
    }

    fn all(&self) -> Result<Vec<InstanceRecord>> {
        Ok(self.records.lock().values().cloned().collect())
    }
}
