//! File-backed instance records.
//!
//! One JSON document per instance under `{dir}/{id}.json`, replaced
//! atomically with a write-to-temp-then-rename.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::warn;
use uuid::Uuid;

use crate::domain::{InstanceId, InstanceRecord};
use crate::error::Result;
use crate::port::outbound::records::RecordStore;

#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, id: &InstanceId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }
}

impl RecordStore for FileRecordStore {
    fn save(&self, record: &InstanceRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        fs::create_dir_all(&self.dir)?;

        let path = self.path(&record.id);
        // Unique per writer so concurrent saves never share a temp file.
        let temp_path = self
            .dir
            .join(format!(".{}.{}.tmp", record.id.as_str(), Uuid::new_v4()));
        let cleanup_and_err = |e: io::Error| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, &path).map_err(cleanup_and_err)?;
        Ok(())
    }

    fn remove(&self, id: &InstanceId) -> Result<()> {
        match fs::remove_file(self.path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn all(&self) -> Result<Vec<InstanceRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(crate::error::Error::from)
                .and_then(|json| Ok(serde_json::from_str::<InstanceRecord>(&json)?));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable instance record"),
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}
