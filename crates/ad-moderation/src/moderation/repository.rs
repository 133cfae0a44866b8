use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use super::domain::ModerationRecord;

/// Append-only storage for moderation records.
pub trait RecordStore: Send + Sync {
    fn append(&self, record: &ModerationRecord) -> Result<(), StoreError>;
    fn records(&self) -> Result<Vec<ModerationRecord>, StoreError>;

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records()?.len())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store io failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Whole-file JSON array store.
///
/// Every append reads the current collection, pushes the record and rewrites
/// the file through a temporary sibling that is renamed into place. A single
/// writer lock serializes appends from concurrent submissions.
#[derive(Debug)]
pub struct JsonFileRecordStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl JsonFileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    /// Missing or unreadable collections start over as an empty array.
    fn load_collection(&self) -> Result<Vec<Value>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(_) => {
                warn!(path = %self.path.display(), "record store is not a JSON array, starting a new collection");
                Ok(Vec::new())
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "record store is unreadable, starting a new collection");
                Ok(Vec::new())
            }
        }
    }

    fn write_collection(&self, entries: &[Value]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let body = serde_json::to_string_pretty(entries)?;
        fs::write(&staging, body).map_err(|source| self.io_error(source))?;
        fs::rename(&staging, &self.path).map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordStore for JsonFileRecordStore {
    fn append(&self, record: &ModerationRecord) -> Result<(), StoreError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.load_collection()?;
        entries.push(serde_json::to_value(record)?);
        self.write_collection(&entries)?;

        debug!(path = %self.path.display(), total = entries.len(), "moderation record appended");
        Ok(())
    }

    fn records(&self) -> Result<Vec<ModerationRecord>, StoreError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let records = self
            .load_collection()?
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(error = %err, "skipping stored entry that is not a moderation record");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    fn len(&self) -> Result<usize, StoreError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load_collection()?.len())
    }
}
