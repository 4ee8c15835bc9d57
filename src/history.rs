//! Bounded download history
//!
//! The history is a newest-first list of [`HistoryRecord`]s capped at a fixed
//! capacity. The whole list is stored as one JSON array under a single file
//! path and rewritten on every mutation:
//!
//! 1. Serialize the updated list
//! 2. Write it to `<path>.tmp` and fsync
//! 3. Rename over `<path>` (atomic on Unix/macOS)
//!
//! Either the full updated list is durable or the previous file is left as it
//! was. The in-memory list only changes after the rename succeeds.
//!
//! Loading never blocks startup: an unreadable or corrupt file is reported as
//! [`HistoryLoad::Recovered`] and the history starts empty.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::types::HistoryRecord;

/// How the history was rehydrated at startup
#[derive(Debug)]
pub enum HistoryLoad {
    /// No history file yet
    Empty,
    /// Records were read successfully
    Loaded {
        /// Number of records kept (after truncation to capacity)
        count: usize,
    },
    /// The file could not be used; history starts empty
    Recovered {
        /// Why the stored history was discarded
        error: PersistenceError,
    },
}

impl HistoryLoad {
    /// Whether the stored history had to be discarded
    pub fn is_recovered(&self) -> bool {
        matches!(self, HistoryLoad::Recovered { .. })
    }
}

/// Persisted, capacity-bounded, newest-first history
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// Open the history at `path`, loading whatever is stored there
    ///
    /// A capacity of zero is treated as one.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> (Self, HistoryLoad) {
        let path = path.into();
        let capacity = capacity.max(1);
        let (records, outcome) = Self::load(&path, capacity);

        (
            Self {
                path,
                capacity,
                records,
            },
            outcome,
        )
    }

    /// Read the stored records, failing open to an empty list
    ///
    /// Stored lists longer than `capacity` are truncated from the tail.
    pub fn load(path: &Path, capacity: usize) -> (Vec<HistoryRecord>, HistoryLoad) {
        match read_records(path) {
            Ok(None) => {
                tracing::debug!(path = %path.display(), "no history file, starting empty");
                (Vec::new(), HistoryLoad::Empty)
            }
            Ok(Some(mut records)) => {
                records.truncate(capacity);
                let count = records.len();
                tracing::debug!(path = %path.display(), count, "history loaded");
                (records, HistoryLoad::Loaded { count })
            }
            Err(error) => {
                tracing::warn!(error = %error, "discarding unreadable history");
                (Vec::new(), HistoryLoad::Recovered { error })
            }
        }
    }

    /// Insert `record` at the head, drop anything past capacity, and persist
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Write`] if the list cannot be written. The
    /// stored file and the in-memory list are then both unchanged.
    pub fn commit(&mut self, record: HistoryRecord) -> Result<(), PersistenceError> {
        let mut updated = Vec::with_capacity(self.capacity);
        updated.push(record);
        updated.extend(self.records.iter().take(self.capacity - 1).cloned());

        write_records(&self.path, &updated)?;
        self.records = updated;

        tracing::debug!(len = self.records.len(), "history committed");
        Ok(())
    }

    /// Remove every record and persist the empty list
    pub fn clear(&mut self) -> Result<(), PersistenceError> {
        write_records(&self.path, &[])?;
        self.records.clear();
        Ok(())
    }

    /// Read-only view of the records, newest first
    pub fn current(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// History file location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_records(path: &Path) -> Result<Option<Vec<HistoryRecord>>, PersistenceError> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|e| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_records(path: &Path, records: &[HistoryRecord]) -> Result<(), PersistenceError> {
    let write_err = |source: std::io::Error| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let content = serde_json::to_vec_pretty(records).map_err(|e| write_err(e.into()))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let temp = temp_path(path);
    let result = (|| {
        let mut file = std::fs::File::create(&temp)?;
        file.write_all(&content)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&temp, path)
    })();

    if let Err(e) = result {
        std::fs::remove_file(&temp).ok();
        return Err(write_err(e));
    }

    Ok(())
}
