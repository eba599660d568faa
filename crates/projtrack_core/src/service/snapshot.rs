//! Whole-list snapshot export and import.
//!
//! # Responsibility
//! - Serialize every project (todos inline) into a portable JSON array.
//! - Re-import snapshots record by record through `new_project`.
//!
//! # Invariants
//! - One failing record never aborts the remaining records.
//! - Only a document that is not a JSON array fails as a whole; a record
//!   that cannot be decoded is reported like any other rejected record.

use crate::model::error::ProjectError;
use crate::model::project::{ProjectData, ProjectRecord};
use crate::service::projects_manager::{ProjectUpsert, ProjectsManager, TodoRestoreFailure};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Default file name offered for exported snapshots.
pub const SNAPSHOT_FILE_NAME: &str = "projects.json";

/// Whole-document snapshot failure.
#[derive(Debug)]
pub enum SnapshotError {
    /// Document is not valid snapshot JSON.
    Json(serde_json::Error),
    /// Snapshot file could not be read or written.
    Io(std::io::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid snapshot document: {err}"),
            Self::Io(err) => write!(f, "snapshot file error: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// One record that could not be imported.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    /// Zero-based position of the record in the document.
    pub index: usize,
    /// Record name as supplied, for display.
    pub name: String,
    pub error: ProjectError,
}

/// One snapshot record after decoding.
pub type SnapshotEntry = Result<ProjectData, ImportFailure>;

/// Per-record outcome of an import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Successful records in document order.
    pub imported: Vec<ProjectUpsert>,
    pub failures: Vec<ImportFailure>,
    /// Nested todos of imported records that were dropped.
    pub todo_failures: Vec<TodoRestoreFailure>,
}

impl ImportReport {
    pub fn created_count(&self) -> usize {
        self.imported.iter().filter(|item| item.is_created()).count()
    }

    pub fn updated_count(&self) -> usize {
        self.imported.len() - self.created_count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.todo_failures.is_empty()
    }
}

impl ProjectsManager {
    /// Copies every project into its wire shape, in list order.
    pub fn export_snapshot(&self) -> Vec<ProjectRecord> {
        self.projects().iter().map(|project| project.to_record()).collect()
    }

    /// Exports the snapshot as pretty-printed JSON (two-space indent).
    pub fn export_snapshot_json(&self) -> Result<String, SnapshotError> {
        let json = serde_json::to_string_pretty(&self.export_snapshot())?;
        Ok(json)
    }

    /// Writes the JSON snapshot to `path`.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let json = self.export_snapshot_json()?;
        std::fs::write(path.as_ref(), json)?;
        info!(
            "event=snapshot_export module=snapshot status=ok count={}",
            self.len()
        );
        Ok(())
    }

    /// Imports records one by one; each failure is captured in the report.
    pub fn import_snapshot(&mut self, records: Vec<ProjectData>) -> ImportReport {
        self.import_entries(records.into_iter().map(Ok).collect())
    }

    /// Imports decoded entries in order; undecodable entries are reported
    /// without touching the list.
    pub fn import_entries(&mut self, entries: Vec<SnapshotEntry>) -> ImportReport {
        let mut report = ImportReport::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let record = match entry {
                Ok(record) => record,
                Err(failure) => {
                    warn!(
                        "event=snapshot_import module=snapshot status=error index={} error_code={}",
                        failure.index,
                        failure.error.code()
                    );
                    report.failures.push(failure);
                    continue;
                }
            };
            let name = record.name.clone();
            match self.upsert_project(record, None) {
                Ok((outcome, todo_failures)) => {
                    report.imported.push(outcome);
                    report.todo_failures.extend(todo_failures);
                }
                Err(error) => {
                    warn!(
                        "event=snapshot_import module=snapshot status=error index={} error_code={}",
                        index,
                        error.code()
                    );
                    report.failures.push(ImportFailure { index, name, error });
                }
            }
        }
        info!(
            "event=snapshot_import module=snapshot status=ok imported={} failed={} todos_failed={}",
            report.imported.len(),
            report.failures.len(),
            report.todo_failures.len()
        );
        report
    }

    /// Parses a JSON snapshot document and imports it.
    ///
    /// # Errors
    /// - [`SnapshotError::Json`] when the document is not a JSON array.
    pub fn import_snapshot_json(&mut self, json: &str) -> Result<ImportReport, SnapshotError> {
        let entries = Self::parse_snapshot(json)?;
        Ok(self.import_entries(entries))
    }

    /// Parses a snapshot document without importing it.
    ///
    /// Each array element is decoded on its own; a malformed element becomes
    /// an [`ImportFailure`] with [`ProjectError::InvalidRecord`].
    ///
    /// # Errors
    /// - [`SnapshotError::Json`] when the document is not a JSON array.
    pub fn parse_snapshot(json: &str) -> Result<Vec<SnapshotEntry>, SnapshotError> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        Ok(values
            .into_iter()
            .enumerate()
            .map(|(index, value)| decode_record(index, value))
            .collect())
    }

    /// Reads and imports a JSON snapshot file.
    pub fn load_snapshot(&mut self, path: impl AsRef<Path>) -> Result<ImportReport, SnapshotError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        self.import_snapshot_json(&json)
    }
}

fn decode_record(index: usize, value: Value) -> SnapshotEntry {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    serde_json::from_value(value).map_err(|err| ImportFailure {
        index,
        name,
        error: ProjectError::InvalidRecord(err.to_string()),
    })
}
