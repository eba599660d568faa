//! Core entity layer for the project tracker.
//! This crate is the single source of truth for project and todo rules.

pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use events::{Observers, ProjectEvent, SubscriptionId, TodoEvent};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use model::error::{ProjectError, ProjectResult, SelectionKind};
pub use model::project::{
    Project, ProjectData, ProjectId, ProjectRecord, ProjectStatus, ProjectUpdate, UserRole,
};
pub use model::todo::{Todo, TodoData, TodoId, TodoUpdate};
pub use model::validation::{resolve_finish_date, ValidationError};
pub use repo::document_repo::{
    Document, DocumentRepository, RepoError, RepoResult, SqliteDocumentRepository, StoredDocument,
};
pub use service::project_store::{LoadReport, ProjectStore, StoreError, StoreResult};
pub use service::projects_manager::{ProjectUpsert, ProjectsManager, TodoRestoreFailure};
pub use service::snapshot::{ImportFailure, ImportReport, SnapshotEntry, SnapshotError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
