//! Write-through persistence for a [`ProjectsManager`].
//!
//! # Responsibility
//! - Load stored projects and their todos into a manager.
//! - Mirror every successful manager change into the document store.
//!
//! # Invariants
//! - The manager is changed first; the store is written only after the entity
//!   rules accepted the change.
//! - A project created in the manager is removed again when its store write
//!   fails.
//! - One unreadable document never aborts a load.

use crate::model::error::{ProjectError, ProjectResult};
use crate::model::project::{Project, ProjectData, ProjectId, ProjectUpdate};
use crate::model::todo::{Todo, TodoData, TodoId, TodoUpdate};
use crate::repo::codec::{
    project_from_document, project_to_document, todo_from_document, todo_to_document,
};
use crate::repo::document_repo::{DocumentRepository, RepoError, RepoResult};
use crate::service::projects_manager::{ProjectUpsert, ProjectsManager};
use crate::service::snapshot::{ImportReport, SnapshotEntry};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Collection holding one document per project.
pub const PROJECTS_COLLECTION: &str = "projects";
/// Collection holding one document per todo, keyed back via `projectId`.
pub const TODOS_COLLECTION: &str = "todos";
const PROJECT_ID_FIELD: &str = "projectId";

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a persisted project operation.
#[derive(Debug)]
pub enum StoreError {
    /// Document store failed or held unreadable data.
    Repo(RepoError),
    /// Entity rules rejected the change; nothing was written.
    Project(ProjectError),
}

impl StoreError {
    /// Stable code for UI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Repo(_) => "store",
            Self::Project(err) => err.code(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Project(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Project(err) => Some(err),
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ProjectError> for StoreError {
    fn from(value: ProjectError) -> Self {
        Self::Project(value)
    }
}

/// One stored project that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    pub document_id: String,
    pub error: StoreError,
}

/// Outcome of [`ProjectStore::load_projects`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Use-case service pairing manager operations with document writes.
pub struct ProjectStore<R: DocumentRepository> {
    repo: R,
}

impl<R: DocumentRepository> ProjectStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads every stored project, with its todos, into `manager`.
    ///
    /// Documents that fail to decode or break a rule (for example a duplicate
    /// name) are reported and skipped.
    ///
    /// # Errors
    /// - [`StoreError::Repo`] when the projects collection cannot be listed.
    pub fn load_projects(&self, manager: &mut ProjectsManager) -> StoreResult<LoadReport> {
        let documents = self.repo.get_all(PROJECTS_COLLECTION)?;
        let mut report = LoadReport::default();

        for stored in &documents {
            let result = project_from_document(stored)
                .and_then(|mut data| {
                    data.todos_list = self.load_todos(&stored.id)?;
                    Ok(data)
                })
                .map_err(StoreError::from)
                .and_then(|data| manager.new_project(data, None).map_err(StoreError::from));
            match result {
                Ok(_) => report.loaded += 1,
                Err(error) => {
                    warn!(
                        "event=store_load module=store status=error doc_id={} error_code={}",
                        stored.id,
                        error.code()
                    );
                    report.failures.push(LoadFailure {
                        document_id: stored.id.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "event=store_load module=store status=ok loaded={} failed={}",
            report.loaded,
            report.failures.len()
        );
        Ok(report)
    }

    /// Reads the stored todos owned by `project_id`, in insertion order.
    pub fn load_todos(&self, project_id: &str) -> RepoResult<Vec<TodoData>> {
        self.repo
            .query_eq(TODOS_COLLECTION, PROJECT_ID_FIELD, project_id)?
            .iter()
            .map(todo_from_document)
            .collect()
    }

    /// Creates (or routes to edit) a project and writes it with its todos.
    ///
    /// # Errors
    /// - [`StoreError::Project`] for entity rule violations; nothing written.
    /// - [`StoreError::Repo`] when the write fails; a newly created project is
    ///   removed from `manager` again.
    pub fn create_project(
        &self,
        manager: &mut ProjectsManager,
        data: ProjectData,
        optional_id: Option<&str>,
    ) -> StoreResult<ProjectUpsert> {
        let outcome = manager.new_project(data, optional_id)?;
        if let Err(err) = self.write_project(manager, outcome.id(), true) {
            error!(
                "event=project_persist module=store status=error project_id={} error={}",
                outcome.id(),
                err
            );
            if outcome.is_created() {
                manager.delete_project(outcome.id());
            }
            return Err(err);
        }
        Ok(outcome)
    }

    /// Edits a project in `manager` and rewrites its document.
    pub fn update_project(
        &self,
        manager: &mut ProjectsManager,
        update: ProjectUpdate,
    ) -> StoreResult<ProjectId> {
        let id = manager.edit_project(update)?.id().to_string();
        self.write_project(manager, &id, false)?;
        Ok(id)
    }

    /// Deletes a project and every stored todo that names it.
    ///
    /// Returns `false` when the manager did not hold the project; stored
    /// documents for the id are removed either way.
    pub fn delete_project(&self, manager: &mut ProjectsManager, id: &str) -> StoreResult<bool> {
        let id = id.trim();
        let removed = manager.delete_project(id);
        ignore_missing(self.repo.delete(PROJECTS_COLLECTION, id))?;
        for todo in self.repo.query_eq(TODOS_COLLECTION, PROJECT_ID_FIELD, id)? {
            ignore_missing(self.repo.delete(TODOS_COLLECTION, &todo.id))?;
        }
        info!("event=project_delete module=store status=ok project_id={id} removed={removed}");
        Ok(removed)
    }

    /// Adds (or routes to edit) a todo on one project and writes it.
    pub fn add_todo(
        &self,
        manager: &mut ProjectsManager,
        project_id: &str,
        data: TodoData,
    ) -> StoreResult<TodoId> {
        let todo = require_project(manager, project_id)?.add_todo(data, None)?;
        self.write_todo(todo)
    }

    /// Edits a todo on one project and rewrites its document.
    pub fn edit_todo(
        &self,
        manager: &mut ProjectsManager,
        project_id: &str,
        update: TodoUpdate,
    ) -> StoreResult<TodoId> {
        let todo = require_project(manager, project_id)?.edit_todo(update)?;
        self.write_todo(todo)
    }

    /// Removes a todo from one project and from the store.
    pub fn delete_todo(
        &self,
        manager: &mut ProjectsManager,
        project_id: &str,
        todo_id: &str,
    ) -> StoreResult<()> {
        require_project(manager, project_id)?.delete_todo(todo_id)?;
        ignore_missing(self.repo.delete(TODOS_COLLECTION, todo_id))?;
        Ok(())
    }

    /// Imports snapshot records into `manager` and writes every accepted one.
    ///
    /// Rejected records stay in the report; the first failed write aborts.
    pub fn import_snapshot(
        &self,
        manager: &mut ProjectsManager,
        entries: Vec<SnapshotEntry>,
    ) -> StoreResult<ImportReport> {
        let report = manager.import_entries(entries);
        for outcome in &report.imported {
            self.write_project(manager, outcome.id(), true)?;
        }
        Ok(report)
    }

    fn write_project(
        &self,
        manager: &ProjectsManager,
        id: &str,
        with_todos: bool,
    ) -> StoreResult<()> {
        let project = manager
            .project_by_id(id)
            .ok_or_else(|| ProjectError::ProjectNotFound(id.to_string()))?;
        self.repo
            .set(PROJECTS_COLLECTION, id, &project_to_document(project)?)?;
        if with_todos {
            for todo in project.todos() {
                self.write_todo(todo)?;
            }
        }
        Ok(())
    }

    fn write_todo(&self, todo: &Todo) -> StoreResult<TodoId> {
        self.repo
            .set(TODOS_COLLECTION, todo.id(), &todo_to_document(todo)?)?;
        Ok(todo.id().to_string())
    }
}

fn require_project<'m>(
    manager: &'m mut ProjectsManager,
    project_id: &str,
) -> ProjectResult<&'m mut Project> {
    manager
        .project_by_id_mut(project_id.trim())
        .ok_or_else(|| ProjectError::ProjectNotFound(project_id.trim().to_string()))
}

fn ignore_missing(result: RepoResult<()>) -> RepoResult<()> {
    match result {
        Err(RepoError::NotFound { .. }) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{ProjectStore, StoreError, PROJECTS_COLLECTION, TODOS_COLLECTION};
    use crate::db::open_db_in_memory;
    use crate::model::error::ProjectError;
    use crate::model::project::ProjectData;
    use crate::model::todo::TodoData;
    use crate::repo::document_repo::{DocumentRepository, SqliteDocumentRepository};
    use crate::service::projects_manager::ProjectsManager;
    use chrono::NaiveDate;

    fn finish() -> NaiveDate {
        NaiveDate::from_ymd_opt(2032, 2, 2).unwrap()
    }

    #[test]
    fn rejected_create_writes_nothing() {
        let conn = open_db_in_memory().unwrap();
        let store = ProjectStore::new(SqliteDocumentRepository::try_new(&conn).unwrap());
        let mut manager = ProjectsManager::new();

        let err = store
            .create_project(&mut manager, ProjectData::new("Tiny", finish()), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Project(ProjectError::Validation(_))));
        assert_eq!(err.code(), "validation");

        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        assert!(repo.get_all(PROJECTS_COLLECTION).unwrap().is_empty());
    }

    #[test]
    fn delete_project_removes_owned_todo_documents() {
        let conn = open_db_in_memory().unwrap();
        let store = ProjectStore::new(SqliteDocumentRepository::try_new(&conn).unwrap());
        let mut manager = ProjectsManager::new();
        let mut data = ProjectData::new("Build Tower", finish());
        data.todos_list = vec![TodoData::new("Pour concrete", finish())];
        store.create_project(&mut manager, data, Some("p-1")).unwrap();

        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        assert_eq!(repo.get_all(TODOS_COLLECTION).unwrap().len(), 1);

        assert!(store.delete_project(&mut manager, "p-1").unwrap());
        assert!(repo.get_all(PROJECTS_COLLECTION).unwrap().is_empty());
        assert!(repo.get_all(TODOS_COLLECTION).unwrap().is_empty());
        assert!(!store.delete_project(&mut manager, "p-1").unwrap());
    }

    #[test]
    fn todo_ops_require_known_project() {
        let conn = open_db_in_memory().unwrap();
        let store = ProjectStore::new(SqliteDocumentRepository::try_new(&conn).unwrap());
        let mut manager = ProjectsManager::new();
        let err = store
            .add_todo(&mut manager, "missing", TodoData::new("Pour concrete", finish()))
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
