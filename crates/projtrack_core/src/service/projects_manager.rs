//! Project collection use-case service.
//!
//! # Responsibility
//! - Own every project of one session and the current project selection.
//! - Mediate create/edit/delete and notify subscribed views.
//! - Keep the derived total cost in step with the list.
//!
//! # Invariants
//! - Project ids and names are unique within one manager at all times.
//! - A selection never outlives its project; stale ids read as no selection.
//! - Notifications fire after the list change is complete.

use crate::events::{Observers, ProjectEvent, SubscriptionId, TodoEvent};
use crate::model::error::{ProjectError, ProjectResult, SelectionKind};
use crate::model::project::{Project, ProjectData, ProjectId, ProjectUpdate};
use crate::model::todo::TodoData;
use crate::model::validation::validate_project_name;
use log::{info, warn};

/// Outcome of [`ProjectsManager::new_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectUpsert {
    /// A new project was appended.
    Created(ProjectId),
    /// The id already existed, so the call was routed to an edit.
    Updated(ProjectId),
}

impl ProjectUpsert {
    pub fn id(&self) -> &str {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Nested todo dropped while restoring a project's `todosList`.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoRestoreFailure {
    pub project_id: ProjectId,
    /// Zero-based position inside the record's `todosList`.
    pub index: usize,
    pub title: String,
    pub error: ProjectError,
}

/// Session-wide owner of all projects.
#[derive(Debug, Default)]
pub struct ProjectsManager {
    list: Vec<Project>,
    selected_project_id: Option<ProjectId>,
    total_cost: f64,
    observers: Observers<ProjectEvent>,
}

impl ProjectsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a project, or edits the existing one with the same id.
    ///
    /// Nested `data.todos_list` entries are added to the project as well;
    /// a todo that fails validation is logged and skipped.
    ///
    /// # Errors
    /// - [`ProjectError::Validation`] when the name or other fields break a rule.
    /// - [`ProjectError::DuplicateName`] when another project uses the name;
    ///   nothing is inserted.
    pub fn new_project(
        &mut self,
        data: ProjectData,
        optional_id: Option<&str>,
    ) -> ProjectResult<ProjectUpsert> {
        self.upsert_project(data, optional_id).map(|(outcome, _)| outcome)
    }

    /// Same as [`Self::new_project`], also returning the nested todos that
    /// could not be restored.
    pub(crate) fn upsert_project(
        &mut self,
        mut data: ProjectData,
        optional_id: Option<&str>,
    ) -> ProjectResult<(ProjectUpsert, Vec<TodoRestoreFailure>)> {
        validate_project_name(&data.name)?;
        let todos = std::mem::take(&mut data.todos_list);

        let requested_id = optional_id
            .or(data.id.as_deref())
            .map(|value| value.trim().to_string());
        if let Some(id) = requested_id
            .as_deref()
            .filter(|id| self.position_of(id).is_some())
        {
            let mut update = ProjectUpdate::from(&data);
            update.id = Some(id.to_string());
            self.edit_project(update)?;
            let failures = match self.project_by_id_mut(id) {
                Some(project) => restore_todos(project, todos),
                None => Vec::new(),
            };
            return Ok((ProjectUpsert::Updated(id.to_string()), failures));
        }

        let name = data.name.trim();
        if self.project_by_name(name).is_some() {
            warn!("event=project_create module=manager status=error error_code=duplicate_name");
            return Err(ProjectError::DuplicateName(name.to_string()));
        }

        let mut project = Project::new(data, optional_id)?;
        let failures = restore_todos(&mut project, todos);
        let id = project.id().to_string();
        self.list.push(project);
        self.refresh_total_cost();

        info!(
            "event=project_create module=manager status=ok project_id={} count={}",
            id,
            self.list.len()
        );
        let record = self.list[self.list.len() - 1].to_record();
        self.observers.emit(&ProjectEvent::Created(record));
        Ok((ProjectUpsert::Created(id), failures))
    }

    /// Replaces the mutable fields of one project.
    ///
    /// Targets `update.id` when set, otherwise the selected project. The id
    /// and todo list of the stored project are preserved.
    ///
    /// # Errors
    /// - [`ProjectError::ProjectNotFound`] for an unknown explicit id.
    /// - [`ProjectError::NothingSelected`] without id and without live selection.
    /// - [`ProjectError::DuplicateName`] when renaming onto another project's name.
    /// - [`ProjectError::Validation`] for rule violations (project unchanged).
    pub fn edit_project(&mut self, update: ProjectUpdate) -> ProjectResult<&Project> {
        let index = match self.resolve_edit_target(update.id.as_deref()) {
            Ok(index) => index,
            Err(err) => {
                warn!(
                    "event=project_edit module=manager status=error error_code={}",
                    err.code()
                );
                return Err(err);
            }
        };

        let name = validate_project_name(&update.name)?;
        let clashes = self
            .list
            .iter()
            .enumerate()
            .any(|(position, project)| position != index && project.name() == name);
        if clashes {
            warn!("event=project_edit module=manager status=error error_code=duplicate_name");
            return Err(ProjectError::DuplicateName(name));
        }

        self.list[index].apply_update(&update)?;
        self.refresh_total_cost();
        info!(
            "event=project_edit module=manager status=ok project_id={}",
            self.list[index].id()
        );
        let record = self.list[index].to_record();
        self.observers.emit(&ProjectEvent::Updated(record));
        Ok(&self.list[index])
    }

    /// Removes one project together with its todos.
    ///
    /// Returns `false` (and logs a warning) when the id is unknown.
    pub fn delete_project(&mut self, id: &str) -> bool {
        let id = id.trim();
        let Some(index) = self.position_of(id) else {
            warn!(
                "event=project_delete module=manager status=skip reason=not_found project_id={id}"
            );
            return false;
        };

        let mut removed = self.list.remove(index);
        removed.dispose();
        if self.selected_project_id.as_deref() == Some(id) {
            self.selected_project_id = None;
        }
        self.refresh_total_cost();

        info!(
            "event=project_delete module=manager status=ok project_id={} count={}",
            id,
            self.list.len()
        );
        self.observers.emit(&ProjectEvent::Deleted(id.to_string()));
        true
    }

    /// Selects one project by id, or clears the selection with `None`.
    pub fn select_project(&mut self, id: Option<&str>) -> ProjectResult<()> {
        match id.map(str::trim) {
            Some(id) => {
                if self.position_of(id).is_none() {
                    return Err(ProjectError::ProjectNotFound(id.to_string()));
                }
                self.selected_project_id = Some(id.to_string());
            }
            None => self.selected_project_id = None,
        }
        Ok(())
    }

    /// Returns the selected project, or `None` when the selection is stale.
    pub fn selected_project(&self) -> Option<&Project> {
        self.selected_project_id
            .as_deref()
            .and_then(|id| self.project_by_id(id))
    }

    pub fn selected_project_mut(&mut self) -> Option<&mut Project> {
        let id = self.selected_project_id.clone()?;
        self.project_by_id_mut(&id)
    }

    pub fn project_by_id(&self, id: &str) -> Option<&Project> {
        self.list.iter().find(|project| project.id() == id)
    }

    pub fn project_by_id_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.list.iter_mut().find(|project| project.id() == id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.list.iter().find(|project| project.name() == name)
    }

    /// Projects whose name contains `needle` (case-sensitive), in order.
    pub fn filter_projects(&self, needle: &str) -> Vec<&Project> {
        self.list
            .iter()
            .filter(|project| project.name().contains(needle))
            .collect()
    }

    /// Projects in insertion order.
    pub fn projects(&self) -> &[Project] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Recomputes the total cost across all projects and returns it.
    pub fn refresh_total_cost(&mut self) -> f64 {
        self.total_cost = self.list.iter().map(Project::cost).sum();
        self.total_cost
    }

    /// Last computed total cost.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Registers a project listener.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&ProjectEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Registers a todo listener on one project.
    pub fn subscribe_todos(
        &mut self,
        project_id: &str,
        listener: impl FnMut(&TodoEvent) + Send + 'static,
    ) -> ProjectResult<SubscriptionId> {
        let project = self
            .project_by_id_mut(project_id)
            .ok_or_else(|| ProjectError::ProjectNotFound(project_id.to_string()))?;
        Ok(project.subscribe_todos(listener))
    }

    pub fn unsubscribe_todos(&mut self, project_id: &str, id: SubscriptionId) -> bool {
        self.project_by_id_mut(project_id)
            .is_some_and(|project| project.unsubscribe_todos(id))
    }

    fn resolve_edit_target(&self, id: Option<&str>) -> ProjectResult<usize> {
        match id {
            Some(id) => {
                let id = id.trim();
                self.position_of(id)
                    .ok_or_else(|| ProjectError::ProjectNotFound(id.to_string()))
            }
            None => self
                .selected_project_id
                .as_deref()
                .and_then(|id| self.position_of(id))
                .ok_or(ProjectError::NothingSelected(SelectionKind::Project)),
        }
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.list.iter().position(|project| project.id() == id)
    }
}

/// Adds nested todos to their owning project.
///
/// Each todo is rebound to `project` first, so a snapshot record that lost
/// its project id keeps its todos.
fn restore_todos(project: &mut Project, todos: Vec<TodoData>) -> Vec<TodoRestoreFailure> {
    let mut failures = Vec::new();
    if todos.is_empty() {
        return failures;
    }
    for (index, mut todo) in todos.into_iter().enumerate() {
        todo.project_id = Some(project.id().to_string());
        let title = todo.title.clone();
        if let Err(error) = project.add_todo(todo, None) {
            warn!(
                "event=todo_restore module=manager status=error project_id={} index={} error_code={}",
                project.id(),
                index,
                error.code()
            );
            failures.push(TodoRestoreFailure {
                project_id: project.id().to_string(),
                index,
                title,
                error,
            });
        }
    }
    // restored todos are not a user selection
    project.clear_todo_selection();
    failures
}

#[cfg(test)]
mod tests {
    use super::{ProjectUpsert, ProjectsManager};
    use crate::events::ProjectEvent;
    use crate::model::error::{ProjectError, SelectionKind};
    use crate::model::project::{ProjectData, ProjectStatus, ProjectUpdate};
    use crate::model::todo::TodoData;
    use crate::model::validation::ValidationError;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};

    fn finish() -> NaiveDate {
        NaiveDate::from_ymd_opt(2031, 6, 30).unwrap()
    }

    fn data(name: &str, cost: f64) -> ProjectData {
        let mut data = ProjectData::new(name, finish());
        data.cost = cost;
        data
    }

    #[test]
    fn total_cost_sums_projects() {
        let mut manager = ProjectsManager::new();
        manager.new_project(data("Build Tower", 1000.0), None).unwrap();
        manager.new_project(data("Paint Tower", 500.0), None).unwrap();
        assert_eq!(manager.refresh_total_cost(), 1500.0);
        assert_eq!(manager.total_cost(), 1500.0);
    }

    #[test]
    fn short_name_is_rejected_without_insert() {
        let mut manager = ProjectsManager::new();
        for name in ["", "a", "abcd", "  ab  "] {
            let err = manager.new_project(data(name, 0.0), None).unwrap_err();
            assert!(matches!(
                err,
                ProjectError::Validation(ValidationError::NameTooShort { .. })
            ));
        }
        assert!(manager.is_empty());
    }

    #[test]
    fn duplicate_name_is_rejected_without_insert() {
        let mut manager = ProjectsManager::new();
        manager.new_project(data("Build Tower", 0.0), None).unwrap();
        let err = manager.new_project(data("Build Tower", 10.0), None).unwrap_err();
        assert_eq!(err, ProjectError::DuplicateName("Build Tower".to_string()));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn known_id_routes_to_edit() {
        let mut manager = ProjectsManager::new();
        let created = manager
            .new_project(data("Build Tower", 100.0), Some("p-1"))
            .unwrap();
        assert_eq!(created, ProjectUpsert::Created("p-1".to_string()));

        let mut again = data("Build Tower Two", 250.0);
        again.status = ProjectStatus::Active;
        let outcome = manager.new_project(again, Some("p-1")).unwrap();
        assert_eq!(outcome, ProjectUpsert::Updated("p-1".to_string()));
        assert_eq!(manager.len(), 1);

        let project = manager.project_by_id("p-1").unwrap();
        assert_eq!(project.name(), "Build Tower Two");
        assert_eq!(project.status(), ProjectStatus::Active);
        assert_eq!(manager.total_cost(), 250.0);
    }

    #[test]
    fn edit_uses_selection_and_preserves_identity_and_todos() {
        let mut manager = ProjectsManager::new();
        let mut input = data("Build Tower", 0.0);
        input.todos_list = vec![TodoData::new("Pour concrete", finish())];
        manager.new_project(input, Some("p-1")).unwrap();
        manager.select_project(Some("p-1")).unwrap();
        let color = manager.project_by_id("p-1").unwrap().icon_color().to_string();

        let mut update = ProjectUpdate::from_project(manager.selected_project().unwrap());
        update.id = None;
        update.cost = 42.0;
        update.progress = 1.0;
        let edited = manager.edit_project(update).unwrap();
        assert_eq!(edited.id(), "p-1");
        assert_eq!(edited.cost(), 42.0);
        assert_eq!(edited.todos().len(), 1);
        assert_eq!(edited.icon_color(), color);
    }

    #[test]
    fn edit_without_target_fails() {
        let mut manager = ProjectsManager::new();
        manager.new_project(data("Build Tower", 0.0), Some("p-1")).unwrap();
        let mut update = ProjectUpdate::from_project(manager.project_by_id("p-1").unwrap());
        update.id = None;
        assert_eq!(
            manager.edit_project(update.clone()).unwrap_err(),
            ProjectError::NothingSelected(SelectionKind::Project)
        );
        update.id = Some("nope".to_string());
        assert!(manager.edit_project(update).unwrap_err().is_not_found());
    }

    #[test]
    fn rename_onto_existing_name_is_rejected() {
        let mut manager = ProjectsManager::new();
        manager.new_project(data("Build Tower", 0.0), Some("p-1")).unwrap();
        manager.new_project(data("Paint Tower", 0.0), Some("p-2")).unwrap();

        let mut update = ProjectUpdate::from_project(manager.project_by_id("p-2").unwrap());
        update.name = "Build Tower".to_string();
        let err = manager.edit_project(update).unwrap_err();
        assert_eq!(err, ProjectError::DuplicateName("Build Tower".to_string()));
        assert_eq!(manager.project_by_id("p-2").unwrap().name(), "Paint Tower");
    }

    #[test]
    fn delete_removes_clears_selection_and_updates_cost() {
        let mut manager = ProjectsManager::new();
        manager.new_project(data("Build Tower", 1000.0), Some("p-1")).unwrap();
        manager.new_project(data("Paint Tower", 500.0), Some("p-2")).unwrap();
        manager.select_project(Some("p-1")).unwrap();

        assert!(manager.delete_project("p-1"));
        assert!(manager.project_by_id("p-1").is_none());
        assert!(manager.selected_project().is_none());
        assert_eq!(manager.refresh_total_cost(), 500.0);

        assert!(!manager.delete_project("p-1"));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn filter_projects_matches_substrings_in_order() {
        let mut manager = ProjectsManager::new();
        for name in ["Build Tower", "Paint Fence", "Paint Tower"] {
            manager.new_project(data(name, 0.0), None).unwrap();
        }
        let names = |needle: &str| -> Vec<String> {
            manager
                .filter_projects(needle)
                .into_iter()
                .map(|project| project.name().to_string())
                .collect()
        };
        assert_eq!(names("Tower"), vec!["Build Tower", "Paint Tower"]);
        assert_eq!(names("").len(), 3);
        assert!(names("tower").is_empty());
    }

    #[test]
    fn subscribers_see_consistent_state_and_can_coexist() {
        let mut manager = ProjectsManager::new();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&first);
        let first_id = manager.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        let sink = Arc::clone(&second);
        manager.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        manager.new_project(data("Build Tower", 10.0), Some("p-1")).unwrap();
        assert!(manager.unsubscribe(first_id));
        manager.delete_project("p-1");

        let first = first.lock().unwrap();
        assert_eq!(first.len(), 1);
        assert!(matches!(&first[0], ProjectEvent::Created(record) if record.cost == 10.0));
        let second = second.lock().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[1], ProjectEvent::Deleted("p-1".to_string()));
    }

    #[test]
    fn todo_subscription_requires_live_project() {
        let mut manager = ProjectsManager::new();
        assert!(manager.subscribe_todos("p-1", |_| {}).is_err());
        manager.new_project(data("Build Tower", 0.0), Some("p-1")).unwrap();
        let id = manager.subscribe_todos("p-1", |_| {}).unwrap();
        assert!(manager.unsubscribe_todos("p-1", id));
    }

    #[test]
    fn nested_todos_follow_their_new_project() {
        let mut manager = ProjectsManager::new();
        let mut input = data("Build Tower", 0.0);
        let mut moved = TodoData::new("Pour concrete", finish());
        moved.project_id = Some("old-id".to_string());
        input.todos_list = vec![moved, TodoData::new("Tiny", finish())];

        let (outcome, failures) = manager.upsert_project(input, None).unwrap();

        let project = manager.project_by_id(outcome.id()).unwrap();
        assert_eq!(project.todos().len(), 1);
        assert_eq!(project.todos()[0].project_id(), outcome.id());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].title, "Tiny");
        assert_eq!(failures[0].project_id, outcome.id());
        assert!(matches!(failures[0].error, ProjectError::Validation(_)));
    }
}
