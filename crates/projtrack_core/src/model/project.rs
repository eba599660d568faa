//! Project domain model.
//!
//! # Responsibility
//! - Define the project record and its owned, ordered todo list.
//! - Own todo add/edit/delete/selection and the todo notifications.
//!
//! # Invariants
//! - `id` is stable once assigned; `icon_color` never changes after creation.
//! - Every owned todo has `project_id == self.id`.
//! - `selected_todo_id`, when it points at a missing todo, reads as no selection.
//! - `cost >= 0` and `progress` within `[0, 1]`.

use crate::events::{Observers, SubscriptionId, TodoEvent};
use crate::model::error::{ProjectError, ProjectResult, SelectionKind};
use crate::model::icon::{icon_color_for, initials, normalize_icon_color};
use crate::model::todo::{Todo, TodoData, TodoId, TodoUpdate};
use crate::model::validation::{
    normalize_id, validate_cost, validate_progress, validate_project_name, validate_todo_title,
    ValidationError,
};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one project.
pub type ProjectId = String;

/// Progress assigned to projects that do not state one.
pub const DEFAULT_PROGRESS: f64 = 0.5;

fn default_progress() -> f64 {
    DEFAULT_PROGRESS
}

/// Project lifecycle label. Transitions are not constrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Pending,
    Active,
    Finished,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    /// Parses a case-insensitive label such as `Active`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

/// Role of the viewing user on a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Architect,
    Engineer,
    Developer,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Engineer => "engineer",
            Self::Developer => "developer",
        }
    }

    /// Parses a case-insensitive label such as `Engineer`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "architect" => Some(Self::Architect),
            "engineer" => Some(Self::Engineer),
            "developer" => Some(Self::Developer),
            _ => None,
        }
    }
}

/// Input shape for creating a project.
///
/// Deserializes from snapshot and store documents, so every field except
/// `name` and `finishDate` has a default. `name` is stored trimmed, and
/// `finishDate` accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    #[serde(default)]
    pub id: Option<ProjectId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub user_role: UserRole,
    #[serde(deserialize_with = "crate::model::validation::deserialize_calendar_date")]
    pub finish_date: NaiveDate,
    #[serde(default)]
    pub cost: f64,
    #[serde(default = "default_progress")]
    pub progress: f64,
    #[serde(default)]
    pub icon_color: Option<String>,
    /// Nested todos carried by snapshots. `Project::new` ignores them.
    #[serde(default)]
    pub todos_list: Vec<TodoData>,
}

impl ProjectData {
    /// Creates input data with defaults for every optional field.
    pub fn new(name: impl Into<String>, finish_date: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            status: ProjectStatus::default(),
            user_role: UserRole::default(),
            finish_date,
            cost: 0.0,
            progress: DEFAULT_PROGRESS,
            icon_color: None,
            todos_list: Vec::new(),
        }
    }
}

/// Replacement values for the mutable project fields.
///
/// `id` selects the target project; when `None` the manager falls back to
/// its current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectUpdate {
    pub id: Option<ProjectId>,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub user_role: UserRole,
    pub finish_date: NaiveDate,
    pub cost: f64,
    pub progress: f64,
}

impl ProjectUpdate {
    /// Builds an update carrying every mutable field of `project`.
    pub fn from_project(project: &Project) -> Self {
        Self {
            id: Some(project.id.clone()),
            name: project.name.clone(),
            description: project.description.clone(),
            status: project.status,
            user_role: project.user_role,
            finish_date: project.finish_date,
            cost: project.cost,
            progress: project.progress,
        }
    }
}

impl From<&ProjectData> for ProjectUpdate {
    fn from(data: &ProjectData) -> Self {
        Self {
            id: data.id.clone(),
            name: data.name.clone(),
            description: data.description.clone(),
            status: data.status,
            user_role: data.user_role,
            finish_date: data.finish_date,
            cost: data.cost,
            progress: data.progress,
        }
    }
}

/// Serializable snapshot of one project with its todos inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub user_role: UserRole,
    #[serde(deserialize_with = "crate::model::validation::deserialize_calendar_date")]
    pub finish_date: NaiveDate,
    pub cost: f64,
    pub progress: f64,
    pub icon_color: String,
    pub todos_list: Vec<TodoData>,
}

impl From<ProjectRecord> for ProjectData {
    fn from(record: ProjectRecord) -> Self {
        Self {
            id: Some(record.id),
            name: record.name,
            description: record.description,
            status: record.status,
            user_role: record.user_role,
            finish_date: record.finish_date,
            cost: record.cost,
            progress: record.progress,
            icon_color: Some(record.icon_color),
            todos_list: record.todos_list,
        }
    }
}

/// A tracked unit of work owning an ordered list of todos.
#[derive(Debug)]
pub struct Project {
    id: ProjectId,
    name: String,
    description: String,
    status: ProjectStatus,
    user_role: UserRole,
    finish_date: NaiveDate,
    cost: f64,
    progress: f64,
    icon_color: String,
    todos: Vec<Todo>,
    selected_todo_id: Option<TodoId>,
    todo_observers: Observers<TodoEvent>,
}

impl Project {
    /// Creates a project with an empty todo list.
    ///
    /// Id precedence: `optional_id`, then `data.id`, then a generated UUID.
    /// `data.todos_list` is not read here.
    ///
    /// # Errors
    /// - [`ValidationError::NameTooShort`] for names under five chars.
    /// - Cost, progress, icon color and id rule violations.
    pub fn new(data: ProjectData, optional_id: Option<&str>) -> Result<Self, ValidationError> {
        let name = validate_project_name(&data.name)?;
        let cost = validate_cost(data.cost)?;
        let progress = validate_progress(data.progress)?;
        let id = match optional_id.or(data.id.as_deref()) {
            Some(value) => normalize_id(value)?,
            None => Uuid::new_v4().to_string(),
        };
        let icon_color = match data.icon_color.as_deref().map(str::trim) {
            Some(color) if !color.is_empty() => normalize_icon_color(color)?,
            _ => icon_color_for(&id),
        };

        Ok(Self {
            id,
            name,
            description: data.description,
            status: data.status,
            user_role: data.user_role,
            finish_date: data.finish_date,
            cost,
            progress,
            icon_color,
            todos: Vec::new(),
            selected_todo_id: None,
            todo_observers: Observers::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    pub fn user_role(&self) -> UserRole {
        self.user_role
    }

    pub fn finish_date(&self) -> NaiveDate {
        self.finish_date
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Completion fraction in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Completion as displayed on cards, `progress * 100`.
    pub fn progress_percent(&self) -> f64 {
        self.progress * 100.0
    }

    pub fn icon_color(&self) -> &str {
        &self.icon_color
    }

    /// Card initials derived from the first two words of the name.
    pub fn initials(&self) -> String {
        initials(&self.name)
    }

    /// Todos in insertion order.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    /// Adds a todo, or edits an existing one with the same id or title.
    ///
    /// When the resolved id matches an existing todo that todo is edited;
    /// otherwise a todo with the same title is edited. New todos are appended,
    /// selected and announced with [`TodoEvent::Added`].
    ///
    /// # Errors
    /// - Title rule violations.
    /// - [`ValidationError::ProjectMismatch`] when `data.project_id` names
    ///   another project.
    pub fn add_todo(
        &mut self,
        mut data: TodoData,
        optional_id: Option<&str>,
    ) -> ProjectResult<&Todo> {
        let title = validate_todo_title(&data.title)?;
        let owner = data
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|owner| !owner.is_empty())
            .map(str::to_string);
        if let Some(owner) = owner {
            if owner != self.id {
                return Err(ValidationError::ProjectMismatch {
                    expected: self.id.clone(),
                    actual: owner,
                }
                .into());
            }
        }
        data.project_id = Some(self.id.clone());

        let requested_id = optional_id
            .or(data.id.as_deref())
            .map(|value| value.trim().to_string());
        let existing = requested_id
            .as_deref()
            .and_then(|id| self.position_of(id))
            .or_else(|| self.todos.iter().position(|todo| todo.title() == title));

        if let Some(index) = existing {
            let mut update = TodoUpdate::from(&data);
            update.id = Some(self.todos[index].id().to_string());
            debug!(
                "event=todo_add module=project status=skip reason=existing project_id={} todo_id={}",
                self.id,
                self.todos[index].id()
            );
            return self.edit_todo(update);
        }

        let todo = Todo::new(data, optional_id)?;
        self.selected_todo_id = Some(todo.id().to_string());
        self.todos.push(todo);
        let index = self.todos.len() - 1;
        info!(
            "event=todo_add module=project status=ok project_id={} todo_id={}",
            self.id,
            self.todos[index].id()
        );
        self.todo_observers
            .emit(&TodoEvent::Added(self.todos[index].clone()));
        Ok(&self.todos[index])
    }

    /// Replaces the mutable fields of one todo.
    ///
    /// Targets `update.id` when set, otherwise the selected todo. The edited
    /// todo becomes selected and [`TodoEvent::Updated`] is raised.
    ///
    /// # Errors
    /// - [`ProjectError::TodoNotFound`] when `update.id` is unknown.
    /// - [`ProjectError::NothingSelected`] when no id is given and no live
    ///   todo is selected.
    /// - Title rule violations (todo left unchanged).
    pub fn edit_todo(&mut self, update: TodoUpdate) -> ProjectResult<&Todo> {
        let index = match update.id.as_deref() {
            Some(id) => {
                let id = id.trim();
                self.position_of(id)
                    .ok_or_else(|| ProjectError::TodoNotFound(id.to_string()))?
            }
            None => self
                .selected_todo_id
                .as_deref()
                .and_then(|id| self.position_of(id))
                .ok_or(ProjectError::NothingSelected(SelectionKind::Todo))?,
        };

        self.todos[index].update(&update)?;
        self.selected_todo_id = Some(self.todos[index].id().to_string());
        info!(
            "event=todo_edit module=project status=ok project_id={} todo_id={}",
            self.id,
            self.todos[index].id()
        );
        self.todo_observers
            .emit(&TodoEvent::Updated(self.todos[index].clone()));
        Ok(&self.todos[index])
    }

    /// Removes one todo, clears the todo selection and raises
    /// [`TodoEvent::Deleted`].
    pub fn delete_todo(&mut self, id: &str) -> ProjectResult<()> {
        let id = id.trim();
        let index = self
            .position_of(id)
            .ok_or_else(|| ProjectError::TodoNotFound(id.to_string()))?;

        let removed = self.todos.remove(index);
        self.selected_todo_id = None;
        info!(
            "event=todo_delete module=project status=ok project_id={} todo_id={}",
            self.id,
            removed.id()
        );
        self.todo_observers.emit(&TodoEvent::Deleted {
            project_id: self.id.clone(),
            todo_id: removed.id().to_string(),
        });
        Ok(())
    }

    /// Selects one todo by id, or clears the selection with `None`.
    pub fn select_todo(&mut self, id: Option<&str>) -> ProjectResult<()> {
        match id.map(str::trim) {
            Some(id) => {
                if self.position_of(id).is_none() {
                    return Err(ProjectError::TodoNotFound(id.to_string()));
                }
                self.selected_todo_id = Some(id.to_string());
            }
            None => self.selected_todo_id = None,
        }
        Ok(())
    }

    /// Returns the selected todo, or `None` when the selection is stale.
    pub fn selected_todo(&self) -> Option<&Todo> {
        self.selected_todo_id
            .as_deref()
            .and_then(|id| self.todo_by_id(id))
    }

    /// Todos whose title contains `needle` (case-sensitive), in order.
    pub fn filter_todos(&self, needle: &str) -> Vec<&Todo> {
        self.todos
            .iter()
            .filter(|todo| todo.title().contains(needle))
            .collect()
    }

    pub fn todo_by_id(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id() == id)
    }

    /// Registers a todo listener for this project.
    pub fn subscribe_todos(
        &mut self,
        listener: impl FnMut(&TodoEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.todo_observers.subscribe(listener)
    }

    pub fn unsubscribe_todos(&mut self, id: SubscriptionId) -> bool {
        self.todo_observers.unsubscribe(id)
    }

    /// Copies the wire shape of this project, todos included.
    pub fn to_record(&self) -> ProjectRecord {
        ProjectRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            user_role: self.user_role,
            finish_date: self.finish_date,
            cost: self.cost,
            progress: self.progress,
            icon_color: self.icon_color.clone(),
            todos_list: self.todos.iter().map(Todo::to_data).collect(),
        }
    }

    /// Applies an edit; the project is left untouched on validation failure.
    pub(crate) fn apply_update(&mut self, update: &ProjectUpdate) -> Result<(), ValidationError> {
        let name = validate_project_name(&update.name)?;
        let cost = validate_cost(update.cost)?;
        let progress = validate_progress(update.progress)?;

        self.name = name;
        self.description = update.description.clone();
        self.status = update.status;
        self.user_role = update.user_role;
        self.finish_date = update.finish_date;
        self.cost = cost;
        self.progress = progress;
        Ok(())
    }

    pub(crate) fn clear_todo_selection(&mut self) {
        self.selected_todo_id = None;
    }

    /// Releases todos and todo listeners ahead of removal.
    pub(crate) fn dispose(&mut self) {
        self.todos.clear();
        self.selected_todo_id = None;
        self.todo_observers.clear();
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id() == id)
    }
}
