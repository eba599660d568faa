//! Todo domain model.
//!
//! # Responsibility
//! - Define the task record owned by exactly one project.
//! - Apply creation and edit rules for todo fields.
//!
//! # Invariants
//! - `id` and `project_id` never change after creation.
//! - `title` always satisfies the minimum length rule.

use crate::model::validation::{normalize_id, validate_todo_title, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one todo.
pub type TodoId = String;

/// Input shape for creating a todo.
///
/// Also the wire shape read back from snapshots and the document store, so
/// optional fields fall back to defaults when absent.
///
/// `title` is stored trimmed: a padded `" Pour concrete"` reads back as
/// `"Pour concrete"`. `finishDate` accepts `YYYY-MM-DD` or an RFC 3339
/// timestamp and is always written as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoData {
    #[serde(default)]
    pub id: Option<TodoId>,
    /// Owning project. Filled in by the project when left empty.
    #[serde(default)]
    pub project_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "crate::model::validation::deserialize_calendar_date")]
    pub finish_date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
}

impl TodoData {
    /// Creates input data with empty description and `completed = false`.
    pub fn new(title: impl Into<String>, finish_date: NaiveDate) -> Self {
        Self {
            id: None,
            project_id: None,
            title: title.into(),
            description: String::new(),
            finish_date,
            completed: false,
        }
    }
}

/// Replacement values for the mutable todo fields.
///
/// `id` selects the target todo; when `None` the owning project falls back to
/// its current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoUpdate {
    pub id: Option<TodoId>,
    pub title: String,
    pub description: String,
    pub finish_date: NaiveDate,
    pub completed: bool,
}

impl TodoUpdate {
    /// Builds an update carrying every mutable field of `todo`.
    pub fn from_todo(todo: &Todo) -> Self {
        Self {
            id: Some(todo.id.clone()),
            title: todo.title.clone(),
            description: todo.description.clone(),
            finish_date: todo.finish_date,
            completed: todo.completed,
        }
    }
}

impl From<&TodoData> for TodoUpdate {
    fn from(data: &TodoData) -> Self {
        Self {
            id: data.id.clone(),
            title: data.title.clone(),
            description: data.description.clone(),
            finish_date: data.finish_date,
            completed: data.completed,
        }
    }
}

/// One task record belonging to a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    id: TodoId,
    project_id: String,
    title: String,
    description: String,
    finish_date: NaiveDate,
    completed: bool,
}

impl Todo {
    /// Creates a todo from input data.
    ///
    /// Id precedence: `optional_id`, then `data.id`, then a generated UUID.
    ///
    /// # Errors
    /// - [`ValidationError::TitleTooShort`] when the title is too short.
    /// - [`ValidationError::BlankId`] when a supplied id or the project id is blank.
    pub fn new(data: TodoData, optional_id: Option<&str>) -> Result<Self, ValidationError> {
        let title = validate_todo_title(&data.title)?;
        let project_id = normalize_id(data.project_id.as_deref().unwrap_or_default())?;
        let id = match optional_id.or(data.id.as_deref()) {
            Some(value) => normalize_id(value)?,
            None => Uuid::new_v4().to_string(),
        };

        Ok(Self {
            id,
            project_id,
            title,
            description: data.description,
            finish_date: data.finish_date,
            completed: data.completed,
        })
    }

    /// Replaces title, description, finish date and completion in place.
    ///
    /// Leaves the todo untouched when the new title is rejected.
    pub fn update(&mut self, update: &TodoUpdate) -> Result<(), ValidationError> {
        self.title = validate_todo_title(&update.title)?;
        self.description = update.description.clone();
        self.finish_date = update.finish_date;
        self.completed = update.completed;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn finish_date(&self) -> NaiveDate {
        self.finish_date
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Converts back into the input/wire shape.
    pub fn to_data(&self) -> TodoData {
        TodoData {
            id: Some(self.id.clone()),
            project_id: Some(self.project_id.clone()),
            title: self.title.clone(),
            description: self.description.clone(),
            finish_date: self.finish_date,
            completed: self.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Todo, TodoData, TodoUpdate};
    use crate::model::validation::ValidationError;
    use chrono::NaiveDate;

    fn data(title: &str) -> TodoData {
        let mut data = TodoData::new(title, NaiveDate::from_ymd_opt(2030, 1, 2).unwrap());
        data.project_id = Some("p-1".to_string());
        data
    }

    #[test]
    fn id_precedence_prefers_explicit_argument() {
        let mut input = data("Pour concrete");
        input.id = Some("from-data".to_string());

        let explicit = Todo::new(input.clone(), Some("from-arg")).unwrap();
        assert_eq!(explicit.id(), "from-arg");

        let from_data = Todo::new(input, None).unwrap();
        assert_eq!(from_data.id(), "from-data");

        let generated = Todo::new(data("Pour concrete"), None).unwrap();
        assert!(uuid::Uuid::parse_str(generated.id()).is_ok());
    }

    #[test]
    fn new_defaults_completed_to_false() {
        let todo = Todo::new(data("Order steel"), None).unwrap();
        assert!(!todo.is_completed());
        assert_eq!(todo.project_id(), "p-1");
    }

    #[test]
    fn new_requires_owning_project() {
        let mut input = data("Order steel");
        input.project_id = None;
        assert_eq!(Todo::new(input, None).unwrap_err(), ValidationError::BlankId);
    }

    #[test]
    fn update_keeps_identity_and_rejects_short_title() {
        let mut todo = Todo::new(data("Pour concrete"), None).unwrap();
        let original_id = todo.id().to_string();

        let mut update = TodoUpdate::from_todo(&todo);
        update.title = "Pour foundation".to_string();
        update.completed = true;
        todo.update(&update).unwrap();
        assert_eq!(todo.id(), original_id);
        assert_eq!(todo.title(), "Pour foundation");
        assert!(todo.is_completed());

        update.title = "Pour".to_string();
        assert!(todo.update(&update).is_err());
        assert_eq!(todo.title(), "Pour foundation");
    }
}
