//! Failure kinds reported by project and todo operations.
//!
//! The entity layer only signals these; presenting them is up to the caller.

use crate::model::project::ProjectId;
use crate::model::todo::TodoId;
use crate::model::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ProjectResult<T> = Result<T, ProjectError>;

/// Which kind of selection an edit fell back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Project,
    Todo,
}

impl SelectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Todo => "todo",
        }
    }
}

/// Error for entity operations on `Project` and `ProjectsManager`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectError {
    /// Input broke a business rule.
    Validation(ValidationError),
    /// Another project in the same manager already uses this name.
    DuplicateName(String),
    ProjectNotFound(ProjectId),
    TodoNotFound(TodoId),
    /// An edit without explicit id found no live selection.
    NothingSelected(SelectionKind),
    /// A snapshot record could not be decoded into project data.
    InvalidRecord(String),
}

impl ProjectError {
    /// Returns whether this error means the target entity is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound(_) | Self::TodoNotFound(_) | Self::NothingSelected(_)
        )
    }

    /// Stable machine-readable code for UI mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DuplicateName(_) => "duplicate_name",
            Self::ProjectNotFound(_) | Self::TodoNotFound(_) => "not_found",
            Self::NothingSelected(_) => "nothing_selected",
            Self::InvalidRecord(_) => "invalid_record",
        }
    }
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateName(name) => write!(
                f,
                "there is already a project named `{name}`; try a different name"
            ),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::TodoNotFound(id) => write!(f, "todo not found: {id}"),
            Self::NothingSelected(kind) => write!(f, "no {} is selected", kind.as_str()),
            Self::InvalidRecord(reason) => write!(f, "record could not be read: {reason}"),
        }
    }
}

impl Error for ProjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ProjectError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
