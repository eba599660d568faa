//! Conversion between entities and stored documents.
//!
//! # Responsibility
//! - Map projects and todos to JSON documents and back.
//! - Convert calendar dates to the stored [`Timestamp`] shape.
//!
//! # Invariants
//! - The document id lives in the key, never in the body.
//! - Project documents never embed todos; todos live in their own collection
//!   and carry `projectId`.
//! - `finishDate` is read from a timestamp object or a `YYYY-MM-DD` string.

use crate::model::project::{Project, ProjectData};
use crate::model::todo::{Todo, TodoData};
use crate::repo::document_repo::{Document, RepoError, RepoResult, StoredDocument};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FINISH_DATE_FIELD: &str = "finishDate";

/// Stored date: milliseconds since the Unix epoch at UTC midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub timestamp_ms: i64,
}

impl Timestamp {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            timestamp_ms: date.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
        }
    }

    /// Calendar date in UTC; `None` when out of chrono's range.
    pub fn to_date(self) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(self.timestamp_ms).map(|at| at.date_naive())
    }
}

/// Encodes the stored fields of `project`.
pub fn project_to_document(project: &Project) -> RepoResult<Document> {
    let mut document = to_document(&project.to_record())?;
    document.remove("id");
    document.remove("todosList");
    store_finish_date(&mut document)?;
    Ok(document)
}

/// Decodes a project document into creation data with `id` filled from the key.
pub fn project_from_document(stored: &StoredDocument) -> RepoResult<ProjectData> {
    let mut data: ProjectData = from_document(stored)?;
    data.todos_list.clear();
    Ok(data)
}

/// Encodes the stored fields of `todo`, owner id included.
pub fn todo_to_document(todo: &Todo) -> RepoResult<Document> {
    let mut document = to_document(&todo.to_data())?;
    document.remove("id");
    store_finish_date(&mut document)?;
    Ok(document)
}

pub fn todo_from_document(stored: &StoredDocument) -> RepoResult<TodoData> {
    from_document(stored)
}

fn to_document(value: &impl Serialize) -> RepoResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(RepoError::InvalidData(
            "entity did not encode to a JSON object".to_string(),
        )),
        Err(err) => Err(RepoError::InvalidData(err.to_string())),
    }
}

fn from_document<T: DeserializeOwned>(stored: &StoredDocument) -> RepoResult<T> {
    let mut body = stored.data.clone();
    body.insert("id".to_string(), Value::String(stored.id.clone()));
    if let Some(value) = body.remove(FINISH_DATE_FIELD) {
        body.insert(FINISH_DATE_FIELD.to_string(), read_finish_date(&stored.id, value)?);
    }
    serde_json::from_value(Value::Object(body)).map_err(|err| {
        RepoError::InvalidData(format!("document `{}`: {err}", stored.id))
    })
}

fn store_finish_date(document: &mut Document) -> RepoResult<()> {
    let Some(Value::String(raw)) = document.get(FINISH_DATE_FIELD) else {
        return Err(RepoError::InvalidData(
            "encoded entity has no finishDate".to_string(),
        ));
    };
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| RepoError::InvalidData(format!("finishDate `{raw}`: {err}")))?;
    let stamp = serde_json::to_value(Timestamp::from_date(date))
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    document.insert(FINISH_DATE_FIELD.to_string(), stamp);
    Ok(())
}

fn read_finish_date(doc_id: &str, value: Value) -> RepoResult<Value> {
    match value {
        Value::String(_) => Ok(value),
        Value::Object(_) => {
            let stamp: Timestamp = serde_json::from_value(value).map_err(|err| {
                RepoError::InvalidData(format!("document `{doc_id}` finishDate: {err}"))
            })?;
            let date = stamp.to_date().ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "document `{doc_id}` finishDate out of range: {}",
                    stamp.timestamp_ms
                ))
            })?;
            Ok(Value::String(date.format("%Y-%m-%d").to_string()))
        }
        other => Err(RepoError::InvalidData(format!(
            "document `{doc_id}` finishDate has unsupported shape: {other}"
        ))),
    }
}
