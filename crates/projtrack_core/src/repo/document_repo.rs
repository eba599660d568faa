//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Store whole JSON records keyed by collection path and document id.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Collection paths are normalized (`/projects` and `projects` are equal).
//! - Document bodies are always JSON objects.
//! - Listing order is insertion order; updates keep a document's position.

use crate::db::DbError;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// JSON object body of one document.
pub type Document = Map<String, Value>;

pub type RepoResult<T> = Result<T, RepoError>;

/// One stored document with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

/// Repository error for document persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { collection: String, id: String },
    /// Collection path, document id or field name is not usable.
    InvalidPath(String),
    /// Stored or supplied data does not have the expected shape.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::InvalidPath(path) => write!(f, "invalid document path: `{path}`"),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Document store keyed by collection path plus id.
pub trait DocumentRepository {
    fn get(&self, collection: &str, id: &str) -> RepoResult<Option<StoredDocument>>;
    fn get_all(&self, collection: &str) -> RepoResult<Vec<StoredDocument>>;
    /// Documents whose top-level string `field` equals `value`.
    fn query_eq(&self, collection: &str, field: &str, value: &str)
        -> RepoResult<Vec<StoredDocument>>;
    /// Inserts with a generated id and returns it.
    fn add(&self, collection: &str, data: &Document) -> RepoResult<String>;
    /// Inserts or fully replaces the document at `id`.
    fn set(&self, collection: &str, id: &str, data: &Document) -> RepoResult<()>;
    /// Merges top-level `fields` into an existing document.
    fn update(&self, collection: &str, id: &str, fields: &Document) -> RepoResult<()>;
    fn delete(&self, collection: &str, id: &str) -> RepoResult<()>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - [`RepoError::InvalidData`] when the `documents` table is missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS (
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'documents'
            );",
            [],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::InvalidData(
                "documents table missing; open the store through db::open_db".to_string(),
            ));
        }
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn get(&self, collection: &str, id: &str) -> RepoResult<Option<StoredDocument>> {
        let collection = normalize_collection(collection)?;
        let id = normalize_doc_id(id)?;
        self.conn
            .query_row(
                "SELECT id, body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
                read_row,
            )
            .optional()?
            .map(parse_stored)
            .transpose()
    }

    fn get_all(&self, collection: &str) -> RepoResult<Vec<StoredDocument>> {
        let collection = normalize_collection(collection)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY rowid ASC;",
        )?;
        let rows = stmt.query_map(params![collection], read_row)?;
        let documents = rows
            .map(|row| parse_stored(row?))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(documents)
    }

    fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> RepoResult<Vec<StoredDocument>> {
        let collection = normalize_collection(collection)?;
        let json_path = field_path(field)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, body FROM documents
             WHERE collection = ?1 AND json_extract(body, ?2) = ?3
             ORDER BY rowid ASC;",
        )?;
        let rows = stmt.query_map(params![collection, json_path, value], read_row)?;
        let documents = rows
            .map(|row| parse_stored(row?))
            .collect::<RepoResult<Vec<_>>>()?;
        Ok(documents)
    }

    fn add(&self, collection: &str, data: &Document) -> RepoResult<String> {
        let collection = normalize_collection(collection)?;
        let id = Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
            params![collection, id, encode_body(data)?],
        )?;
        debug!("event=doc_add module=repo status=ok collection={collection} doc_id={id}");
        Ok(id)
    }

    fn set(&self, collection: &str, id: &str, data: &Document) -> RepoResult<()> {
        let collection = normalize_collection(collection)?;
        let id = normalize_doc_id(id)?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO UPDATE SET
                body = excluded.body,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![collection, id, encode_body(data)?],
        )?;
        debug!("event=doc_set module=repo status=ok collection={collection} doc_id={id}");
        Ok(())
    }

    fn update(&self, collection: &str, id: &str, fields: &Document) -> RepoResult<()> {
        let Some(mut existing) = self.get(collection, id)? else {
            return Err(RepoError::NotFound {
                collection: normalize_collection(collection)?.to_string(),
                id: id.trim().to_string(),
            });
        };
        for (key, value) in fields {
            existing.data.insert(key.clone(), value.clone());
        }
        self.conn.execute(
            "UPDATE documents
             SET body = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?2 AND id = ?3;",
            params![
                encode_body(&existing.data)?,
                normalize_collection(collection)?,
                existing.id
            ],
        )?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> RepoResult<()> {
        let collection = normalize_collection(collection)?;
        let id = normalize_doc_id(id)?;
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Strips surrounding slashes; rejects empty or nested paths.
pub fn normalize_collection(path: &str) -> RepoResult<&str> {
    let normalized = path.trim().trim_matches('/');
    if normalized.is_empty() || normalized.contains('/') {
        return Err(RepoError::InvalidPath(path.to_string()));
    }
    Ok(normalized)
}

fn normalize_doc_id(id: &str) -> RepoResult<&str> {
    let normalized = id.trim();
    if normalized.is_empty() || normalized.contains('/') {
        return Err(RepoError::InvalidPath(id.to_string()));
    }
    Ok(normalized)
}

fn field_path(field: &str) -> RepoResult<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if !valid {
        return Err(RepoError::InvalidPath(field.to_string()));
    }
    Ok(format!("$.{field}"))
}

fn encode_body(data: &Document) -> RepoResult<String> {
    serde_json::to_string(data).map_err(|err| RepoError::InvalidData(err.to_string()))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get("id")?, row.get("body")?))
}

fn parse_stored((id, body): (String, String)) -> RepoResult<StoredDocument> {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(data)) => Ok(StoredDocument { id, data }),
        Ok(_) => Err(RepoError::InvalidData(format!(
            "document `{id}` body is not a JSON object"
        ))),
        Err(err) => Err(RepoError::InvalidData(format!(
            "document `{id}` body is not valid JSON: {err}"
        ))),
    }
}
