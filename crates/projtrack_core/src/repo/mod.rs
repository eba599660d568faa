//! Document persistence for projects and todos.
//!
//! # Responsibility
//! - Define the document store contract the services persist through.
//! - Isolate SQLite query details and the stored date shape from entities.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to DB transport errors.

pub mod codec;
pub mod document_repo;
