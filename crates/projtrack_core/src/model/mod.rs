//! Domain model for projects and their todos.
//!
//! # Responsibility
//! - Define canonical entity shapes and their business rules.
//! - Keep entities free of presentation and storage concerns.
//!
//! # Invariants
//! - Every entity is identified by a stable string id.
//! - A todo belongs to exactly one project for its whole lifetime.

pub mod error;
pub mod icon;
pub mod project;
pub mod todo;
pub mod validation;
