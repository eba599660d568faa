//! Core use-case services.
//!
//! # Responsibility
//! - Own the session's projects and the rules that span projects.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod project_store;
pub mod projects_manager;
pub mod snapshot;
