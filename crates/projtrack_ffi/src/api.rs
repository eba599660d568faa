//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose project and todo use cases to Dart via FRB.
//! - Turn form input (labels, date strings) into entity input.
//! - Keep one process-wide manager, written through to the document store.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are returned as envelopes with a stable `error_code`.
//! - The store is loaded into the manager once, before the first use case runs.

use log::warn;
use once_cell::sync::Lazy;
use projtrack_core::config::{default_db_path, CoreConfig};
use projtrack_core::db::open_db;
use projtrack_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    resolve_finish_date, Project, ProjectData, ProjectError, ProjectStatus, ProjectStore,
    ProjectUpdate,
    ProjectsManager, SqliteDocumentRepository, StoreError, Todo, TodoData, TodoUpdate, UserRole,
};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static SESSION: Lazy<Mutex<Session>> = Lazy::new(|| Mutex::new(Session::default()));

#[derive(Default)]
struct Session {
    manager: ProjectsManager,
    loaded: bool,
}

type FfiStore<'conn> = ProjectStore<SqliteDocumentRepository<'conn>>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
/// - Idempotent for the same `level + log_dir`; conflicting calls return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Project form fields as entered in the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectForm {
    /// Target project for edits; `None` creates, or edits the selection.
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    /// `pending|active|finished`, case-insensitive.
    pub status: String,
    /// `architect|engineer|developer`, case-insensitive.
    pub user_role: String,
    /// `YYYY-MM-DD`; blank means thirty days from today.
    pub finish_date: String,
    pub cost: f64,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
}

/// Todo form fields as entered in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoForm {
    /// Target todo for edits; `None` creates, or edits the selection.
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    /// `YYYY-MM-DD`; blank means thirty days from today.
    pub finish_date: String,
    pub completed: bool,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Affected project or todo id.
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
    /// `validation|duplicate_name|not_found|nothing_selected|store|snapshot`.
    pub error_code: Option<String>,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
            error_code: None,
        }
    }

    fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
            error_code: Some(code.to_string()),
        }
    }
}

/// Project card data.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub user_role: String,
    pub finish_date: String,
    pub cost: f64,
    pub progress_percent: f64,
    pub icon_color: String,
    pub initials: String,
    pub todo_count: u32,
    pub selected: bool,
}

/// Todo row data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub finish_date: String,
    pub completed: bool,
    pub selected: bool,
}

/// Result of a snapshot import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    /// `false` only when the document itself could not be used.
    pub ok: bool,
    pub created: u32,
    pub updated: u32,
    /// One line per rejected record, then one per dropped nested todo.
    pub failures: Vec<String>,
    pub message: String,
}

/// Snapshot export payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResponse {
    pub ok: bool,
    /// Pretty-printed JSON array; empty on failure.
    pub json: String,
    pub message: String,
}

/// Creates a project, or edits it when `form.id` already exists.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Past finish dates are rejected with `validation`.
#[flutter_rust_bridge::frb(sync)]
pub fn project_create(form: ProjectForm) -> ActionResponse {
    let data = match project_data_from_form(&form) {
        Ok(data) => data,
        Err(message) => return ActionResponse::failure("validation", message),
    };
    respond(
        with_store(|store, manager| store.create_project(manager, data, form.id.as_deref())),
        |outcome| {
            let message = if outcome.is_created() {
                "Project created."
            } else {
                "Project updated."
            };
            ActionResponse::success(message, Some(outcome.id().to_string()))
        },
    )
}

/// Edits `form.id`, or the selected project when `form.id` is `None`.
#[flutter_rust_bridge::frb(sync)]
pub fn project_edit(form: ProjectForm) -> ActionResponse {
    let update = match project_data_from_form(&form) {
        Ok(data) => ProjectUpdate::from(&data),
        Err(message) => return ActionResponse::failure("validation", message),
    };
    respond(
        with_store(|store, manager| store.update_project(manager, update)),
        |id| ActionResponse::success("Project updated.", Some(id)),
    )
}

/// Deletes a project with its todos.
#[flutter_rust_bridge::frb(sync)]
pub fn project_delete(id: String) -> ActionResponse {
    respond(
        with_store(|store, manager| store.delete_project(manager, &id)),
        |removed| {
            if removed {
                ActionResponse::success("Project deleted.", Some(id.trim().to_string()))
            } else {
                ActionResponse::failure("not_found", format!("project not found: {}", id.trim()))
            }
        },
    )
}

/// Selects a project, or clears the selection with `None`.
#[flutter_rust_bridge::frb(sync)]
pub fn project_select(id: Option<String>) -> ActionResponse {
    respond(
        with_store(|_, manager| {
            manager.select_project(id.as_deref())?;
            Ok(id.clone())
        }),
        |id| ActionResponse::success("Selection changed.", id),
    )
}

/// Lists project cards whose name contains `filter` (case-sensitive).
///
/// Returns an empty list when the store cannot be opened.
#[flutter_rust_bridge::frb(sync)]
pub fn projects_list(filter: Option<String>) -> Vec<ProjectItem> {
    let needle = filter.unwrap_or_default();
    with_store(|_, manager| {
        let selected = manager.selected_project().map(|project| project.id().to_string());
        Ok(manager
            .filter_projects(&needle)
            .into_iter()
            .map(|project| to_project_item(project, selected.as_deref()))
            .collect())
    })
    .unwrap_or_default()
}

/// Adds a todo to `project_id`, or edits the todo with the same id or title.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_add(project_id: String, form: TodoForm) -> ActionResponse {
    let data = match todo_data_from_form(&form) {
        Ok(data) => data,
        Err(message) => return ActionResponse::failure("validation", message),
    };
    respond(
        with_store(|store, manager| store.add_todo(manager, &project_id, data)),
        |id| ActionResponse::success("Todo saved.", Some(id)),
    )
}

/// Edits `form.id`, or the project's selected todo when `form.id` is `None`.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_edit(project_id: String, form: TodoForm) -> ActionResponse {
    let update = match todo_data_from_form(&form) {
        Ok(data) => TodoUpdate::from(&data),
        Err(message) => return ActionResponse::failure("validation", message),
    };
    respond(
        with_store(|store, manager| store.edit_todo(manager, &project_id, update)),
        |id| ActionResponse::success("Todo updated.", Some(id)),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn todo_delete(project_id: String, todo_id: String) -> ActionResponse {
    respond(
        with_store(|store, manager| store.delete_todo(manager, &project_id, &todo_id)),
        |()| ActionResponse::success("Todo deleted.", Some(todo_id.trim().to_string())),
    )
}

/// Selects a todo of one project, or clears its todo selection with `None`.
///
/// `todo_edit` without `form.id` edits this selection.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_select(project_id: String, todo_id: Option<String>) -> ActionResponse {
    respond(
        with_store(|_, manager| {
            let project_id = project_id.trim();
            let project = manager
                .project_by_id_mut(project_id)
                .ok_or_else(|| ProjectError::ProjectNotFound(project_id.to_string()))?;
            project.select_todo(todo_id.as_deref())?;
            Ok(todo_id.clone())
        }),
        |id| ActionResponse::success("Selection changed.", id),
    )
}

/// Lists todos of one project whose title contains `filter`.
#[flutter_rust_bridge::frb(sync)]
pub fn todos_list(project_id: String, filter: Option<String>) -> Vec<TodoItem> {
    let needle = filter.unwrap_or_default();
    with_store(|_, manager| {
        let Some(project) = manager.project_by_id(project_id.trim()) else {
            return Ok(Vec::new());
        };
        let selected = project.selected_todo().map(Todo::id);
        Ok(project
            .filter_todos(&needle)
            .into_iter()
            .map(|todo| to_todo_item(todo, selected))
            .collect())
    })
    .unwrap_or_default()
}

/// Sum of all project costs; `0.0` when the store cannot be opened.
#[flutter_rust_bridge::frb(sync)]
pub fn total_cost() -> f64 {
    with_store(|_, manager| Ok(manager.refresh_total_cost())).unwrap_or(0.0)
}

/// Exports every project, todos inline, as pretty JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn snapshot_export() -> ExportResponse {
    let exported = with_store(|_, manager| Ok(manager.export_snapshot_json()));
    match exported {
        Ok(Ok(json)) => ExportResponse {
            ok: true,
            json,
            message: "Snapshot exported.".to_string(),
        },
        Ok(Err(err)) => ExportResponse {
            ok: false,
            json: String::new(),
            message: format!("snapshot_export failed: {err}"),
        },
        Err(err) => ExportResponse {
            ok: false,
            json: String::new(),
            message: format!("snapshot_export failed: {err}"),
        },
    }
}

/// Imports a JSON snapshot record by record.
///
/// # FFI contract
/// - Rejected records are listed in `failures`; the rest are kept.
/// - `ok = false` only when `json` is not an array of records or the store
///   write fails.
#[flutter_rust_bridge::frb(sync)]
pub fn snapshot_import(json: String) -> ImportResponse {
    let entries = match ProjectsManager::parse_snapshot(&json) {
        Ok(entries) => entries,
        Err(err) => return import_failure(format!("snapshot_import failed: {err}")),
    };
    match with_store(|store, manager| store.import_snapshot(manager, entries)) {
        Ok(report) => ImportResponse {
            ok: true,
            created: count_u32(report.created_count()),
            updated: count_u32(report.updated_count()),
            failures: report
                .failures
                .iter()
                .map(|failure| format!("#{} `{}`: {}", failure.index, failure.name, failure.error))
                .chain(report.todo_failures.iter().map(|failure| {
                    format!(
                        "project {} todo #{} `{}`: {}",
                        failure.project_id, failure.index, failure.title, failure.error
                    )
                }))
                .collect(),
            message: format!(
                "Imported {} project(s), {} rejected, {} todo(s) dropped.",
                report.imported.len(),
                report.failures.len(),
                report.todo_failures.len()
            ),
        },
        Err(err) => import_failure(format!("snapshot_import failed: {err}")),
    }
}

fn import_failure(message: String) -> ImportResponse {
    ImportResponse {
        ok: false,
        created: 0,
        updated: 0,
        failures: Vec::new(),
        message,
    }
}

fn respond<T>(
    result: Result<T, StoreError>,
    on_ok: impl FnOnce(T) -> ActionResponse,
) -> ActionResponse {
    match result {
        Ok(value) => on_ok(value),
        Err(err) => ActionResponse::failure(err.code(), err.to_string()),
    }
}

fn project_data_from_form(form: &ProjectForm) -> Result<ProjectData, String> {
    let status = ProjectStatus::parse(&form.status)
        .ok_or_else(|| format!("unknown project status `{}`", form.status.trim()))?;
    let user_role = UserRole::parse(&form.user_role)
        .ok_or_else(|| format!("unknown user role `{}`", form.user_role.trim()))?;
    let finish_date = resolve_finish_date(&form.finish_date, today()).map_err(|err| err.to_string())?;

    let mut data = ProjectData::new(form.name.clone(), finish_date);
    data.id = form.id.clone();
    data.description = form.description.clone();
    data.status = status;
    data.user_role = user_role;
    data.cost = form.cost;
    data.progress = form.progress;
    Ok(data)
}

fn todo_data_from_form(form: &TodoForm) -> Result<TodoData, String> {
    let finish_date = resolve_finish_date(&form.finish_date, today()).map_err(|err| err.to_string())?;
    let mut data = TodoData::new(form.title.clone(), finish_date);
    data.id = form.id.clone();
    data.description = form.description.clone();
    data.completed = form.completed;
    Ok(data)
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn to_project_item(project: &Project, selected: Option<&str>) -> ProjectItem {
    ProjectItem {
        id: project.id().to_string(),
        name: project.name().to_string(),
        description: project.description().to_string(),
        status: project.status().as_str().to_string(),
        user_role: project.user_role().as_str().to_string(),
        finish_date: project.finish_date().format("%Y-%m-%d").to_string(),
        cost: project.cost(),
        progress_percent: project.progress_percent(),
        icon_color: project.icon_color().to_string(),
        initials: project.initials(),
        todo_count: count_u32(project.todos().len()),
        selected: selected == Some(project.id()),
    }
}

fn to_todo_item(todo: &Todo, selected: Option<&str>) -> TodoItem {
    TodoItem {
        id: todo.id().to_string(),
        project_id: todo.project_id().to_string(),
        title: todo.title().to_string(),
        description: todo.description().to_string(),
        finish_date: todo.finish_date().format("%Y-%m-%d").to_string(),
        completed: todo.is_completed(),
        selected: selected == Some(todo.id()),
    }
}

fn count_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| match CoreConfig::from_env() {
            Ok(config) => config.db_path,
            Err(err) => {
                warn!("event=config_load module=ffi status=error error={err}");
                default_db_path()
            }
        })
        .clone()
}

fn with_store<T>(
    f: impl FnOnce(&FfiStore<'_>, &mut ProjectsManager) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut session = SESSION.lock().unwrap_or_else(PoisonError::into_inner);
    let conn = open_db(resolve_db_path()).map_err(|err| StoreError::Repo(err.into()))?;
    let store = ProjectStore::new(SqliteDocumentRepository::try_new(&conn)?);

    let Session { manager, loaded } = &mut *session;
    if !*loaded {
        let report = store.load_projects(manager)?;
        if !report.is_clean() {
            warn!(
                "event=session_load module=ffi status=skip failed={}",
                report.failures.len()
            );
        }
        *loaded = true;
    }
    f(&store, manager)
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, ping, project_create, project_delete, project_edit,
        project_select, projects_list, snapshot_export, snapshot_import, todo_add, todo_delete,
        todo_edit, todo_select, todos_list, ProjectForm, TodoForm,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_name(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix} {nanos}")
    }

    fn project_form(name: &str) -> ProjectForm {
        ProjectForm {
            id: None,
            name: name.to_string(),
            description: "ffi test".to_string(),
            status: "Active".to_string(),
            user_role: "Engineer".to_string(),
            finish_date: String::new(),
            cost: 120.0,
            progress: 0.25,
        }
    }

    fn todo_form(title: &str) -> TodoForm {
        TodoForm {
            id: None,
            title: title.to_string(),
            description: String::new(),
            finish_date: "2099-01-01".to_string(),
            completed: false,
        }
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn project_create_lists_card_and_rejects_duplicate() {
        let name = unique_name("Build Tower");
        let created = project_create(project_form(&name));
        assert!(created.ok, "{}", created.message);
        let id = created.id.expect("create should return id");

        let items = projects_list(Some(name.clone()));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].status, "active");
        assert_eq!(items[0].progress_percent, 25.0);
        assert_eq!(items[0].icon_color.len(), 7);

        let duplicate = project_create(project_form(&name));
        assert!(!duplicate.ok);
        assert_eq!(duplicate.error_code.as_deref(), Some("duplicate_name"));
    }

    #[test]
    fn form_errors_map_to_validation_code() {
        let short = project_create(project_form("Tiny"));
        assert_eq!(short.error_code.as_deref(), Some("validation"));

        let mut past = project_form(&unique_name("Past Tower"));
        past.finish_date = "2000-01-01".to_string();
        assert_eq!(
            project_create(past).error_code.as_deref(),
            Some("validation")
        );

        let mut role = project_form(&unique_name("Role Tower"));
        role.user_role = "manager".to_string();
        assert!(!project_create(role).ok);
    }

    #[test]
    fn edit_by_selection_and_todo_flow() {
        let name = unique_name("Paint Tower");
        let id = project_create(project_form(&name)).id.expect("id");
        assert!(project_select(Some(id.clone())).ok);

        let mut form = project_form(&format!("{name} v2"));
        form.cost = 300.0;
        let edited = project_edit(form);
        assert!(edited.ok, "{}", edited.message);
        assert_eq!(edited.id.as_deref(), Some(id.as_str()));

        let todo_id = todo_add(id.clone(), todo_form("Pour concrete"))
            .id
            .expect("todo id");
        let mut rename = todo_form("Pour foundation");
        rename.id = Some(todo_id.clone());
        assert!(todo_edit(id.clone(), rename).ok);

        let todos = todos_list(id.clone(), None);
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].id, todo_id);
        assert_eq!(todos[0].title, "Pour foundation");

        assert!(todo_delete(id.clone(), todo_id).ok);
        assert!(todos_list(id.clone(), None).is_empty());

        assert!(project_delete(id.clone()).ok);
        let again = project_delete(id);
        assert_eq!(again.error_code.as_deref(), Some("not_found"));
    }

    #[test]
    fn snapshot_import_reports_per_record_failures() {
        let name = unique_name("Import Tower");
        let json = format!(
            r#"[{{"name":"{name}","finishDate":"2099-05-01","cost":10}},
                {{"name":"{name}","finishDate":"2099-05-01"}}]"#
        );
        let response = snapshot_import(json);
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.created, 1);
        assert_eq!(response.failures.len(), 1);

        let exported = snapshot_export();
        assert!(exported.ok);
        assert!(exported.json.contains(&name));

        assert!(!snapshot_import("{}".to_string()).ok);
    }

    #[test]
    fn snapshot_import_keeps_valid_records_next_to_malformed_ones() {
        let name = unique_name("Mixed Tower");
        let json = format!(
            r#"[{{"name":"{name}","finishDate":"2099-05-01T00:00:00.000Z"}},
                {{"name":"{name} b","finishDate":"2099-05-01","status":"done"}}]"#
        );
        let response = snapshot_import(json);
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.created, 1);
        assert_eq!(response.failures.len(), 1);
        assert!(response.failures[0].starts_with("#1 "));
        assert_eq!(projects_list(Some(name)).len(), 1);
    }

    #[test]
    fn todo_select_drives_edit_without_id() {
        let id = project_create(project_form(&unique_name("Select Tower")))
            .id
            .expect("id");
        let first = todo_add(id.clone(), todo_form("Pour concrete")).id.expect("todo id");
        todo_add(id.clone(), todo_form("Order steel")).id.expect("todo id");

        assert!(todo_select(id.clone(), Some(first.clone())).ok);
        let edited = todo_edit(id.clone(), todo_form("Pour foundation"));
        assert!(edited.ok, "{}", edited.message);
        assert_eq!(edited.id.as_deref(), Some(first.as_str()));

        let missing = todo_select(id.clone(), Some("missing".to_string()));
        assert_eq!(missing.error_code.as_deref(), Some("not_found"));
        assert!(todo_select(id.clone(), None).ok);
        let unselected = todo_edit(id.clone(), todo_form("Pour footing"));
        assert_eq!(unselected.error_code.as_deref(), Some("nothing_selected"));
        assert_eq!(
            todo_select("missing".to_string(), None).error_code.as_deref(),
            Some("not_found")
        );
    }
}
