use chrono::NaiveDate;
use projtrack_core::{ProjectData, ProjectStatus, ProjectsManager, SnapshotError, TodoData};

fn finish() -> NaiveDate {
    NaiveDate::from_ymd_opt(2036, 9, 9).unwrap()
}

#[test]
fn saved_snapshot_restores_projects_todos_and_colors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.json");

    let mut source = ProjectsManager::new();
    let mut data = ProjectData::new("Build Tower", finish());
    data.status = ProjectStatus::Active;
    data.cost = 1000.0;
    data.todos_list = vec![
        TodoData::new("Pour concrete", finish()),
        TodoData::new("Order steel", finish()),
    ];
    source.new_project(data, None).unwrap();
    source.save_snapshot(&path).unwrap();

    let mut target = ProjectsManager::new();
    let report = target.load_snapshot(&path).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.created_count(), 1);

    let original = &source.projects()[0];
    let restored = &target.projects()[0];
    assert_eq!(restored.id(), original.id());
    assert_eq!(restored.icon_color(), original.icon_color());
    assert_eq!(restored.status(), ProjectStatus::Active);
    let titles: Vec<&str> = restored.todos().iter().map(|todo| todo.title()).collect();
    assert_eq!(titles, vec!["Pour concrete", "Order steel"]);
    assert_eq!(target.total_cost(), 1000.0);
}

#[test]
fn reimporting_own_snapshot_routes_to_edit() {
    let mut manager = ProjectsManager::new();
    manager
        .new_project(ProjectData::new("Build Tower", finish()), Some("p-1"))
        .unwrap();
    let json = manager.export_snapshot_json().unwrap();

    let report = manager.import_snapshot_json(&json).unwrap();
    assert_eq!(report.updated_count(), 1);
    assert_eq!(report.created_count(), 0);
    assert_eq!(manager.len(), 1);
}

#[test]
fn sparse_records_take_defaults() {
    let mut manager = ProjectsManager::new();
    let report = manager
        .import_snapshot_json(r#"[{"name": "Paint Tower", "finishDate": "2036-09-09"}]"#)
        .unwrap();
    assert!(report.is_clean());

    let project = &manager.projects()[0];
    assert_eq!(project.cost(), 0.0);
    assert_eq!(project.progress(), 0.5);
    assert_eq!(project.description(), "");
    assert!(project.todos().is_empty());
    assert!(project.icon_color().starts_with('#'));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = ProjectsManager::new();
    let err = manager
        .load_snapshot(dir.path().join("absent.json"))
        .unwrap_err();
    assert!(matches!(err, SnapshotError::Io(_)));
}
