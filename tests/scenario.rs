//! End-to-end flows through the workspace

use dbkeeper::{Cell, ColumnDef, ColumnType, DatabaseEntry, DbkeeperConfig, Error, Session, Workspace};

fn workspace(dir: &tempfile::TempDir) -> Workspace {
    Workspace::open(DbkeeperConfig::in_dir(dir.path())).unwrap()
}

fn login(ws: &Workspace, user: &str, password: &str) -> Session {
    let mut session = Session::new();
    ws.login(&mut session, user, password).unwrap();
    session
}

#[test]
fn shop_items_round_trip_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let ws = workspace(&dir);
    let mut session = login(&ws, "admin", "test");

    ws.create_database(&session, "shop").unwrap();
    ws.open_database(&mut session, "shop").unwrap();
    ws.create_table(
        &session,
        "items",
        &[
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("price", ColumnType::Real),
        ],
    )
    .unwrap();
    ws.insert_row(
        &session,
        "items",
        &[("name".to_string(), Cell::from("pen")), ("price".to_string(), Cell::Real(1.5))],
    )
    .unwrap();

    let data = ws.rows(&session, "items").unwrap();
    assert_eq!(data.columns, vec!["name", "price"]);
    assert_eq!(data.values(), vec![vec![Cell::from("pen"), Cell::Real(1.5)]]);
    assert_eq!(ws.columns(&session, "items").unwrap(), vec!["name", "price"]);

    let path = ws.export_csv(&session, "items").unwrap();
    assert_eq!(path, dir.path().join("items.csv"));
    let csv = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines, vec!["name,price", "pen,1.5"]);
}

#[test]
fn state_survives_reopening_the_workspace() {
    let dir = tempfile::tempdir().unwrap();
    {
        let ws = workspace(&dir);
        ws.register("alice", "pw").unwrap();
        let mut session = login(&ws, "alice", "pw");
        ws.create_database(&session, "notes").unwrap();
        ws.open_database(&mut session, "notes").unwrap();
        ws.create_table(&session, "todo", &[ColumnDef::new("task", ColumnType::Text)]).unwrap();
    }

    let ws = workspace(&dir);
    let mut session = login(&ws, "alice", "pw");
    assert_eq!(
        ws.databases(&session).unwrap(),
        vec![DatabaseEntry { name: "notes".into(), creator: "alice".into() }]
    );
    ws.open_database(&mut session, "notes").unwrap();
    assert_eq!(ws.tables(&session).unwrap(), vec!["todo"]);
}

#[test]
fn deleting_a_shared_database_hides_it_from_everyone() {
    let dir = tempfile::tempdir().unwrap();
    let ws = workspace(&dir);
    ws.register("alice", "pw").unwrap();
    ws.register("bob", "pw").unwrap();

    let mut alice = login(&ws, "alice", "pw");
    let mut bob = login(&ws, "bob", "pw");
    ws.create_database(&alice, "shop").unwrap();
    ws.share(&alice, "shop", "bob").unwrap();
    ws.open_database(&mut bob, "shop").unwrap();

    ws.open_database(&mut alice, "shop").unwrap();
    ws.delete_database(&mut alice, "shop").unwrap();

    assert!(ws.databases(&alice).unwrap().is_empty());
    assert!(ws.databases(&bob).unwrap().is_empty());
    // Bob's session still names the database but the grant is gone
    assert!(matches!(ws.tables(&bob), Err(Error::AccessDenied(_))));
    assert!(!dir.path().join("shop.db").exists());

    // The name is free again
    ws.create_database(&bob, "shop").unwrap();
    assert_eq!(
        ws.databases(&bob).unwrap(),
        vec![DatabaseEntry { name: "shop".into(), creator: "bob".into() }]
    );
}

#[test]
fn selected_row_deletion_keeps_identical_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let ws = workspace(&dir);
    let mut session = login(&ws, "admin", "test");
    ws.create_database(&session, "shop").unwrap();
    ws.open_database(&mut session, "shop").unwrap();
    ws.create_table(&session, "items", &[ColumnDef::new("name", ColumnType::Text)]).unwrap();

    let values = [("name".to_string(), Cell::from("pen"))];
    ws.insert_row(&session, "items", &values).unwrap();
    ws.insert_row(&session, "items", &values).unwrap();

    let first = ws.rows(&session, "items").unwrap().rows[0].id;
    assert_eq!(ws.delete_rows_by_id(&session, "items", &[first]).unwrap(), 1);
    assert_eq!(ws.rows(&session, "items").unwrap().rows.len(), 1);

    // Value matching removes every identical row
    ws.insert_row(&session, "items", &values).unwrap();
    assert_eq!(ws.delete_rows(&session, "items", &[vec![Cell::from("pen")]]).unwrap(), 2);
    assert!(ws.rows(&session, "items").unwrap().rows.is_empty());

    ws.drop_table(&session, "items").unwrap();
    ws.drop_table(&session, "items").unwrap();
    assert!(ws.tables(&session).unwrap().is_empty());
}
