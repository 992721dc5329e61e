//! File-backed integration tests exercising the storage engine through its
//! public `Table` surface: open/insert/select/update/delete/close/reopen.
use mysqlite::storage::{Row, Table};
use mysqlite::Error;
use tempfile::NamedTempFile;

fn row(id: u32, username: &str, email: &str) -> Row {
    Row::new(id, username, email).unwrap()
}

#[test]
fn insert_then_select_one_row() {
    let tmp = NamedTempFile::new().unwrap();
    let mut table = Table::open(tmp.path()).unwrap();
    table.insert(&row(1, "alice", "a@x")).unwrap();
    let rows = table.select().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].id, rows[0].username.as_str(), rows[0].email.as_str()), (1, "alice", "a@x"));
}

#[test]
fn duplicate_insert_is_rejected_and_leaves_original_row() {
    let tmp = NamedTempFile::new().unwrap();
    let mut table = Table::open(tmp.path()).unwrap();
    table.insert(&row(1, "a", "a@x")).unwrap();
    let err = table.insert(&row(1, "b", "b@y")).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey(1)));
    let rows = table.select().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "a");
}

#[test]
fn out_of_order_inserts_select_in_ascending_id_order() {
    let tmp = NamedTempFile::new().unwrap();
    let mut table = Table::open(tmp.path()).unwrap();
    for id in [2u32, 1, 3] {
        table.insert(&row(id, "u", "e@x")).unwrap();
    }
    let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn one_row_past_leaf_capacity_splits_root_into_two_leaves() {
    let tmp = NamedTempFile::new().unwrap();
    let mut table = Table::open(tmp.path()).unwrap();
    let max_cells = mysqlite::storage::node::LEAF_NODE_MAX_CELLS as u32;
    for id in 1..=(max_cells + 1) {
        table.insert(&row(id, &format!("user_{}", id), "u@x")).unwrap();
    }
    let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=(max_cells + 1)).collect::<Vec<_>>());
    let tree = table.debug_btree().unwrap();
    assert!(tree.contains("internal"));
    assert!(tree.matches("- leaf").count() == 2);
}

#[test]
fn delete_by_id_shifts_cells_and_leaves_the_rest_in_order() {
    let tmp = NamedTempFile::new().unwrap();
    let mut table = Table::open(tmp.path()).unwrap();
    for id in 1..=30u32 {
        table.insert(&row(id, "u", "e@x")).unwrap();
    }
    table.delete(15).unwrap();
    let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
    let expected: Vec<u32> = (1..=14).chain(16..=30).collect();
    assert_eq!(ids, expected);
}

#[test]
fn update_not_found_leaves_table_unchanged() {
    let tmp = NamedTempFile::new().unwrap();
    let mut table = Table::open(tmp.path()).unwrap();
    table.insert(&row(1, "a", "a@x")).unwrap();
    let err = table.update(2, "b", "b@y").unwrap_err();
    assert!(matches!(err, Error::NotFound(2)));
    assert_eq!(table.select().unwrap().len(), 1);
}

#[test]
fn reopen_after_many_inserts_preserves_select_output() {
    let tmp = NamedTempFile::new().unwrap();
    {
        let mut table = Table::open(tmp.path()).unwrap();
        for id in 1..=60u32 {
            table.insert(&row(id, "u", "e@x")).unwrap();
        }
        table.close().unwrap();
    }
    let mut table = Table::open(tmp.path()).unwrap();
    let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=60).collect::<Vec<_>>());
    let tree = table.debug_btree().unwrap();
    assert!(tree.contains("internal"));
}

#[test]
fn open_close_reopen_with_no_mutations_is_byte_identical() {
    let tmp = NamedTempFile::new().unwrap();
    {
        let mut table = Table::open(tmp.path()).unwrap();
        table.insert(&row(1, "alice", "a@x")).unwrap();
        table.close().unwrap();
    }
    let before = std::fs::read(tmp.path()).unwrap();
    {
        let mut table = Table::open(tmp.path()).unwrap();
        let _ = table.select().unwrap();
        table.close().unwrap();
    }
    let after = std::fs::read(tmp.path()).unwrap();
    assert_eq!(before, after);
}
