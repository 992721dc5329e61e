//! The executor: insert, update, delete, and select against a single
//! fixed-schema table backed by a B+tree.
use super::btree::{self, ROOT_PAGE_NUM};
use super::cursor::Cursor;
use super::node::{self, NodeType, INVALID_PAGE_NUM, PAGE_SIZE};
use super::pager::Pager;
use super::row::Row;
use crate::errors::Error;
use std::path::Path;
use tracing::{debug, info};

pub struct Table {
    pager: Pager,
}

impl Table {
    /// Opens (creating if absent) the database file at `path`. A fresh
    /// file gets a single empty leaf as the root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;
        if pager.num_pages() == 0 {
            btree::initialize_leaf(&mut pager, ROOT_PAGE_NUM)?;
            node::set_is_root(pager.get_page(ROOT_PAGE_NUM)?, true);
        }
        info!(num_pages = pager.num_pages(), "opened table");
        Ok(Table { pager })
    }

    pub fn close(&mut self) -> Result<(), Error> {
        self.pager.close()
    }

    pub fn insert(&mut self, row: &Row) -> Result<(), Error> {
        let cursor = Cursor::find(&mut self.pager, row.id)?;
        if cursor.key_matches(&mut self.pager, row.id)? {
            return Err(Error::DuplicateKey(row.id));
        }
        let pos = btree::Position {
            page_num: cursor.page_num,
            cell_num: cursor.cell_num,
        };
        btree::leaf_insert(&mut self.pager, pos, row.id, row)?;
        debug!(id = row.id, "inserted row");
        Ok(())
    }

    pub fn update(&mut self, id: u32, username: &str, email: &str) -> Result<(), Error> {
        let cursor = Cursor::find(&mut self.pager, id)?;
        if !cursor.key_matches(&mut self.pager, id)? {
            return Err(Error::NotFound(id));
        }
        let row = Row::new(id, username, email)?;
        cursor.write_row(&mut self.pager, &row)?;
        debug!(id, "updated row");
        Ok(())
    }

    pub fn delete(&mut self, id: u32) -> Result<(), Error> {
        let cursor = Cursor::find(&mut self.pager, id)?;
        if cursor.end_of_table {
            return Err(Error::NotFound(id));
        }
        let page = self.pager.get_page(cursor.page_num)?;
        let num_cells = node::leaf_num_cells(page);
        let snapshot = page.clone();
        for i in cursor.cell_num..num_cells - 1 {
            node::copy_leaf_cell(&snapshot, i + 1, page, i);
        }
        node::set_leaf_num_cells(page, num_cells - 1);
        debug!(id, "deleted row");
        Ok(())
    }

    pub fn select(&mut self) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        let mut cursor = Cursor::start(&mut self.pager)?;
        while !cursor.end_of_table {
            rows.push(cursor.row(&mut self.pager)?);
            cursor.advance(&mut self.pager)?;
        }
        Ok(rows)
    }

    /// Renders the whole page tree for `.btree`, indented by depth.
    pub fn debug_btree(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        self.debug_btree_node(ROOT_PAGE_NUM, 0, &mut out)?;
        Ok(out)
    }

    fn debug_btree_node(&mut self, page_num: u32, depth: usize, out: &mut String) -> Result<(), Error> {
        let indent = "  ".repeat(depth);
        let page = self.pager.get_page(page_num)?.clone();
        match node::node_type(&page)? {
            NodeType::Leaf => {
                let num_cells = node::leaf_num_cells(&page);
                out.push_str(&format!("{}- leaf (page {}, size {})\n", indent, page_num, num_cells));
                for i in 0..num_cells {
                    out.push_str(&format!("{}  - {}\n", indent, node::leaf_key(&page, i)));
                }
            }
            NodeType::Internal => {
                let num_keys = node::internal_num_keys(&page);
                out.push_str(&format!("{}- internal (page {}, size {})\n", indent, page_num, num_keys));
                for i in 0..num_keys {
                    let child = node::internal_child_at(&page, i);
                    self.debug_btree_node(child, depth + 1, out)?;
                    out.push_str(&format!("{}- key {}\n", indent, node::internal_key_at(&page, i)));
                }
                let right = node::internal_right_child(&page);
                if right != INVALID_PAGE_NUM {
                    self.debug_btree_node(right, depth + 1, out)?;
                }
            }
        }
        Ok(())
    }

    /// Renders the fixed layout constants for `.constants`.
    pub fn debug_constants() -> String {
        format!(
            "ROW_SIZE: {}\nCOMMON_NODE_HEADER_SIZE: {}\nLEAF_NODE_HEADER_SIZE: {}\n\
             LEAF_NODE_CELL_SIZE: {}\nLEAF_NODE_SPACE_FOR_CELLS: {}\nLEAF_NODE_MAX_CELLS: {}\n\
             INTERNAL_NODE_MAX_KEYS: {}\nPAGE_SIZE: {}",
            super::row::ROW_SIZE,
            node::COMMON_NODE_HEADER_SIZE,
            node::LEAF_NODE_HEADER_SIZE,
            node::LEAF_NODE_CELL_SIZE,
            node::LEAF_NODE_SPACE_FOR_CELLS,
            node::LEAF_NODE_MAX_CELLS,
            node::INTERNAL_NODE_MAX_KEYS,
            PAGE_SIZE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn fresh_table() -> (NamedTempFile, Table) {
        let tmp = NamedTempFile::new().unwrap();
        let table = Table::open(tmp.path()).unwrap();
        (tmp, table)
    }

    #[test]
    fn insert_then_select_round_trips() {
        let (_tmp, mut table) = fresh_table();
        table.insert(&Row::new(1, "alice", "alice@x.com").unwrap()).unwrap();
        table.insert(&Row::new(2, "bob", "bob@x.com").unwrap()).unwrap();
        let rows = table.select().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1].id, 2);
    }

    #[test]
    fn insert_out_of_order_selects_ascending() {
        let (_tmp, mut table) = fresh_table();
        for id in [5, 1, 3, 2, 4] {
            table.insert(&Row::new(id, "u", "e@x").unwrap()).unwrap();
        }
        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let (_tmp, mut table) = fresh_table();
        table.insert(&Row::new(1, "a", "a@x").unwrap()).unwrap();
        let err = table.insert(&Row::new(1, "b", "b@x").unwrap()).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(1)));
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let (_tmp, mut table) = fresh_table();
        let err = table.update(1, "a", "a@x").unwrap_err();
        assert!(matches!(err, Error::NotFound(1)));
    }

    #[test]
    fn update_existing_row_changes_fields() {
        let (_tmp, mut table) = fresh_table();
        table.insert(&Row::new(1, "a", "a@x").unwrap()).unwrap();
        table.update(1, "b", "b@x").unwrap();
        let rows = table.select().unwrap();
        assert_eq!(rows[0].username, "b");
    }

    #[test]
    fn delete_removes_row_and_shifts_cells() {
        let (_tmp, mut table) = fresh_table();
        for id in 1..=3 {
            table.insert(&Row::new(id, "u", "e@x").unwrap()).unwrap();
        }
        table.delete(2).unwrap();
        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn reopen_after_close_preserves_rows() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut table = Table::open(tmp.path()).unwrap();
            for id in 1..=20 {
                table.insert(&Row::new(id, "u", "e@x").unwrap()).unwrap();
            }
            table.close().unwrap();
        }
        let mut table = Table::open(tmp.path()).unwrap();
        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn many_inserts_trigger_multilevel_split() {
        let (_tmp, mut table) = fresh_table();
        for id in 1..=60 {
            table.insert(&Row::new(id, "u", "e@x").unwrap()).unwrap();
        }
        let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=60).collect::<Vec<_>>());
    }
}
