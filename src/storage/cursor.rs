//! Cursor-based navigation over a table's leaf chain.
//!
//! Unlike a plain index into an array, a cursor here tracks a page number
//! and a cell number within that page, and `advance` hops across leaf
//! siblings transparently so callers can scan the whole table without
//! caring where node boundaries fall.
use super::btree::{self, ROOT_PAGE_NUM};
use super::node;
use super::pager::Pager;
use super::row::Row;
use crate::errors::Error;

pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl Cursor {
    /// Positions at the first row in ascending key order.
    pub fn start(pager: &mut Pager) -> Result<Self, Error> {
        let mut page_num = ROOT_PAGE_NUM;
        loop {
            let page = pager.get_page(page_num)?;
            match node::node_type(page)? {
                node::NodeType::Leaf => break,
                node::NodeType::Internal => {
                    page_num = node::internal_child(page, 0)?;
                }
            }
        }
        let num_cells = node::leaf_num_cells(pager.get_page(page_num)?);
        Ok(Cursor {
            page_num,
            cell_num: 0,
            end_of_table: num_cells == 0,
        })
    }

    /// Positions at `key`, or at the slot it would occupy if absent.
    pub fn find(pager: &mut Pager, key: u32) -> Result<Self, Error> {
        let pos = btree::find(pager, key)?;
        let num_cells = node::leaf_num_cells(pager.get_page(pos.page_num)?);
        Ok(Cursor {
            page_num: pos.page_num,
            cell_num: pos.cell_num,
            end_of_table: pos.cell_num >= num_cells,
        })
    }

    /// True if the cursor sits exactly on a cell holding `key`.
    pub fn key_matches(&self, pager: &mut Pager, key: u32) -> Result<bool, Error> {
        if self.end_of_table {
            return Ok(false);
        }
        let page = pager.get_page(self.page_num)?;
        let num_cells = node::leaf_num_cells(page);
        if self.cell_num >= num_cells {
            return Ok(false);
        }
        Ok(node::leaf_key(page, self.cell_num) == key)
    }

    pub fn row(&self, pager: &mut Pager) -> Result<Row, Error> {
        let page = pager.get_page(self.page_num)?;
        Row::deserialize(node::leaf_value(page, self.cell_num))
    }

    pub fn write_row(&self, pager: &mut Pager, row: &Row) -> Result<(), Error> {
        let page = pager.get_page(self.page_num)?;
        row.serialize_into(node::leaf_value_mut(page, self.cell_num));
        Ok(())
    }

    /// Moves to the next cell, following the leaf sibling chain at a node
    /// boundary and marking `end_of_table` after the rightmost leaf.
    pub fn advance(&mut self, pager: &mut Pager) -> Result<(), Error> {
        let page = pager.get_page(self.page_num)?;
        self.cell_num += 1;
        if self.cell_num >= node::leaf_num_cells(page) {
            let next = node::leaf_next_leaf(page);
            if next == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn fresh_pager() -> (NamedTempFile, Pager) {
        let tmp = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(tmp.path()).unwrap();
        btree::initialize_leaf(&mut pager, ROOT_PAGE_NUM).unwrap();
        node::set_is_root(pager.get_page(ROOT_PAGE_NUM).unwrap(), true);
        (tmp, pager)
    }

    #[test]
    fn start_on_empty_table_is_end_of_table() {
        let (_tmp, mut pager) = fresh_pager();
        let cursor = Cursor::start(&mut pager).unwrap();
        assert!(cursor.end_of_table);
    }

    #[test]
    fn scan_visits_rows_in_ascending_key_order() {
        let (_tmp, mut pager) = fresh_pager();
        for id in [5u32, 1, 3] {
            let row = Row::new(id, "u", "e@x").unwrap();
            let pos = btree::find(&mut pager, id).unwrap();
            btree::leaf_insert(&mut pager, pos, id, &row).unwrap();
        }
        let mut cursor = Cursor::start(&mut pager).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(cursor.row(&mut pager).unwrap().id);
            cursor.advance(&mut pager).unwrap();
        }
        assert_eq!(seen, vec![1, 3, 5]);
    }

    #[test]
    fn scan_crosses_leaf_boundary_after_split() {
        let (_tmp, mut pager) = fresh_pager();
        let total = node::LEAF_NODE_MAX_CELLS as u32 + 5;
        for id in 1..=total {
            let row = Row::new(id, "u", "e@x").unwrap();
            let pos = btree::find(&mut pager, id).unwrap();
            btree::leaf_insert(&mut pager, pos, id, &row).unwrap();
        }
        let mut cursor = Cursor::start(&mut pager).unwrap();
        let mut count = 0;
        while !cursor.end_of_table {
            count += 1;
            cursor.advance(&mut pager).unwrap();
        }
        assert_eq!(count, total);
    }
}
