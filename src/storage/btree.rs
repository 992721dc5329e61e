//! Tree search, leaf/internal insertion and splitting, and new-root
//! creation. Free functions operating on pages fetched through a
//! [`Pager`]; nodes are addressed by page number throughout so no
//! function ever holds two mutable borrows of the pager at once.
use super::node::{self, NodeType, INTERNAL_NODE_MAX_KEYS, INVALID_PAGE_NUM, LEAF_SPLIT_COUNTS};
use super::pager::Pager;
use super::row::Row;
use crate::errors::Error;
use tracing::{debug, trace};

/// The root always lives at page 0; it changes shape (leaf <-> internal)
/// but never moves.
pub const ROOT_PAGE_NUM: u32 = 0;

pub fn get_node_max_key(pager: &mut Pager, page_num: u32) -> Result<u32, Error> {
    let page = pager.get_page(page_num)?;
    match node::node_type(page)? {
        NodeType::Leaf => {
            let n = node::leaf_num_cells(page);
            Ok(node::leaf_key(page, n - 1))
        }
        NodeType::Internal => {
            let right = node::internal_right_child(page);
            get_node_max_key(pager, right)
        }
    }
}

/// Binary search within an internal node for the child index to descend
/// into: the smallest index whose key is `>= key`, or `num_keys` if none.
pub fn internal_find_child(page: &super::node::Page, key: u32) -> u32 {
    let num_keys = node::internal_num_keys(page);
    let (mut lo, mut hi) = (0u32, num_keys);
    while lo != hi {
        let mid = (lo + hi) / 2;
        if key <= node::internal_key_at(page, mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Binary search within a leaf for `key`'s cell, or the insertion slot.
fn leaf_find_cell(page: &super::node::Page, key: u32) -> u32 {
    let num_cells = node::leaf_num_cells(page);
    let (mut lo, mut hi) = (0u32, num_cells);
    while lo != hi {
        let mid = (lo + hi) / 2;
        let key_at_mid = node::leaf_key(page, mid);
        if key == key_at_mid {
            return mid;
        }
        if key < key_at_mid {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Result of a tree search: the leaf page and the cell index where `key`
/// is (or would be inserted).
#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub page_num: u32,
    pub cell_num: u32,
}

pub fn find(pager: &mut Pager, key: u32) -> Result<Position, Error> {
    find_from(pager, ROOT_PAGE_NUM, key)
}

fn find_from(pager: &mut Pager, page_num: u32, key: u32) -> Result<Position, Error> {
    let page = pager.get_page(page_num)?;
    match node::node_type(page)? {
        NodeType::Leaf => Ok(Position {
            page_num,
            cell_num: leaf_find_cell(page, key),
        }),
        NodeType::Internal => {
            let child_index = internal_find_child(page, key);
            let child_page_num = node::internal_child(page, child_index)?;
            find_from(pager, child_page_num, key)
        }
    }
}

pub fn initialize_leaf(pager: &mut Pager, page_num: u32) -> Result<(), Error> {
    node::initialize_leaf(pager.get_page(page_num)?);
    Ok(())
}

/// Inserts `(key, row)` at `pos`, splitting the leaf if it is already full.
pub fn leaf_insert(pager: &mut Pager, pos: Position, key: u32, row: &Row) -> Result<(), Error> {
    let page = pager.get_page(pos.page_num)?;
    let num_cells = node::leaf_num_cells(page);

    if num_cells as usize >= node::LEAF_NODE_MAX_CELLS {
        return leaf_split_insert(pager, pos, key, row);
    }

    for i in (pos.cell_num..num_cells).rev() {
        node::copy_leaf_cell(&page.clone(), i, page, i + 1);
    }
    node::set_leaf_key(page, pos.cell_num, key);
    row.serialize_into(node::leaf_value_mut(page, pos.cell_num));
    node::set_leaf_num_cells(page, num_cells + 1);
    trace!(page_num = pos.page_num, key, "inserted leaf cell");
    Ok(())
}

/// Splits a full leaf, distributing its `LEAF_NODE_MAX_CELLS + 1` logical
/// cells (the existing ones plus the incoming one) across the old leaf
/// and a new sibling, then links the sibling into the parent.
fn leaf_split_insert(pager: &mut Pager, pos: Position, key: u32, row: &Row) -> Result<(), Error> {
    let old_page_num = pos.page_num;
    let new_page_num = pager.allocate_page()?;

    let old_parent = node::parent(pager.get_page(old_page_num)?);
    let old_next_leaf = node::leaf_next_leaf(pager.get_page(old_page_num)?);
    let old_is_root = node::is_root(pager.get_page(old_page_num)?);

    node::initialize_leaf(pager.get_page(new_page_num)?);
    node::set_parent(pager.get_page(new_page_num)?, old_parent);
    node::set_leaf_next_leaf(pager.get_page(new_page_num)?, old_next_leaf);
    node::set_leaf_next_leaf(pager.get_page(old_page_num)?, new_page_num);

    let (left_count, right_count) = *LEAF_SPLIT_COUNTS;
    debug!(old_page_num, new_page_num, "splitting full leaf");

    let total = node::LEAF_NODE_MAX_CELLS as u32 + 1;
    let old_snapshot = pager.get_page(old_page_num)?.clone();

    // Highest logical slot first, so a write into `old` never clobbers a
    // cell this loop still needs to read.
    for slot in (0..total).rev() {
        let (dst_page_num, dst_cell) = if (slot as usize) < left_count {
            (old_page_num, slot)
        } else {
            (new_page_num, slot - left_count as u32)
        };

        if slot == pos.cell_num {
            let dst = pager.get_page(dst_page_num)?;
            node::set_leaf_key(dst, dst_cell, key);
            row.serialize_into(node::leaf_value_mut(dst, dst_cell));
        } else {
            let src_cell = if slot > pos.cell_num { slot - 1 } else { slot };
            let dst = pager.get_page(dst_page_num)?;
            node::copy_leaf_cell(&old_snapshot, src_cell, dst, dst_cell);
        }
    }

    node::set_leaf_num_cells(pager.get_page(old_page_num)?, left_count as u32);
    node::set_leaf_num_cells(pager.get_page(new_page_num)?, right_count as u32);

    if old_is_root {
        return create_new_root(pager, new_page_num);
    }

    let old_max = get_node_max_key(pager, old_page_num)?;
    let new_max = get_node_max_key(pager, new_page_num)?;
    update_internal_node_key(pager.get_page(old_parent)?, old_max, new_max);
    internal_insert(pager, old_parent, new_page_num)
}

/// Promotes the current root (page 0) to an internal node whose left
/// child holds the old root's contents and whose right child is
/// `right_child_page`. The root's page number never changes.
fn create_new_root(pager: &mut Pager, right_child_page: u32) -> Result<(), Error> {
    let left_child_page = pager.allocate_page()?;
    let root_copy = pager.get_page(ROOT_PAGE_NUM)?.clone();
    let root_was_internal = node::node_type(&root_copy)? == NodeType::Internal;

    // Copy verbatim first; metadata fixes on the left child happen only
    // after the copy, never before.
    *pager.get_page(left_child_page)? = root_copy;
    let left_child = pager.get_page(left_child_page)?;
    node::set_is_root(left_child, false);

    if root_was_internal {
        let num_children = node::internal_num_keys(left_child) + 1;
        for i in 0..num_children {
            let child_page = node::internal_child(left_child, i)?;
            node::set_parent(pager.get_page(child_page)?, left_child_page);
        }
    } else {
        node::set_leaf_num_cells(pager.get_page(left_child_page)?, LEAF_SPLIT_COUNTS.0 as u32);
    }

    node::set_parent(pager.get_page(left_child_page)?, ROOT_PAGE_NUM);
    node::set_parent(pager.get_page(right_child_page)?, ROOT_PAGE_NUM);

    let left_max = get_node_max_key(pager, left_child_page)?;

    let root = pager.get_page(ROOT_PAGE_NUM)?;
    node::initialize_internal(root);
    node::set_is_root(root, true);
    node::set_internal_num_keys(root, 1);
    node::set_internal_child_at(root, 0, left_child_page);
    node::set_internal_key_at(root, 0, left_max);
    node::set_internal_right_child(root, right_child_page);

    debug!(left_child_page, right_child_page, "created new root");
    Ok(())
}

pub fn update_internal_node_key(page: &mut super::node::Page, old_key: u32, new_key: u32) {
    let idx = internal_find_child(page, old_key);
    node::set_internal_key_at(page, idx, new_key);
}

/// Inserts `child_page` into `parent_page`, splitting it if full.
pub fn internal_insert(pager: &mut Pager, parent_page: u32, child_page: u32) -> Result<(), Error> {
    let child_max = get_node_max_key(pager, child_page)?;
    let parent = pager.get_page(parent_page)?;
    let index = internal_find_child(parent, child_max);
    let num_keys = node::internal_num_keys(parent);

    if num_keys >= INTERNAL_NODE_MAX_KEYS {
        return internal_split_insert(pager, parent_page, child_page);
    }

    let right_child_page = node::internal_right_child(parent);
    if right_child_page == INVALID_PAGE_NUM {
        node::set_internal_right_child(pager.get_page(parent_page)?, child_page);
    } else {
        let right_max = get_node_max_key(pager, right_child_page)?;
        let parent = pager.get_page(parent_page)?;
        node::set_internal_num_keys(parent, num_keys + 1);
        if child_max > right_max {
            node::set_internal_child_at(parent, num_keys, right_child_page);
            node::set_internal_key_at(parent, num_keys, right_max);
            node::set_internal_right_child(parent, child_page);
        } else {
            for i in (index..num_keys).rev() {
                let child_at_i = node::internal_child_at(parent, i);
                let key_at_i = node::internal_key_at(parent, i);
                node::set_internal_child_at(parent, i + 1, child_at_i);
                node::set_internal_key_at(parent, i + 1, key_at_i);
            }
            node::set_internal_child_at(parent, index, child_page);
            node::set_internal_key_at(parent, index, child_max);
        }
    }

    node::set_parent(pager.get_page(child_page)?, parent_page);
    Ok(())
}

fn internal_split_insert(pager: &mut Pager, old_page_num: u32, extra_child_page: u32) -> Result<(), Error> {
    // Capture every max-key this function needs before any mutation: once
    // right_child is cleared below, get_node_max_key would read the wrong
    // value out of this node.
    let old_max = get_node_max_key(pager, old_page_num)?;
    let extra_max = get_node_max_key(pager, extra_child_page)?;

    let new_page_num = pager.allocate_page()?;
    // Initialized unconditionally: in the splitting-root branch this page
    // is never touched by create_new_root (that call only wires up the
    // *old* root's copy), so it would otherwise stay a zeroed buffer whose
    // right_child reads back as page 0, not INVALID_PAGE_NUM.
    node::initialize_internal(pager.get_page(new_page_num)?);
    let splitting_root = node::is_root(pager.get_page(old_page_num)?);

    let (old_page_num, parent_page) = if splitting_root {
        create_new_root(pager, new_page_num)?;
        let root = pager.get_page(ROOT_PAGE_NUM)?;
        let left_child = node::internal_child_at(root, 0);
        (left_child, ROOT_PAGE_NUM)
    } else {
        let parent = node::parent(pager.get_page(old_page_num)?);
        (old_page_num, parent)
    };

    let old_right_child = node::internal_right_child(pager.get_page(old_page_num)?);
    internal_insert(pager, new_page_num, old_right_child)?;
    node::set_internal_right_child(pager.get_page(old_page_num)?, INVALID_PAGE_NUM);

    let mut num_keys = node::internal_num_keys(pager.get_page(old_page_num)?);
    let mut i = INTERNAL_NODE_MAX_KEYS - 1;
    while i > INTERNAL_NODE_MAX_KEYS / 2 {
        let moved_child = node::internal_child_at(pager.get_page(old_page_num)?, i);
        internal_insert(pager, new_page_num, moved_child)?;
        num_keys -= 1;
        node::set_internal_num_keys(pager.get_page(old_page_num)?, num_keys);
        i -= 1;
    }

    let promoted_child = node::internal_child_at(pager.get_page(old_page_num)?, num_keys - 1);
    node::set_internal_right_child(pager.get_page(old_page_num)?, promoted_child);
    num_keys -= 1;
    node::set_internal_num_keys(pager.get_page(old_page_num)?, num_keys);

    let max_after_split = get_node_max_key(pager, old_page_num)?;
    let destination_page_num = if extra_max < max_after_split { old_page_num } else { new_page_num };
    internal_insert(pager, destination_page_num, extra_child_page)?;

    let new_max = get_node_max_key(pager, old_page_num)?;
    update_internal_node_key(pager.get_page(parent_page)?, old_max, new_max);

    if !splitting_root {
        internal_insert(pager, parent_page, new_page_num)?;
    }

    debug!(old_page_num, new_page_num, "split internal node");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn fresh_pager() -> (NamedTempFile, Pager) {
        let tmp = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(tmp.path()).unwrap();
        initialize_leaf(&mut pager, ROOT_PAGE_NUM).unwrap();
        node::set_is_root(pager.get_page(ROOT_PAGE_NUM).unwrap(), true);
        (tmp, pager)
    }

    #[test]
    fn insert_and_find_single_row() {
        let (_tmp, mut pager) = fresh_pager();
        let row = Row::new(5, "a", "a@x").unwrap();
        let pos = find(&mut pager, 5).unwrap();
        leaf_insert(&mut pager, pos, 5, &row).unwrap();
        let pos = find(&mut pager, 5).unwrap();
        assert_eq!(node::leaf_key(pager.get_page(pos.page_num).unwrap(), pos.cell_num), 5);
    }

    #[test]
    fn insert_past_leaf_capacity_splits_into_internal_root() {
        let (_tmp, mut pager) = fresh_pager();
        for id in 1..=(node::LEAF_NODE_MAX_CELLS as u32 + 1) {
            let row = Row::new(id, format!("u{}", id), "e@x").unwrap();
            let pos = find(&mut pager, id).unwrap();
            leaf_insert(&mut pager, pos, id, &row).unwrap();
        }
        let root = pager.get_page(ROOT_PAGE_NUM).unwrap();
        assert_eq!(node::node_type(root).unwrap(), NodeType::Internal);
        assert_eq!(node::internal_num_keys(root), 1);
    }

    #[test]
    fn leaf_sibling_chain_links_after_split() {
        let (_tmp, mut pager) = fresh_pager();
        for id in 1..=(node::LEAF_NODE_MAX_CELLS as u32 + 1) {
            let row = Row::new(id, format!("u{}", id), "e@x").unwrap();
            let pos = find(&mut pager, id).unwrap();
            leaf_insert(&mut pager, pos, id, &row).unwrap();
        }
        let root = pager.get_page(ROOT_PAGE_NUM).unwrap();
        let left = node::internal_child_at(root, 0);
        let right = node::internal_right_child(root);
        let left_page = pager.get_page(left).unwrap();
        assert_eq!(node::leaf_next_leaf(left_page), right);
    }
}
