//! Byte layout of a page interpreted as a B-tree node.
//!
//! A page is either a leaf node (sorted key/row cells, a `next_leaf`
//! sibling pointer) or an internal node (sorted child-pointer/key cells
//! plus a distinguished `right_child`). Both shapes share a common header
//! and live in the same fixed-size buffer; there is no separate `Node`
//! type, since the schema behind a page never varies at runtime.
use super::row::ROW_SIZE;
use crate::errors::Error;
use once_cell::sync::Lazy;

pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: u32 = 100;
pub const INVALID_PAGE_NUM: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

// Common header: node_type(1) | is_root(1) | parent_page(4)
const NODE_TYPE_OFFSET: usize = 0;
const IS_ROOT_OFFSET: usize = 1;
const PARENT_POINTER_OFFSET: usize = 2;
pub const COMMON_NODE_HEADER_SIZE: usize = 6;

// Leaf header: num_cells(4) | next_leaf(4)
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + 4;
pub const LEAF_NODE_HEADER_SIZE: usize = LEAF_NODE_NEXT_LEAF_OFFSET + 4;

const LEAF_NODE_KEY_SIZE: usize = 4;
const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

// Internal header: num_keys(4) | right_child(4)
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize = INTERNAL_NODE_NUM_KEYS_OFFSET + 4;
const INTERNAL_NODE_HEADER_SIZE: usize = INTERNAL_NODE_RIGHT_CHILD_OFFSET + 4;

const INTERNAL_NODE_CHILD_SIZE: usize = 4;
const INTERNAL_NODE_KEY_SIZE: usize = 4;
const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

/// Deliberately small so multi-level splits are exercised by modest
/// insert counts; raising it changes performance, not correctness.
pub const INTERNAL_NODE_MAX_KEYS: u32 = 3;

/// `(left, right)` leaf split counts, computed once from `LEAF_NODE_MAX_CELLS`.
pub static LEAF_SPLIT_COUNTS: Lazy<(usize, usize)> = Lazy::new(|| {
    let right = (LEAF_NODE_MAX_CELLS + 1 + 1) / 2;
    let left = (LEAF_NODE_MAX_CELLS + 1) - right;
    (left, right)
});

pub type Page = [u8; PAGE_SIZE];

pub fn new_page() -> Page {
    [0u8; PAGE_SIZE]
}

// --- common header ---

pub fn node_type(page: &Page) -> Result<NodeType, Error> {
    match page[NODE_TYPE_OFFSET] {
        0 => Ok(NodeType::Internal),
        1 => Ok(NodeType::Leaf),
        other => Err(Error::CorruptFile(format!("invalid node type byte {}", other))),
    }
}

pub fn set_node_type(page: &mut Page, ty: NodeType) {
    page[NODE_TYPE_OFFSET] = match ty {
        NodeType::Internal => 0,
        NodeType::Leaf => 1,
    };
}

pub fn is_root(page: &Page) -> bool {
    page[IS_ROOT_OFFSET] == 1
}

pub fn set_is_root(page: &mut Page, v: bool) {
    page[IS_ROOT_OFFSET] = v as u8;
}

pub fn parent(page: &Page) -> u32 {
    read_u32(page, PARENT_POINTER_OFFSET)
}

pub fn set_parent(page: &mut Page, parent_page: u32) {
    write_u32(page, PARENT_POINTER_OFFSET, parent_page);
}

// --- leaf node ---

pub fn leaf_num_cells(page: &Page) -> u32 {
    read_u32(page, LEAF_NODE_NUM_CELLS_OFFSET)
}

pub fn set_leaf_num_cells(page: &mut Page, n: u32) {
    write_u32(page, LEAF_NODE_NUM_CELLS_OFFSET, n);
}

pub fn leaf_next_leaf(page: &Page) -> u32 {
    read_u32(page, LEAF_NODE_NEXT_LEAF_OFFSET)
}

pub fn set_leaf_next_leaf(page: &mut Page, next: u32) {
    write_u32(page, LEAF_NODE_NEXT_LEAF_OFFSET, next);
}

fn leaf_cell_offset(cell_num: u32) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE
}

pub fn leaf_key(page: &Page, cell_num: u32) -> u32 {
    read_u32(page, leaf_cell_offset(cell_num))
}

pub fn set_leaf_key(page: &mut Page, cell_num: u32, key: u32) {
    write_u32(page, leaf_cell_offset(cell_num), key);
}

pub fn leaf_value(page: &Page, cell_num: u32) -> &[u8] {
    let start = leaf_cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
    &page[start..start + LEAF_NODE_VALUE_SIZE]
}

pub fn leaf_value_mut(page: &mut Page, cell_num: u32) -> &mut [u8] {
    let start = leaf_cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
    &mut page[start..start + LEAF_NODE_VALUE_SIZE]
}

/// Copies the whole `(key, value)` cell at `src` in `from` into `dst` in `to`.
pub fn copy_leaf_cell(from: &Page, src: u32, to: &mut Page, dst: u32) {
    let s = leaf_cell_offset(src);
    let d = leaf_cell_offset(dst);
    let cell = from[s..s + LEAF_NODE_CELL_SIZE].to_vec();
    to[d..d + LEAF_NODE_CELL_SIZE].copy_from_slice(&cell);
}

pub fn initialize_leaf(page: &mut Page) {
    set_node_type(page, NodeType::Leaf);
    set_is_root(page, false);
    set_leaf_num_cells(page, 0);
    // 0 represents no sibling.
    set_leaf_next_leaf(page, 0);
}

// --- internal node ---

pub fn internal_num_keys(page: &Page) -> u32 {
    read_u32(page, INTERNAL_NODE_NUM_KEYS_OFFSET)
}

pub fn set_internal_num_keys(page: &mut Page, n: u32) {
    write_u32(page, INTERNAL_NODE_NUM_KEYS_OFFSET, n);
}

pub fn internal_right_child(page: &Page) -> u32 {
    read_u32(page, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
}

pub fn set_internal_right_child(page: &mut Page, child: u32) {
    write_u32(page, INTERNAL_NODE_RIGHT_CHILD_OFFSET, child);
}

fn internal_cell_offset(cell_num: u32) -> usize {
    INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE
}

pub fn internal_child_at(page: &Page, cell_num: u32) -> u32 {
    read_u32(page, internal_cell_offset(cell_num))
}

pub fn set_internal_child_at(page: &mut Page, cell_num: u32, child: u32) {
    write_u32(page, internal_cell_offset(cell_num), child);
}

pub fn internal_key_at(page: &Page, cell_num: u32) -> u32 {
    read_u32(page, internal_cell_offset(cell_num) + INTERNAL_NODE_CHILD_SIZE)
}

pub fn set_internal_key_at(page: &mut Page, cell_num: u32, key: u32) {
    write_u32(page, internal_cell_offset(cell_num) + INTERNAL_NODE_CHILD_SIZE, key);
}

/// `child(i)` for `i == num_keys` is the right child; otherwise the i-th cell's child.
pub fn internal_child(page: &Page, child_num: u32) -> Result<u32, Error> {
    let num_keys = internal_num_keys(page);
    if child_num > num_keys {
        return Err(Error::CorruptFile(format!(
            "child index {} exceeds num_keys {}",
            child_num, num_keys
        )));
    }
    let ptr = if child_num == num_keys {
        internal_right_child(page)
    } else {
        internal_child_at(page, child_num)
    };
    if ptr == INVALID_PAGE_NUM {
        return Err(Error::CorruptFile("read INVALID_PAGE_NUM as a real child".into()));
    }
    Ok(ptr)
}

pub fn initialize_internal(page: &mut Page) {
    set_node_type(page, NodeType::Internal);
    set_is_root(page, false);
    set_internal_num_keys(page, 0);
    set_internal_right_child(page, INVALID_PAGE_NUM);
}

fn read_u32(page: &Page, offset: usize) -> u32 {
    u32::from_le_bytes(page[offset..offset + 4].try_into().unwrap())
}

fn write_u32(page: &mut Page, offset: usize, value: u32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
