//! Fixed row schema: `(id: u32, username: varchar(32), email: varchar(255))`.
//!
//! The row size is frozen at compile time, which is what lets the leaf node
//! layout in [`super::node`] compute `LEAF_NODE_MAX_CELLS` as a constant
//! instead of a per-table, per-instance value.
use crate::errors::{Error, PrepareError};

pub const USERNAME_SIZE: usize = 32;
pub const EMAIL_SIZE: usize = 255;

const ID_SIZE: usize = std::mem::size_of::<u32>();
const USERNAME_FIELD_SIZE: usize = USERNAME_SIZE + 1;
const EMAIL_FIELD_SIZE: usize = EMAIL_SIZE + 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_FIELD_SIZE;

/// Serialized byte size of a row: `4 + 33 + 256`.
pub const ROW_SIZE: usize = EMAIL_OFFSET + EMAIL_FIELD_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Result<Self, Error> {
        let username = username.into();
        let email = email.into();
        if username.len() > USERNAME_SIZE || email.len() > EMAIL_SIZE {
            return Err(Error::Prepare(PrepareError::StringTooLong));
        }
        Ok(Row { id, username, email })
    }

    /// Writes this row's serialized form into `buf`, which must be exactly
    /// `ROW_SIZE` bytes.
    pub fn serialize_into(&self, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), ROW_SIZE);
        buf[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());

        let uname = self.username.as_bytes();
        buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_FIELD_SIZE].fill(0);
        buf[USERNAME_OFFSET..USERNAME_OFFSET + uname.len()].copy_from_slice(uname);

        let email = self.email.as_bytes();
        buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_FIELD_SIZE].fill(0);
        buf[EMAIL_OFFSET..EMAIL_OFFSET + email.len()].copy_from_slice(email);
    }

    /// Reads a row back out of a `ROW_SIZE`-byte slice.
    pub fn deserialize(buf: &[u8]) -> Result<Self, Error> {
        debug_assert_eq!(buf.len(), ROW_SIZE);
        let id = u32::from_le_bytes(
            buf[ID_OFFSET..ID_OFFSET + ID_SIZE]
                .try_into()
                .map_err(|_| Error::CorruptFile("row id".into()))?,
        );
        let username = read_cstr(&buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_FIELD_SIZE])?;
        let email = read_cstr(&buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_FIELD_SIZE])?;
        Ok(Row { id, username, email })
    }
}

fn read_cstr(field: &[u8]) -> Result<String, Error> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec())
        .map_err(|_| Error::CorruptFile("row string field not utf8".into()))
}
