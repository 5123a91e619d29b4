use std::fmt;

use thiserror::Error;

use crate::format::NAME_LENGTH;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    #[error("name is {0} bytes, the limit is {}", NAME_LENGTH)]
    TooLong(usize),
    #[error("name is not ASCII")]
    NonAscii,
    #[error("name is empty")]
    Empty,
    #[error("name contains a zero byte")]
    InteriorNul,
}

/// A file name as stored in a record: ASCII, at most [`NAME_LENGTH`] bytes,
/// zero-padded on disk. Longer names are rejected, never truncated.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryName {
    bytes: [u8; NAME_LENGTH],
    len: u8,
}

impl EntryName {
    pub fn new(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.len() > NAME_LENGTH {
            return Err(NameError::TooLong(name.len()));
        }
        if !name.is_ascii() {
            return Err(NameError::NonAscii);
        }
        // Zero terminates the stored field
        if name.bytes().any(|b| b == 0) {
            return Err(NameError::InteriorNul);
        }

        let mut bytes = [0u8; NAME_LENGTH];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            bytes,
            len: name.len() as u8,
        })
    }

    /// Decodes a stored name field. The name ends at the first zero byte, or
    /// fills the whole field when there is none.
    pub fn from_field(field: &[u8; NAME_LENGTH]) -> Self {
        let len = field.iter().position(|&b| b == 0).unwrap_or(NAME_LENGTH);
        let mut bytes = [0u8; NAME_LENGTH];
        bytes[..len].copy_from_slice(&field[..len]);
        Self {
            bytes,
            len: len as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// The name as text. Fields decoded from foreign images may hold
    /// non-ASCII bytes, those are rendered lossily.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// The padded on-disk field.
    pub fn to_field(&self) -> [u8; NAME_LENGTH] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn matches(&self, name: &str) -> bool {
        self.as_bytes() == name.as_bytes()
    }
}

impl TryFrom<&str> for EntryName {
    type Error = NameError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryName({:?})", self.as_str())
    }
}
