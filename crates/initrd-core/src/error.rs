use thiserror::Error;

pub type Result<T> = std::result::Result<T, InitrdError>;

#[derive(Error, Debug)]
pub enum InitrdError {
    #[error("Entry {index}: name {name:?} is {length} bytes, the limit is {}", crate::NAME_LENGTH)]
    NameTooLong {
        index: usize,
        name: String,
        length: usize,
    },
    #[error("Entry {index}: name {name:?} is not ASCII")]
    NonAsciiName { index: usize, name: String },
    #[error("Entry {index}: name is empty")]
    EmptyName { index: usize },
    #[error("Entry {index}: name {name:?} contains a zero byte")]
    NulInName { index: usize, name: String },
    #[error("Entry {index} ({name}) does not fit in a 32-bit image")]
    SizeOverflow { index: usize, name: String },
    /// `actual` is `expected + 1` when the source runs long; the rest of the
    /// source is not read.
    #[error("Entry {name}: expected {expected} bytes of content, source produced {actual}")]
    LengthMismatch {
        name: String,
        expected: u32,
        actual: u64,
    },
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid Image: {0}")]
    Format(#[from] FormatViolation),
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Structural damage in an image. Distinct from [`InitrdError::Io`]: these
/// mean the bytes are corrupt or belong to another format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatViolation {
    #[error("archive magic mismatch (found {found:#06x})")]
    BadArchiveMagic { found: u16 },
    #[error("record {index}: file magic mismatch (found {found:#06x})")]
    BadFileMagic { index: usize, found: u16 },
    #[error("truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: u64, available: u64 },
    #[error("record {index}: content [{offset}, +{length}) lies outside the {image_len} byte image")]
    EntryOutOfBounds {
        index: usize,
        offset: u32,
        length: u32,
        image_len: u64,
    },
}
