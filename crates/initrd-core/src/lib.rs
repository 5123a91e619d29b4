//! Flat initrd image format.
//!
//! An image is an [`ArchiveHeader`], followed by one [`FileHeader`] record per
//! file, followed by the raw contents of every file concatenated in record
//! order. All integers are little-endian and no padding exists anywhere.
//!
//! ```
//! use initrd_core::{encode_to_vec, InitrdImage};
//!
//! let bytes = encode_to_vec(&[("a.txt", b"hi")]).unwrap();
//! let image = InitrdImage::parse(&bytes).unwrap();
//! let entry = image.find("a.txt").unwrap();
//! assert_eq!(image.content(entry), b"hi");
//! ```

pub mod error;
pub mod format;
pub mod image;
pub mod layout;
pub mod name;
pub mod reader;
pub mod writer;

pub use error::{FormatViolation, InitrdError, Result};
pub use format::{
    ArchiveHeader, FileHeader, ARCHIVE_HEADER_SIZE, ARCHIVE_MAGIC, FILE_HEADER_SIZE, FILE_MAGIC,
    NAME_LENGTH,
};
pub use image::InitrdImage;
pub use layout::Layout;
pub use name::{EntryName, NameError};
pub use reader::InitrdReader;
pub use writer::{encode_to_vec, InitrdWriter, InputEntry, Summary};

/// A decoded file record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Position of the record in the header region.
    pub index: usize,
    pub name: EntryName,
    /// Absolute offset of the content from the start of the image.
    pub offset: u32,
    pub length: u32,
}

impl Entry {
    /// One past the last content byte, as an absolute offset.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }
}

/// Number of bytes a positional read of `entry` at `offset` may copy into a
/// buffer of `capacity` bytes. Reads past the end yield nothing.
pub(crate) fn clamp_read(entry: &Entry, offset: u32, capacity: usize) -> usize {
    if offset >= entry.length {
        return 0;
    }
    let remaining = (entry.length - offset) as usize;
    remaining.min(capacity)
}
