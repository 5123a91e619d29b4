//! Zero-copy view over an image already resident in memory, the way an
//! early-boot consumer sees the blob once the bootloader has loaded it.

use tracing::debug;

use crate::error::{InitrdError, Result};
use crate::format::{decode_records, ArchiveHeader};
use crate::{clamp_read, Entry};

#[derive(Debug, Clone)]
pub struct InitrdImage<'a> {
    bytes: &'a [u8],
    entries: Vec<Entry>,
}

impl<'a> InitrdImage<'a> {
    /// Validates the archive header and every record of `bytes`.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let header = ArchiveHeader::decode(bytes)?;
        let entries = decode_records(bytes, header.file_count(), bytes.len() as u64)?;
        debug!(files = entries.len(), bytes = bytes.len(), "parsed in-memory image");

        Ok(Self { bytes, entries })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at position `index` of the header region.
    pub fn readdir(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Linear scan for an exact, case-sensitive name match.
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name.matches(name))
    }

    /// Content of `entry`, borrowed from the image. `entry` must come from
    /// this image; an entry whose block lies outside it yields an empty slice.
    pub fn content(&self, entry: &Entry) -> &'a [u8] {
        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        self.bytes.get(start..end).unwrap_or_default()
    }

    pub fn file(&self, name: &str) -> Result<&'a [u8]> {
        let entry = self
            .find(name)
            .ok_or_else(|| InitrdError::NotFound(name.to_string()))?;
        Ok(self.content(entry))
    }

    /// Copies up to `buf.len()` bytes of `entry` starting `offset` bytes into
    /// its content. Returns the number of bytes copied, 0 past the end.
    pub fn read_at(&self, entry: &Entry, offset: u32, buf: &mut [u8]) -> usize {
        let count = clamp_read(entry, offset, buf.len());
        let content = self.content(entry);
        let start = offset as usize;
        if let Some(src) = content.get(start..start + count) {
            buf[..count].copy_from_slice(src);
            count
        } else {
            0
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}
