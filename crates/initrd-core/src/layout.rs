//! Offset assignment for the content region.
//!
//! Content blocks follow the header region back to back, in record order,
//! with no alignment padding. Consumers seek by these exact offsets, so the
//! computation must stay a pure function of the ordered sizes.

use tracing::trace;

use crate::format::{ARCHIVE_HEADER_SIZE, FILE_HEADER_SIZE};

/// The entry that could not be placed inside the 32-bit offset space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    header_region_size: u32,
    offsets: Vec<u32>,
    lengths: Vec<u32>,
    total_size: u32,
}

impl Layout {
    /// Size of the header region of an image holding `file_count` entries.
    pub const fn header_region_size_for(file_count: usize) -> u64 {
        ARCHIVE_HEADER_SIZE as u64 + file_count as u64 * FILE_HEADER_SIZE as u64
    }

    /// Assigns an offset to every size, in order. Fails on the first entry
    /// whose length or end offset does not fit in `u32`.
    pub fn compute<I>(sizes: I) -> Result<Self, Overflow>
    where
        I: IntoIterator<Item = u64>,
    {
        let sizes: Vec<u64> = sizes.into_iter().collect();

        let header_region_size = u32::try_from(Self::header_region_size_for(sizes.len()))
            .map_err(|_| Overflow { index: 0 })?;

        let mut offsets = Vec::with_capacity(sizes.len());
        let mut lengths = Vec::with_capacity(sizes.len());
        let mut cursor = header_region_size;

        for (index, &size) in sizes.iter().enumerate() {
            let length = u32::try_from(size).map_err(|_| Overflow { index })?;
            let end = cursor.checked_add(length).ok_or(Overflow { index })?;
            trace!(index, offset = cursor, length, "placed entry");

            offsets.push(cursor);
            lengths.push(length);
            cursor = end;
        }

        Ok(Self {
            header_region_size,
            offsets,
            lengths,
            total_size: cursor,
        })
    }

    pub fn header_region_size(&self) -> u32 {
        self.header_region_size
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn offset(&self, index: usize) -> Option<u32> {
        self.offsets.get(index).copied()
    }

    pub fn length(&self, index: usize) -> Option<u32> {
        self.lengths.get(index).copied()
    }

    /// Size of the whole image in bytes.
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
