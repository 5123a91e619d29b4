use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

use crate::error::FormatViolation;
use crate::layout::Layout;
use crate::name::EntryName;
use crate::Entry;

/// Magic value opening every image.
pub const ARCHIVE_MAGIC: u16 = 0xCAFE;

/// Magic value opening every file record.
pub const FILE_MAGIC: u16 = 0xBEEF;

/// Width of the zero-padded name field in a file record.
pub const NAME_LENGTH: usize = 64;

pub const ARCHIVE_HEADER_SIZE: usize = std::mem::size_of::<ArchiveHeader>();
pub const FILE_HEADER_SIZE: usize = std::mem::size_of::<FileHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromZeroes, FromBytes, AsBytes, Unaligned)]
pub struct ArchiveHeader {
    pub magic: U16<LittleEndian>,
    pub file_count: U32<LittleEndian>,
}

impl ArchiveHeader {
    pub fn new(file_count: u32) -> Self {
        Self {
            magic: U16::new(ARCHIVE_MAGIC),
            file_count: U32::new(file_count),
        }
    }

    /// Decodes and validates the header at the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatViolation> {
        let header = Self::read_from_prefix(bytes).ok_or(FormatViolation::Truncated {
            needed: ARCHIVE_HEADER_SIZE as u64,
            available: bytes.len() as u64,
        })?;

        let magic = header.magic.get();
        if magic != ARCHIVE_MAGIC {
            return Err(FormatViolation::BadArchiveMagic { found: magic });
        }
        Ok(header)
    }

    pub fn file_count(&self) -> u32 {
        self.file_count.get()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromZeroes, FromBytes, AsBytes, Unaligned)]
pub struct FileHeader {
    pub magic: U16<LittleEndian>,
    pub name: [u8; NAME_LENGTH],
    pub offset: U32<LittleEndian>,
    pub length: U32<LittleEndian>,
}

impl FileHeader {
    pub fn new(name: [u8; NAME_LENGTH], offset: u32, length: u32) -> Self {
        Self {
            magic: U16::new(FILE_MAGIC),
            name,
            offset: U32::new(offset),
            length: U32::new(length),
        }
    }

    /// Decodes record `index` from the start of `bytes`, checking its magic.
    pub fn decode(bytes: &[u8], index: usize) -> Result<Self, FormatViolation> {
        let header = Self::read_from_prefix(bytes).ok_or(FormatViolation::Truncated {
            needed: FILE_HEADER_SIZE as u64,
            available: bytes.len() as u64,
        })?;

        let magic = header.magic.get();
        if magic != FILE_MAGIC {
            return Err(FormatViolation::BadFileMagic {
                index,
                found: magic,
            });
        }
        Ok(header)
    }

    pub fn offset(&self) -> u32 {
        self.offset.get()
    }

    pub fn length(&self) -> u32 {
        self.length.get()
    }
}

/// Decodes the `file_count` records that follow the archive header in
/// `header_region`, checking each magic and that each content block lies
/// within an image of `image_len` bytes.
pub(crate) fn decode_records(
    header_region: &[u8],
    file_count: u32,
    image_len: u64,
) -> Result<Vec<Entry>, FormatViolation> {
    let header_region_size = Layout::header_region_size_for(file_count as usize);
    if (header_region.len() as u64) < header_region_size {
        return Err(FormatViolation::Truncated {
            needed: header_region_size,
            available: header_region.len() as u64,
        });
    }

    let records = &header_region[ARCHIVE_HEADER_SIZE..];
    let mut entries = Vec::with_capacity(file_count as usize);
    for index in 0..file_count as usize {
        let start = index * FILE_HEADER_SIZE;
        let record = FileHeader::decode(&records[start..], index)?;
        let entry = Entry {
            index,
            name: EntryName::from_field(&record.name),
            offset: record.offset(),
            length: record.length(),
        };

        let inside_header_region = u64::from(entry.offset) < header_region_size;
        if entry.end() > image_len || (inside_header_region && entry.length != 0) {
            return Err(FormatViolation::EntryOutOfBounds {
                index,
                offset: entry.offset,
                length: entry.length,
                image_len,
            });
        }
        entries.push(entry);
    }
    Ok(entries)
}
