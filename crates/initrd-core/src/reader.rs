use crate::error::{FormatViolation, InitrdError, Result};
use crate::format::{decode_records, ArchiveHeader, ARCHIVE_HEADER_SIZE};
use crate::layout::Layout;
use crate::{clamp_read, Entry};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Decoder over a seekable source. The header region is read and validated
/// once in [`open`](Self::open); content is read on demand by offset.
#[derive(Debug)]
pub struct InitrdReader<R> {
    source: R,
    image_len: u64,
    entries: Vec<Entry>,
}

impl InitrdReader<File> {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(File::open(path)?)
    }
}

impl<R: Read + Seek> InitrdReader<R> {
    pub fn open(mut source: R) -> Result<Self> {
        let image_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        // Read Header
        let mut header_buffer = [0u8; ARCHIVE_HEADER_SIZE];
        read_exact_at(&mut source, &mut header_buffer, 0, image_len)?;
        let header = ArchiveHeader::decode(&header_buffer)?;

        // Read Records
        let header_region_size = Layout::header_region_size_for(header.file_count() as usize);
        if header_region_size > image_len {
            return Err(FormatViolation::Truncated {
                needed: header_region_size,
                available: image_len,
            }
            .into());
        }
        let mut header_region = vec![0u8; header_region_size as usize];
        header_region[..ARCHIVE_HEADER_SIZE].copy_from_slice(&header_buffer);
        read_exact_at(
            &mut source,
            &mut header_region[ARCHIVE_HEADER_SIZE..],
            ARCHIVE_HEADER_SIZE as u64,
            image_len,
        )?;

        let entries = decode_records(&header_region, header.file_count(), image_len)?;
        debug!(files = entries.len(), image_len, "opened image");

        Ok(Self {
            source,
            image_len,
            entries,
        })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn image_len(&self) -> u64 {
        self.image_len
    }

    pub fn readdir(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Linear scan for an exact, case-sensitive name match.
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name.matches(name))
    }

    pub fn read_entry(&mut self, entry: &Entry) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; entry.length as usize];
        read_exact_at(
            &mut self.source,
            &mut buffer,
            u64::from(entry.offset),
            self.image_len,
        )?;
        Ok(buffer)
    }

    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .find(name)
            .cloned()
            .ok_or_else(|| InitrdError::NotFound(name.to_string()))?;
        self.read_entry(&entry)
    }

    /// Copies up to `buf.len()` bytes of `entry` starting `offset` bytes into
    /// its content. Returns the number of bytes copied, 0 past the end.
    pub fn read_at(&mut self, entry: &Entry, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let count = clamp_read(entry, offset, buf.len());
        if count == 0 {
            return Ok(0);
        }
        let position = u64::from(entry.offset) + u64::from(offset);
        read_exact_at(&mut self.source, &mut buf[..count], position, self.image_len)?;
        Ok(count)
    }

    /// Streams the content of `entry` into `out`.
    pub fn copy_entry_to<W: Write>(&mut self, entry: &Entry, mut out: W) -> Result<u64> {
        self.source.seek(SeekFrom::Start(u64::from(entry.offset)))?;
        let length = u64::from(entry.length);
        let copied = io::copy(&mut self.source.by_ref().take(length), &mut out)?;
        if copied != length {
            return Err(FormatViolation::Truncated {
                needed: entry.end(),
                available: self.image_len,
            }
            .into());
        }
        Ok(copied)
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

/// Reads exactly `buf.len()` bytes at `position`. A short source is a
/// format violation, not an I/O fault.
fn read_exact_at<R: Read + Seek>(
    source: &mut R,
    buf: &mut [u8],
    position: u64,
    image_len: u64,
) -> Result<()> {
    source.seek(SeekFrom::Start(position))?;
    match source.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            Err(FormatViolation::Truncated {
                needed: position + buf.len() as u64,
                available: image_len,
            }
            .into())
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::encode_to_vec;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn reads_entries_through_seeks() {
        let bytes = encode_to_vec(&[("a.txt", "hi"), ("b.bin", "\u{1}\u{2}\u{3}")]).unwrap();
        let mut reader = InitrdReader::open(Cursor::new(bytes)).unwrap();

        assert_eq!(reader.entries().len(), 2);
        assert_eq!(reader.read_file("a.txt").unwrap(), b"hi");
        assert_eq!(reader.read_file("b.bin").unwrap(), vec![1, 2, 3]);

        let entry = reader.readdir(1).unwrap().clone();
        let mut buf = [0u8; 8];
        assert_eq!(reader.read_at(&entry, 2, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);

        let mut out = Vec::new();
        assert_eq!(reader.copy_entry_to(&entry, &mut out).unwrap(), 3);
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn missing_name_is_not_found() {
        let bytes = encode_to_vec(&[("a", "x")]).unwrap();
        let mut reader = InitrdReader::open(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            reader.read_file("b"),
            Err(InitrdError::NotFound(name)) if name == "b"
        ));
    }

    #[test]
    fn short_source_is_truncated_not_io() {
        let err = InitrdReader::open(Cursor::new(vec![0xFE, 0xCA])).unwrap_err();
        assert!(matches!(
            err,
            InitrdError::Format(FormatViolation::Truncated {
                needed: 6,
                available: 2
            })
        ));
    }

    #[test]
    fn huge_file_count_is_truncated() {
        let mut bytes = encode_to_vec(&[("a", "x")]).unwrap();
        bytes[2..6].copy_from_slice(&1000u32.to_le_bytes());
        let err = InitrdReader::open(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            InitrdError::Format(FormatViolation::Truncated { .. })
        ));
    }

    #[test]
    fn foreign_magic_is_rejected() {
        let err = InitrdReader::open(Cursor::new(vec![0u8; 64])).unwrap_err();
        assert!(matches!(
            err,
            InitrdError::Format(FormatViolation::BadArchiveMagic { found: 0 })
        ));
    }
}
