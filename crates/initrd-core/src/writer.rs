//! Image encoder.
//!
//! Every name is validated and every offset assigned in [`InitrdWriter::new`],
//! before a single byte reaches the output. Writing then streams the header,
//! the records and each source's content in input order. If writing fails the
//! output holds a partial image and must be discarded.

use std::io::{self, Read, Write};

use tracing::{debug, trace};
use zerocopy::AsBytes;

use crate::error::{InitrdError, Result};
use crate::format::{ArchiveHeader, FileHeader};
use crate::layout::Layout;
use crate::name::{EntryName, NameError};
use crate::Entry;

/// One file to embed: its base name, declared length and content source.
#[derive(Debug)]
pub struct InputEntry<R> {
    pub name: String,
    pub length: u64,
    pub source: R,
}

impl<R: Read> InputEntry<R> {
    pub fn new(name: impl Into<String>, length: u64, source: R) -> Self {
        Self {
            name: name.into(),
            length,
            source,
        }
    }
}

impl<'a> InputEntry<&'a [u8]> {
    pub fn from_bytes(name: impl Into<String>, content: &'a [u8]) -> Self {
        Self::new(name, content.len() as u64, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub file_count: u32,
    pub header_region_size: u32,
    pub total_size: u32,
}

pub struct InitrdWriter<R> {
    records: Vec<Entry>,
    sources: Vec<R>,
    layout: Layout,
}

impl<R: Read> InitrdWriter<R> {
    pub fn new(entries: Vec<InputEntry<R>>) -> Result<Self> {
        let mut names = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let name = EntryName::new(&entry.name).map_err(|err| match err {
                NameError::TooLong(length) => InitrdError::NameTooLong {
                    index,
                    name: entry.name.clone(),
                    length,
                },
                NameError::NonAscii => InitrdError::NonAsciiName {
                    index,
                    name: entry.name.clone(),
                },
                NameError::Empty => InitrdError::EmptyName { index },
                NameError::InteriorNul => InitrdError::NulInName {
                    index,
                    name: entry.name.clone(),
                },
            })?;
            names.push(name);
        }

        let layout = Layout::compute(entries.iter().map(|entry| entry.length)).map_err(|overflow| {
            InitrdError::SizeOverflow {
                index: overflow.index,
                name: entries
                    .get(overflow.index)
                    .map(|entry| entry.name.clone())
                    .unwrap_or_default(),
            }
        })?;
        debug!(
            files = layout.len(),
            header_region_size = layout.header_region_size(),
            total_size = layout.total_size(),
            "computed layout"
        );

        let records = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Entry {
                index,
                name,
                offset: layout.offset(index).unwrap_or_default(),
                length: layout.length(index).unwrap_or_default(),
            })
            .collect();
        let sources = entries.into_iter().map(|entry| entry.source).collect();

        Ok(Self {
            records,
            sources,
            layout,
        })
    }

    /// The records that will be written, with their assigned offsets.
    pub fn entries(&self) -> &[Entry] {
        &self.records
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn write_to<W: Write>(self, out: W) -> Result<Summary> {
        self.write_to_with_progress(out, |_| {})
    }

    /// Like [`write_to`](Self::write_to), calling `progress` after each
    /// entry's content has been written.
    pub fn write_to_with_progress<W, F>(self, mut out: W, mut progress: F) -> Result<Summary>
    where
        W: Write,
        F: FnMut(&Entry),
    {
        let summary = Summary {
            file_count: self.records.len() as u32,
            header_region_size: self.layout.header_region_size(),
            total_size: self.layout.total_size(),
        };

        out.write_all(ArchiveHeader::new(summary.file_count).as_bytes())?;
        for record in &self.records {
            let header = FileHeader::new(record.name.to_field(), record.offset, record.length);
            out.write_all(header.as_bytes())?;
            trace!(index = record.index, name = %record.name, offset = record.offset, "wrote record");
        }

        for (record, mut source) in self.records.iter().zip(self.sources) {
            let expected = u64::from(record.length);
            let copied = io::copy(&mut source.by_ref().take(expected), &mut out)?;
            if copied != expected {
                return Err(InitrdError::LengthMismatch {
                    name: record.name.to_string(),
                    expected: record.length,
                    actual: copied,
                });
            }

            let extra = io::copy(&mut source.take(1), &mut io::sink())?;
            if extra != 0 {
                return Err(InitrdError::LengthMismatch {
                    name: record.name.to_string(),
                    expected: record.length,
                    actual: copied + extra,
                });
            }

            progress(record);
        }

        out.flush()?;
        debug!(files = summary.file_count, bytes = summary.total_size, "image written");
        Ok(summary)
    }
}

/// Encodes in-memory files into a complete image.
pub fn encode_to_vec<N, C>(files: &[(N, C)]) -> Result<Vec<u8>>
where
    N: AsRef<str>,
    C: AsRef<[u8]>,
{
    let entries = files
        .iter()
        .map(|(name, content)| InputEntry::from_bytes(name.as_ref(), content.as_ref()))
        .collect();
    let writer = InitrdWriter::new(entries)?;

    let mut out = Vec::with_capacity(writer.layout().total_size() as usize);
    writer.write_to(&mut out)?;
    Ok(out)
}
