use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use initrd_core::{InitrdWriter, InputEntry, Summary};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Resolves the files to pack. A directory contributes its regular files,
/// non-recursively, sorted by name. Explicit files keep their order.
pub fn collect_inputs(input: Option<&Path>, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let Some(dir) = input else {
        for path in files {
            if !path.is_file() {
                bail!("{} is not a regular file", path.display());
            }
        }
        return Ok(files.to_vec());
    };

    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
        if entry.file_type().is_file() {
            found.push(entry.into_path());
        }
    }
    debug!(dir = %dir.display(), files = found.len(), "scanned input directory");
    Ok(found)
}

/// Packs `inputs` into an image at `output`. The image is staged in a
/// temporary file beside `output` and only moved into place once complete.
pub fn build_archive(inputs: &[PathBuf], output: &Path, show_progress: bool) -> Result<Summary> {
    info!("Init: {}", output.display());

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(inputs.len());
    for path in inputs {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?;
        if !seen.insert(name.to_string()) {
            bail!("Duplicate file name {name:?} ({})", path.display());
        }

        let length = fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        entries.push(InputEntry::new(name, length, LazyFile::new(path)));
    }

    let writer = InitrdWriter::new(entries).context("Invalid input set")?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a staging file in {}", dir.display()))?;

    let bar = if show_progress {
        ProgressBar::new(inputs.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut out = BufWriter::new(staging);
    let summary = writer
        .write_to_with_progress(&mut out, |entry| {
            bar.set_message(entry.name.to_string());
            bar.inc(1);
        })
        .with_context(|| format!("Failed to write {}", output.display()))?;
    bar.finish_and_clear();

    let staging = out
        .into_inner()
        .map_err(|err| err.into_error())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    staging
        .persist(output)
        .map_err(|err| err.error)
        .with_context(|| format!("Failed to move image into {}", output.display()))?;

    info!(
        files = summary.file_count,
        bytes = summary.total_size,
        "Success! Image ready."
    );
    Ok(summary)
}

/// A content source that opens its file on first read, so only one input
/// file is held open at a time while the image is written.
struct LazyFile {
    path: PathBuf,
    file: Option<File>,
}

impl LazyFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
        }
    }

    fn annotate(&self, err: io::Error) -> io::Error {
        io::Error::new(err.kind(), format!("{}: {err}", self.path.display()))
    }
}

impl Read for LazyFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let file = match self.file.take() {
            Some(file) => file,
            None => File::open(&self.path).map_err(|err| self.annotate(err))?,
        };
        let file = self.file.insert(file);
        match file.read(buf) {
            Ok(read) => Ok(read),
            Err(err) => Err(self.annotate(err)),
        }
    }
}
