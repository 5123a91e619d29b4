use anyhow::{bail, Context, Result};
use initrd_core::{Entry, InitrdReader, Layout};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

fn open(archive: &Path) -> Result<InitrdReader<File>> {
    InitrdReader::open_path(archive)
        .with_context(|| format!("Failed to open image {}", archive.display()))
}

pub fn list_archive(archive: &Path) -> Result<()> {
    let reader = open(archive)?;

    println!("{:<5} | {:<64} | {:<10} | {:<10}", "#", "NAME", "OFFSET", "LENGTH");
    println!("{:-<5}-|-{:-<64}-|-{:-<10}-|-{:-<10}", "", "", "", "");

    for entry in reader.entries() {
        println!(
            "{:<5} | {:<64} | {:<10} | {:<10}",
            entry.index,
            entry.name.to_string(),
            entry.offset,
            entry.length
        );
    }
    Ok(())
}

pub fn cat_file(archive: &Path, file: &str) -> Result<()> {
    let mut reader = open(archive)?;
    let entry = reader
        .find(file)
        .cloned()
        .with_context(|| format!("{file} not found in {}", archive.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    reader.copy_entry_to(&entry, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn extract_archive(archive: &Path, output: &Path) -> Result<()> {
    let mut reader = open(archive)?;
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let entries = reader.entries().to_vec();
    for entry in &entries {
        let name = safe_name(entry)?;
        let target = output.join(&name);

        let file = File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        let mut out = BufWriter::new(file);
        reader.copy_entry_to(entry, &mut out)?;
        out.flush()
            .with_context(|| format!("Failed to write {}", target.display()))?;
        debug!(name = %name, length = entry.length, "extracted");
    }

    info!(files = entries.len(), "Extracted into {}", output.display());
    Ok(())
}

/// Names from foreign images must stay inside the extraction directory.
fn safe_name(entry: &Entry) -> Result<String> {
    let name = entry.name.to_string();
    if name.is_empty() || name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\\') {
        bail!("Record {} has an unsafe name {name:?}", entry.index);
    }
    Ok(name)
}

pub fn inspect_archive(archive: &Path) -> Result<()> {
    // Opening validates every magic and record bound
    let reader = open(archive)?;
    let entries = reader.entries();

    let dense = Layout::compute(entries.iter().map(|entry| u64::from(entry.length)))
        .map(|layout| {
            entries
                .iter()
                .zip(layout.offsets())
                .all(|(entry, &offset)| entry.offset == offset)
                && u64::from(layout.total_size()) == reader.image_len()
        })
        .unwrap_or(false);

    println!("Status: VALID initrd image");
    println!("Files: {}", entries.len());
    println!(
        "Header region: {} bytes",
        Layout::header_region_size_for(entries.len())
    );
    println!("Image size: {} bytes", reader.image_len());
    println!("Layout: {}", if dense { "contiguous" } else { "non-contiguous" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use initrd_core::encode_to_vec;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("initrd.img");
        fs::write(
            &archive,
            encode_to_vec(&[("hosts", "127.0.0.1 localhost\n"), ("empty", "")]).unwrap(),
        )
        .unwrap();

        let out = dir.path().join("out");
        extract_archive(&archive, &out).unwrap();
        assert_eq!(
            fs::read(out.join("hosts")).unwrap(),
            b"127.0.0.1 localhost\n"
        );
        assert_eq!(fs::read(out.join("empty")).unwrap(), b"");
    }

    #[test]
    fn refuses_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("initrd.img");
        fs::write(&archive, encode_to_vec(&[("../escape", "x")]).unwrap()).unwrap();

        let out = dir.path().join("out");
        assert!(extract_archive(&archive, &out).is_err());
        assert!(!dir.path().join("escape").exists());
    }

    #[test]
    fn corrupt_image_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bogus.img");
        fs::write(&archive, b"not an image").unwrap();

        assert!(inspect_archive(&archive).is_err());
        assert!(list_archive(&archive).is_err());
    }
}
