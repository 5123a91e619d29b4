use std::io::Cursor;

use initrd_core::{
    encode_to_vec, InitrdError, InitrdImage, InitrdReader, InitrdWriter, InputEntry, Layout,
    ARCHIVE_HEADER_SIZE, FILE_HEADER_SIZE,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn single_text_file() {
    let bytes = encode_to_vec(&[("a.txt", "hi")]).unwrap();
    let image = InitrdImage::parse(&bytes).unwrap();

    assert_eq!(image.len(), 1);
    let entry = image.find("a.txt").unwrap();
    assert_eq!(entry.length, 2);
    assert_eq!(
        entry.offset as usize,
        ARCHIVE_HEADER_SIZE + FILE_HEADER_SIZE
    );
    assert_eq!(image.content(entry), b"hi");
}

#[test]
fn adjacent_offsets_differ_by_length() {
    let first = vec![0xAA; 10];
    let second = vec![0xBB; 20];
    let bytes = encode_to_vec(&[("first", &first), ("second", &second)]).unwrap();
    let image = InitrdImage::parse(&bytes).unwrap();

    let entries = image.entries();
    assert_eq!(entries[1].offset - entries[0].offset, 10);
    assert_eq!(image.content(&entries[1]), second.as_slice());
}

#[test]
fn empty_input_decodes_as_zero_entries() {
    let files: [(&str, &[u8]); 0] = [];
    let bytes = encode_to_vec(&files).unwrap();
    assert_eq!(bytes.len(), ARCHIVE_HEADER_SIZE);

    let image = InitrdImage::parse(&bytes).unwrap();
    assert!(image.is_empty());

    let reader = InitrdReader::open(Cursor::new(bytes)).unwrap();
    assert!(reader.entries().is_empty());
}

#[test]
fn name_length_boundary() {
    let exact = "e".repeat(64);
    let bytes = encode_to_vec(&[(exact.as_str(), "ok")]).unwrap();
    let image = InitrdImage::parse(&bytes).unwrap();
    assert_eq!(image.file(&exact).unwrap(), b"ok");

    let over = "o".repeat(65);
    let err = encode_to_vec(&[(over.as_str(), "no")]).unwrap_err();
    assert!(matches!(err, InitrdError::NameTooLong { index: 0, length: 65, .. }));
}

#[test]
fn zero_byte_names_never_shadow_other_entries() {
    let err = encode_to_vec(&[("a\0b", "x"), ("a", "y")]).unwrap_err();
    assert!(matches!(err, InitrdError::NulInName { index: 0, .. }));

    let bytes = encode_to_vec(&[("ab", "x"), ("a", "y")]).unwrap();
    let image = InitrdImage::parse(&bytes).unwrap();
    assert_eq!(image.file("a").unwrap(), b"y");
    assert_eq!(image.find("a").unwrap().index, 1);
}

#[test]
fn empty_files_are_addressable() {
    let bytes = encode_to_vec(&[("empty", ""), ("full", "data"), ("tail", "")]).unwrap();
    let image = InitrdImage::parse(&bytes).unwrap();

    assert_eq!(image.file("empty").unwrap(), b"");
    assert_eq!(image.file("full").unwrap(), b"data");
    assert_eq!(image.find("tail").unwrap().offset as usize, bytes.len());
}

#[test]
fn streamed_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("initrd.img");

    let entries = vec![
        InputEntry::from_bytes("init", b"\x7fELF".as_slice()),
        InputEntry::from_bytes("fstab", b"none / tmpfs\n".as_slice()),
    ];
    let writer = InitrdWriter::new(entries).unwrap();
    let summary = writer
        .write_to(std::fs::File::create(&path).unwrap())
        .unwrap();
    assert_eq!(summary.file_count, 2);
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        u64::from(summary.total_size)
    );

    let mut reader = InitrdReader::open_path(&path).unwrap();
    assert_eq!(reader.read_file("fstab").unwrap(), b"none / tmpfs\n");
    assert_eq!(reader.read_file("init").unwrap(), b"\x7fELF");
}

fn file_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._-]{1,64}"
}

fn file_list() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    prop::collection::vec(
        (file_name(), prop::collection::vec(any::<u8>(), 0..256)),
        0..12,
    )
}

proptest! {
    #[test]
    fn layout_offsets_are_prefix_sums(sizes in prop::collection::vec(0u64..10_000, 0..32)) {
        let layout = Layout::compute(sizes.iter().copied()).unwrap();
        let mut expected = Layout::header_region_size_for(sizes.len());
        for (index, size) in sizes.iter().enumerate() {
            prop_assert_eq!(u64::from(layout.offset(index).unwrap()), expected);
            expected += size;
        }
        prop_assert_eq!(u64::from(layout.total_size()), expected);
    }

    #[test]
    fn encode_decode_identity(files in file_list()) {
        let bytes = encode_to_vec(&files).unwrap();

        let image = InitrdImage::parse(&bytes).unwrap();
        prop_assert_eq!(image.len(), files.len());
        for (entry, (name, content)) in image.entries().iter().zip(&files) {
            prop_assert_eq!(entry.name.as_str(), name.as_str());
            prop_assert_eq!(image.content(entry), content.as_slice());
        }

        let mut reader = InitrdReader::open(Cursor::new(bytes.clone())).unwrap();
        let entries = reader.entries().to_vec();
        for (entry, (_, content)) in entries.iter().zip(&files) {
            prop_assert_eq!(&reader.read_entry(entry).unwrap(), content);
        }
    }

    #[test]
    fn encoding_is_deterministic(files in file_list()) {
        let first = encode_to_vec(&files).unwrap();
        let second = encode_to_vec(&files).unwrap();
        prop_assert_eq!(first, second);
    }
}
