use std::io::Cursor;

use xzip::{CompressionMethod, SortOrder, XzipArchive};

// This test asserts that after building an archive, then reading its
// contents back out, the extracted data is exactly the original data.
#[test]
fn minimal_round_trip() {
    let mut archive = XzipArchive::new();
    archive
        .add_buffer("hello.txt", b"hi\n", false, CompressionMethod::Stored)
        .unwrap();

    // 30 (local header) + 9 (name) + 3 (payload) + 46 + 9 + 22 + 10
    assert_eq!(archive.calculate_size(), 129);

    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 129);

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&bytes).unwrap();
    assert_eq!(reopened.len(), 1);

    let entry = reopened.entries().next().unwrap();
    assert_eq!(entry.file_name, "hello.txt");
    assert_eq!(entry.uncompressed_size, 3);
    assert_eq!(entry.crc32, crc32("hi\n".as_bytes()));
    assert_eq!(reopened.read_file("hello.txt", false).unwrap(), b"hi\n");
}

#[test]
fn text_mode_expands_line_endings() {
    let mut archive = XzipArchive::new();
    archive
        .add_buffer("a.cfg", b"x\ny\n", true, CompressionMethod::Stored)
        .unwrap();

    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&bytes).unwrap();
    let entry = reopened.entries().next().unwrap();
    assert_eq!(entry.uncompressed_size, 6);
    assert_eq!(entry.crc32, crc32(b"x\r\ny\r\n"));
    assert_eq!(reopened.read_file("a.cfg", false).unwrap(), b"x\r\ny\r\n");
    assert_eq!(reopened.read_file("a.cfg", true).unwrap(), b"x\ny\n");
}

#[test]
fn aligned_payloads_start_on_boundaries() {
    let mut archive = XzipArchive::new();
    archive.force_alignment(true, true, 2048);
    archive.add_buffer("a", &[0x11; 10], false, CompressionMethod::Stored).unwrap();
    archive.add_buffer("b", &[0x22; 10], false, CompressionMethod::Stored).unwrap();

    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();
    assert_eq!(archive.calculate_size() as usize, bytes.len());

    // first payload on the first boundary, second on the next
    assert_eq!(&bytes[2048..2058], &[0x11; 10]);
    assert_eq!(&bytes[4096..4106], &[0x22; 10]);
    assert_eq!(&bytes[bytes.len() - 10..bytes.len() - 1], b"XZP1 2048");

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&bytes).unwrap();
    assert_eq!(reopened.read_file("a", false).unwrap(), vec![0x11; 10]);
    assert_eq!(reopened.read_file("b", false).unwrap(), vec![0x22; 10]);
}

#[test]
fn compact_format_is_smaller_and_tagged_xzp2() {
    let build = |compatible: bool| {
        let mut archive = XzipArchive::new();
        archive.force_alignment(true, compatible, 2048);
        archive.add_buffer("a", &[0x11; 10], false, CompressionMethod::Stored).unwrap();
        archive.add_buffer("b", &[0x22; 10], false, CompressionMethod::Stored).unwrap();
        let mut bytes = Vec::new();
        archive.save_to_buffer(&mut bytes).unwrap();
        assert_eq!(archive.calculate_size() as usize, bytes.len());
        bytes
    };

    let compatible = build(true);
    let compact = build(false);
    assert!(compact.len() < compatible.len());
    assert_eq!(&compact[compact.len() - 10..compact.len() - 1], b"XZP2 2048");

    // local headers still pad, so payload offsets are unchanged
    assert_eq!(&compact[2048..2058], &[0x11; 10]);
    assert_eq!(&compact[4096..4106], &[0x22; 10]);

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&compact).unwrap();
    assert!(!reopened.is_compatible_format());
    assert_eq!(reopened.read_file("b", false).unwrap(), vec![0x22; 10]);
}

#[test]
fn lzma_entry_round_trips_with_zip_framing() {
    let data: Vec<u8> = (0..65536u32).map(|i| (i / 7) as u8).collect();

    let mut archive = XzipArchive::new();
    archive
        .add_buffer("big.bin", &data, false, CompressionMethod::Lzma)
        .unwrap();

    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&bytes).unwrap();

    let entry = reopened.entries().next().unwrap();
    assert_eq!(entry.compression_method, CompressionMethod::Lzma);
    assert_eq!(entry.uncompressed_size, data.len() as u32);
    match &entry.payload {
        xzip::PayloadLocation::InMemory(payload) => {
            // ZIP 5.8.8 framing: version, props length (5, LE), props
            assert_eq!(&payload[2..4], &[0x05, 0x00]);
            assert!(payload.len() >= 9);
        }
        other => panic!("unexpected payload location: {other:?}"),
    }

    let restored = reopened.read_file("big.bin", false).unwrap();
    assert_eq!(restored, data);
    assert_eq!(entry.crc32, crc32(&data));
}

#[test]
fn non_ascii_name_bytes_round_trip_exactly() {
    let mut archive = XzipArchive::new();
    archive.add_buffer("Bäd.txt", b"data", false, CompressionMethod::Stored).unwrap();

    let mut first = Vec::new();
    archive.save_to_buffer(&mut first).unwrap();

    // only ASCII letters fold; the non-ASCII bytes land on disk verbatim
    let wire_name = "bäd.txt".as_bytes();
    assert_eq!(&first[30..30 + wire_name.len()], wire_name);

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&first).unwrap();
    assert!(reopened.file_exists("Bäd.txt"));
    assert_eq!(reopened.read_file("bäd.txt", false).unwrap(), b"data");

    // names listed by the directory resolve as-is, too
    let listed = reopened.entries().next().unwrap().file_name.clone();
    assert_eq!(reopened.read_file(&listed, false).unwrap(), b"data");

    let mut second = Vec::new();
    reopened.save_to_buffer(&mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn names_differing_only_in_case_collapse() {
    let mut archive = XzipArchive::new();
    archive.add_buffer("X", b"AAAA", false, CompressionMethod::Stored).unwrap();
    archive.add_buffer("x", b"BB", false, CompressionMethod::Stored).unwrap();

    assert_eq!(archive.len(), 1);
    let entry = archive.entries().next().unwrap();
    assert_eq!(entry.file_name, "x");
    assert_eq!(archive.read_file("X", false).unwrap(), b"BB");
}

#[test]
fn empty_archive_is_trailer_only() {
    let mut archive = XzipArchive::new();
    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 32);
    assert_eq!(archive.calculate_size(), 32);

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&bytes).unwrap();
    assert!(reopened.is_empty());
}

#[test]
fn zero_length_entry_is_kept_but_not_serialized() {
    let mut archive = XzipArchive::new();
    archive.add_buffer("empty.txt", b"", false, CompressionMethod::Stored).unwrap();
    assert!(archive.file_exists("empty.txt"));

    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 32);

    // the round trip loses the empty entry
    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&bytes).unwrap();
    assert!(!reopened.file_exists("empty.txt"));
}

#[test]
fn alignment_of_one_is_equivalent_to_none() {
    let build = |alignment: u32| {
        let mut archive = XzipArchive::new();
        archive.force_alignment(alignment != 0, true, alignment);
        archive.add_buffer("f", b"1234567", false, CompressionMethod::Stored).unwrap();
        let mut bytes = Vec::new();
        archive.save_to_buffer(&mut bytes).unwrap();
        bytes
    };

    let unaligned = build(0);
    let aligned_one = build(1);
    // identical apart from the alignment digit in the comment
    assert_eq!(unaligned.len(), aligned_one.len());
    assert_eq!(unaligned[..unaligned.len() - 10], aligned_one[..aligned_one.len() - 10]);
}

#[test]
fn plain_zip_without_comment_still_opens() {
    // build a trailer-only archive, strip the comment and zero its length
    let mut archive = XzipArchive::new();
    archive.force_alignment(true, false, 512);
    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();
    bytes.truncate(22);
    bytes[20] = 0;
    bytes[21] = 0;

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&bytes).unwrap();
    assert!(reopened.is_empty());
    // no comment means the defaults stand
    assert!(reopened.is_compatible_format());
}

#[test]
fn big_endian_archives_round_trip() {
    let mut archive = XzipArchive::new();
    archive.set_big_endian(true);
    archive.add_buffer("be.bin", b"payload", false, CompressionMethod::Stored).unwrap();

    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();
    assert_eq!(archive.calculate_size() as usize, bytes.len());
    // the local header signature is byteswapped on disk
    assert_eq!(&bytes[..4], &[0x04, 0x03, 0x4b, 0x50]);

    let mut reopened = XzipArchive::new();
    reopened.set_big_endian(true);
    reopened.open_from_buffer(&bytes).unwrap();
    assert_eq!(reopened.read_file("be.bin", false).unwrap(), b"payload");
}

#[test]
fn save_open_save_is_byte_identical() {
    let mut archive = XzipArchive::new();
    archive.force_alignment(true, true, 512);
    archive.add_buffer("one.txt", b"first file", false, CompressionMethod::Stored).unwrap();
    archive.add_buffer("two.txt", b"second file", false, CompressionMethod::Stored).unwrap();

    let mut first = Vec::new();
    archive.save_to_buffer(&mut first).unwrap();

    // the reopening archive takes alignment and format from the comment
    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&first).unwrap();
    let mut second = Vec::new();
    reopened.save_to_buffer(&mut second).unwrap();

    assert_eq!(first, second);
}

#[test]
fn save_to_disk_matches_save_to_buffer() {
    let mut archive = XzipArchive::new();
    archive.add_buffer("f.txt", b"same bytes", false, CompressionMethod::Stored).unwrap();

    let mut buffer = Vec::new();
    archive.save_to_buffer(&mut buffer).unwrap();

    let mut cursor = Cursor::new(Vec::new());
    archive.save_to_disk(&mut cursor).unwrap();
    assert_eq!(cursor.into_inner(), buffer);
}

#[test]
fn disk_cache_produces_identical_output() {
    let dir = tempfile::tempdir().unwrap();

    let mut cached =
        XzipArchive::with_disk_cache(SortOrder::ByName, Some(dir.path())).unwrap();
    let mut plain = XzipArchive::new();
    for (name, data) in [("a.txt", &b"alpha"[..]), ("b.txt", &b"bravo"[..])] {
        cached.add_buffer(name, data, false, CompressionMethod::Stored).unwrap();
        plain.add_buffer(name, data, false, CompressionMethod::Stored).unwrap();
    }

    let mut from_cache = Vec::new();
    cached.save_to_buffer(&mut from_cache).unwrap();
    let mut from_memory = Vec::new();
    plain.save_to_buffer(&mut from_memory).unwrap();
    assert_eq!(from_cache, from_memory);

    // saving draws from the cache without consuming it
    let mut again = Vec::new();
    cached.save_to_buffer(&mut again).unwrap();
    assert_eq!(again, from_memory);
}

#[test]
fn open_from_disk_reads_lazily() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lazy.xzp");

    let mut archive = XzipArchive::new();
    archive.add_buffer("maps/de_dust.bsp", b"geometry", false, CompressionMethod::Stored).unwrap();
    archive.add_buffer("ignored", b"", false, CompressionMethod::Stored).unwrap();
    archive.save_to_disk(std::fs::File::create(&path).unwrap()).unwrap();

    let mut mounted = XzipArchive::new();
    let mut source = mounted.open_from_disk(&path).unwrap();
    assert_eq!(mounted.len(), 1);

    let entry = mounted.entries().next().unwrap();
    assert!(matches!(entry.payload, xzip::PayloadLocation::SourceArchive(_)));

    // without the handle the payload is unreachable, but the name exists
    let err = mounted.read_file("maps/de_dust.bsp", false).unwrap_err();
    assert!(matches!(err, xzip::XzipError::PayloadUnavailable));
    let data = mounted
        .read_file_from(&mut source, "maps/de_dust.bsp", false)
        .unwrap();
    assert_eq!(data, b"geometry");
}

#[test]
fn clear_returns_to_a_usable_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut archive =
        XzipArchive::with_disk_cache(SortOrder::CaselessByName, Some(dir.path())).unwrap();
    archive.add_buffer("a", b"data", false, CompressionMethod::Stored).unwrap();
    archive.clear().unwrap();
    assert!(archive.is_empty());

    archive.add_buffer("b", b"more", false, CompressionMethod::Stored).unwrap();
    let mut bytes = Vec::new();
    archive.save_to_buffer(&mut bytes).unwrap();

    let mut reopened = XzipArchive::new();
    reopened.open_from_buffer(&bytes).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.read_file("b", false).unwrap(), b"more");
}

#[test]
fn garbage_input_leaves_the_archive_empty() {
    let mut archive = XzipArchive::new();
    archive.add_buffer("pre", b"existing", false, CompressionMethod::Stored).unwrap();

    assert!(archive.open_from_buffer(&[0x5a; 100]).is_err());
    assert!(archive.is_empty());
}

fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
