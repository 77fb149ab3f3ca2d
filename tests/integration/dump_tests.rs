//! Directory listing integration tests.
//!
//! Tests verify:
//! - Every directory of a chain is listed in order
//! - Values are rendered per data type and cut at the value limit
//! - The JSON report carries the same information as the text one

use tiff_tag_codec::{
    dump_stream, ByteOrder, Directory, DirectoryLayout, FreeBlock, Rational, TagInfo, TiffHeader,
    TiffStream,
};

use super::test_utils::{all_layouts, empty_file, shorts, MemoryStream, RawTiffBuilder};

/// Two-page file: a full-resolution page followed by a thumbnail.
fn two_page_file(layout: DirectoryLayout) -> MemoryStream {
    let info = TagInfo::baseline();
    let mut stream = empty_file(layout);

    let mut thumbnail = Directory::new(layout);
    thumbnail.set_values::<u32>(&info, 254, &[1]).unwrap();
    thumbnail.set_values::<u32>(&info, 256, &[32]).unwrap();
    thumbnail.set_values::<u32>(&info, 257, &[24]).unwrap();
    let thumbnail_offset = thumbnail.write(&mut stream).unwrap();

    let mut page = Directory::new(layout);
    page.set_values::<u32>(&info, 256, &[1024]).unwrap();
    page.set_values::<u32>(&info, 257, &[768]).unwrap();
    page.set_values::<u16>(&info, 258, &[8, 8, 8]).unwrap();
    page.set_values(&info, 283, &[Rational::new(300, 1)]).unwrap();
    page.set_ascii(&info, 306, "2024:01:02 03:04:05").unwrap();
    page.set_values::<u8>(&info, 347, &[0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
    page.store_free_blocks(&info, &[FreeBlock { offset: 2, size: 6 }])
        .unwrap();
    page.set_next_offset(thumbnail_offset);
    let page_offset = page.write(&mut stream).unwrap();

    TiffHeader::new(layout, page_offset).write(&mut stream).unwrap();
    stream
}

#[test]
fn test_dump_walks_chain() {
    let info = TagInfo::baseline();
    for layout in all_layouts() {
        let mut stream = two_page_file(layout);
        let report = dump_stream(&mut stream, &info, 8).unwrap();

        assert_eq!(report.bigtiff, layout.is_bigtiff);
        assert_eq!(report.directories.len(), 2, "{:?}", layout);
        assert_eq!(report.directories[0].next_offset, report.directories[1].offset);
        assert_eq!(report.directories[1].next_offset, 0);

        let page: Vec<&str> = report.directories[0]
            .entries
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(
            page,
            vec![
                "ImageWidth",
                "ImageLength",
                "BitsPerSample",
                "YResolution",
                "FreeOffsets",
                "FreeByteCounts",
                "DateTime",
                "JPEGTables",
            ]
        );
        assert_eq!(report.directories[1].entries[0].name, "NewSubfileType");
        assert_eq!(report.free_blocks, vec![FreeBlock { offset: 2, size: 6 }]);
        assert_eq!(report.free_bytes, 6);
    }
}

#[test]
fn test_dump_renders_values_by_type() {
    let layout = DirectoryLayout::classic(ByteOrder::BigEndian);
    let mut stream = two_page_file(layout);
    let report = dump_stream(&mut stream, &TagInfo::baseline(), 2).unwrap();
    let entries = &report.directories[0].entries;

    let find = |tag: u16| entries.iter().find(|entry| entry.tag == tag).unwrap();

    let bits = find(258);
    assert_eq!(bits.values, vec!["8", "8"]);
    assert!(bits.truncated);
    assert!(!bits.inline);

    assert_eq!(find(283).values, vec!["300/1"]);
    assert_eq!(find(283).data_type, "RATIONAL");

    let date = find(306);
    assert_eq!(date.count, 20);
    assert_eq!(date.values, vec!["\"2024:01:02 03:04:05\""]);
    assert!(!date.truncated);

    let tables = find(347);
    assert_eq!(tables.values, vec!["0xFF", "0xD8"]);
    assert!(tables.inline);
    assert_eq!(tables.offset, None);
}

#[test]
fn test_dump_text_and_json_agree() {
    let layout = DirectoryLayout::bigtiff(ByteOrder::LittleEndian);
    let mut stream = two_page_file(layout);
    let report = dump_stream(&mut stream, &TagInfo::baseline(), 8).unwrap();

    let text = report.to_string();
    assert!(text.contains("Directory 0 at offset"));
    assert!(text.contains("Directory 1 at offset"));
    assert!(text.contains("DateTime"));
    assert!(text.ends_with("BytesTotal in Freeblocks: 6"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["bigtiff"], true);
    assert_eq!(json["byte_order"], "little-endian");
    assert_eq!(json["directories"].as_array().unwrap().len(), 2);
    assert_eq!(json["directories"][0]["entries"][0]["values"][0], "1024");
    assert_eq!(json["free_bytes"], 6);
}

#[test]
fn test_dump_of_hand_built_file() {
    let layout = DirectoryLayout::classic(ByteOrder::LittleEndian);
    let mut builder = RawTiffBuilder::new(layout);
    builder
        .entry(256, 3, 1, &shorts(layout, &[100]))
        // Unknown type code, dropped from the listing
        .entry(262, 42, 1, &[]);
    let mut stream = TiffStream::in_memory(builder.build());

    let report = dump_stream(&mut stream, &TagInfo::baseline(), 8).unwrap();
    let entries = &report.directories[0].entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].data_type, "SHORT");
    assert_eq!(entries[0].values, vec!["100"]);
}

#[test]
fn test_dump_rejects_non_tiff() {
    let mut stream = TiffStream::in_memory(b"GIF89a, not a tiff at all".to_vec());
    assert!(dump_stream(&mut stream, &TagInfo::baseline(), 8).is_err());
}
