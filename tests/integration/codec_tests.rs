//! Entry codec integration tests.
//!
//! Tests verify:
//! - Every data type survives a write/read cycle in all four layouts
//! - Inline values stay in the record, larger ones move out of line
//! - ASCII values always end with a NUL after reading
//! - Byte swapping of foreign-order payloads happens exactly once
//! - Fixed counts are enforced on both the read and write path
//! - Free-block lists sitting in freed space are relocated

use std::fmt::Debug;

use tiff_tag_codec::{
    Access, ByteOrder, DataType, DirectoryLayout, FreeBlock, Rational, SRational, TagElement,
    TagEntryCodec, TagError, TagInfo, TagStream, TiffStream,
};

use super::test_utils::{
    all_layouts, empty_file, longs, raw_record, read_entry, shorts, single_tag_info,
    swapped_layout, write_entry, TEST_TAG,
};

fn round_trip<T>(data_types: &'static [DataType], values: &[T])
where
    T: TagElement + PartialEq + Debug,
{
    let info = single_tag_info(data_types);
    for layout in all_layouts() {
        let mut stream = empty_file(layout);
        let mut codec = TagEntryCodec::with_tag(&info, TEST_TAG, layout);
        codec.set_values(values).unwrap();
        let at = write_entry(&mut codec, &mut stream);

        let mut read = read_entry(&mut stream, &info, layout, at);
        assert_eq!(read.data_type(), Some(data_types[0]), "{:?}", layout);
        assert_eq!(read.count(), values.len() as u64, "{:?}", layout);
        assert_eq!(read.get_values::<T>().unwrap(), values, "{:?}", layout);
    }
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_round_trip_byte_types() {
    round_trip(&[DataType::Byte], &[0u8, 1, 127, 255]);
    round_trip(&[DataType::Byte], &[1u8, 2, 3, 4, 5, 6, 7, 8, 9]);
    round_trip(&[DataType::Undefined], &[0xFFu8, 0xD8, 0xFF, 0xDB, 0x00, 0x43]);
    round_trip(&[DataType::SByte], &[-128i8, -1, 0, 1, 127]);
}

#[test]
fn test_round_trip_short_types() {
    round_trip(&[DataType::Short], &[0x1234u16]);
    round_trip(&[DataType::Short], &[1u16, 2, 3, 4, 5, 0xFFFF]);
    round_trip(&[DataType::SShort], &[-2i16, 300]);
    round_trip(&[DataType::SShort], &[i16::MIN, -1, 0, 1, i16::MAX]);
}

#[test]
fn test_round_trip_long_types() {
    round_trip(&[DataType::Long], &[0xDEAD_BEEFu32]);
    round_trip(&[DataType::Long], &[1u32, 65536, u32::MAX]);
    round_trip(&[DataType::Ifd], &[8u32, 1024]);
    round_trip(&[DataType::SLong], &[-70000i32, 70000]);
    round_trip(&[DataType::Float], &[1.5f32]);
    round_trip(&[DataType::Float], &[-0.25f32, 3.0, 1e-3]);
}

#[test]
fn test_round_trip_eight_byte_types() {
    round_trip(&[DataType::Double], &[std::f64::consts::PI]);
    round_trip(&[DataType::Double], &[0.5f64, -2.0, 1e10]);
    round_trip(&[DataType::Long64], &[0x0102_0304_0506_0708u64]);
    round_trip(&[DataType::Long64], &[1u64 << 40, 3]);
    round_trip(&[DataType::SLong64], &[-1i64, i64::MAX]);
    round_trip(&[DataType::Ifd64], &[16u64, 4096]);
    round_trip(&[DataType::Rational], &[Rational::new(72, 1)]);
    round_trip(&[DataType::Rational], &[Rational::new(1, 3), Rational::new(300, 2)]);
    round_trip(&[DataType::SRational], &[SRational::new(-1, 4)]);
}

#[test]
fn test_round_trip_ascii() {
    let info = single_tag_info(&[DataType::Ascii]);
    for layout in all_layouts() {
        for text in ["", "a", "abc", "seven c", "a longer description"] {
            let mut stream = empty_file(layout);
            let mut codec = TagEntryCodec::with_tag(&info, TEST_TAG, layout);
            codec.set_ascii(text).unwrap();
            let at = write_entry(&mut codec, &mut stream);

            let mut read = read_entry(&mut stream, &info, layout, at);
            assert_eq!(read.count(), text.len() as u64 + 1);
            assert_eq!(read.get_ascii().unwrap().to_str().unwrap(), text);
        }
    }
}

#[test]
fn test_round_trip_wide_string() {
    let info = single_tag_info(&[DataType::AsciiW]);
    for layout in all_layouts() {
        for text in ["é", "Grüße aus Köln"] {
            let mut stream = empty_file(layout);
            let mut codec = TagEntryCodec::with_tag(&info, TEST_TAG, layout);
            codec.set_wide_string(text).unwrap();
            let at = write_entry(&mut codec, &mut stream);

            let mut read = read_entry(&mut stream, &info, layout, at);
            assert_eq!(read.data_type(), Some(DataType::AsciiW));
            assert_eq!(read.get_wide_string().unwrap(), text);
            assert_eq!(read.get_string().unwrap(), text);
        }
    }
}

// =============================================================================
// Example Scenarios
// =============================================================================

#[test]
fn test_image_width_is_inline() {
    let info = TagInfo::baseline();
    for layout in all_layouts() {
        let mut stream = empty_file(layout);
        let size_before = stream.size();

        let mut codec = TagEntryCodec::with_tag(&info, 0x0100, layout);
        assert_eq!(codec.data_type(), Some(DataType::Long));
        codec.set_value(4096u32).unwrap();

        codec.write_data(&mut stream).unwrap();
        assert_eq!(stream.size(), size_before, "inline value must not allocate");

        let record = codec.encode_record().unwrap();
        let field = &record[record.len() - layout.value_offset_size()..];
        let expected: &[u8] = match layout.byte_order {
            ByteOrder::LittleEndian => &[0x00, 0x10, 0x00, 0x00],
            ByteOrder::BigEndian => &[0x00, 0x00, 0x10, 0x00],
        };
        assert_eq!(&field[..4], expected);
        assert!(field[4..].iter().all(|&byte| byte == 0));

        let at = write_entry(&mut codec, &mut stream);
        let mut read = read_entry(&mut stream, &info, layout, at);
        assert_eq!(read.get_value::<u32>(), Some(4096));
        assert!(read.is_stored_inline());
    }
}

#[test]
fn test_ascii_abc_scenario() {
    let info = TagInfo::baseline();
    for layout in all_layouts() {
        let mut stream = empty_file(layout);
        let mut codec = TagEntryCodec::with_tag(&info, 305, layout);
        codec.set_ascii("abc").unwrap();
        assert_eq!(codec.count(), 4);
        assert_eq!(codec.raw_bytes().unwrap(), b"abc\0");

        let at = write_entry(&mut codec, &mut stream);
        let mut read = read_entry(&mut stream, &info, layout, at);
        assert_eq!(read.count(), 4);
        assert_eq!(read.raw_bytes().unwrap(), b"abc\0");
    }
}

// =============================================================================
// Inline Threshold
// =============================================================================

#[test]
fn test_bigtiff_short_inline_threshold() {
    let info = TagInfo::baseline();
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let layout = DirectoryLayout::bigtiff(order);
        for count in 1..=5u16 {
            let values: Vec<u16> = (1..=count).collect();
            let mut stream = empty_file(layout);
            let mut codec = TagEntryCodec::with_tag(&info, 320, layout);
            codec.set_values(&values).unwrap();
            let at = write_entry(&mut codec, &mut stream);

            let mut read = read_entry(&mut stream, &info, layout, at);
            if count <= 4 {
                assert!(read.is_stored_inline(), "count {}", count);
            } else {
                assert!(!read.is_stored_inline(), "count {}", count);
                assert_ne!(read.offset(), 0);
                assert_eq!(read.offset(), codec.offset());
            }
            assert_eq!(read.get_values::<u16>().unwrap(), values);
        }
    }
}

#[test]
fn test_classic_threshold_is_four_bytes() {
    let info = TagInfo::baseline();
    let layout = DirectoryLayout::classic(ByteOrder::LittleEndian);

    let mut codec = TagEntryCodec::with_tag(&info, 320, layout);
    codec.set_values(&[1u16, 2]).unwrap();
    assert!(codec.is_stored_inline());

    codec.set_values(&[1u16, 2, 3]).unwrap();
    assert!(!codec.is_stored_inline());
    assert!(codec.is_pending_resize());
}

// =============================================================================
// ASCII Terminator
// =============================================================================

#[test]
fn test_unterminated_ascii_inline() {
    let info = TagInfo::baseline();
    for layout in all_layouts() {
        let mut stream = empty_file(layout);
        let record = raw_record(layout, 305, 2, 3, b"abc");
        let at = stream.check_alloc(0, 0, record.len() as u64);
        stream.seek(at).unwrap();
        stream.write_all(&record).unwrap();

        let mut codec = read_entry(&mut stream, &info, layout, at);
        assert_eq!(codec.count(), 3);
        assert_eq!(codec.store().unwrap().data().last(), Some(&0));
        assert_eq!(codec.get_ascii().unwrap().to_str().unwrap(), "abc");
    }
}

#[test]
fn test_unterminated_ascii_out_of_line() {
    let info = TagInfo::baseline();
    for layout in all_layouts() {
        let mut stream = empty_file(layout);
        let text = b"no terminator here";
        let data_at = stream.check_alloc(0, 0, text.len() as u64);
        stream.seek(data_at).unwrap();
        stream.write_all(text).unwrap();

        let field = match (layout.is_bigtiff, layout.byte_order) {
            (true, ByteOrder::LittleEndian) => data_at.to_le_bytes().to_vec(),
            (true, ByteOrder::BigEndian) => data_at.to_be_bytes().to_vec(),
            (false, _) => longs(layout, &[data_at as u32]),
        };
        let record = raw_record(layout, 270, 2, text.len() as u64, &field);
        let at = stream.check_alloc(0, 0, record.len() as u64);
        stream.seek(at).unwrap();
        stream.write_all(&record).unwrap();

        let mut codec = read_entry(&mut stream, &info, layout, at);
        assert_eq!(codec.count(), text.len() as u64);
        assert_eq!(codec.store().unwrap().data().last(), Some(&0));
        assert_eq!(
            codec.get_ascii().unwrap().to_bytes(),
            b"no terminator here"
        );
    }
}

// =============================================================================
// Byte Swapping
// =============================================================================

#[test]
fn test_getter_swaps_once() {
    let info = TagInfo::baseline();
    for is_bigtiff in [false, true] {
        let layout = swapped_layout(is_bigtiff);
        let mut stream = empty_file(layout);
        let mut codec = TagEntryCodec::with_tag(&info, 320, layout);
        codec.set_values(&[0x0102u16, 0x0304, 0x0506, 0x0708, 0x090A]).unwrap();
        let at = write_entry(&mut codec, &mut stream);

        let mut read = read_entry(&mut stream, &info, layout, at);
        assert!(read.needs_byte_swap());

        let first = read.get_values::<u16>().unwrap();
        assert!(!read.needs_byte_swap());
        let second = read.get_values::<u16>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec![0x0102, 0x0304, 0x0506, 0x0708, 0x090A]);
    }
}

#[test]
fn test_swap_data_twice_restores_bytes() {
    let info = TagInfo::baseline();
    let layout = DirectoryLayout::classic(ByteOrder::host());
    let mut codec = TagEntryCodec::with_tag(&info, 282, layout);
    codec.set_value(Rational::new(300, 7)).unwrap();
    let original = codec.store().unwrap().data().to_vec();

    codec.swap_data();
    assert_ne!(codec.store().unwrap().data(), original.as_slice());
    codec.swap_data();
    assert_eq!(codec.store().unwrap().data(), original.as_slice());
}

#[test]
fn test_foreign_order_payload_on_disk() {
    let info = TagInfo::baseline();
    let layout = DirectoryLayout::classic(ByteOrder::BigEndian);
    let mut stream = empty_file(layout);

    let mut codec = TagEntryCodec::with_tag(&info, 320, layout);
    codec.set_values(&[1u16, 2, 3]).unwrap();
    codec.write_data(&mut stream).unwrap();

    let offset = codec.offset() as usize;
    assert_eq!(&stream.bytes()[offset..offset + 6], shorts(layout, &[1, 2, 3]).as_slice());
    // In-memory value is still host order
    assert_eq!(codec.get_values::<u16>().unwrap(), vec![1, 2, 3]);
}

// =============================================================================
// Count Validation
// =============================================================================

#[test]
fn test_fixed_count_rejects_wrong_write() {
    let info = TagInfo::baseline();
    let layout = DirectoryLayout::classic(ByteOrder::LittleEndian);
    let mut codec = TagEntryCodec::with_tag(&info, 297, layout);

    let result = codec.set_values(&[1u16, 2, 3]);
    assert!(matches!(
        result,
        Err(TagError::IncorrectCountForTagWritten {
            count: 3,
            expected: 2,
            ..
        })
    ));
    assert!(codec.last_error().is_some());

    codec.set_values(&[1u16, 4]).unwrap();
    assert_eq!(codec.get_pair::<u16>(), Some((1, 4)));
}

#[test]
fn test_fixed_count_rejects_wrong_read() {
    let info = TagInfo::baseline();
    for layout in all_layouts() {
        let mut stream = empty_file(layout);
        let record = raw_record(layout, 297, 3, 3, &[]);
        let at = stream.check_alloc(0, 0, record.len() as u64);
        stream.seek(at).unwrap();
        stream.write_all(&record).unwrap();
        stream.seek(at).unwrap();

        let mut codec = TagEntryCodec::new(layout);
        let result = codec.read_tag_entry(&mut stream, &info);
        assert!(matches!(
            result,
            Err(TagError::IncorrectCountForTagRead {
                count: 3,
                expected: 2,
                ..
            })
        ));
        assert!(!codec.has_value());
    }
}

#[test]
fn test_validate_data_len_open_count() {
    let info = TagInfo::baseline();
    let layout = DirectoryLayout::classic(ByteOrder::LittleEndian);
    let mut codec = TagEntryCodec::with_tag(&info, 273, layout);

    assert!(codec.validate_data_len(17, Access::Read).is_ok());
    assert!(codec.validate_data_len(9, Access::Write).is_ok());
    assert_eq!(codec.count(), 9);
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn test_converted_values_after_read() {
    let info = TagInfo::baseline();
    for layout in all_layouts() {
        let mut stream = empty_file(layout);
        let mut codec = TagEntryCodec::with_tag(&info, 318, layout);
        codec
            .set_values(&[Rational::new(1, 2), Rational::new(3, 4)])
            .unwrap();
        let at = write_entry(&mut codec, &mut stream);

        let mut read = read_entry(&mut stream, &info, layout, at);
        assert_eq!(read.get_converted_values().unwrap(), vec![0.5, 0.75]);
    }
}

// =============================================================================
// Free-Block Repair
// =============================================================================

#[test]
fn test_free_offsets_in_free_block_is_relocated() {
    let info = TagInfo::baseline();
    let layout = DirectoryLayout::classic(ByteOrder::LittleEndian);
    let mut stream = empty_file(layout);

    let mut codec = TagEntryCodec::with_tag(&info, 288, layout);
    codec.set_values(&[100u32, 200, 300]).unwrap();
    codec.write_data(&mut stream).unwrap();
    let old_offset = codec.offset();
    assert_ne!(old_offset, 0);

    // The list's own block gets released
    let mut stream = stream.with_free_blocks([FreeBlock {
        offset: old_offset,
        size: 12,
    }]);
    assert!(codec.repair_free_block_overlap(&stream));
    assert!(codec.is_pending_resize());
    assert_eq!(codec.offset(), 0);

    codec.write_data(&mut stream).unwrap();
    assert_ne!(codec.offset(), 0);
    assert!(!codec.is_pending_resize());
    assert_eq!(stream.free_bytes(), 12, "free list must stay untouched");
}

#[test]
fn test_other_tags_are_not_relocated() {
    let info = TagInfo::baseline();
    let layout = DirectoryLayout::classic(ByteOrder::LittleEndian);
    let mut stream = empty_file(layout);

    let mut codec = TagEntryCodec::with_tag(&info, 273, layout);
    codec.set_values(&[100u32, 200, 300]).unwrap();
    codec.write_data(&mut stream).unwrap();
    let offset = codec.offset();

    let stream = stream.with_free_blocks([FreeBlock { offset, size: 12 }]);
    assert!(!codec.repair_free_block_overlap(&stream));
    assert_eq!(codec.offset(), offset);
}

#[test]
fn test_free_block_reused_for_new_payload() {
    let info = TagInfo::baseline();
    let layout = DirectoryLayout::classic(ByteOrder::LittleEndian);
    let stream = TiffStream::in_memory(vec![0u8; 256]);
    let mut stream = stream.with_free_blocks([FreeBlock {
        offset: 64,
        size: 32,
    }]);

    let mut codec = TagEntryCodec::with_tag(&info, 270, layout);
    codec.set_ascii("sixteen chars!!").unwrap();
    codec.write_data(&mut stream).unwrap();

    assert_eq!(codec.offset(), 64);
    assert_eq!(stream.free_bytes(), 16);
}
