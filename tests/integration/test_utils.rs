//! Test utilities for integration tests.
//!
//! Provides:
//! - A hand-rolled directory builder producing raw TIFF bytes, independent
//!   of the codec under test
//! - Helpers writing one entry to a stream and reading it back
//! - Tag tables holding a single custom tag of a chosen type

use std::io::Cursor;

use tiff_tag_codec::{
    ByteOrder, DataType, DirectoryLayout, TagCount, TagDescriptor, TagEntryCodec, TagInfo,
    TagStream, TiffHeader, TiffStream,
};

/// Stream type used throughout the tests.
pub type MemoryStream = TiffStream<Cursor<Vec<u8>>>;

/// Private tag id used for custom single-tag tables.
pub const TEST_TAG: u16 = 65000;

// =============================================================================
// Layouts
// =============================================================================

/// Every combination of classic/BigTIFF and byte order.
pub fn all_layouts() -> [DirectoryLayout; 4] {
    [
        DirectoryLayout::classic(ByteOrder::LittleEndian),
        DirectoryLayout::classic(ByteOrder::BigEndian),
        DirectoryLayout::bigtiff(ByteOrder::LittleEndian),
        DirectoryLayout::bigtiff(ByteOrder::BigEndian),
    ]
}

/// Layout whose byte order differs from the machine running the tests.
pub fn swapped_layout(is_bigtiff: bool) -> DirectoryLayout {
    let order = ByteOrder::host().opposite();
    if is_bigtiff {
        DirectoryLayout::bigtiff(order)
    } else {
        DirectoryLayout::classic(order)
    }
}

// =============================================================================
// Tag Tables
// =============================================================================

/// Table holding [`TEST_TAG`] with the given types and an open count.
pub fn single_tag_info(data_types: &'static [DataType]) -> TagInfo {
    TagInfo::empty().with_descriptor(TagDescriptor::new(
        TEST_TAG,
        "TestTag",
        data_types,
        TagCount::Variable,
    ))
}

// =============================================================================
// Streams
// =============================================================================

/// In-memory file holding only a header with no directory.
pub fn empty_file(layout: DirectoryLayout) -> MemoryStream {
    TiffStream::in_memory(TiffHeader::new(layout, 0).encode().to_vec())
}

/// Write the payload of `codec`, then its record at a freshly allocated
/// position. Returns the record's offset.
pub fn write_entry(codec: &mut TagEntryCodec, stream: &mut MemoryStream) -> u64 {
    codec.write_data(stream).unwrap();

    let record_size = codec.layout().entry_size() as u64;
    let at = stream.check_alloc(0, 0, record_size);
    stream.seek(at).unwrap();
    codec.write_tag_entry(stream).unwrap();
    at
}

/// Read back the record at `at` and its payload.
pub fn read_entry(
    stream: &mut MemoryStream,
    info: &TagInfo,
    layout: DirectoryLayout,
    at: u64,
) -> TagEntryCodec {
    let mut codec = TagEntryCodec::new(layout);
    stream.seek(at).unwrap();
    codec.read_tag_entry(stream, info).unwrap();
    codec.read_data(stream).unwrap();
    codec
}

// =============================================================================
// Raw TIFF Builder
// =============================================================================

/// Builds a single-directory TIFF file byte by byte.
///
/// Out-of-line payloads are added first with [`data`](Self::data), which
/// returns the offset to put in the entry's value field.
pub struct RawTiffBuilder {
    layout: DirectoryLayout,
    body: Vec<u8>,
    entries: Vec<Vec<u8>>,
    next_offset: u64,
}

impl RawTiffBuilder {
    pub fn new(layout: DirectoryLayout) -> Self {
        Self {
            layout,
            body: Vec::new(),
            entries: Vec::new(),
            next_offset: 0,
        }
    }

    fn header_size(&self) -> usize {
        if self.layout.is_bigtiff {
            16
        } else {
            8
        }
    }

    /// Append an out-of-line payload and return its file offset.
    pub fn data(&mut self, bytes: &[u8]) -> u64 {
        if self.body.len() % 2 == 1 {
            self.body.push(0);
        }
        let offset = (self.header_size() + self.body.len()) as u64;
        self.body.extend_from_slice(bytes);
        offset
    }

    /// Add an entry whose value field holds `field` (zero padded).
    pub fn entry(&mut self, tag: u16, type_code: u16, count: u64, field: &[u8]) -> &mut Self {
        self.entries
            .push(raw_record(self.layout, tag, type_code, count, field));
        self
    }

    /// Add an entry whose value field holds an offset.
    pub fn entry_at(&mut self, tag: u16, type_code: u16, count: u64, offset: u64) -> &mut Self {
        let field = self.offset_bytes(offset);
        self.entry(tag, type_code, count, &field)
    }

    /// Offset of the next directory.
    pub fn next_offset(&mut self, offset: u64) -> &mut Self {
        self.next_offset = offset;
        self
    }

    fn offset_bytes(&self, value: u64) -> Vec<u8> {
        match (self.layout.is_bigtiff, self.layout.byte_order) {
            (true, ByteOrder::LittleEndian) => value.to_le_bytes().to_vec(),
            (true, ByteOrder::BigEndian) => value.to_be_bytes().to_vec(),
            (false, ByteOrder::LittleEndian) => (value as u32).to_le_bytes().to_vec(),
            (false, ByteOrder::BigEndian) => (value as u32).to_be_bytes().to_vec(),
        }
    }

    /// Offset the directory will be placed at.
    pub fn directory_offset(&self) -> u64 {
        let end = self.header_size() + self.body.len();
        ((end + 1) & !1) as u64
    }

    pub fn build(&self) -> Vec<u8> {
        let directory_offset = self.directory_offset();
        let header = TiffHeader::new(self.layout, directory_offset);

        let mut data = header.encode().to_vec();
        data.extend_from_slice(&self.body);
        data.resize(directory_offset as usize, 0);

        let count = self.entries.len() as u64;
        match (self.layout.is_bigtiff, self.layout.byte_order) {
            (true, ByteOrder::LittleEndian) => data.extend_from_slice(&count.to_le_bytes()),
            (true, ByteOrder::BigEndian) => data.extend_from_slice(&count.to_be_bytes()),
            (false, ByteOrder::LittleEndian) => {
                data.extend_from_slice(&(count as u16).to_le_bytes())
            }
            (false, ByteOrder::BigEndian) => data.extend_from_slice(&(count as u16).to_be_bytes()),
        }
        for entry in &self.entries {
            data.extend_from_slice(entry);
        }
        data.extend_from_slice(&self.offset_bytes(self.next_offset));
        data
    }
}

/// Encode one directory record by hand.
pub fn raw_record(
    layout: DirectoryLayout,
    tag: u16,
    type_code: u16,
    count: u64,
    field: &[u8],
) -> Vec<u8> {
    let big_endian = layout.byte_order == ByteOrder::BigEndian;
    let mut record = Vec::with_capacity(layout.entry_size());

    let put16 = |record: &mut Vec<u8>, value: u16| {
        if big_endian {
            record.extend_from_slice(&value.to_be_bytes());
        } else {
            record.extend_from_slice(&value.to_le_bytes());
        }
    };
    put16(&mut record, tag);
    put16(&mut record, type_code);

    match (layout.is_bigtiff, big_endian) {
        (true, true) => record.extend_from_slice(&count.to_be_bytes()),
        (true, false) => record.extend_from_slice(&count.to_le_bytes()),
        (false, true) => record.extend_from_slice(&(count as u32).to_be_bytes()),
        (false, false) => record.extend_from_slice(&(count as u32).to_le_bytes()),
    }

    let mut value = vec![0u8; layout.value_offset_size()];
    value[..field.len()].copy_from_slice(field);
    record.extend_from_slice(&value);
    record
}

/// Encode 16-bit words in the layout's byte order.
pub fn shorts(layout: DirectoryLayout, values: &[u16]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|value| match layout.byte_order {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        })
        .collect()
}

/// Encode 32-bit words in the layout's byte order.
pub fn longs(layout: DirectoryLayout, values: &[u32]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|value| match layout.byte_order {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        })
        .collect()
}
