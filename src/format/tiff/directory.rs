//! Image File Directory (IFD) built from entry codecs.
//!
//! # IFD Structure
//!
//! ```text
//! Classic TIFF:
//!   2 bytes: Entry count (N)
//!   N × 12 bytes: Entries
//!   4 bytes: Offset to next IFD (0 if last)
//!
//! BigTIFF:
//!   8 bytes: Entry count (N)
//!   N × 20 bytes: Entries
//!   8 bytes: Offset to next IFD (0 if last)
//! ```
//!
//! Entries are kept sorted by tag id, which is the order TIFF requires on
//! disk.

use std::collections::BTreeMap;

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::error::{IoError, TagError, TiffError};
use crate::io::{FreeBlock, TagStream};

use super::entry::TagEntryCodec;
use super::parser::DirectoryLayout;
use super::tags::{DataType, TagInfo, TiffTag};
use super::values::TagElement;

/// Upper bound on the entry count of a directory.
///
/// Real files carry a few dozen tags; a larger count means the offset does
/// not point at a directory.
pub const MAX_DIRECTORY_ENTRIES: u64 = 4096;

/// One image file directory.
#[derive(Debug, Clone)]
pub struct Directory {
    layout: DirectoryLayout,
    /// File offset of the directory, 0 when never written
    offset: u64,
    size_on_disk: u64,
    next_offset: u64,
    entries: BTreeMap<u16, TagEntryCodec>,
    /// Records dropped while reading
    skipped: usize,
}

impl Directory {
    /// Empty directory for writing.
    pub fn new(layout: DirectoryLayout) -> Self {
        Self {
            layout,
            offset: 0,
            size_on_disk: 0,
            next_offset: 0,
            entries: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// Read the directory at `offset`.
    ///
    /// All records are parsed before any payload is loaded. Entries whose
    /// definition, count or payload is rejected are skipped with a warning;
    /// a short read of the record block aborts.
    pub fn read<S: TagStream>(
        stream: &mut S,
        info: &TagInfo,
        layout: DirectoryLayout,
        offset: u64,
    ) -> Result<Self, TiffError> {
        let order = layout.byte_order;
        stream.seek(offset)?;

        let mut count_bytes = [0u8; 8];
        let count_field = &mut count_bytes[..layout.count_size()];
        stream.read_exact(count_field)?;
        let entry_count = if layout.is_bigtiff {
            order.read_u64(count_field)
        } else {
            order.read_u16(count_field) as u64
        };

        if entry_count > MAX_DIRECTORY_ENTRIES {
            return Err(TiffError::TooManyEntries {
                offset,
                count: entry_count,
            });
        }

        let mut codecs = Vec::with_capacity(entry_count as usize);
        let mut skipped = 0;
        for index in 0..entry_count {
            let mut codec = TagEntryCodec::new(layout);
            match codec.read_tag_entry(stream, info) {
                Ok(()) => codecs.push(codec),
                Err(error @ TagError::DirectoryEntryRead(_)) => return Err(error.into()),
                Err(error) => {
                    warn!(offset, index, error = %error, "Skipping directory entry");
                    skipped += 1;
                    // Keep the cursor on the next record
                    let next = offset
                        + layout.count_size() as u64
                        + (index + 1) * layout.entry_size() as u64;
                    stream.seek(next)?;
                }
            }
        }

        let mut next_bytes = [0u8; 8];
        let next_field = &mut next_bytes[..layout.value_offset_size()];
        stream.read_exact(next_field)?;
        let next_offset = layout.read_offset(next_field);

        let mut entries = BTreeMap::new();
        for mut codec in codecs {
            if let Err(error) = codec.read_data(stream) {
                warn!(tag = codec.name(), error = %error, "Skipping tag with unreadable data");
                skipped += 1;
                continue;
            }
            let Some(tag_id) = codec.tag_id() else {
                continue;
            };
            if entries.contains_key(&tag_id) {
                warn!(tag = codec.name(), "Duplicate tag, keeping the first one");
                skipped += 1;
                continue;
            }
            entries.insert(tag_id, codec);
        }

        debug!(
            stream = stream.identifier(),
            offset,
            entries = entries.len(),
            next_offset,
            "Read directory"
        );

        Ok(Self {
            layout,
            offset,
            size_on_disk: layout.directory_size(entry_count as usize) as u64,
            next_offset,
            entries,
            skipped,
        })
    }

    /// Write every payload, then the directory itself.
    ///
    /// Returns the directory's offset, which may have moved if the entry
    /// count grew.
    pub fn write<S: TagStream>(&mut self, stream: &mut S) -> Result<u64, TiffError> {
        for codec in self.entries.values_mut() {
            codec.write_data(stream)?;
        }

        let entry_count = self.entries.len();
        if !self.layout.is_bigtiff && entry_count > u16::MAX as usize {
            return Err(TiffError::TooManyEntries {
                offset: self.offset,
                count: entry_count as u64,
            });
        }

        let size = self.layout.directory_size(entry_count) as u64;
        self.offset = stream.check_alloc(self.offset, self.size_on_disk, size);
        self.size_on_disk = size;

        let order = self.layout.byte_order;
        let mut count_field = BytesMut::with_capacity(self.layout.count_size());
        if self.layout.is_bigtiff {
            order.put_u64(&mut count_field, entry_count as u64);
        } else {
            order.put_u16(&mut count_field, entry_count as u16);
        }

        stream.seek(self.offset)?;
        stream.write_all(&count_field)?;
        for codec in self.entries.values_mut() {
            codec.write_tag_entry(stream)?;
        }

        let mut next_field = BytesMut::with_capacity(self.layout.value_offset_size());
        self.layout.put_offset(&mut next_field, self.next_offset);
        stream.write_all(&next_field)?;

        debug!(
            stream = stream.identifier(),
            offset = self.offset,
            entries = entry_count,
            "Wrote directory"
        );
        Ok(self.offset)
    }

    /// Codec for `tag_id`, created empty if the directory lacks it.
    pub fn entry_mut(&mut self, info: &TagInfo, tag_id: u16) -> Result<&mut TagEntryCodec, TagError> {
        if !self.entries.contains_key(&tag_id) {
            let codec = TagEntryCodec::with_tag(info, tag_id, self.layout);
            if !codec.is_valid() {
                return Err(codec.last_error().cloned().unwrap_or(TagError::Undefined));
            }
            self.entries.insert(tag_id, codec);
        }
        self.entries.get_mut(&tag_id).ok_or(TagError::Undefined)
    }

    /// Set the value of `tag_id`, creating the entry if needed.
    pub fn set_values<T: TagElement>(
        &mut self,
        info: &TagInfo,
        tag_id: u16,
        values: &[T],
    ) -> Result<(), TagError> {
        self.entry_mut(info, tag_id)?.set_values(values)
    }

    /// Set an ASCII value, creating the entry if needed.
    pub fn set_ascii(&mut self, info: &TagInfo, tag_id: u16, text: &str) -> Result<(), TagError> {
        self.entry_mut(info, tag_id)?.set_ascii(text)
    }

    /// Remove a tag and give its out-of-line block back to the stream.
    pub fn remove<S: TagStream>(&mut self, stream: &mut S, tag_id: u16) -> Option<TagEntryCodec> {
        let codec = self.entries.remove(&tag_id)?;
        let size_on_disk = codec.store().map_or(0, |store| store.size_on_disk());
        if size_on_disk > 0 && !TiffTag::is_free_block_tag(tag_id) {
            stream.check_alloc(codec.offset(), size_on_disk, 0);
        }
        Some(codec)
    }

    /// Offsets of an offset-table tag (strip, tile or free-block lists),
    /// whatever integer type it was written with.
    pub fn offsets(&mut self, tag_id: u16) -> Option<Vec<u64>> {
        let codec = self.entries.get_mut(&tag_id)?;
        match codec.data_type()? {
            DataType::Short => Some(widen(codec.get_values::<u16>()?)),
            DataType::Long | DataType::Ifd => Some(widen(codec.get_values::<u32>()?)),
            DataType::Long64 | DataType::Ifd64 => codec.get_values::<u64>(),
            _ => None,
        }
    }

    /// Free blocks listed by the FreeOffsets and FreeByteCounts tags.
    ///
    /// The lists are paired up to the shorter one.
    pub fn free_blocks(&mut self) -> Vec<FreeBlock> {
        let offsets = self
            .offsets(TiffTag::FreeOffsets.as_u16())
            .unwrap_or_default();
        let sizes = self
            .offsets(TiffTag::FreeByteCounts.as_u16())
            .unwrap_or_default();
        if offsets.len() != sizes.len() {
            warn!(
                offsets = offsets.len(),
                sizes = sizes.len(),
                "Free-block lists differ in length"
            );
        }
        offsets
            .into_iter()
            .zip(sizes)
            .map(|(offset, size)| FreeBlock { offset, size })
            .collect()
    }

    /// Record a free-block list in the FreeOffsets and FreeByteCounts tags.
    ///
    /// An empty list removes both tags.
    pub fn store_free_blocks(&mut self, info: &TagInfo, blocks: &[FreeBlock]) -> Result<(), TagError> {
        let offsets_tag = TiffTag::FreeOffsets.as_u16();
        let sizes_tag = TiffTag::FreeByteCounts.as_u16();
        if blocks.is_empty() {
            self.entries.remove(&offsets_tag);
            self.entries.remove(&sizes_tag);
            return Ok(());
        }

        let offsets: Vec<u64> = blocks.iter().map(|block| block.offset).collect();
        let sizes: Vec<u64> = blocks.iter().map(|block| block.size).collect();
        self.store_offset_list(info, offsets_tag, &offsets)?;
        self.store_offset_list(info, sizes_tag, &sizes)
    }

    /// Write an offset table in the integer type its entry already carries.
    ///
    /// Values too wide for that type replace the entry with one of the
    /// layout's default type.
    fn store_offset_list(
        &mut self,
        info: &TagInfo,
        tag_id: u16,
        values: &[u64],
    ) -> Result<(), TagError> {
        let current = self.entries.get(&tag_id).and_then(TagEntryCodec::data_type);
        let stored = match current {
            Some(DataType::Short) => {
                narrow::<u16>(values).map(|narrowed| self.set_values(info, tag_id, &narrowed))
            }
            Some(DataType::Long) => {
                narrow::<u32>(values).map(|narrowed| self.set_values(info, tag_id, &narrowed))
            }
            Some(DataType::Long64) => Some(self.set_values(info, tag_id, values)),
            _ => None,
        };
        if let Some(result) = stored {
            return result;
        }

        if current.is_some() {
            debug!(tag_id, "Offset table widened to the layout default type");
            self.entries.remove(&tag_id);
        }
        if self.layout.is_bigtiff {
            self.set_values(info, tag_id, values)
        } else {
            let narrowed = narrow::<u32>(values).ok_or_else(|| TagError::DirectoryEntryWrite {
                tag: info.name_of(tag_id),
                source: IoError::Io("offset beyond 4 GiB".to_string()),
            })?;
            self.set_values(info, tag_id, &narrowed)
        }
    }

    #[inline]
    pub fn get(&self, tag_id: u16) -> Option<&TagEntryCodec> {
        self.entries.get(&tag_id)
    }

    #[inline]
    pub fn get_mut(&mut self, tag_id: u16) -> Option<&mut TagEntryCodec> {
        self.entries.get_mut(&tag_id)
    }

    #[inline]
    pub fn contains(&self, tag_id: u16) -> bool {
        self.entries.contains_key(&tag_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &TagEntryCodec> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TagEntryCodec> {
        self.entries.values_mut()
    }

    #[inline]
    pub fn layout(&self) -> DirectoryLayout {
        self.layout
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    #[inline]
    pub fn set_next_offset(&mut self, offset: u64) {
        self.next_offset = offset;
    }

    /// Number of records dropped by [`read`](Self::read).
    #[inline]
    pub fn skipped_entries(&self) -> usize {
        self.skipped
    }
}

fn widen<T: Into<u64>>(values: Vec<T>) -> Vec<u64> {
    values.into_iter().map(Into::into).collect()
}

/// `None` when any value does not fit in `T`.
fn narrow<T: TryFrom<u64>>(values: &[u64]) -> Option<Vec<T>> {
    values.iter().map(|&value| T::try_from(value).ok()).collect()
}

// =============================================================================
// Tests
// =============================================================================
