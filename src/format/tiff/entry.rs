//! Directory entry codec.
//!
//! A [`TagEntryCodec`] owns one directory entry: it parses the fixed-size
//! record, loads the payload (inline or from its file offset), exposes typed
//! getters and setters, and writes the record and payload back.
//!
//! # Byte order
//!
//! Payloads read from a file stay in file order until the first typed access
//! swaps them to host order. A payload that was never accessed is written
//! back as is; a host-order payload is swapped into a scratch state for the
//! write and restored afterwards.
//!
//! # Errors
//!
//! Every fallible operation returns a [`TagError`] and also records it as the
//! codec's last error, so a directory can report which entries went wrong
//! after a bulk operation.

use std::ffi::CStr;

use bytes::{BufMut, BytesMut};
use tracing::{trace, warn};

use crate::error::{DefinitionError, IoError, TagError};
use crate::io::{swap_words, TagStream};

use super::definition::TagDefinition;
use super::parser::DirectoryLayout;
use super::store::{TagValueStore, ValueStorage, INLINE_CAPACITY};
use super::tags::{DataType, TagCount, TagInfo};
use super::values::{decode_elements, encode_elements, Rational, TagElement};

/// Direction of a count check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Codec for one directory entry.
#[derive(Debug, Clone)]
pub struct TagEntryCodec {
    layout: DirectoryLayout,
    definition: Option<TagDefinition>,
    store: Option<TagValueStore>,
    last_error: Option<TagError>,
}

impl TagEntryCodec {
    /// Untyped codec, ready for [`read_tag_entry`](Self::read_tag_entry).
    pub fn new(layout: DirectoryLayout) -> Self {
        Self {
            layout,
            definition: None,
            store: None,
            last_error: None,
        }
    }

    /// Codec for a known tag, created empty for writing.
    ///
    /// Fixed-arity tags start with that many zeroed elements, sample-count
    /// tags reserve room for the maximum sample count, and open-ended tags
    /// allocate on the first set. An unknown tag yields an invalid codec
    /// (see [`is_valid`](Self::is_valid)) whose last error says why.
    pub fn with_tag(info: &TagInfo, tag_id: u16, layout: DirectoryLayout) -> Self {
        let mut codec = Self::new(layout);
        let definition = match TagDefinition::for_tag(info, tag_id, layout.is_bigtiff) {
            Ok(definition) => definition,
            Err(error) => {
                warn!(tag_id, error = %error, "Cannot create tag entry");
                codec.last_error = Some(error.into());
                return codec;
            }
        };

        let data_type = definition.data_type();
        let store = match (definition.write_count(), definition.initial_capacity()) {
            (TagCount::Fixed(_), Some(count)) => {
                TagValueStore::zeroed(count as u64, data_type, layout.value_offset_size())
            }
            (_, Some(capacity)) => TagValueStore::with_capacity(capacity as u64, data_type),
            (_, None) => TagValueStore::zeroed(0, data_type, layout.value_offset_size()),
        };

        codec.definition = Some(definition);
        codec.store = Some(store);
        codec
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Parse one directory record at the stream's current position.
    ///
    /// Builds the definition from the record (keeping an existing one when
    /// tag id and type agree) and checks the count against the read arity.
    /// The payload itself is loaded by [`read_data`](Self::read_data).
    pub fn read_tag_entry<S: TagStream>(
        &mut self,
        stream: &mut S,
        info: &TagInfo,
    ) -> Result<(), TagError> {
        let result = self.read_record(stream, info);
        if result.is_err() {
            self.store = None;
        }
        self.record(result)
    }

    fn read_record<S: TagStream>(&mut self, stream: &mut S, info: &TagInfo) -> Result<(), TagError> {
        let layout = self.layout;
        let order = layout.byte_order;

        let mut buf = [0u8; 20];
        let record = &mut buf[..layout.entry_size()];
        stream
            .read_exact(record)
            .map_err(TagError::DirectoryEntryRead)?;

        let tag_id = order.read_u16(&record[0..2]);
        let type_code = order.read_u16(&record[2..4]);
        let (count, field) = if layout.is_bigtiff {
            (order.read_u64(&record[4..12]), &record[12..20])
        } else {
            (order.read_u32(&record[4..8]) as u64, &record[8..12])
        };
        let offset = layout.read_offset(field);
        let mut value_field = [0u8; INLINE_CAPACITY];
        value_field[..field.len()].copy_from_slice(field);

        let same_tag = self.definition.as_ref().is_some_and(|definition| {
            definition.tag_id() == tag_id && definition.data_type().as_u16() == type_code
        });
        if !same_tag {
            self.definition = Some(TagDefinition::from_record(
                info,
                tag_id,
                type_code,
                layout.is_bigtiff,
            )?);
        }

        self.store = None;
        self.check_count(count, Access::Read)?;
        self.store = Some(TagValueStore::from_record(count, offset, value_field));

        trace!(tag_id, data_type = type_code, count, offset, "Read directory entry");
        Ok(())
    }

    /// Load the payload of a parsed record.
    ///
    /// Inline payloads are copied out of the record's value field; larger
    /// payloads are read from their offset. ASCII payloads are repaired to
    /// end with a NUL. On failure the value is discarded.
    pub fn read_data<S: TagStream>(&mut self, stream: &mut S) -> Result<(), TagError> {
        let result = self.load_payload(stream);
        if result.is_err() {
            self.store = None;
        }
        self.record(result)
    }

    fn load_payload<S: TagStream>(&mut self, stream: &mut S) -> Result<(), TagError> {
        let layout = self.layout;
        let definition = self.definition.as_ref().ok_or(TagError::Undefined)?;
        let store = self
            .store
            .as_mut()
            .ok_or_else(|| TagError::NoValue(definition.name().to_string()))?;
        let data_type = definition.data_type();
        let read_error = |length: u64| TagError::TagRead {
            tag: definition.name().to_string(),
            file_tag_id: definition.tag_id(),
            length,
        };

        let length = data_type
            .byte_length(store.count())
            .ok_or_else(|| read_error(u64::MAX))?;
        let needs_swap = data_type.swap_word_size().is_some() && layout.byte_order.needs_swap();

        if !layout.fits_inline(length) {
            let offset = store.offset();
            let in_bounds = offset
                .checked_add(length)
                .is_some_and(|end| end <= stream.size());
            if !in_bounds {
                return Err(read_error(length));
            }

            let mut data = vec![0u8; length as usize];
            stream.seek(offset).map_err(|_| read_error(length))?;
            stream
                .read_exact(&mut data)
                .map_err(|_| read_error(length))?;
            store.load(ValueStorage::Owned(data), needs_swap);
            store.set_allocation(offset, length);
        } else {
            let inline = ValueStorage::inline(&store.value_field()[..length as usize]);
            store.load(inline, needs_swap);
        }

        if data_type == DataType::Ascii
            && store.storage_mut().ensure_nul_terminated()
            && store.count() > 0
        {
            warn!(
                tag = definition.name(),
                count = store.count(),
                "ASCII value is not NUL-terminated, appended terminator"
            );
        }
        Ok(())
    }

    /// Check `count` against the definition's arity for `access`.
    ///
    /// Only fixed arities are enforced. On the write path an open arity
    /// updates the stored count instead.
    pub fn validate_data_len(&mut self, count: u64, access: Access) -> Result<(), TagError> {
        let result = self.check_count(count, access);
        self.record(result)
    }

    fn check_count(&mut self, count: u64, access: Access) -> Result<(), TagError> {
        let definition = self.definition.as_ref().ok_or(TagError::Undefined)?;
        let arity = match access {
            Access::Read => definition.read_count(),
            Access::Write => definition.write_count(),
        };

        match arity {
            TagCount::Fixed(expected) if count != expected as u64 => {
                let tag = definition.name().to_string();
                Err(match access {
                    Access::Read => TagError::IncorrectCountForTagRead {
                        tag,
                        count,
                        expected,
                    },
                    Access::Write => TagError::IncorrectCountForTagWritten {
                        tag,
                        count,
                        expected,
                    },
                })
            }
            TagCount::Fixed(_) => Ok(()),
            TagCount::Any | TagCount::Variable | TagCount::UseSampleCount(_) => {
                if access == Access::Write {
                    if let Some(store) = self.store.as_mut() {
                        store.set_count(count);
                    }
                }
                Ok(())
            }
        }
    }

    // =========================================================================
    // Typed getters
    // =========================================================================

    /// Swap the payload to host order if still pending and borrow it.
    fn host_view(&mut self) -> Option<(DataType, &TagValueStore)> {
        let data_type = self.definition.as_ref()?.data_type();
        let store = self.store.as_mut()?;
        store.swap_to_host(data_type);
        Some((data_type, &*store))
    }

    /// First element of the value.
    pub fn get_value<T: TagElement>(&mut self) -> Option<T> {
        let (data_type, store) = self.host_view()?;
        if !element_matches::<T>(data_type) || store.count() == 0 {
            return None;
        }
        store.data().get(..T::SIZE).map(T::from_ne_slice)
    }

    /// All elements of the value.
    pub fn get_values<T: TagElement>(&mut self) -> Option<Vec<T>> {
        let (data_type, store) = self.host_view()?;
        if !element_matches::<T>(data_type) {
            return None;
        }
        let count = usize::try_from(store.count()).ok()?;
        Some(decode_elements(store.data(), count))
    }

    /// First two elements, for two-valued tags such as `PageNumber`.
    pub fn get_pair<T: TagElement>(&mut self) -> Option<(T, T)> {
        match self.get_values::<T>()?.as_slice() {
            [first, second, ..] => Some((*first, *second)),
            _ => None,
        }
    }

    /// Payload bytes in host order.
    pub fn raw_bytes(&mut self) -> Option<&[u8]> {
        let (data_type, store) = self.host_view()?;
        Some(&store.data()[..store.payload_len(data_type)])
    }

    /// BYTE or UNDEFINED value, borrowed from the store.
    pub fn get_bytes(&mut self) -> Option<&[u8]> {
        let (data_type, store) = self.host_view()?;
        if !matches!(data_type, DataType::Byte | DataType::Undefined) {
            return None;
        }
        let count = usize::try_from(store.count()).ok()?;
        store.data().get(..count)
    }

    /// ASCII value up to its first NUL.
    pub fn get_ascii(&mut self) -> Option<&CStr> {
        let (data_type, store) = self.host_view()?;
        debug_assert_eq!(data_type, DataType::Ascii, "not an ASCII tag");
        if data_type != DataType::Ascii {
            return None;
        }
        CStr::from_bytes_until_nul(store.data()).ok()
    }

    /// Wide-character value up to its first NUL.
    pub fn get_wide_string(&mut self) -> Option<String> {
        let (data_type, store) = self.host_view()?;
        debug_assert_eq!(data_type, DataType::AsciiW, "not a wide-string tag");
        if data_type != DataType::AsciiW {
            return None;
        }
        let units: Vec<u16> = decode_elements(store.data(), store.data().len() / 2);
        let end = units.iter().position(|&unit| unit == 0).unwrap_or(units.len());
        Some(String::from_utf16_lossy(&units[..end]))
    }

    /// Text value of an ASCII or wide-string tag, lossily decoded.
    pub fn get_string(&mut self) -> Option<String> {
        match self.data_type()? {
            DataType::Ascii => self
                .get_ascii()
                .map(|text| text.to_string_lossy().into_owned()),
            DataType::AsciiW => self.get_wide_string(),
            _ => None,
        }
    }

    /// Numeric value widened to `f64`.
    ///
    /// Supported for BYTE, SHORT, LONG, FLOAT, DOUBLE and RATIONAL.
    pub fn get_converted_values(&mut self) -> Option<Vec<f64>> {
        let data_type = self.data_type()?;
        debug_assert!(
            matches!(
                data_type,
                DataType::Byte
                    | DataType::Short
                    | DataType::Long
                    | DataType::Float
                    | DataType::Double
                    | DataType::Rational
            ),
            "{} values cannot be converted",
            data_type.name()
        );

        let values = match data_type {
            DataType::Byte => widen(self.get_values::<u8>()?),
            DataType::Short => widen(self.get_values::<u16>()?),
            DataType::Long => widen(self.get_values::<u32>()?),
            DataType::Float => widen(self.get_values::<f32>()?),
            DataType::Double => self.get_values::<f64>()?,
            DataType::Rational => self
                .get_values::<Rational>()?
                .into_iter()
                .map(Rational::to_f64)
                .collect(),
            _ => return None,
        };
        Some(values)
    }

    // =========================================================================
    // Setters
    // =========================================================================

    /// Replace the value with a single element.
    pub fn set_value<T: TagElement>(&mut self, value: T) -> Result<(), TagError> {
        self.set_values(&[value])
    }

    /// Replace the value with `values`.
    ///
    /// The count is checked against the write arity. A count change marks
    /// the entry for reallocation on the next [`write_data`](Self::write_data).
    pub fn set_values<T: TagElement>(&mut self, values: &[T]) -> Result<(), TagError> {
        let result = self.assign(encode_elements(values), values.len() as u64, T::accepts);
        self.record(result)
    }

    /// Replace the value of a byte-sized tag with raw bytes.
    pub fn set_raw(&mut self, bytes: &[u8]) -> Result<(), TagError> {
        self.set_values(bytes)
    }

    /// Replace an ASCII value. The stored count includes the terminator.
    ///
    /// Text after an embedded NUL is dropped.
    pub fn set_ascii(&mut self, text: &str) -> Result<(), TagError> {
        let text = text.split('\0').next().unwrap_or_default();
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);

        let count = bytes.len() as u64;
        let result = self.assign(bytes, count, |data_type| data_type == DataType::Ascii);
        self.record(result)
    }

    /// Replace a wide-string value. The stored count includes the terminator.
    pub fn set_wide_string(&mut self, text: &str) -> Result<(), TagError> {
        let mut units: Vec<u16> = text.encode_utf16().take_while(|&unit| unit != 0).collect();
        units.push(0);

        let count = units.len() as u64;
        let result = self.assign(encode_elements(&units), count, |data_type| {
            data_type == DataType::AsciiW
        });
        self.record(result)
    }

    fn assign(
        &mut self,
        bytes: Vec<u8>,
        count: u64,
        accepts: fn(DataType) -> bool,
    ) -> Result<(), TagError> {
        let definition = self.definition.as_ref().ok_or(TagError::Undefined)?;
        let data_type = definition.data_type();
        let accepted = accepts(data_type);
        debug_assert!(accepted, "value type does not match {}", data_type.name());
        if !accepted {
            return Err(DefinitionError::TypeMismatch {
                tag: definition.name().to_string(),
                data_type: data_type.name(),
            }
            .into());
        }

        let previous_count = self.store.as_ref().map(TagValueStore::count);
        self.check_count(count, Access::Write)?;

        let threshold = self.layout.value_offset_size();
        let store = self.store.get_or_insert_with(TagValueStore::empty);
        store.assign(bytes, count, threshold, previous_count != Some(count));
        if data_type == DataType::Ascii {
            store.storage_mut().ensure_nul_terminated();
        }
        Ok(())
    }

    /// Mark the value as modified so the next write rewrites its payload.
    pub fn touch(&mut self) {
        if let Some(store) = self.store.as_mut() {
            store.mark_dirty();
        }
    }

    /// Reverse the byte order of the held payload in place.
    ///
    /// Toggles between file and host order; applying it twice restores the
    /// original bytes.
    pub fn swap_data(&mut self) {
        if let (Some(definition), Some(store)) = (self.definition.as_ref(), self.store.as_mut()) {
            store.swap_in_place(definition.data_type());
        }
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Encode the directory record in the file's byte order.
    ///
    /// Out-of-line values reference the offset assigned by
    /// [`write_data`](Self::write_data), which must run first.
    pub fn encode_record(&self) -> Result<BytesMut, TagError> {
        let layout = self.layout;
        let order = layout.byte_order;
        let definition = self.definition.as_ref().ok_or(TagError::Undefined)?;
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| TagError::NoValue(definition.name().to_string()))?;
        let data_type = definition.data_type();
        let write_error = |message: &str| TagError::DirectoryEntryWrite {
            tag: definition.name().to_string(),
            source: IoError::Io(message.to_string()),
        };

        let mut record = BytesMut::with_capacity(layout.entry_size());
        order.put_u16(&mut record, definition.tag_id());
        order.put_u16(&mut record, data_type.as_u16());
        if layout.is_bigtiff {
            order.put_u64(&mut record, store.count());
        } else {
            let count = u32::try_from(store.count())
                .map_err(|_| write_error("count does not fit in 32 bits"))?;
            order.put_u32(&mut record, count);
        }

        let field_size = layout.value_offset_size();
        let length = data_type
            .byte_length(store.count())
            .ok_or_else(|| write_error("value length overflows"))?;

        if layout.fits_inline(length) {
            let length = length as usize;
            let data = store
                .data()
                .get(..length)
                .ok_or_else(|| TagError::NoValue(definition.name().to_string()))?;
            let mut field = [0u8; INLINE_CAPACITY];
            field[..length].copy_from_slice(data);
            if !store.needs_byte_swap() && order.needs_swap() {
                if let Some(word_size) = data_type.swap_word_size() {
                    swap_words(&mut field[..length], word_size);
                }
            }
            record.put_slice(&field[..field_size]);
        } else {
            if !layout.is_bigtiff && store.offset() > u32::MAX as u64 {
                return Err(write_error("offset does not fit in 32 bits"));
            }
            layout.put_offset(&mut record, store.offset());
        }

        Ok(record)
    }

    /// Write the directory record at the stream's current position.
    pub fn write_tag_entry<S: TagStream>(&mut self, stream: &mut S) -> Result<(), TagError> {
        let result = self.write_record(stream);
        self.record(result)
    }

    fn write_record<S: TagStream>(&mut self, stream: &mut S) -> Result<(), TagError> {
        let record = self.encode_record()?;
        stream
            .write_all(&record)
            .map_err(|source| TagError::DirectoryEntryWrite {
                tag: self.name().to_string(),
                source,
            })?;
        trace!(tag = self.name(), count = self.count(), "Wrote directory entry");
        Ok(())
    }

    /// Write an out-of-line payload if it is new, resized or modified.
    ///
    /// Allocates file space first when the value has none yet or changed
    /// size. Free-block tags allocate without touching the free list they
    /// describe, and are relocated first if their block was released.
    pub fn write_data<S: TagStream>(&mut self, stream: &mut S) -> Result<(), TagError> {
        self.repair_free_block_overlap(&*stream);
        let result = self.write_payload(stream);
        self.record(result)
    }

    fn write_payload<S: TagStream>(&mut self, stream: &mut S) -> Result<(), TagError> {
        let layout = self.layout;
        let definition = self.definition.as_ref().ok_or(TagError::Undefined)?;
        let store = self
            .store
            .as_mut()
            .ok_or_else(|| TagError::NoValue(definition.name().to_string()))?;
        let data_type = definition.data_type();
        let write_error = |length: u64| TagError::TagRead {
            tag: definition.name().to_string(),
            file_tag_id: definition.tag_id(),
            length,
        };

        let length = data_type
            .byte_length(store.count())
            .ok_or_else(|| write_error(u64::MAX))?;

        if layout.fits_inline(length) {
            // Shrunk into the record: give the old block back
            if store.size_on_disk() > 0 {
                if !definition.is_free_block_tag() {
                    stream.check_alloc(store.offset(), store.size_on_disk(), 0);
                }
                store.set_allocation(0, 0);
            }
            return Ok(());
        }

        let needs_allocation = store.offset() == 0 || store.is_pending_resize();
        if !needs_allocation && !store.is_dirty() {
            return Ok(());
        }

        if needs_allocation {
            let offset = if definition.is_free_block_tag() {
                stream.check_alloc_without_update(store.offset(), store.size_on_disk(), length)
            } else {
                stream.check_alloc(store.offset(), store.size_on_disk(), length)
            };
            store.set_allocation(offset, length);
        }

        let offset = store.offset();
        let swap_word_size = if store.needs_byte_swap() || !layout.byte_order.needs_swap() {
            None
        } else {
            data_type.swap_word_size()
        };

        let payload = store
            .storage_mut()
            .as_mut_slice()
            .get_mut(..length as usize)
            .ok_or_else(|| TagError::NoValue(definition.name().to_string()))?;

        if let Some(word_size) = swap_word_size {
            swap_words(payload, word_size);
        }
        let result = stream
            .seek(offset)
            .and_then(|()| stream.write_all(payload));
        if let Some(word_size) = swap_word_size {
            swap_words(payload, word_size);
        }
        result.map_err(|_| write_error(length))?;

        store.mark_written();
        trace!(tag = definition.name(), offset, length, "Wrote tag data");
        Ok(())
    }

    /// Relocate a free-block tag whose payload sits inside a free block.
    ///
    /// Such a payload would be overwritten by the next allocation. Returns
    /// `true` when the entry was marked for reallocation.
    pub fn repair_free_block_overlap<S: TagStream>(&mut self, stream: &S) -> bool {
        let (Some(definition), Some(store)) = (self.definition.as_ref(), self.store.as_mut())
        else {
            return false;
        };
        if !definition.is_free_block_tag() || store.offset() == 0 {
            return false;
        }
        let Some(length) = definition.data_type().byte_length(store.count()) else {
            return false;
        };
        if self.layout.fits_inline(length) {
            return false;
        }

        let size = store.size_on_disk().max(length);
        if !stream.overlaps_free_blocks(store.offset(), size) {
            return false;
        }

        warn!(
            tag = definition.name(),
            offset = store.offset(),
            size,
            "Free-block list overlaps a free block, relocating"
        );
        store.force_reallocation();
        true
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    fn record<T>(&mut self, result: Result<T, TagError>) -> Result<T, TagError> {
        if let Err(error) = &result {
            self.last_error = Some(error.clone());
        }
        result
    }

    #[inline]
    pub fn layout(&self) -> DirectoryLayout {
        self.layout
    }

    #[inline]
    pub fn definition(&self) -> Option<&TagDefinition> {
        self.definition.as_ref()
    }

    #[inline]
    pub fn store(&self) -> Option<&TagValueStore> {
        self.store.as_ref()
    }

    /// Whether the codec has a definition to work with.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.definition.is_some()
    }

    /// Whether a value is held (read or set).
    #[inline]
    pub fn has_value(&self) -> bool {
        self.store.is_some()
    }

    /// The most recent error, kept until overwritten.
    #[inline]
    pub fn last_error(&self) -> Option<&TagError> {
        self.last_error.as_ref()
    }

    pub fn tag_id(&self) -> Option<u16> {
        self.definition.as_ref().map(TagDefinition::tag_id)
    }

    pub fn name(&self) -> &str {
        self.definition
            .as_ref()
            .map_or("<undefined>", TagDefinition::name)
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.definition.as_ref().map(TagDefinition::data_type)
    }

    pub fn count(&self) -> u64 {
        self.store.as_ref().map_or(0, TagValueStore::count)
    }

    pub fn offset(&self) -> u64 {
        self.store.as_ref().map_or(0, TagValueStore::offset)
    }

    pub fn is_stored_inline(&self) -> bool {
        self.store
            .as_ref()
            .is_some_and(TagValueStore::is_stored_inline)
    }

    pub fn needs_byte_swap(&self) -> bool {
        self.store
            .as_ref()
            .is_some_and(TagValueStore::needs_byte_swap)
    }

    pub fn is_dirty(&self) -> bool {
        self.store.as_ref().is_some_and(TagValueStore::is_dirty)
    }

    pub fn is_pending_resize(&self) -> bool {
        self.store
            .as_ref()
            .is_some_and(TagValueStore::is_pending_resize)
    }
}

fn element_matches<T: TagElement>(data_type: DataType) -> bool {
    let accepted = T::accepts(data_type);
    debug_assert!(
        accepted,
        "{} value accessed with the wrong element type",
        data_type.name()
    );
    accepted
}

fn widen<T: Into<f64>>(values: Vec<T>) -> Vec<f64> {
    values.into_iter().map(Into::into).collect()
}

// =============================================================================
// Tests
// =============================================================================
