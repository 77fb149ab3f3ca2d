//! In-memory storage of one tag value.
//!
//! Small values live in a fixed 8-byte array ([`ValueStorage::Inline`]);
//! anything larger gets its own buffer ([`ValueStorage::Owned`]). Values are
//! always copied in: the inline array never aliases the record's
//! value/offset field.

use crate::io::swap_words;

use super::tags::DataType;

/// Capacity of the inline array: the widest value/offset field.
pub const INLINE_CAPACITY: usize = 8;

/// Bytes of a tag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueStorage {
    /// Value small enough for the record's value/offset field
    Inline { bytes: [u8; INLINE_CAPACITY], len: u8 },
    /// Value stored out of line
    Owned(Vec<u8>),
}

impl Default for ValueStorage {
    fn default() -> Self {
        ValueStorage::Inline {
            bytes: [0; INLINE_CAPACITY],
            len: 0,
        }
    }
}

impl ValueStorage {
    /// Storage for `bytes`, inline when they fit in `threshold` bytes.
    pub fn from_vec(bytes: Vec<u8>, threshold: usize) -> Self {
        if bytes.len() <= threshold.min(INLINE_CAPACITY) {
            Self::inline(&bytes)
        } else {
            ValueStorage::Owned(bytes)
        }
    }

    /// Inline storage holding a copy of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes` is longer than [`INLINE_CAPACITY`].
    pub fn inline(bytes: &[u8]) -> Self {
        let mut raw = [0u8; INLINE_CAPACITY];
        raw[..bytes.len()].copy_from_slice(bytes);
        ValueStorage::Inline {
            bytes: raw,
            len: bytes.len() as u8,
        }
    }

    /// Zero-filled storage of `len` bytes.
    pub fn zeroed(len: usize, threshold: usize) -> Self {
        Self::from_vec(vec![0; len], threshold)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ValueStorage::Inline { bytes, len } => &bytes[..*len as usize],
            ValueStorage::Owned(bytes) => bytes,
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            ValueStorage::Inline { bytes, len } => &mut bytes[..*len as usize],
            ValueStorage::Owned(bytes) => bytes,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self, ValueStorage::Inline { .. })
    }

    /// Make sure the last byte is NUL, appending one if needed.
    ///
    /// Grows in place while the inline array has room; otherwise the bytes
    /// move to an owned buffer. Returns `true` when a byte was appended.
    pub fn ensure_nul_terminated(&mut self) -> bool {
        if self.as_slice().last() == Some(&0) {
            return false;
        }
        match self {
            ValueStorage::Inline { bytes, len } if (*len as usize) < INLINE_CAPACITY => {
                bytes[*len as usize] = 0;
                *len += 1;
            }
            ValueStorage::Inline { bytes, len } => {
                let mut owned = bytes[..*len as usize].to_vec();
                owned.push(0);
                *self = ValueStorage::Owned(owned);
            }
            ValueStorage::Owned(bytes) => bytes.push(0),
        }
        true
    }
}

/// Value of one directory entry plus its on-disk bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct TagValueStore {
    storage: ValueStorage,
    count: u64,
    /// File offset of an out-of-line payload, 0 when never allocated
    offset: u64,
    /// Raw value/offset field as read, in file byte order
    value_field: [u8; INLINE_CAPACITY],
    size_on_disk: u64,
    dirty: bool,
    needs_byte_swap: bool,
    pending_resize: bool,
}

impl TagValueStore {
    /// Empty store for an entry created programmatically.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store with `count` zeroed elements.
    pub fn zeroed(count: u64, data_type: DataType, threshold: usize) -> Self {
        let len = count as usize * data_type.size_in_bytes();
        let mut storage = ValueStorage::zeroed(len, threshold);
        if data_type == DataType::Ascii {
            storage.ensure_nul_terminated();
        }
        Self {
            storage,
            count,
            ..Self::default()
        }
    }

    /// Store with room reserved for `capacity` elements and no value yet.
    pub fn with_capacity(capacity: u64, data_type: DataType) -> Self {
        let len = capacity as usize * data_type.size_in_bytes();
        Self {
            storage: ValueStorage::Owned(Vec::with_capacity(len)),
            ..Self::default()
        }
    }

    /// Store for a parsed directory record; the payload is not loaded yet.
    pub fn from_record(count: u64, offset: u64, value_field: [u8; INLINE_CAPACITY]) -> Self {
        Self {
            count,
            offset,
            value_field,
            ..Self::default()
        }
    }

    /// Install a payload read from a file.
    pub(crate) fn load(&mut self, storage: ValueStorage, needs_byte_swap: bool) {
        self.storage = storage;
        self.needs_byte_swap = needs_byte_swap;
        self.dirty = false;
        self.pending_resize = false;
    }

    /// Install a payload set programmatically (host byte order).
    pub(crate) fn assign(&mut self, bytes: Vec<u8>, count: u64, threshold: usize, resized: bool) {
        self.storage = ValueStorage::from_vec(bytes, threshold);
        self.count = count;
        self.dirty = true;
        self.needs_byte_swap = false;
        if resized {
            self.pending_resize = true;
        }
    }

    /// Swap a file-order payload to host order, once.
    pub(crate) fn swap_to_host(&mut self, data_type: DataType) {
        if self.needs_byte_swap {
            self.swap_in_place(data_type);
        }
    }

    /// Reverse the byte order of every element and flip `needs_byte_swap`.
    ///
    /// Single-byte types are left alone.
    pub(crate) fn swap_in_place(&mut self, data_type: DataType) {
        if let Some(word_size) = data_type.swap_word_size() {
            let len = self.payload_len(data_type);
            swap_words(&mut self.storage.as_mut_slice()[..len], word_size);
            self.needs_byte_swap = !self.needs_byte_swap;
        }
    }

    /// Bytes of the payload proper, clamped to what is held.
    pub(crate) fn payload_len(&self, data_type: DataType) -> usize {
        let wanted = data_type
            .byte_length(self.count)
            .unwrap_or(u64::MAX)
            .min(usize::MAX as u64) as usize;
        wanted.min(self.storage.len())
    }

    #[inline]
    pub(crate) fn storage_mut(&mut self) -> &mut ValueStorage {
        &mut self.storage
    }

    #[inline]
    pub(crate) fn set_count(&mut self, count: u64) {
        self.count = count;
    }

    #[inline]
    pub(crate) fn set_allocation(&mut self, offset: u64, size_on_disk: u64) {
        self.offset = offset;
        self.size_on_disk = size_on_disk;
    }

    #[inline]
    pub(crate) fn mark_written(&mut self) {
        self.dirty = false;
        self.pending_resize = false;
    }

    #[inline]
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Drop the on-disk allocation so the next write reallocates.
    pub(crate) fn force_reallocation(&mut self) {
        self.offset = 0;
        self.size_on_disk = 0;
        self.pending_resize = true;
        self.dirty = true;
    }

    /// Raw bytes currently held (file order while a swap is pending).
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.storage.as_slice()
    }

    /// Number of elements.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// File offset of the payload (meaningful for out-of-line values).
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The record's value/offset field as read from the file.
    #[inline]
    pub fn value_field(&self) -> &[u8; INLINE_CAPACITY] {
        &self.value_field
    }

    #[inline]
    pub fn size_on_disk(&self) -> u64 {
        self.size_on_disk
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn needs_byte_swap(&self) -> bool {
        self.needs_byte_swap
    }

    #[inline]
    pub fn is_stored_inline(&self) -> bool {
        self.storage.is_inline()
    }

    #[inline]
    pub fn is_pending_resize(&self) -> bool {
        self.pending_resize
    }
}
