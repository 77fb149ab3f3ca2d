use crate::error::IoError;

/// Trait for the seekable, allocating byte stream a directory lives in.
///
/// The codec never reaches into file handles directly; every payload and
/// record access goes through this abstraction. Implementations own the
/// free-space bookkeeping of the host file.
pub trait TagStream {
    /// Read exactly `buf.len()` bytes at the current position.
    ///
    /// Returns an error (and leaves `buf` unspecified) on a short read.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), IoError>;

    /// Write all of `buf` at the current position.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), IoError>;

    /// Move the cursor to an absolute offset.
    fn seek(&mut self, offset: u64) -> Result<(), IoError>;

    /// Current absolute position of the cursor.
    fn position(&self) -> u64;

    /// Total size of the stream in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this stream (for logging).
    fn identifier(&self) -> &str;

    /// Find room for `new_size` bytes.
    ///
    /// `offset`/`previous_size` describe the block currently held by the
    /// caller (`offset == 0` when nothing was allocated yet). The block is
    /// reused in place when `new_size` fits; otherwise it is released to the
    /// free list and a new offset is returned.
    fn check_alloc(&mut self, offset: u64, previous_size: u64, new_size: u64) -> u64;

    /// Same as [`check_alloc`](Self::check_alloc) without touching the
    /// free-block list.
    ///
    /// Used when the block being allocated holds the free-block list itself.
    fn check_alloc_without_update(&mut self, offset: u64, previous_size: u64, new_size: u64)
        -> u64;

    /// Whether `[offset, offset + size)` intersects any free block.
    fn overlaps_free_blocks(&self, offset: u64, size: u64) -> bool;
}

// =============================================================================
// Endian Helper Functions
// =============================================================================
//
// TIFF files can be either little-endian or big-endian, determined by the
// magic bytes at the start of the file. These helpers are used extensively
// by the record codec.

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a big-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Read a big-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_be(bytes: &[u8]) -> u64 {
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Reverse every `word_size`-byte word of `bytes` in place.
///
/// Trailing bytes that do not form a whole word are left untouched.
#[inline]
pub fn swap_words(bytes: &mut [u8], word_size: usize) {
    if word_size < 2 {
        return;
    }
    for word in bytes.chunks_exact_mut(word_size) {
        word.reverse();
    }
}
