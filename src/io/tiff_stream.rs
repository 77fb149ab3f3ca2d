//! Seekable host stream with free-space management.
//!
//! [`TiffStream`] wraps any `Read + Write + Seek` handle (a `File`, a
//! `Cursor<Vec<u8>>`, ...) and implements [`TagStream`] on top of it.
//!
//! # Allocation
//!
//! Space for tag payloads and directories is handed out by `check_alloc`:
//!
//! 1. A block that still fits is reused in place (its tail is released).
//! 2. Otherwise the old block is released and the first free block large
//!    enough is taken.
//! 3. Failing that, space is appended at the word-aligned end of the file.
//!
//! Released blocks are kept sorted and adjacent blocks coalesce.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use serde::Serialize;
use tracing::debug;

use crate::error::IoError;

use super::stream::TagStream;

/// A free region of the host file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeBlock {
    /// Start of the region
    pub offset: u64,
    /// Size of the region in bytes
    pub size: u64,
}

impl FreeBlock {
    #[inline]
    fn end(&self) -> u64 {
        self.offset + self.size
    }

    #[inline]
    fn overlaps(&self, offset: u64, size: u64) -> bool {
        size > 0 && offset < self.end() && self.offset < offset + size
    }
}

/// A [`TagStream`] over a std I/O handle.
pub struct TiffStream<T> {
    inner: T,
    identifier: String,
    position: u64,
    len: u64,
    /// End of the allocated region; may run ahead of `len` until written
    allocated_end: u64,
    free_blocks: Vec<FreeBlock>,
}

impl<T: Read + Write + Seek> TiffStream<T> {
    /// Wrap an I/O handle. The current size is taken from the handle.
    pub fn new(mut inner: T, identifier: impl Into<String>) -> Result<Self, IoError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            identifier: identifier.into(),
            position: 0,
            len,
            allocated_end: len,
            free_blocks: Vec::new(),
        })
    }

    /// Seed the free-block list, typically from the FreeOffsets and
    /// FreeByteCounts tags of the first directory.
    pub fn with_free_blocks(mut self, blocks: impl IntoIterator<Item = FreeBlock>) -> Self {
        for block in blocks {
            self.release(block.offset, block.size);
        }
        self
    }

    /// Current free-block list, sorted by offset.
    pub fn free_blocks(&self) -> &[FreeBlock] {
        &self.free_blocks
    }

    /// Total number of free bytes.
    pub fn free_bytes(&self) -> u64 {
        self.free_blocks.iter().map(|b| b.size).sum()
    }

    /// Unwrap the underlying handle.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn release(&mut self, offset: u64, size: u64) {
        if offset == 0 || size == 0 {
            return;
        }

        let index = self
            .free_blocks
            .partition_point(|block| block.offset < offset);
        self.free_blocks.insert(index, FreeBlock { offset, size });

        // Coalesce with neighbours
        let mut merged: Vec<FreeBlock> = Vec::with_capacity(self.free_blocks.len());
        for block in self.free_blocks.drain(..) {
            match merged.last_mut() {
                Some(last) if last.end() >= block.offset => {
                    let end = last.end().max(block.end());
                    last.size = end - last.offset;
                }
                _ => merged.push(block),
            }
        }
        self.free_blocks = merged;
    }

    /// Reload the cached position from the handle after a failed transfer.
    fn resync_position(&mut self) {
        match self.inner.stream_position() {
            Ok(position) => self.position = position,
            Err(error) => debug!(
                identifier = %self.identifier,
                error = %error,
                "Stream position unknown after a failed transfer"
            ),
        }
    }

    fn take_free_block(&mut self, size: u64) -> Option<u64> {
        let index = self.free_blocks.iter().position(|block| block.size >= size)?;
        let block = &mut self.free_blocks[index];
        let offset = block.offset;
        if block.size == size {
            self.free_blocks.remove(index);
        } else {
            block.offset += size;
            block.size -= size;
        }
        Some(offset)
    }

    fn append(&mut self, size: u64) -> u64 {
        // TIFF values start on a word boundary
        let offset = (self.allocated_end.max(self.len) + 1) & !1;
        self.allocated_end = offset + size;
        offset
    }
}

impl TiffStream<Cursor<Vec<u8>>> {
    /// Create a stream over an in-memory buffer.
    pub fn in_memory(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self {
            inner: Cursor::new(bytes),
            identifier: "memory://".to_string(),
            position: 0,
            len,
            allocated_end: len,
            free_blocks: Vec::new(),
        }
    }

    /// Borrow the in-memory contents.
    pub fn bytes(&self) -> &[u8] {
        self.inner.get_ref()
    }
}

impl<T: Read + Write + Seek> TagStream for TiffStream<T> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), IoError> {
        let requested = buf.len() as u64;
        if self.position.saturating_add(requested) > self.len {
            return Err(IoError::RangeOutOfBounds {
                offset: self.position,
                requested,
                size: self.len,
            });
        }
        if let Err(error) = self.inner.read_exact(buf) {
            self.resync_position();
            return Err(error.into());
        }
        self.position += requested;
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), IoError> {
        let result = self.inner.write_all(buf);
        match result {
            Ok(()) => self.position += buf.len() as u64,
            // A partial write still moved the handle
            Err(_) => self.resync_position(),
        }
        self.len = self.len.max(self.position);
        result.map_err(IoError::from)
    }

    fn seek(&mut self, offset: u64) -> Result<(), IoError> {
        let reached = self
            .inner
            .seek(SeekFrom::Start(offset))
            .map_err(|_| IoError::Seek(offset))?;
        if reached != offset {
            return Err(IoError::Seek(offset));
        }
        self.position = offset;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn size(&self) -> u64 {
        self.len
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn check_alloc(&mut self, offset: u64, previous_size: u64, new_size: u64) -> u64 {
        if offset != 0 && new_size <= previous_size {
            self.release(offset + new_size, previous_size - new_size);
            return offset;
        }

        self.release(offset, previous_size);
        let allocated = match self.take_free_block(new_size) {
            Some(reused) => reused,
            None => self.append(new_size),
        };
        debug!(
            stream = %self.identifier,
            previous = offset,
            offset = allocated,
            size = new_size,
            "Allocated block"
        );
        allocated
    }

    fn check_alloc_without_update(
        &mut self,
        offset: u64,
        previous_size: u64,
        new_size: u64,
    ) -> u64 {
        if offset != 0 && new_size <= previous_size {
            return offset;
        }
        self.append(new_size)
    }

    fn overlaps_free_blocks(&self, offset: u64, size: u64) -> bool {
        self.free_blocks
            .iter()
            .any(|block| block.overlaps(offset, size))
    }
}

// =============================================================================
// Tests
// =============================================================================
