//! TIFF header, byte order and directory layout.
//!
//! # TIFF Header Structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (43 = 0x002B)
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved (must be 0)
//! Bytes 8-15: Offset to first IFD (8 bytes)
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::TiffError;
use crate::io::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, TagStream,
};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
///
/// TIFF files declare their byte order in the first two bytes of the header.
/// All multi-byte values in the file must be read respecting this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the machine running this code.
    #[inline]
    pub const fn host() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// The other byte order.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
        }
    }

    /// Whether values in this order must be swapped to be used on the host.
    #[inline]
    pub fn needs_swap(self) -> bool {
        self != Self::host()
    }

    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }

    /// Append a u16 in this byte order.
    #[inline]
    pub fn put_u16(self, buf: &mut impl BufMut, value: u16) {
        match self {
            ByteOrder::LittleEndian => buf.put_u16_le(value),
            ByteOrder::BigEndian => buf.put_u16(value),
        }
    }

    /// Append a u32 in this byte order.
    #[inline]
    pub fn put_u32(self, buf: &mut impl BufMut, value: u32) {
        match self {
            ByteOrder::LittleEndian => buf.put_u32_le(value),
            ByteOrder::BigEndian => buf.put_u32(value),
        }
    }

    /// Append a u64 in this byte order.
    #[inline]
    pub fn put_u64(self, buf: &mut impl BufMut, value: u64) {
        match self {
            ByteOrder::LittleEndian => buf.put_u64_le(value),
            ByteOrder::BigEndian => buf.put_u64(value),
        }
    }
}

// =============================================================================
// DirectoryLayout
// =============================================================================

/// How directories of one file are laid out on disk.
///
/// Passed by value into every codec; it never changes for an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLayout {
    /// Whether counts and offsets are 64-bit
    pub is_bigtiff: bool,

    /// Byte order of every multi-byte value in the file
    pub byte_order: ByteOrder,
}

impl DirectoryLayout {
    /// Classic TIFF layout.
    pub const fn classic(byte_order: ByteOrder) -> Self {
        Self {
            is_bigtiff: false,
            byte_order,
        }
    }

    /// BigTIFF layout.
    pub const fn bigtiff(byte_order: ByteOrder) -> Self {
        Self {
            is_bigtiff: true,
            byte_order,
        }
    }

    /// Size of an IFD entry in bytes.
    ///
    /// Classic TIFF: 12 bytes (2 tag + 2 type + 4 count + 4 value/offset)
    /// BigTIFF: 20 bytes (2 tag + 2 type + 8 count + 8 value/offset)
    #[inline]
    pub const fn entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count field at the start of an IFD.
    #[inline]
    pub const fn count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of the value/offset field in an IFD entry.
    ///
    /// This is also the inline threshold: values up to this many bytes are
    /// stored in the entry itself.
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Whether a payload of `length` bytes is stored in the entry itself.
    #[inline]
    pub const fn fits_inline(&self, length: u64) -> bool {
        length <= self.value_offset_size() as u64
    }

    /// Size of a whole directory with `entry_count` entries, including the
    /// entry count and the next-IFD offset.
    #[inline]
    pub const fn directory_size(&self, entry_count: usize) -> usize {
        self.count_size() + entry_count * self.entry_size() + self.value_offset_size()
    }

    /// Read an offset-sized value (u32 or u64) from raw bytes.
    #[inline]
    pub fn read_offset(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u32(bytes) as u64
        }
    }

    /// Append an offset-sized value (u32 or u64).
    ///
    /// Classic offsets are truncated to 32 bits; callers check the range.
    #[inline]
    pub fn put_offset(&self, buf: &mut impl BufMut, value: u64) {
        if self.is_bigtiff {
            self.byte_order.put_u64(buf, value);
        } else {
            self.byte_order.put_u32(buf, value as u32);
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
///
/// Contains the essential information needed to begin parsing IFDs:
/// - Byte order for reading all subsequent values
/// - Whether this is classic TIFF or BigTIFF (affects entry sizes and offset widths)
/// - Location of the first IFD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Build a header for a new file.
    pub fn new(layout: DirectoryLayout, first_ifd_offset: u64) -> Self {
        Self {
            byte_order: layout.byte_order,
            is_bigtiff: layout.is_bigtiff,
            first_ifd_offset,
        }
    }

    /// Parse a TIFF header from raw bytes.
    ///
    /// The input must contain at least 8 bytes for classic TIFF or 16 bytes for BigTIFF.
    ///
    /// # Errors
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 or 43
    /// - `InvalidBigTiffOffsetSize` if BigTIFF offset size is not 8
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `InvalidIfdOffset` if the first IFD offset is outside the file
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // Read as little-endian: we are matching byte patterns, not values
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);

        let (is_bigtiff, first_ifd_offset) = match version {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }

                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }

                // Bytes 6-7 are reserved; not enforced
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            _ => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Read and parse the header at the start of a stream.
    pub fn read<S: TagStream>(stream: &mut S) -> Result<Self, TiffError> {
        let available = stream.size().min(BIGTIFF_HEADER_SIZE as u64) as usize;
        let mut bytes = vec![0u8; available];
        stream.seek(0)?;
        stream.read_exact(&mut bytes)?;
        Self::parse(&bytes, stream.size())
    }

    /// Encode the header.
    pub fn encode(&self) -> Bytes {
        let layout = self.layout();
        let mut buf = BytesMut::with_capacity(self.size());
        match self.byte_order {
            ByteOrder::LittleEndian => buf.put_u16_le(BYTE_ORDER_LITTLE_ENDIAN),
            ByteOrder::BigEndian => buf.put_u16_le(BYTE_ORDER_BIG_ENDIAN),
        }
        if self.is_bigtiff {
            self.byte_order.put_u16(&mut buf, VERSION_BIGTIFF);
            self.byte_order.put_u16(&mut buf, 8);
            self.byte_order.put_u16(&mut buf, 0);
        } else {
            self.byte_order.put_u16(&mut buf, VERSION_TIFF);
        }
        layout.put_offset(&mut buf, self.first_ifd_offset);
        buf.freeze()
    }

    /// Write the header at the start of a stream.
    pub fn write<S: TagStream>(&self, stream: &mut S) -> Result<(), TiffError> {
        stream.seek(0)?;
        stream.write_all(&self.encode())?;
        Ok(())
    }

    /// Size of this header in bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        if self.is_bigtiff {
            BIGTIFF_HEADER_SIZE
        } else {
            TIFF_HEADER_SIZE
        }
    }

    /// Directory layout described by this header.
    #[inline]
    pub const fn layout(&self) -> DirectoryLayout {
        DirectoryLayout {
            is_bigtiff: self.is_bigtiff,
            byte_order: self.byte_order,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
