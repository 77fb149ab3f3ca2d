//! TIFF directory entries.
//!
//! This module reads and writes the tag entries of TIFF and BigTIFF image
//! file directories.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. Every multi-byte count, offset and value follows it.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 12-byte entries with 32-bit counts
//!   and offsets, BigTIFF uses 20-byte entries with 64-bit ones. A [`DirectoryLayout`]
//!   carries the difference.
//!
//! - **Inline vs offset values**: Values of up to 4 bytes (8 in BigTIFF) are stored in the
//!   entry itself, larger values at an offset the entry points to.
//!
//! - **Tag definitions**: Each tag accepts a set of data types and a count rule. The
//!   [`TagInfo`] table drives how entries are checked and how new ones are created.

mod definition;
mod directory;
mod entry;
mod parser;
mod store;
mod tags;
mod values;

pub use definition::TagDefinition;
pub use directory::{Directory, MAX_DIRECTORY_ENTRIES};
pub use entry::{Access, TagEntryCodec};
pub use parser::{ByteOrder, DirectoryLayout, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use store::{TagValueStore, ValueStorage, INLINE_CAPACITY};
pub use tags::{
    DataType, TagCount, TagDescriptor, TagInfo, TiffTag, MAX_SAMPLES_PER_PIXEL,
};
pub use values::{decode_elements, encode_elements, Rational, SRational, TagElement};
