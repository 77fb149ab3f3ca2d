//! # TIFF Tag Codec
//!
//! Reading and writing of TIFF and BigTIFF directory entries.
//!
//! Each tag of an Image File Directory is handled by a [`TagEntryCodec`],
//! which parses the fixed-size record, loads the value (stored inline in the
//! record or at a file offset), exposes it through typed getters and
//! setters, and writes it back in the file's byte order.
//!
//! ## Features
//!
//! - **Classic TIFF and BigTIFF**: 12- and 20-byte records, 32- and 64-bit counts and offsets
//! - **Both byte orders**: values are swapped lazily, on first typed access
//! - **Count checking**: fixed-arity tags are validated when read and written
//! - **Space management**: out-of-line values are allocated through the stream's free list
//!
//! ## Architecture
//!
//! - [`io`] - Stream abstraction ([`TagStream`]) and a std-backed implementation
//! - [`mod@format`] - Header, tag table, entry codec and directories
//! - [`dump`] - Directory listing used by the command-line tool
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust
//! use tiff_tag_codec::{ByteOrder, DirectoryLayout, TagEntryCodec, TagInfo, TiffStream};
//!
//! let info = TagInfo::baseline();
//! let layout = DirectoryLayout::classic(ByteOrder::LittleEndian);
//! let mut stream = TiffStream::in_memory(vec![0u8; 8]);
//!
//! // ImageWidth = 4096, stored inline
//! let mut width = TagEntryCodec::with_tag(&info, 256, layout);
//! width.set_value::<u32>(4096).unwrap();
//! width.write_data(&mut stream).unwrap();
//! width.write_tag_entry(&mut stream).unwrap();
//! assert!(width.is_stored_inline());
//! ```

pub mod config;
pub mod dump;
pub mod error;
pub mod format;
pub mod io;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, DumpConfig, OutputFormat};
pub use dump::{dump_stream, read_directories, DirectoryReport, EntryReport, FileReport};
pub use error::{DefinitionError, IoError, TagError, TiffError};
pub use format::tiff::{
    Access, ByteOrder, DataType, Directory, DirectoryLayout, Rational, SRational, TagCount,
    TagDefinition, TagDescriptor, TagElement, TagEntryCodec, TagInfo, TagValueStore, TiffHeader,
    TiffTag, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE,
};
pub use io::{FreeBlock, TagStream, TiffStream};
