//! Directory listing of a TIFF file.
//!
//! Walks the directory chain starting at the header and collects every tag
//! with its type, count and (abbreviated) values. The report serializes to
//! JSON and renders as text for the `dump` command.

use std::collections::HashSet;
use std::fmt::{self, Display};

use serde::Serialize;
use tracing::warn;

use crate::error::TiffError;
use crate::format::tiff::{
    ByteOrder, DataType, Directory, Rational, SRational, TagElement, TagEntryCodec, TagInfo,
    TiffHeader,
};
use crate::io::{FreeBlock, TagStream};

/// Directories read before the walk gives up.
pub const MAX_DIRECTORIES: usize = 100;

/// Report of a whole file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub identifier: String,
    pub byte_order: &'static str,
    pub bigtiff: bool,
    pub directories: Vec<DirectoryReport>,
    /// Free blocks listed in the first directory
    pub free_blocks: Vec<FreeBlock>,
    pub free_bytes: u64,
}

/// Report of one directory.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub index: usize,
    pub offset: u64,
    pub next_offset: u64,
    pub entries: Vec<EntryReport>,
}

/// Report of one tag.
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub tag: u16,
    pub name: String,
    pub data_type: &'static str,
    pub count: u64,
    pub inline: bool,
    /// Offset of the payload when stored out of line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    pub values: Vec<String>,
    /// Whether `values` was cut short
    pub truncated: bool,
}

impl EntryReport {
    /// Describe one entry, listing at most `max_values` values.
    pub fn from_codec(codec: &mut TagEntryCodec, max_values: usize) -> Option<Self> {
        let tag = codec.tag_id()?;
        let data_type = codec.data_type()?;
        let inline = data_type
            .byte_length(codec.count())
            .is_some_and(|length| codec.layout().fits_inline(length));

        let values = match data_type {
            DataType::Ascii | DataType::AsciiW => {
                vec![format!("{:?}", codec.get_string().unwrap_or_default())]
            }
            DataType::Byte => codec
                .get_bytes()
                .unwrap_or_default()
                .iter()
                .take(max_values)
                .map(ToString::to_string)
                .collect(),
            DataType::Undefined => codec
                .get_bytes()
                .unwrap_or_default()
                .iter()
                .take(max_values)
                .map(|byte| format!("0x{:02X}", byte))
                .collect(),
            DataType::SByte => render::<i8>(codec, max_values),
            DataType::Short => render::<u16>(codec, max_values),
            DataType::SShort => render::<i16>(codec, max_values),
            DataType::Long | DataType::Ifd => render::<u32>(codec, max_values),
            DataType::SLong => render::<i32>(codec, max_values),
            DataType::Long64 | DataType::Ifd64 => render::<u64>(codec, max_values),
            DataType::SLong64 => render::<i64>(codec, max_values),
            DataType::Float => render::<f32>(codec, max_values),
            DataType::Double => render::<f64>(codec, max_values),
            DataType::Rational => render::<Rational>(codec, max_values),
            DataType::SRational => render::<SRational>(codec, max_values),
        };

        let truncated = !data_type.is_text() && codec.count() > max_values as u64;
        Some(Self {
            tag,
            name: codec.name().to_string(),
            data_type: data_type.name(),
            count: codec.count(),
            inline,
            offset: (!inline).then(|| codec.offset()),
            values,
            truncated,
        })
    }
}

fn render<T: TagElement + Display>(codec: &mut TagEntryCodec, max_values: usize) -> Vec<String> {
    codec
        .get_values::<T>()
        .unwrap_or_default()
        .iter()
        .take(max_values)
        .map(ToString::to_string)
        .collect()
}

impl DirectoryReport {
    pub fn from_directory(index: usize, directory: &mut Directory, max_values: usize) -> Self {
        Self {
            index,
            offset: directory.offset(),
            next_offset: directory.next_offset(),
            entries: directory
                .iter_mut()
                .filter_map(|codec| EntryReport::from_codec(codec, max_values))
                .collect(),
        }
    }
}

/// Read the header and every directory of the chain.
///
/// The walk stops at a zero next offset, at a loop in the chain, or after
/// [`MAX_DIRECTORIES`] directories.
pub fn read_directories<S: TagStream>(
    stream: &mut S,
    info: &TagInfo,
) -> Result<(TiffHeader, Vec<Directory>), TiffError> {
    let header = TiffHeader::read(stream)?;
    let layout = header.layout();

    let mut directories = Vec::new();
    let mut visited = HashSet::new();
    let mut offset = header.first_ifd_offset;

    while offset != 0 {
        if directories.len() == MAX_DIRECTORIES {
            warn!(limit = MAX_DIRECTORIES, "Too many directories, stopping");
            break;
        }
        if !visited.insert(offset) {
            warn!(offset, "Directory chain loops back, stopping");
            break;
        }

        let directory = Directory::read(stream, info, layout, offset)?;
        offset = directory.next_offset();
        directories.push(directory);
    }

    Ok((header, directories))
}

/// Read every directory of `stream` and describe it.
pub fn dump_stream<S: TagStream>(
    stream: &mut S,
    info: &TagInfo,
    max_values: usize,
) -> Result<FileReport, TiffError> {
    let (header, mut directories) = read_directories(stream, info)?;

    let free_blocks = directories
        .first_mut()
        .map(Directory::free_blocks)
        .unwrap_or_default();
    let free_bytes = free_blocks.iter().map(|block| block.size).sum();

    Ok(FileReport {
        identifier: stream.identifier().to_string(),
        byte_order: match header.byte_order {
            ByteOrder::LittleEndian => "little-endian",
            ByteOrder::BigEndian => "big-endian",
        },
        bigtiff: header.is_bigtiff,
        directories: directories
            .iter_mut()
            .enumerate()
            .map(|(index, directory)| {
                DirectoryReport::from_directory(index, directory, max_values)
            })
            .collect(),
        free_blocks,
        free_bytes,
    })
}

impl Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}, {})",
            self.identifier,
            self.byte_order,
            if self.bigtiff { "BigTIFF" } else { "TIFF" }
        )?;

        for directory in &self.directories {
            writeln!(
                f,
                "Directory {} at offset {} (next {})",
                directory.index, directory.offset, directory.next_offset
            )?;
            for entry in &directory.entries {
                write!(
                    f,
                    "  {:>5} {:<28} {}[{}] = {}",
                    entry.tag,
                    entry.name,
                    entry.data_type,
                    entry.count,
                    entry.values.join(", ")
                )?;
                if entry.truncated {
                    write!(f, ", ...")?;
                }
                writeln!(f)?;
            }
        }

        write!(f, "BytesTotal in Freeblocks: {}", self.free_bytes)
    }
}
