use thiserror::Error;

/// I/O errors raised by a host stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// Requested range exceeds the stream bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Seek to an offset failed
    #[error("Seek to offset {0} failed")]
    Seek(u64),

    /// Error from the underlying I/O handle
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for IoError {
    fn from(error: std::io::Error) -> Self {
        IoError::Io(error.to_string())
    }
}

/// Errors raised while building a tag definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// Data type code is not one of the TIFF field types
    #[error("Unknown data type {data_type} for tag {tag_id}")]
    UnknownDataType { tag_id: u16, data_type: u16 },

    /// Tag id is missing from the tag table
    #[error("Unknown tag {0}")]
    UnknownTag(u16),

    /// The tag is known but does not accept this data type
    #[error("Tag {tag} does not accept data type {data_type}")]
    TypeMismatch { tag: String, data_type: &'static str },
}

/// Errors raised by a directory entry codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// Short read of a fixed-size directory record
    #[error("Cannot read directory entry: {0}")]
    DirectoryEntryRead(IoError),

    /// Short write of a fixed-size directory record
    #[error("Cannot write directory entry for tag {tag}: {source}")]
    DirectoryEntryWrite { tag: String, source: IoError },

    /// Short seek/read/write of a tag payload
    #[error("Cannot access data of tag {tag} (file id {file_tag_id}, {length} bytes)")]
    TagRead {
        tag: String,
        file_tag_id: u16,
        length: u64,
    },

    /// Count read from the file does not match the tag arity
    #[error("Incorrect count for tag {tag} read: got {count}, expected {expected}")]
    IncorrectCountForTagRead {
        tag: String,
        count: u64,
        expected: u32,
    },

    /// Count given to a setter does not match the tag arity
    #[error("Incorrect count for tag {tag} written: got {count}, expected {expected}")]
    IncorrectCountForTagWritten {
        tag: String,
        count: u64,
        expected: u32,
    },

    /// The tag definition could not be built
    #[error("Invalid tag definition: {0}")]
    InvalidDefinition(#[from] DefinitionError),

    /// The operation needs a value that has not been read or set
    #[error("Tag {0} holds no value")]
    NoValue(String),

    /// The entry has no tag definition
    #[error("Entry has no tag definition")]
    Undefined,
}

/// Errors that can occur when parsing or writing TIFF structure
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Error from a directory entry
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Directory declares more entries than any sane file carries
    #[error("Directory at offset {offset} declares {count} entries")]
    TooManyEntries { offset: u64, count: u64 },
}
