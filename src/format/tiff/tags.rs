//! TIFF tag and data type definitions.
//!
//! This module defines the vocabulary of directory entries:
//! - Data types that determine how values are encoded
//! - Count rules (fixed arity or one of the open-ended sentinels)
//! - The tag table that maps tag ids to their expected type and arity
//!
//! The definitions support both classic TIFF and BigTIFF formats.

use std::collections::BTreeMap;

// =============================================================================
// Data Types
// =============================================================================

/// TIFF data types that determine how values are encoded.
///
/// Each type has a fixed element size, which drives:
/// - Whether a value fits inline in an IFD entry
/// - The word width used when swapping byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DataType {
    /// Unsigned 8-bit integer
    Byte = 1,
    /// 8-bit character, NUL-terminated
    Ascii = 2,
    /// Unsigned 16-bit integer
    Short = 3,
    /// Unsigned 32-bit integer
    Long = 4,
    /// Two LONGs: numerator, denominator
    Rational = 5,
    /// Signed 8-bit integer
    SByte = 6,
    /// Opaque bytes
    Undefined = 7,
    /// Signed 16-bit integer
    SShort = 8,
    /// Signed 32-bit integer
    SLong = 9,
    /// Two SLONGs: numerator, denominator
    SRational = 10,
    /// IEEE single precision
    Float = 11,
    /// IEEE double precision
    Double = 12,
    /// 32-bit offset to a sub-IFD
    Ifd = 13,
    /// Unsigned 64-bit integer (BigTIFF)
    Long64 = 16,
    /// Signed 64-bit integer (BigTIFF)
    SLong64 = 17,
    /// 64-bit offset to a sub-IFD (BigTIFF)
    Ifd64 = 18,
    /// 16-bit character string, NUL-terminated (private type)
    AsciiW = 19,
}

impl DataType {
    /// Create a DataType from its numeric value.
    ///
    /// Returns `None` for unknown type values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(DataType::Byte),
            2 => Some(DataType::Ascii),
            3 => Some(DataType::Short),
            4 => Some(DataType::Long),
            5 => Some(DataType::Rational),
            6 => Some(DataType::SByte),
            7 => Some(DataType::Undefined),
            8 => Some(DataType::SShort),
            9 => Some(DataType::SLong),
            10 => Some(DataType::SRational),
            11 => Some(DataType::Float),
            12 => Some(DataType::Double),
            13 => Some(DataType::Ifd),
            16 => Some(DataType::Long64),
            17 => Some(DataType::SLong64),
            18 => Some(DataType::Ifd64),
            19 => Some(DataType::AsciiW),
            _ => None,
        }
    }

    /// Numeric value written to the directory record.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::Byte | DataType::Ascii | DataType::SByte | DataType::Undefined => 1,
            DataType::Short | DataType::SShort | DataType::AsciiW => 2,
            DataType::Long | DataType::SLong | DataType::Float | DataType::Ifd => 4,
            DataType::Rational
            | DataType::SRational
            | DataType::Double
            | DataType::Long64
            | DataType::SLong64
            | DataType::Ifd64 => 8,
        }
    }

    /// Width of the words reversed when the byte order is swapped.
    ///
    /// Rationals are two 32-bit words per element. Single-byte types are
    /// never swapped.
    #[inline]
    pub const fn swap_word_size(self) -> Option<usize> {
        match self {
            DataType::Byte | DataType::Ascii | DataType::SByte | DataType::Undefined => None,
            DataType::Short | DataType::SShort | DataType::AsciiW => Some(2),
            DataType::Long
            | DataType::SLong
            | DataType::Float
            | DataType::Ifd
            | DataType::Rational
            | DataType::SRational => Some(4),
            DataType::Double | DataType::Long64 | DataType::SLong64 | DataType::Ifd64 => Some(8),
        }
    }

    /// Whether the value is a NUL-terminated string.
    #[inline]
    pub const fn is_text(self) -> bool {
        matches!(self, DataType::Ascii | DataType::AsciiW)
    }

    /// Human-readable name, as used in TIFF documentation.
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Byte => "BYTE",
            DataType::Ascii => "ASCII",
            DataType::Short => "SHORT",
            DataType::Long => "LONG",
            DataType::Rational => "RATIONAL",
            DataType::SByte => "SBYTE",
            DataType::Undefined => "UNDEFINED",
            DataType::SShort => "SSHORT",
            DataType::SLong => "SLONG",
            DataType::SRational => "SRATIONAL",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Ifd => "IFD",
            DataType::Long64 => "LONG64",
            DataType::SLong64 => "SLONG64",
            DataType::Ifd64 => "IFD64",
            DataType::AsciiW => "ASCIIW",
        }
    }

    /// Total payload size for `count` elements, `None` on overflow.
    #[inline]
    pub fn byte_length(self, count: u64) -> Option<u64> {
        count.checked_mul(self.size_in_bytes() as u64)
    }
}

// =============================================================================
// Counts
// =============================================================================

/// Upper bound on samples per pixel for sample-count tags.
pub const MAX_SAMPLES_PER_PIXEL: u32 = 48;

/// Expected number of elements for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCount {
    /// Exactly this many elements
    Fixed(u32),
    /// Any count is accepted
    Any,
    /// Count varies with the image (strip tables, strings, ...)
    Variable,
    /// One element per sample, bounded by the given maximum
    UseSampleCount(u32),
}

impl TagCount {
    /// One element per sample, up to [`MAX_SAMPLES_PER_PIXEL`].
    pub const SAMPLES: TagCount = TagCount::UseSampleCount(MAX_SAMPLES_PER_PIXEL);
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// Well-known TIFF tag ids.
///
/// Tags not listed here are still read; they get an anonymous definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    NewSubfileType = 254,
    SubfileType = 255,
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    Threshholding = 263,
    FillOrder = 266,
    DocumentName = 269,
    ImageDescription = 270,
    Make = 271,
    Model = 272,
    StripOffsets = 273,
    Orientation = 274,
    SamplesPerPixel = 277,
    RowsPerStrip = 278,
    StripByteCounts = 279,
    MinSampleValue = 280,
    MaxSampleValue = 281,
    XResolution = 282,
    YResolution = 283,
    PlanarConfiguration = 284,
    PageName = 285,
    XPosition = 286,
    YPosition = 287,
    /// Offsets of the unused blocks of the file
    FreeOffsets = 288,
    /// Sizes of the unused blocks of the file
    FreeByteCounts = 289,
    ResolutionUnit = 296,
    PageNumber = 297,
    Software = 305,
    DateTime = 306,
    Artist = 315,
    HostComputer = 316,
    Predictor = 317,
    WhitePoint = 318,
    PrimaryChromaticities = 319,
    ColorMap = 320,
    HalftoneHints = 321,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    SubIfds = 330,
    InkSet = 332,
    ExtraSamples = 338,
    SampleFormat = 339,
    JpegTables = 347,
    YCbCrCoefficients = 529,
    YCbCrSubSampling = 530,
    YCbCrPositioning = 531,
    ReferenceBlackWhite = 532,
    Copyright = 33432,
    ModelPixelScale = 33550,
    ModelTiepoint = 33922,
    ModelTransformation = 34264,
    ExifIfd = 34665,
    GeoKeyDirectory = 34735,
    GeoDoubleParams = 34736,
    GeoAsciiParams = 34737,
    GpsIfd = 34853,
}

impl TiffTag {
    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether this tag id belongs to the free-block list.
    #[inline]
    pub fn is_free_block_tag(tag_id: u16) -> bool {
        tag_id == TiffTag::FreeOffsets.as_u16() || tag_id == TiffTag::FreeByteCounts.as_u16()
    }
}

// =============================================================================
// Tag Table
// =============================================================================

/// Static description of one tag: its accepted types and arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDescriptor {
    /// Numeric tag id
    pub tag_id: u16,

    /// Display name
    pub name: &'static str,

    /// Types accepted when reading; the first one is written by classic TIFF
    pub data_types: &'static [DataType],

    /// Type written by BigTIFF when it differs (offset tables)
    pub bigtiff_data_type: Option<DataType>,

    /// Expected count when reading
    pub read_count: TagCount,

    /// Expected count when writing
    pub write_count: TagCount,
}

impl TagDescriptor {
    /// Describe a tag with the same read and write arity.
    pub const fn new(
        tag_id: u16,
        name: &'static str,
        data_types: &'static [DataType],
        count: TagCount,
    ) -> Self {
        Self {
            tag_id,
            name,
            data_types,
            bigtiff_data_type: None,
            read_count: count,
            write_count: count,
        }
    }

    /// Use a different data type when writing BigTIFF.
    pub const fn with_bigtiff_type(mut self, data_type: DataType) -> Self {
        self.bigtiff_data_type = Some(data_type);
        self
    }

    /// Use a different arity when reading.
    pub const fn with_read_count(mut self, count: TagCount) -> Self {
        self.read_count = count;
        self
    }

    /// Type used when creating this tag programmatically.
    pub fn write_type(&self, is_bigtiff: bool) -> Option<DataType> {
        match self.bigtiff_data_type {
            Some(data_type) if is_bigtiff => Some(data_type),
            _ => self.data_types.first().copied(),
        }
    }

    /// Whether a value of `data_type` is acceptable for this tag.
    pub fn accepts(&self, data_type: DataType) -> bool {
        self.data_types.contains(&data_type) || self.bigtiff_data_type == Some(data_type)
    }
}

use self::DataType::{Ascii, Double, Ifd, Ifd64, Long, Long64, Rational, Short, Undefined};

const SHORT: &[DataType] = &[Short];
const LONG: &[DataType] = &[Long];
const SHORT_OR_LONG: &[DataType] = &[Long, Short];
const OFFSETS: &[DataType] = &[Long, Short, Long64];
const IFD_POINTER: &[DataType] = &[Long, Ifd, Long64, Ifd64];
const RATIONAL: &[DataType] = &[Rational];
const ASCII: &[DataType] = &[Ascii];
const DOUBLE: &[DataType] = &[Double];
const UNDEFINED: &[DataType] = &[Undefined];

/// Baseline, extension, GeoTIFF and EXIF pointer tags.
static BASELINE_TAGS: &[TagDescriptor] = &[
    TagDescriptor::new(254, "NewSubfileType", LONG, TagCount::Fixed(1)),
    TagDescriptor::new(255, "SubfileType", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(256, "ImageWidth", SHORT_OR_LONG, TagCount::Fixed(1)),
    TagDescriptor::new(257, "ImageLength", SHORT_OR_LONG, TagCount::Fixed(1)),
    TagDescriptor::new(258, "BitsPerSample", SHORT, TagCount::SAMPLES),
    TagDescriptor::new(259, "Compression", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(262, "PhotometricInterpretation", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(263, "Threshholding", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(266, "FillOrder", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(269, "DocumentName", ASCII, TagCount::Variable),
    TagDescriptor::new(270, "ImageDescription", ASCII, TagCount::Variable),
    TagDescriptor::new(271, "Make", ASCII, TagCount::Variable),
    TagDescriptor::new(272, "Model", ASCII, TagCount::Variable),
    TagDescriptor::new(273, "StripOffsets", OFFSETS, TagCount::Variable).with_bigtiff_type(Long64),
    TagDescriptor::new(274, "Orientation", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(277, "SamplesPerPixel", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(278, "RowsPerStrip", SHORT_OR_LONG, TagCount::Fixed(1)),
    TagDescriptor::new(279, "StripByteCounts", OFFSETS, TagCount::Variable)
        .with_bigtiff_type(Long64),
    TagDescriptor::new(280, "MinSampleValue", SHORT, TagCount::SAMPLES),
    TagDescriptor::new(281, "MaxSampleValue", SHORT, TagCount::SAMPLES),
    TagDescriptor::new(282, "XResolution", RATIONAL, TagCount::Fixed(1)),
    TagDescriptor::new(283, "YResolution", RATIONAL, TagCount::Fixed(1)),
    TagDescriptor::new(284, "PlanarConfiguration", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(285, "PageName", ASCII, TagCount::Variable),
    TagDescriptor::new(286, "XPosition", RATIONAL, TagCount::Fixed(1)),
    TagDescriptor::new(287, "YPosition", RATIONAL, TagCount::Fixed(1)),
    TagDescriptor::new(288, "FreeOffsets", OFFSETS, TagCount::Variable).with_bigtiff_type(Long64),
    TagDescriptor::new(289, "FreeByteCounts", OFFSETS, TagCount::Variable)
        .with_bigtiff_type(Long64),
    TagDescriptor::new(296, "ResolutionUnit", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(297, "PageNumber", SHORT, TagCount::Fixed(2)),
    TagDescriptor::new(305, "Software", ASCII, TagCount::Variable),
    TagDescriptor::new(306, "DateTime", ASCII, TagCount::Fixed(20))
        .with_read_count(TagCount::Variable),
    TagDescriptor::new(315, "Artist", ASCII, TagCount::Variable),
    TagDescriptor::new(316, "HostComputer", ASCII, TagCount::Variable),
    TagDescriptor::new(317, "Predictor", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(318, "WhitePoint", RATIONAL, TagCount::Fixed(2)),
    TagDescriptor::new(319, "PrimaryChromaticities", RATIONAL, TagCount::Fixed(6)),
    TagDescriptor::new(320, "ColorMap", SHORT, TagCount::Variable),
    TagDescriptor::new(321, "HalftoneHints", SHORT, TagCount::Fixed(2)),
    TagDescriptor::new(322, "TileWidth", SHORT_OR_LONG, TagCount::Fixed(1)),
    TagDescriptor::new(323, "TileLength", SHORT_OR_LONG, TagCount::Fixed(1)),
    TagDescriptor::new(324, "TileOffsets", OFFSETS, TagCount::Variable).with_bigtiff_type(Long64),
    TagDescriptor::new(325, "TileByteCounts", OFFSETS, TagCount::Variable)
        .with_bigtiff_type(Long64),
    TagDescriptor::new(330, "SubIFDs", IFD_POINTER, TagCount::Variable).with_bigtiff_type(Ifd64),
    TagDescriptor::new(332, "InkSet", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(338, "ExtraSamples", SHORT, TagCount::Variable),
    TagDescriptor::new(339, "SampleFormat", SHORT, TagCount::SAMPLES),
    TagDescriptor::new(347, "JPEGTables", UNDEFINED, TagCount::Variable),
    TagDescriptor::new(529, "YCbCrCoefficients", RATIONAL, TagCount::Fixed(3)),
    TagDescriptor::new(530, "YCbCrSubSampling", SHORT, TagCount::Fixed(2)),
    TagDescriptor::new(531, "YCbCrPositioning", SHORT, TagCount::Fixed(1)),
    TagDescriptor::new(532, "ReferenceBlackWhite", RATIONAL, TagCount::Fixed(6)),
    TagDescriptor::new(33432, "Copyright", ASCII, TagCount::Variable),
    TagDescriptor::new(33550, "ModelPixelScaleTag", DOUBLE, TagCount::Variable),
    TagDescriptor::new(33922, "ModelTiepointTag", DOUBLE, TagCount::Variable),
    TagDescriptor::new(34264, "ModelTransformationTag", DOUBLE, TagCount::Fixed(16)),
    TagDescriptor::new(34665, "ExifIFD", IFD_POINTER, TagCount::Fixed(1)).with_bigtiff_type(Ifd64),
    TagDescriptor::new(34735, "GeoKeyDirectoryTag", SHORT, TagCount::Variable),
    TagDescriptor::new(34736, "GeoDoubleParamsTag", DOUBLE, TagCount::Variable),
    TagDescriptor::new(34737, "GeoAsciiParamsTag", ASCII, TagCount::Variable),
    TagDescriptor::new(34853, "GPSIFD", IFD_POINTER, TagCount::Fixed(1)).with_bigtiff_type(Ifd64),
];

/// Tag metadata table consulted when building definitions.
#[derive(Debug, Clone, Default)]
pub struct TagInfo {
    descriptors: BTreeMap<u16, TagDescriptor>,
}

impl TagInfo {
    /// An empty table: every tag read becomes anonymous.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard table.
    pub fn baseline() -> Self {
        BASELINE_TAGS
            .iter()
            .cloned()
            .fold(Self::empty(), Self::with_descriptor)
    }

    /// Add (or replace) a descriptor.
    pub fn with_descriptor(mut self, descriptor: TagDescriptor) -> Self {
        self.descriptors.insert(descriptor.tag_id, descriptor);
        self
    }

    /// Look up a tag id.
    pub fn get(&self, tag_id: u16) -> Option<&TagDescriptor> {
        self.descriptors.get(&tag_id)
    }

    /// Display name of a tag id, known or not.
    pub fn name_of(&self, tag_id: u16) -> String {
        match self.get(tag_id) {
            Some(descriptor) => descriptor.name.to_string(),
            None => format!("Tag{}", tag_id),
        }
    }

    /// Number of known tags.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
