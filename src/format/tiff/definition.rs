//! Per-entry tag definition.
//!
//! A [`TagDefinition`] pins down what one directory entry is: its tag id,
//! the data type actually used, and the arity expected when reading and
//! writing. It is derived from the [`TagInfo`] table either up front (typed
//! construction) or from a parsed directory record.

use std::borrow::Cow;

use crate::error::DefinitionError;

use super::tags::{DataType, TagCount, TagInfo, TiffTag};

/// Metadata describing one tag of one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDefinition {
    tag_id: u16,
    name: Cow<'static, str>,
    data_type: DataType,
    read_count: TagCount,
    write_count: TagCount,
    is_bigtiff: bool,
}

impl TagDefinition {
    /// Definition of a known tag, using the type it is normally written with.
    ///
    /// # Errors
    /// `UnknownTag` if the id is missing from the table.
    pub fn for_tag(info: &TagInfo, tag_id: u16, is_bigtiff: bool) -> Result<Self, DefinitionError> {
        let descriptor = info.get(tag_id).ok_or(DefinitionError::UnknownTag(tag_id))?;
        let data_type = descriptor
            .write_type(is_bigtiff)
            .ok_or(DefinitionError::UnknownTag(tag_id))?;

        Ok(Self {
            tag_id,
            name: Cow::Borrowed(descriptor.name),
            data_type,
            read_count: descriptor.read_count,
            write_count: descriptor.write_count,
            is_bigtiff,
        })
    }

    /// Definition for a record read from a file.
    ///
    /// Unknown tag ids are accepted with an open arity so that private tags
    /// survive a read/write cycle.
    ///
    /// # Errors
    /// - `UnknownDataType` if the type code is not a TIFF type
    /// - `TypeMismatch` if a known tag does not accept the type
    pub fn from_record(
        info: &TagInfo,
        tag_id: u16,
        data_type: u16,
        is_bigtiff: bool,
    ) -> Result<Self, DefinitionError> {
        let data_type = DataType::from_u16(data_type)
            .ok_or(DefinitionError::UnknownDataType { tag_id, data_type })?;

        match info.get(tag_id) {
            Some(descriptor) if descriptor.accepts(data_type) => Ok(Self {
                tag_id,
                name: Cow::Borrowed(descriptor.name),
                data_type,
                read_count: descriptor.read_count,
                write_count: descriptor.write_count,
                is_bigtiff,
            }),
            Some(descriptor) => Err(DefinitionError::TypeMismatch {
                tag: descriptor.name.to_string(),
                data_type: data_type.name(),
            }),
            None => Ok(Self {
                tag_id,
                name: Cow::Owned(info.name_of(tag_id)),
                data_type,
                read_count: TagCount::Variable,
                write_count: TagCount::Variable,
                is_bigtiff,
            }),
        }
    }

    #[inline]
    pub fn tag_id(&self) -> u16 {
        self.tag_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Byte width of one element.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.data_type.size_in_bytes()
    }

    #[inline]
    pub fn read_count(&self) -> TagCount {
        self.read_count
    }

    #[inline]
    pub fn write_count(&self) -> TagCount {
        self.write_count
    }

    #[inline]
    pub fn is_bigtiff(&self) -> bool {
        self.is_bigtiff
    }

    /// Whether this entry holds part of the free-block list.
    #[inline]
    pub fn is_free_block_tag(&self) -> bool {
        TiffTag::is_free_block_tag(self.tag_id)
    }

    /// Number of elements to reserve when the entry is created empty.
    ///
    /// `None` when allocation waits for the first value.
    pub fn initial_capacity(&self) -> Option<u32> {
        match self.write_count {
            TagCount::Fixed(count) => Some(count),
            TagCount::UseSampleCount(max) => Some(max),
            TagCount::Any | TagCount::Variable => None,
        }
    }
}
