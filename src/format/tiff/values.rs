//! Typed element access.
//!
//! Tag payloads are kept as raw bytes. [`TagElement`] describes how one
//! element of a given Rust type is laid out in host order and which TIFF
//! data types it may be read from or written to.

use std::fmt;

use super::tags::DataType;

/// A Rust type that can be stored as elements of a tag value.
pub trait TagElement: Copy {
    /// Size of one element in bytes.
    const SIZE: usize;

    /// Whether values of this type may live in a tag of `data_type`.
    fn accepts(data_type: DataType) -> bool;

    /// Decode one element from host-order bytes.
    ///
    /// # Panics
    /// Panics if `bytes` holds fewer than `SIZE` bytes.
    fn from_ne_slice(bytes: &[u8]) -> Self;

    /// Append this element as host-order bytes.
    fn write_ne(self, out: &mut Vec<u8>);
}

macro_rules! primitive_element {
    ($ty:ty, $size:expr, $($data_type:ident)|+) => {
        impl TagElement for $ty {
            const SIZE: usize = $size;

            #[inline]
            fn accepts(data_type: DataType) -> bool {
                matches!(data_type, $(DataType::$data_type)|+)
            }

            #[inline]
            fn from_ne_slice(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $size];
                raw.copy_from_slice(&bytes[..$size]);
                <$ty>::from_ne_bytes(raw)
            }

            #[inline]
            fn write_ne(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

primitive_element!(u8, 1, Byte | Undefined | Ascii);
primitive_element!(i8, 1, SByte);
primitive_element!(u16, 2, Short | AsciiW);
primitive_element!(i16, 2, SShort);
primitive_element!(u32, 4, Long | Ifd);
primitive_element!(i32, 4, SLong);
primitive_element!(u64, 8, Long64 | Ifd64);
primitive_element!(i64, 8, SLong64);
primitive_element!(f32, 4, Float);
primitive_element!(f64, 8, Double);

// =============================================================================
// Rationals
// =============================================================================

/// Unsigned fraction (TIFF RATIONAL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Value as a float; a zero denominator yields an infinity or NaN.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl TagElement for Rational {
    const SIZE: usize = 8;

    #[inline]
    fn accepts(data_type: DataType) -> bool {
        data_type == DataType::Rational
    }

    #[inline]
    fn from_ne_slice(bytes: &[u8]) -> Self {
        Self::new(u32::from_ne_slice(bytes), u32::from_ne_slice(&bytes[4..]))
    }

    #[inline]
    fn write_ne(self, out: &mut Vec<u8>) {
        self.numerator.write_ne(out);
        self.denominator.write_ne(out);
    }
}

/// Signed fraction (TIFF SRATIONAL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SRational {
    pub numerator: i32,
    pub denominator: i32,
}

impl SRational {
    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl fmt::Display for SRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl TagElement for SRational {
    const SIZE: usize = 8;

    #[inline]
    fn accepts(data_type: DataType) -> bool {
        data_type == DataType::SRational
    }

    #[inline]
    fn from_ne_slice(bytes: &[u8]) -> Self {
        Self::new(i32::from_ne_slice(bytes), i32::from_ne_slice(&bytes[4..]))
    }

    #[inline]
    fn write_ne(self, out: &mut Vec<u8>) {
        self.numerator.write_ne(out);
        self.denominator.write_ne(out);
    }
}

/// Decode host-order bytes into elements.
pub fn decode_elements<T: TagElement>(bytes: &[u8], count: usize) -> Vec<T> {
    bytes
        .chunks_exact(T::SIZE)
        .take(count)
        .map(T::from_ne_slice)
        .collect()
}

/// Encode elements as host-order bytes.
pub fn encode_elements<T: TagElement>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::SIZE);
    for value in values {
        value.write_ne(&mut out);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
