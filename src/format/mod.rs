//! File format support.
//!
//! Only TIFF and BigTIFF directories are handled; see [`tiff`].

pub mod tiff;
