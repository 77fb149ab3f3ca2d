mod stream;
mod tiff_stream;

pub use stream::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, swap_words,
    TagStream,
};
pub use tiff_stream::{FreeBlock, TiffStream};
