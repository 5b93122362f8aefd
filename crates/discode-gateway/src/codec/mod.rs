//! Frame codec
//!
//! Turns raw transport messages into complete JSON text frames.

mod frame_decoder;

pub use frame_decoder::{FrameDecoder, ZLIB_SUFFIX};
