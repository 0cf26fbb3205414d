//! Stream codecs
//!
//! - [`adpcm`] - IMA ADPCM for audio and spectrum frames

pub mod adpcm;

pub use adpcm::{AdpcmCodec, AdpcmDecoder, AdpcmEncoder, FftAdpcmEncoder};
