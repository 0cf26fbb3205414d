//! Port traits (interfaces)
//!
//! Transform kernels the DSP code consumes but does not implement itself.
//! Adapters in `crate::adapters` implement them on top of real crates.

pub mod fft;
pub mod resampler;

pub use fft::*;
pub use resampler::*;
