//! Adapters implementing the port traits
//!
//! - [`RustFftKernel`] - `FftKernel` on top of `rustfft`
//! - [`RubatoResampler`] - `ResamplerKernel` on top of `rubato`'s sinc interpolator

pub mod rubato_resampler;
pub mod rustfft_kernel;

pub use rubato_resampler::RubatoResampler;
pub use rustfft_kernel::RustFftKernel;
