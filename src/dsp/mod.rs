//! Digital Signal Processing
//!
//! Stream modules built on the [`crate::module`] contract, plus the filter
//! and window math they share.

pub mod agc;
pub mod amplitude;
pub mod convert;
pub mod dcblock;
pub mod deemphasis;
pub mod demod;
pub mod fft;
pub mod fftfilter;
pub mod filter;
pub mod filter_module;
pub mod firdecimate;
pub mod fractional_decimator;
pub mod power;
pub mod resampler;
pub mod shift;
pub mod timing_recovery;
pub mod window;

// Re-export commonly used items
pub use agc::{Agc, AgcModule};
pub use amplitude::{Gain, Limit};
pub use convert::{Converter, Downmix, Realpart};
pub use dcblock::DcBlock;
pub use deemphasis::WfmDeemphasis;
pub use demod::{AmDemod, FmDemod};
pub use fft::{Fft, LogPower};
pub use fftfilter::FftFilter;
pub use filter::{Filter, FirFilter};
pub use filter_module::FilterModule;
pub use firdecimate::FirDecimate;
pub use fractional_decimator::FractionalDecimator;
pub use power::{Power, Squelch};
pub use resampler::AudioResampler;
pub use shift::{ShiftAddfast, ShiftMath};
pub use timing_recovery::TimingRecovery;
pub use window::Window;
