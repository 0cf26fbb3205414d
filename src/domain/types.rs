//! Core domain types
//!
//! Every stream carries exactly one sample representation. The [`Sample`]
//! trait is the bound used by buffers and generic modules.

use num_complex::Complex;

/// Complex float sample, the workhorse representation for baseband IQ
pub type ComplexF32 = Complex<f32>;

/// Complex 16-bit sample as delivered by most SDR front ends
pub type ComplexI16 = Complex<i16>;

/// A value that can travel through a ring buffer
///
/// `Copy + Default` lets buffers be preallocated and filled with silence.
pub trait Sample: Copy + Default + Send + Sync + 'static {}

impl Sample for u8 {}
impl Sample for i16 {}
impl Sample for f32 {}
impl Sample for ComplexF32 {}
impl Sample for ComplexI16 {}

/// Samples that support the arithmetic generic filters need
pub trait FilterSample:
    Sample + std::ops::Add<Output = Self> + std::ops::AddAssign + std::ops::Mul<f32, Output = Self>
{
    fn zero() -> Self {
        Self::default()
    }

    /// Multiply by a complex tap. Real samples keep only the real part.
    fn mul_complex(self, tap: ComplexF32) -> Self;
}

impl FilterSample for f32 {
    fn mul_complex(self, tap: ComplexF32) -> Self {
        self * tap.re
    }
}

impl FilterSample for ComplexF32 {
    fn mul_complex(self, tap: ComplexF32) -> Self {
        self * tap
    }
}

/// Frequency in Hz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frequency(pub f64);

impl Frequency {
    pub fn hz(hz: f64) -> Self {
        Self(hz)
    }

    pub fn khz(khz: f64) -> Self {
        Self(khz * 1_000.0)
    }

    pub fn as_hz(&self) -> f64 {
        self.0
    }

    /// Express this frequency relative to a sample rate, the unit every
    /// filter and mixer in this crate works in.
    pub fn relative_to(&self, sample_rate: u32) -> f32 {
        (self.0 / sample_rate as f64) as f32
    }
}
