//! FFT kernel port

use crate::domain::ComplexF32;

/// A complex transform of one fixed size over caller-owned buffers
pub trait FftKernel: Send {
    /// Transform length; buffers passed in must have exactly this length
    fn size(&self) -> usize;

    /// Forward transform in place
    fn forward(&mut self, buffer: &mut [ComplexF32]);

    /// Inverse transform in place, without the `1 / size` scaling
    fn inverse(&mut self, buffer: &mut [ComplexF32]);
}
