//! Overlap-add FIR filtering in the frequency domain
//!
//! Each call filters exactly `fft_size - taps + 1` input samples: the block
//! is zero padded to `fft_size`, transformed, multiplied by the transformed
//! taps, transformed back, and the tail of the previous block is added to
//! the head of this one.
//!
//! The taps are convolved in reversed order, so for the same taps the output
//! equals the direct [`FirFilter`](super::filter::FirFilter) output delayed
//! by `taps - 1` samples.

use crate::adapters::RustFftKernel;
use crate::domain::{ComplexF32, SdrError, SdrResult};
use crate::dsp::filter::{
    bandpass_taps, check_band, check_transition, filter_length, lowpass_taps, Filter,
};
use crate::dsp::window::Window;
use crate::ports::FftKernel;

/// Minimum number of fresh samples per block
const MIN_PADDING: usize = 200;

pub struct FftFilter {
    kernel: Box<dyn FftKernel>,
    taps_fft: Vec<ComplexF32>,
    taps_len: usize,
    input_size: usize,
    work: Vec<ComplexF32>,
    overlap: Vec<ComplexF32>,
}

impl FftFilter {
    /// Smallest power of two that fits the taps with enough padding
    pub fn fft_size_for(taps_len: usize) -> usize {
        let mut size = 1;
        while size < taps_len {
            size <<= 1;
        }
        while size - taps_len < MIN_PADDING {
            size <<= 1;
        }
        size
    }

    /// Build around `taps` using a `rustfft` kernel of the default size
    pub fn new(taps: &[ComplexF32]) -> SdrResult<Self> {
        let kernel = RustFftKernel::new(Self::fft_size_for(taps.len()))?;
        Self::with_kernel(taps, Box::new(kernel))
    }

    /// Build around `taps` using a caller-supplied transform
    pub fn with_kernel(taps: &[ComplexF32], mut kernel: Box<dyn FftKernel>) -> SdrResult<Self> {
        let fft_size = kernel.size();
        if taps.is_empty() {
            return Err(SdrError::Config("FFT filter needs at least one tap".into()));
        }
        if fft_size < taps.len() {
            return Err(SdrError::Config(format!(
                "FFT size {fft_size} is smaller than the {} taps",
                taps.len()
            )));
        }

        let mut taps_fft = vec![ComplexF32::default(); fft_size];
        for (slot, &tap) in taps_fft.iter_mut().zip(taps.iter().rev()) {
            *slot = tap;
        }
        kernel.forward(&mut taps_fft);

        let input_size = fft_size - taps.len() + 1;
        log::debug!(
            "FFT filter: {} taps, fft size {fft_size}, {input_size} samples per block",
            taps.len()
        );
        Ok(Self {
            kernel,
            taps_fft,
            taps_len: taps.len(),
            input_size,
            work: vec![ComplexF32::default(); fft_size],
            overlap: vec![ComplexF32::default(); taps.len() - 1],
        })
    }

    pub fn lowpass(cutoff: f32, transition: f32, window: Window) -> SdrResult<Self> {
        check_transition(transition)?;
        check_band(-cutoff, cutoff)?;
        let taps: Vec<ComplexF32> = lowpass_taps(cutoff, filter_length(transition), window)
            .into_iter()
            .map(|t| ComplexF32::new(t, 0.0))
            .collect();
        Self::new(&taps)
    }

    pub fn bandpass(low_cut: f32, high_cut: f32, transition: f32, window: Window) -> SdrResult<Self> {
        check_transition(transition)?;
        check_band(low_cut, high_cut)?;
        Self::new(&bandpass_taps(
            low_cut,
            high_cut,
            filter_length(transition),
            window,
        ))
    }

    pub fn fft_size(&self) -> usize {
        self.taps_fft.len()
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn taps_len(&self) -> usize {
        self.taps_len
    }
}

impl Filter<ComplexF32> for FftFilter {
    fn apply(&mut self, input: &[ComplexF32], output: &mut [ComplexF32], _size: usize) -> usize {
        let block = self.input_size;
        let fft_size = self.work.len();

        self.work[..block].copy_from_slice(&input[..block]);
        self.work[block..].fill(ComplexF32::default());
        self.kernel.forward(&mut self.work);

        for (x, &h) in self.work.iter_mut().zip(&self.taps_fft) {
            *x *= h;
        }
        self.kernel.inverse(&mut self.work);

        let scale = 1.0 / fft_size as f32;
        for x in &mut self.work {
            *x *= scale;
        }
        for (x, &carry) in self.work.iter_mut().zip(&self.overlap) {
            *x += carry;
        }
        self.overlap.copy_from_slice(&self.work[block..block + self.taps_len - 1]);

        output[..block].copy_from_slice(&self.work[..block]);
        block
    }

    fn min_processing_size(&self) -> usize {
        self.input_size
    }
}
