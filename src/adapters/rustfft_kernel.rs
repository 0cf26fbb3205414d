//! `rustfft` backed FFT kernel

use std::sync::Arc;

use rustfft::{Fft, FftPlanner};

use crate::domain::{ComplexF32, SdrError, SdrResult};
use crate::ports::FftKernel;

/// Forward and inverse plans for one transform size, planned once
pub struct RustFftKernel {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<ComplexF32>,
    size: usize,
}

impl RustFftKernel {
    pub fn new(size: usize) -> SdrResult<Self> {
        if size == 0 {
            return Err(SdrError::Config("FFT size must be positive".into()));
        }
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        log::debug!("Planned {size}-point FFT (scratch {scratch_len})");
        Ok(Self {
            forward,
            inverse,
            scratch: vec![ComplexF32::default(); scratch_len],
            size,
        })
    }
}

impl FftKernel for RustFftKernel {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&mut self, buffer: &mut [ComplexF32]) {
        self.forward.process_with_scratch(buffer, &mut self.scratch);
    }

    fn inverse(&mut self, buffer: &mut [ComplexF32]) {
        self.inverse.process_with_scratch(buffer, &mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_rejected() {
        assert!(RustFftKernel::new(0).is_err());
    }

    #[test]
    fn pure_tone_lands_in_its_bin() {
        let mut kernel = RustFftKernel::new(64).unwrap();
        let mut buffer: Vec<ComplexF32> = (0..64)
            .map(|n| ComplexF32::from_polar(1.0, 2.0 * std::f32::consts::PI * 5.0 * n as f32 / 64.0))
            .collect();
        kernel.forward(&mut buffer);

        let peak = buffer
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 5, "tone at 5 cycles per block should land in bin 5");
    }

    #[test]
    fn inverse_undoes_forward_up_to_scale() {
        let mut kernel = RustFftKernel::new(32).unwrap();
        let original: Vec<ComplexF32> = (0..32)
            .map(|n| ComplexF32::new(n as f32 * 0.1, -(n as f32) * 0.05))
            .collect();
        let mut buffer = original.clone();
        kernel.forward(&mut buffer);
        kernel.inverse(&mut buffer);

        for (got, want) in buffer.iter().zip(&original) {
            assert!((got / 32.0 - want).norm() < 1e-4);
        }
    }
}
