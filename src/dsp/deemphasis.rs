//! Broadcast FM de-emphasis
//!
//! Single-pole IIR low-pass `y[n] = α·x[n] + (1 − α)·y[n−1]` with
//! `α = dt / (τ + dt)`. Typical time constants are 75 µs (Americas) and
//! 50 µs (Europe).

use crate::domain::{SdrError, SdrResult};
use crate::module::{AnyLength, AnyLengthBlock};

/// Time constant used in Europe
pub const TAU_EU: f32 = 50e-6;
/// Time constant used in the Americas
pub const TAU_US: f32 = 75e-6;

pub struct WfmDeemphasis {
    alpha: f32,
    last_output: f32,
}

impl WfmDeemphasis {
    pub fn new(sample_rate: u32, tau: f32) -> SdrResult<Self> {
        if sample_rate == 0 {
            return Err(SdrError::UnsupportedSampleRate(sample_rate));
        }
        if !(tau.is_finite() && tau > 0.0) {
            return Err(SdrError::Config(format!(
                "de-emphasis time constant must be positive, got {tau}"
            )));
        }
        let dt = 1.0 / sample_rate as f32;
        Ok(Self {
            alpha: dt / (tau + dt),
            last_output: 0.0,
        })
    }

    pub fn module(sample_rate: u32, tau: f32) -> SdrResult<AnyLength<Self>> {
        Ok(AnyLength::new(Self::new(sample_rate, tau)?))
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl AnyLengthBlock for WfmDeemphasis {
    type Input = f32;
    type Output = f32;

    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        if self.last_output.is_nan() {
            self.last_output = 0.0;
        }
        for (out, &x) in output.iter_mut().zip(input) {
            self.last_output = self.alpha * x + (1.0 - self.alpha) * self.last_output;
            *out = self.last_output;
        }
    }
}
