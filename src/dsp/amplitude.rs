//! Fixed gain and hard limiting

use crate::domain::FilterSample;
use crate::module::{AnyLength, AnyLengthBlock};

/// Multiply every sample by a constant
pub struct Gain<T> {
    gain: f32,
    _sample: std::marker::PhantomData<fn(T) -> T>,
}

impl<T: FilterSample> Gain<T> {
    pub fn new(gain: f32) -> Self {
        Self {
            gain,
            _sample: std::marker::PhantomData,
        }
    }

    pub fn module(gain: f32) -> AnyLength<Self> {
        AnyLength::new(Self::new(gain))
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }
}

impl<T: FilterSample> AnyLengthBlock for Gain<T> {
    type Input = T;
    type Output = T;

    fn process_block(&mut self, input: &[T], output: &mut [T]) {
        for (out, &x) in output.iter_mut().zip(input) {
            *out = x * self.gain;
        }
    }
}

/// Clip real samples to `±max_amplitude`
pub struct Limit {
    max_amplitude: f32,
}

impl Limit {
    pub fn new(max_amplitude: f32) -> Self {
        Self {
            max_amplitude: max_amplitude.abs(),
        }
    }

    pub fn module(max_amplitude: f32) -> AnyLength<Self> {
        AnyLength::new(Self::new(max_amplitude))
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AnyLengthBlock for Limit {
    type Input = f32;
    type Output = f32;

    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        for (out, &x) in output.iter_mut().zip(input) {
            *out = x.clamp(-self.max_amplitude, self.max_amplitude);
        }
    }
}
