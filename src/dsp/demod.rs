//! FM and AM demodulators

use crate::domain::ComplexF32;
use crate::module::{AnyLength, AnyLengthBlock};

/// Scale that maps the quadri-correlator output to ±1 at full deviation
const QUADRI_K: f32 = 0.340_447_55;

/// Quadri-correlator FM demodulator
///
/// `y[n] = K · (I[n]·ΔQ[n] − Q[n]·ΔI[n]) / |x[n]|²`, where the differences
/// reach back into the previous block through the last sample seen.
#[derive(Default)]
pub struct FmDemod {
    last_sample: ComplexF32,
}

impl FmDemod {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module() -> AnyLength<Self> {
        AnyLength::new(Self::new())
    }
}

impl AnyLengthBlock for FmDemod {
    type Input = ComplexF32;
    type Output = f32;

    fn process_block(&mut self, input: &[ComplexF32], output: &mut [f32]) {
        let mut previous = self.last_sample;
        for (out, &x) in output.iter_mut().zip(input) {
            let di = x.re - previous.re;
            let dq = x.im - previous.im;
            let energy = x.norm_sqr();
            *out = if energy == 0.0 {
                0.0
            } else {
                QUADRI_K * (x.re * dq - x.im * di) / energy
            };
            previous = x;
        }
        self.last_sample = previous;
    }
}

/// Envelope detector
#[derive(Default)]
pub struct AmDemod;

impl AmDemod {
    pub fn module() -> AnyLength<Self> {
        AnyLength::new(Self)
    }
}

impl AnyLengthBlock for AmDemod {
    type Input = ComplexF32;
    type Output = f32;

    fn process_block(&mut self, input: &[ComplexF32], output: &mut [f32]) {
        for (out, x) in output.iter_mut().zip(input) {
            *out = x.norm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(freq: f32, len: usize) -> Vec<ComplexF32> {
        (0..len)
            .map(|n| ComplexF32::from_polar(1.0, 2.0 * PI * freq * n as f32))
            .collect()
    }

    #[test]
    fn constant_frequency_gives_constant_output() {
        let mut demod = FmDemod::new();
        let input = tone(0.05, 200);
        let mut output = vec![0.0; 200];
        demod.process_block(&input, &mut output);
        // sin(2π·0.05) scaled by K
        let expected = QUADRI_K * (2.0 * PI * 0.05).sin();
        for (n, y) in output.iter().enumerate().skip(1) {
            assert!((y - expected).abs() < 1e-4, "sample {n}: {y} vs {expected}");
        }
    }

    #[test]
    fn sign_follows_frequency_direction() {
        let mut up = FmDemod::new();
        let mut down = FmDemod::new();
        let mut out_up = vec![0.0; 50];
        let mut out_down = vec![0.0; 50];
        up.process_block(&tone(0.02, 50), &mut out_up);
        down.process_block(&tone(-0.02, 50), &mut out_down);
        assert!(out_up[10] > 0.0);
        assert!(out_down[10] < 0.0);
    }

    #[test]
    fn history_spans_blocks() {
        let input = tone(0.1, 100);
        let mut whole = FmDemod::new();
        let mut expected = vec![0.0; 100];
        whole.process_block(&input, &mut expected);

        let mut split = FmDemod::new();
        let mut actual = vec![0.0; 100];
        split.process_block(&input[..30], &mut actual[..30]);
        split.process_block(&input[30..], &mut actual[30..]);
        assert_eq!(actual, expected);
    }

    #[test]
    fn silence_demodulates_to_zero() {
        let mut demod = FmDemod::new();
        let mut output = vec![1.0; 10];
        demod.process_block(&[ComplexF32::default(); 10], &mut output);
        assert!(output.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn am_output_is_magnitude() {
        let mut demod = AmDemod;
        let mut output = vec![0.0; 2];
        demod.process_block(&[ComplexF32::new(3.0, 4.0), ComplexF32::new(0.0, -2.0)], &mut output);
        assert_eq!(output, vec![5.0, 2.0]);
    }
}
