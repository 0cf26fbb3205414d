//! Complex frequency shifters
//!
//! Both mix the input with `e^{j·2π·rate·n}`. [`ShiftMath`] evaluates the
//! oscillator directly for any block length. [`ShiftAddfast`] runs on
//! 1024-sample blocks and advances the oscillator with a four-way angle
//! addition recurrence, re-anchored at the start of every block.

use std::f32::consts::PI;

use crate::domain::{ComplexF32, Frequency};
use crate::module::{AnyLength, AnyLengthBlock, FixedLength, FixedLengthBlock};

const ADDFAST_BLOCK: usize = 1024;

/// Direct-evaluation mixer
pub struct ShiftMath {
    rate: f32,
    phase_increment: f32,
    phase: f32,
}

impl ShiftMath {
    /// Shift by `rate`, a frequency relative to the sample rate
    pub fn new(rate: f32) -> Self {
        Self {
            rate,
            phase_increment: 2.0 * PI * rate,
            phase: 0.0,
        }
    }

    pub fn module(rate: f32) -> AnyLength<Self> {
        AnyLength::new(Self::new(rate))
    }

    /// Bring a signal at `offset` down to zero
    pub fn tuned(offset: Frequency, sample_rate: u32) -> Self {
        Self::new(-offset.relative_to(sample_rate))
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Retune; the phase is continuous across the change
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        self.phase_increment = 2.0 * PI * rate;
    }
}

impl AnyLengthBlock for ShiftMath {
    type Input = ComplexF32;
    type Output = ComplexF32;

    fn process_block(&mut self, input: &[ComplexF32], output: &mut [ComplexF32]) {
        for (i, (out, &x)) in output.iter_mut().zip(input).enumerate() {
            let phase = self.phase_increment * i as f32 + self.phase;
            let (sin, cos) = phase.sin_cos();
            *out = x * ComplexF32::new(cos, sin);
        }
        self.phase = (self.phase + self.phase_increment * input.len() as f32).rem_euclid(2.0 * PI);
    }
}

/// Block mixer using an angle-addition recurrence
pub struct ShiftAddfast {
    rate: f32,
    phase_increment: f32,
    starting_phase: f32,
    dsin: [f32; 4],
    dcos: [f32; 4],
}

impl ShiftAddfast {
    pub fn new(rate: f32) -> Self {
        let mut shift = Self {
            rate,
            phase_increment: 0.0,
            starting_phase: 0.0,
            dsin: [0.0; 4],
            dcos: [0.0; 4],
        };
        shift.set_rate(rate);
        shift
    }

    pub fn module(rate: f32) -> FixedLength<Self> {
        FixedLength::new(Self::new(rate))
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        self.phase_increment = 2.0 * PI * rate;
        for i in 0..4 {
            let (sin, cos) = (self.phase_increment * (i + 1) as f32).sin_cos();
            self.dsin[i] = sin;
            self.dcos[i] = cos;
        }
    }
}

impl FixedLengthBlock for ShiftAddfast {
    type Input = ComplexF32;
    type Output = ComplexF32;

    fn length(&self) -> usize {
        ADDFAST_BLOCK
    }

    fn process_block(&mut self, input: &[ComplexF32], output: &mut [ComplexF32]) {
        let (mut sin_start, mut cos_start) = self.starting_phase.sin_cos();
        for (ins, outs) in input.chunks_exact(4).zip(output.chunks_exact_mut(4)) {
            let mut last = (cos_start, sin_start);
            for j in 0..4 {
                let cos = cos_start * self.dcos[j] - sin_start * self.dsin[j];
                let sin = sin_start * self.dcos[j] + cos_start * self.dsin[j];
                outs[j] = ins[j] * ComplexF32::new(cos, sin);
                last = (cos, sin);
            }
            (cos_start, sin_start) = last;
        }

        self.starting_phase += ADDFAST_BLOCK as f32 * self.phase_increment;
        // keep within [-π, π]
        self.starting_phase = (self.starting_phase + PI).rem_euclid(2.0 * PI) - PI;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;
    use crate::module::Module;

    fn dc(len: usize) -> Vec<ComplexF32> {
        vec![ComplexF32::new(1.0, 0.0); len]
    }

    #[test]
    fn math_shift_produces_tone() {
        let mut shift = ShiftMath::new(0.125);
        let mut out = vec![ComplexF32::default(); 16];
        shift.process_block(&dc(16), &mut out);
        for (n, y) in out.iter().enumerate() {
            let expected = ComplexF32::from_polar(1.0, 2.0 * PI * 0.125 * n as f32);
            assert!((y - expected).norm() < 1e-5, "sample {n}: {y} vs {expected}");
        }
    }

    #[test]
    fn math_shift_phase_is_continuous_across_blocks() {
        let mut whole = ShiftMath::new(0.01);
        let mut expected = vec![ComplexF32::default(); 300];
        whole.process_block(&dc(300), &mut expected);

        let mut split = ShiftMath::new(0.01);
        let mut actual = vec![ComplexF32::default(); 300];
        split.process_block(&dc(100), &mut actual[..100]);
        split.process_block(&dc(200), &mut actual[100..]);

        for n in 0..300 {
            assert!((actual[n] - expected[n]).norm() < 1e-4, "sample {n}");
        }
    }

    #[test]
    fn addfast_matches_direct_mixer_within_a_block() {
        // the recurrence starts one step ahead of the anchor phase
        let rate = -0.03;
        let mut fast = ShiftAddfast::new(rate);
        let mut out = vec![ComplexF32::default(); ADDFAST_BLOCK];
        fast.process_block(&dc(ADDFAST_BLOCK), &mut out);
        for (n, y) in out.iter().enumerate() {
            let expected = ComplexF32::from_polar(1.0, 2.0 * PI * rate * (n + 1) as f32);
            assert!((y - expected).norm() < 1e-3, "sample {n}: {y} vs {expected}");
        }
    }

    #[test]
    fn addfast_module_waits_for_whole_block() {
        let mut module = ShiftAddfast::module(0.1);
        let (mut input, reader) = RingBuffer::new::<ComplexF32>(4096);
        let (writer, output) = RingBuffer::new::<ComplexF32>(4096);
        module.set_reader(reader);
        module.set_writer(writer);

        input.push(&dc(1000));
        assert!(!module.can_process());
        input.push(&dc(100));
        module.process();
        assert_eq!(output.available(), ADDFAST_BLOCK);
        let magnitude = output.read_slice()[500].norm();
        assert!((magnitude - 1.0).abs() < 1e-3, "mixing keeps magnitude, got {magnitude}");
    }

    #[test]
    fn tuned_mixer_brings_offset_to_zero() {
        let shift = ShiftMath::tuned(Frequency::khz(12.0), 48_000);
        assert!((shift.rate() + 0.25).abs() < 1e-6);
    }

    #[test]
    fn set_rate_retunes() {
        let mut shift = ShiftMath::new(0.0);
        let mut out = vec![ComplexF32::default(); 4];
        shift.process_block(&dc(4), &mut out);
        assert!(out.iter().all(|y| (y - ComplexF32::new(1.0, 0.0)).norm() < 1e-6));

        shift.set_rate(0.25);
        assert_eq!(shift.rate(), 0.25);
        shift.process_block(&dc(2), &mut out[..2]);
        assert!((out[1] - ComplexF32::new(0.0, 1.0)).norm() < 1e-5);
    }
}
