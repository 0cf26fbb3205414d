//! Integer decimation with a low-pass evaluated only where outputs are kept

use crate::domain::{ComplexF32, SdrError, SdrResult};
use crate::dsp::filter::{Filter, FirFilter, SampleFilter};
use crate::dsp::window::Window;
use crate::module::{Bindings, Module};

pub struct FirDecimate {
    decimation: usize,
    lowpass: FirFilter<ComplexF32, f32>,
    bindings: Bindings<ComplexF32, ComplexF32>,
}

impl FirDecimate {
    /// Decimate by `decimation` behind a low-pass at `0.5 / decimation`
    pub fn new(decimation: usize, transition: f32, window: Window) -> SdrResult<Self> {
        Self::with_cutoff(decimation, transition, window, 0.5)
    }

    /// Decimate with the low-pass at `cutoff / decimation`
    pub fn with_cutoff(
        decimation: usize,
        transition: f32,
        window: Window,
        cutoff: f32,
    ) -> SdrResult<Self> {
        if decimation == 0 {
            return Err(SdrError::Config("decimation must be at least 1".into()));
        }
        let lowpass = FirFilter::lowpass(cutoff / decimation as f32, transition, window)?;
        log::debug!(
            "FIR decimator: factor {decimation}, {} taps",
            lowpass.taps().len()
        );
        Ok(Self {
            decimation,
            lowpass,
            bindings: Bindings::new(),
        })
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }
}

impl Module for FirDecimate {
    type Input = ComplexF32;
    type Output = ComplexF32;

    fn bindings(&self) -> &Bindings<ComplexF32, ComplexF32> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<ComplexF32, ComplexF32> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        let overhead = self.lowpass.overhead();
        available > overhead && (available - overhead) / self.decimation > 0 && writable > 0
    }

    fn process(&mut self) {
        let overhead = self.lowpass.overhead();
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let available = reader.available();
        if available < overhead {
            return;
        }
        let samples = ((available - overhead) / self.decimation).min(writer.writable());

        let sparse = self.lowpass.sparse(reader.read_slice());
        for (i, out) in writer.write_slice()[..samples].iter_mut().enumerate() {
            *out = sparse.get(i * self.decimation);
        }
        writer.advance(samples);
        reader.advance(samples * self.decimation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;
    use std::f32::consts::PI;

    fn tone(freq: f32, len: usize) -> Vec<ComplexF32> {
        (0..len)
            .map(|n| ComplexF32::from_polar(1.0, 2.0 * PI * freq * n as f32))
            .collect()
    }

    #[test]
    fn output_count_is_input_over_decimation() {
        let mut decimator = FirDecimate::new(4, 0.05, Window::Hamming).unwrap();
        let (mut input, reader) = RingBuffer::new::<ComplexF32>(4096);
        let (writer, output) = RingBuffer::new::<ComplexF32>(4096);
        decimator.set_reader(reader);
        decimator.set_writer(writer);

        let overhead = 81;
        input.push(&vec![ComplexF32::new(1.0, 0.0); overhead + 400]);
        decimator.process();
        assert_eq!(output.available(), 100);
        assert!((output.read_slice()[50] - ComplexF32::new(1.0, 0.0)).norm() < 1e-3);
        assert_eq!(
            decimator.bindings().reader().map(|r| r.available()),
            Some(overhead)
        );
    }

    #[test]
    fn passes_in_band_and_blocks_alias() {
        for (freq, passes) in [(0.02, true), (0.3, false)] {
            let mut decimator = FirDecimate::new(4, 0.05, Window::Blackman).unwrap();
            let (mut input, reader) = RingBuffer::new::<ComplexF32>(4096);
            let (writer, output) = RingBuffer::new::<ComplexF32>(4096);
            decimator.set_reader(reader);
            decimator.set_writer(writer);

            input.push(&tone(freq, 2000));
            decimator.process();
            let peak = output
                .read_slice()
                .iter()
                .map(|y| y.norm())
                .fold(0.0f32, f32::max);
            if passes {
                assert!(peak > 0.9, "tone at {freq} should pass, got {peak}");
            } else {
                assert!(peak < 0.01, "tone at {freq} should be rejected, got {peak}");
            }
        }
    }

    #[test]
    fn waits_for_overhead_plus_one_output() {
        let decimator = FirDecimate::new(4, 0.05, Window::Hamming).unwrap();
        assert!(!decimator.can_process_with(84, 10));
        assert!(decimator.can_process_with(85, 10));
        assert!(!decimator.can_process_with(85, 0));
    }

    #[test]
    fn zero_decimation_is_rejected() {
        assert!(FirDecimate::new(0, 0.05, Window::Hamming).is_err());
    }
}
