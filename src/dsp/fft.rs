//! Spectrum computation for waterfall and spectrum displays
//!
//! [`Fft`] takes a windowed forward transform of `fft_size` samples once
//! every `every_n_samples` input samples and drops the rest. [`LogPower`]
//! turns the complex bins into decibels.

use crate::adapters::RustFftKernel;
use crate::domain::{ComplexF32, SdrError, SdrResult};
use crate::dsp::window::{PrecalculatedWindow, Window};
use crate::module::{AnyLength, AnyLengthBlock, Bindings, Module};
use crate::ports::FftKernel;

pub struct Fft {
    kernel: Box<dyn FftKernel>,
    fft_size: usize,
    every_n_samples: usize,
    window: PrecalculatedWindow,
    /// Samples dropped since the start of the last transform
    skipped: usize,
    bindings: Bindings<ComplexF32, ComplexF32>,
}

impl Fft {
    pub fn new(fft_size: usize, every_n_samples: usize, window: Window) -> SdrResult<Self> {
        let kernel = RustFftKernel::new(fft_size)?;
        Self::with_kernel(Box::new(kernel), every_n_samples, window)
    }

    pub fn with_kernel(
        kernel: Box<dyn FftKernel>,
        every_n_samples: usize,
        window: Window,
    ) -> SdrResult<Self> {
        if every_n_samples == 0 {
            return Err(SdrError::Config("FFT interval must be at least one sample".into()));
        }
        let fft_size = kernel.size();
        log::debug!("spectrum: {fft_size} bins every {every_n_samples} samples, {window} window");
        Ok(Self {
            kernel,
            fft_size,
            every_n_samples,
            window: window.precalculate(fft_size),
            skipped: 0,
            bindings: Bindings::new(),
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Change the spacing between transforms; takes effect at the next call
    pub fn set_every_n_samples(&mut self, every_n_samples: usize) {
        self.every_n_samples = every_n_samples.max(1);
    }
}

impl Module for Fft {
    type Input = ComplexF32;
    type Output = ComplexF32;

    fn bindings(&self) -> &Bindings<ComplexF32, ComplexF32> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<ComplexF32, ComplexF32> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        available.min(writable) > self.fft_size
    }

    fn process(&mut self) {
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let mut available = reader.available();

        if self.skipped + available < self.every_n_samples {
            reader.advance(available);
            self.skipped += available;
            return;
        }

        // align to the start of the next transform
        if self.every_n_samples > self.skipped {
            let to_skip = self.every_n_samples - self.skipped;
            reader.advance(to_skip);
            self.skipped += to_skip;
            available -= to_skip;
        }

        if available >= self.fft_size && writer.writable() >= self.fft_size {
            let output = &mut writer.write_slice()[..self.fft_size];
            self.window.apply(&reader.read_slice()[..self.fft_size], output);
            self.kernel.forward(output);
            writer.advance(self.fft_size);
            self.skipped = 0;
        }
    }
}

/// Power in decibels, `10·log10(|x|²) + offset`
pub struct LogPower {
    offset_db: f32,
}

impl LogPower {
    /// Floor that keeps silent bins finite
    const FLOOR: f32 = 1e-10;

    pub fn new(offset_db: f32) -> Self {
        Self { offset_db }
    }

    pub fn module(offset_db: f32) -> AnyLength<Self> {
        AnyLength::new(Self::new(offset_db))
    }
}

impl AnyLengthBlock for LogPower {
    type Input = ComplexF32;
    type Output = f32;

    fn process_block(&mut self, input: &[ComplexF32], output: &mut [f32]) {
        for (out, x) in output.iter_mut().zip(input) {
            *out = 10.0 * x.norm_sqr().max(Self::FLOOR).log10() + self.offset_db;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Reader, RingBuffer, Writer};
    use std::f32::consts::PI;

    fn bind(fft: &mut Fft) -> (Writer<ComplexF32>, Reader<ComplexF32>) {
        let (input, reader) = RingBuffer::new::<ComplexF32>(8192);
        let (writer, output) = RingBuffer::new::<ComplexF32>(8192);
        fft.set_reader(reader);
        fft.set_writer(writer);
        (input, output)
    }

    fn tone(cycles_per_block: f32, block: usize, len: usize) -> Vec<ComplexF32> {
        (0..len)
            .map(|n| ComplexF32::from_polar(1.0, 2.0 * PI * cycles_per_block * n as f32 / block as f32))
            .collect()
    }

    #[test]
    fn pure_tone_peaks_in_its_bin() {
        let mut fft = Fft::new(256, 256, Window::Hamming).unwrap();
        let (mut input, output) = bind(&mut fft);
        input.push(&tone(21.0, 256, 1024));

        fft.process();
        assert_eq!(output.available(), 256);
        let peak_bin = output
            .read_slice()
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 21, "Peak at bin {peak_bin} but expected 21");
    }

    #[test]
    fn one_transform_per_interval() {
        let mut fft = Fft::new(64, 1000, Window::Boxcar).unwrap();
        let (mut input, output) = bind(&mut fft);

        input.push(&tone(3.0, 64, 4000));
        while fft.can_process() {
            fft.process();
        }
        // transforms start at 1000, 2000 and 3000
        assert_eq!(output.available(), 3 * 64);
    }

    #[test]
    fn short_input_is_dropped_towards_the_next_transform() {
        let mut fft = Fft::new(64, 500, Window::Boxcar).unwrap();
        let (mut input, output) = bind(&mut fft);

        input.push(&tone(3.0, 64, 300));
        fft.process();
        assert_eq!(output.available(), 0);
        assert_eq!(fft.bindings().reader().map(|r| r.available()), Some(0));

        // 200 more samples reach the interval, the other 50 are too few
        input.push(&tone(3.0, 64, 250));
        fft.process();
        assert_eq!(output.available(), 0);
        input.push(&tone(3.0, 64, 100));
        fft.process();
        assert_eq!(output.available(), 64);
    }

    #[test]
    fn interval_can_be_changed() {
        let mut fft = Fft::new(64, 10_000, Window::Boxcar).unwrap();
        let (mut input, output) = bind(&mut fft);
        fft.set_every_n_samples(100);
        input.push(&tone(3.0, 64, 400));
        while fft.can_process() {
            fft.process();
        }
        assert!(output.available() >= 2 * 64);
    }

    #[test]
    fn log_power_in_decibels() {
        let mut log_power = LogPower::new(-3.0);
        let mut out = [0.0f32; 2];
        log_power.process_block(&[ComplexF32::new(10.0, 0.0), ComplexF32::default()], &mut out);
        assert!((out[0] - 17.0).abs() < 1e-4);
        assert!((out[1] + 103.0).abs() < 1e-3, "silence is floored, got {}", out[1]);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Fft::new(64, 0, Window::Hamming).is_err());
    }
}
