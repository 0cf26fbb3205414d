//! Sample format conversion and channel handling

use crate::domain::{ComplexF32, ComplexI16, Sample};
use crate::module::{AnyLength, AnyLengthBlock, Bindings, Module};

const I16_SCALE: f32 = i16::MAX as f32;

/// Elementwise conversion between two sample representations
pub trait Convert<O>: Sample {
    fn convert(self) -> O;
}

impl Convert<i16> for f32 {
    /// Saturates outside ±1
    fn convert(self) -> i16 {
        (self * I16_SCALE) as i16
    }
}

impl Convert<f32> for i16 {
    fn convert(self) -> f32 {
        self as f32 / I16_SCALE
    }
}

impl Convert<ComplexI16> for ComplexF32 {
    fn convert(self) -> ComplexI16 {
        ComplexI16::new(self.re.convert(), self.im.convert())
    }
}

impl Convert<ComplexF32> for ComplexI16 {
    fn convert(self) -> ComplexF32 {
        ComplexF32::new(self.re.convert(), self.im.convert())
    }
}

/// Stream format converter
pub struct Converter<I, O> {
    _formats: std::marker::PhantomData<fn(I) -> O>,
}

impl<I: Convert<O>, O: Sample> Converter<I, O> {
    pub fn new() -> Self {
        Self {
            _formats: std::marker::PhantomData,
        }
    }

    pub fn module() -> AnyLength<Self> {
        AnyLength::new(Self::new())
    }
}

impl<I: Convert<O>, O: Sample> Default for Converter<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Convert<O>, O: Sample> AnyLengthBlock for Converter<I, O> {
    type Input = I;
    type Output = O;

    fn process_block(&mut self, input: &[I], output: &mut [O]) {
        for (out, &x) in output.iter_mut().zip(input) {
            *out = x.convert();
        }
    }
}

/// Keep the in-phase component
#[derive(Default)]
pub struct Realpart;

impl Realpart {
    pub fn module() -> AnyLength<Self> {
        AnyLength::new(Self)
    }
}

impl AnyLengthBlock for Realpart {
    type Input = ComplexF32;
    type Output = f32;

    fn process_block(&mut self, input: &[ComplexF32], output: &mut [f32]) {
        for (out, x) in output.iter_mut().zip(input) {
            *out = x.re;
        }
    }
}

/// Average interleaved `i16` channels into one
pub struct Downmix {
    channels: usize,
    bindings: Bindings<i16, i16>,
}

impl Downmix {
    pub fn new(channels: usize) -> Self {
        Self {
            channels: channels.max(1),
            bindings: Bindings::new(),
        }
    }
}

impl Module for Downmix {
    type Input = i16;
    type Output = i16;

    fn bindings(&self) -> &Bindings<i16, i16> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<i16, i16> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        available >= self.channels && writable > 0
    }

    fn process(&mut self) {
        let channels = self.channels;
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let frames = (reader.available() / channels).min(writer.writable());
        let input = reader.read_slice();
        for (out, frame) in writer.write_slice()[..frames]
            .iter_mut()
            .zip(input.chunks_exact(channels))
        {
            // per-channel division keeps the sum in range
            *out = frame.iter().map(|&x| x / channels as i16).sum();
        }
        writer.advance(frames);
        reader.advance(frames * channels);
    }
}
