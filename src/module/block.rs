//! Generic modules for algorithms that map input blocks to output blocks

use super::{Bindings, Module};
use crate::domain::Sample;

/// An algorithm that maps any number of inputs to the same number of outputs
pub trait AnyLengthBlock: Send {
    type Input: Sample;
    type Output: Sample;

    /// `input` and `output` have the same length
    fn process_block(&mut self, input: &[Self::Input], output: &mut [Self::Output]);
}

/// An algorithm that only works on blocks of exactly [`FixedLengthBlock::length`]
pub trait FixedLengthBlock: Send {
    type Input: Sample;
    type Output: Sample;

    fn length(&self) -> usize;

    /// `input` and `output` are both [`FixedLengthBlock::length`] long
    fn process_block(&mut self, input: &[Self::Input], output: &mut [Self::Output]);
}

/// Runs an [`AnyLengthBlock`] over `min(available, writable)` samples
pub struct AnyLength<B: AnyLengthBlock> {
    block: B,
    bindings: Bindings<B::Input, B::Output>,
}

impl<B: AnyLengthBlock> AnyLength<B> {
    pub fn new(block: B) -> Self {
        Self {
            block,
            bindings: Bindings::new(),
        }
    }

    pub fn block(&self) -> &B {
        &self.block
    }

    pub fn block_mut(&mut self) -> &mut B {
        &mut self.block
    }
}

impl<B: AnyLengthBlock> Module for AnyLength<B> {
    type Input = B::Input;
    type Output = B::Output;

    fn bindings(&self) -> &Bindings<B::Input, B::Output> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<B::Input, B::Output> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        available > 0 && writable > 0
    }

    fn process(&mut self) {
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let size = reader.available().min(writer.writable());
        self.block
            .process_block(&reader.read_slice()[..size], &mut writer.write_slice()[..size]);
        reader.advance(size);
        writer.advance(size);
    }
}

/// Runs a [`FixedLengthBlock`] one whole block at a time
pub struct FixedLength<B: FixedLengthBlock> {
    block: B,
    bindings: Bindings<B::Input, B::Output>,
}

impl<B: FixedLengthBlock> FixedLength<B> {
    pub fn new(block: B) -> Self {
        Self {
            block,
            bindings: Bindings::new(),
        }
    }

    pub fn block(&self) -> &B {
        &self.block
    }

    pub fn block_mut(&mut self) -> &mut B {
        &mut self.block
    }
}

impl<B: FixedLengthBlock> Module for FixedLength<B> {
    type Input = B::Input;
    type Output = B::Output;

    fn bindings(&self) -> &Bindings<B::Input, B::Output> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<B::Input, B::Output> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        let length = self.block.length();
        available >= length && writable >= length
    }

    fn process(&mut self) {
        let length = self.block.length();
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        if reader.available() < length || writer.writable() < length {
            return;
        }
        self.block.process_block(
            &reader.read_slice()[..length],
            &mut writer.write_slice()[..length],
        );
        reader.advance(length);
        writer.advance(length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;

    struct Double;

    impl AnyLengthBlock for Double {
        type Input = f32;
        type Output = f32;

        fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
            for (out, x) in output.iter_mut().zip(input) {
                *out = x * 2.0;
            }
        }
    }

    struct Sum4;

    impl FixedLengthBlock for Sum4 {
        type Input = i16;
        type Output = i16;

        fn length(&self) -> usize {
            4
        }

        fn process_block(&mut self, input: &[i16], output: &mut [i16]) {
            let sum: i16 = input.iter().sum();
            output.fill(sum);
        }
    }

    #[test]
    fn any_length_processes_what_fits() {
        let mut module = AnyLength::new(Double);
        let (mut input, reader) = RingBuffer::new::<f32>(64);
        let (writer, output) = RingBuffer::new::<f32>(3);
        module.set_reader(reader);
        module.set_writer(writer);

        assert!(!module.can_process(), "nothing to read yet");
        input.push(&[1.0, 2.0, 3.0, 4.0]);
        assert!(module.can_process());

        module.process();
        assert_eq!(output.read_slice(), &[2.0, 4.0, 6.0]);
        assert!(!module.can_process(), "output is full");
    }

    #[test]
    fn fixed_length_waits_for_whole_block() {
        let mut module = FixedLength::new(Sum4);
        let (mut input, reader) = RingBuffer::new::<i16>(64);
        let (writer, output) = RingBuffer::new::<i16>(64);
        module.set_reader(reader);
        module.set_writer(writer);

        input.push(&[1, 2, 3]);
        assert!(!module.can_process());
        input.push(&[4, 5]);
        assert!(module.can_process());

        module.process();
        assert_eq!(output.read_slice(), &[10, 10, 10, 10]);
        assert_eq!(module.bindings().reader().map(|r| r.available()), Some(1));
    }

    #[test]
    fn unbound_module_is_never_ready() {
        let mut module = AnyLength::new(Double);
        assert!(!module.can_process());
        module.process();
    }
}
