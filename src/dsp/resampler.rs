//! Audio sample rate conversion module
//!
//! Drives any [`ResamplerKernel`] one kernel chunk at a time. Once the
//! input ends, the trailing partial chunk and the kernel's delayed tail are
//! flushed in one last call.

use crate::adapters::RubatoResampler;
use crate::domain::SdrResult;
use crate::module::{Bindings, Module};
use crate::ports::ResamplerKernel;

pub struct AudioResampler {
    kernel: Box<dyn ResamplerKernel>,
    flushed: bool,
    bindings: Bindings<f32, f32>,
}

impl AudioResampler {
    /// Resample by `ratio` (output rate / input rate)
    pub fn new(ratio: f64) -> SdrResult<Self> {
        Ok(Self::with_kernel(Box::new(RubatoResampler::new(ratio)?)))
    }

    pub fn from_rates(input_rate: u32, output_rate: u32) -> SdrResult<Self> {
        Ok(Self::with_kernel(Box::new(RubatoResampler::from_rates(
            input_rate,
            output_rate,
        )?)))
    }

    pub fn with_kernel(kernel: Box<dyn ResamplerKernel>) -> Self {
        Self {
            kernel,
            flushed: false,
            bindings: Bindings::new(),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.kernel.ratio()
    }

    fn input_finished(&self) -> bool {
        self.bindings.reader().is_some_and(|r| r.is_terminated())
    }
}

impl Module for AudioResampler {
    type Input = f32;
    type Output = f32;

    fn bindings(&self) -> &Bindings<f32, f32> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<f32, f32> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        if writable < self.kernel.output_frames_max() {
            return false;
        }
        available >= self.kernel.input_frames_next() || (self.input_finished() && !self.flushed)
    }

    fn process(&mut self) {
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let input = reader.read_slice();
        let result = if input.len() >= self.kernel.input_frames_next() {
            self.kernel.process(input, writer.write_slice())
        } else if reader.is_terminated() && !self.flushed {
            self.flushed = true;
            self.kernel.flush(input, writer.write_slice())
        } else {
            return;
        };
        match result {
            Ok((consumed, produced)) => {
                writer.advance(produced);
                reader.advance(consumed);
            }
            Err(e) => {
                log::error!("resampler failed, closing stage: {e}");
                self.bindings.close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;
    use crate::domain::SdrError;
    use crate::module::Stage;

    /// Keeps every other sample of 4-sample chunks
    struct Halver;

    impl ResamplerKernel for Halver {
        fn ratio(&self) -> f64 {
            0.5
        }

        fn input_frames_next(&self) -> usize {
            4
        }

        fn output_frames_max(&self) -> usize {
            2
        }

        fn process(&mut self, input: &[f32], output: &mut [f32]) -> SdrResult<(usize, usize)> {
            output[0] = input[0];
            output[1] = input[2];
            Ok((4, 2))
        }

        fn flush(&mut self, input: &[f32], output: &mut [f32]) -> SdrResult<(usize, usize)> {
            let kept: Vec<f32> = input.iter().step_by(2).copied().collect();
            output[..kept.len()].copy_from_slice(&kept);
            Ok((input.len(), kept.len()))
        }
    }

    struct Broken;

    impl ResamplerKernel for Broken {
        fn ratio(&self) -> f64 {
            1.0
        }

        fn input_frames_next(&self) -> usize {
            1
        }

        fn output_frames_max(&self) -> usize {
            1
        }

        fn process(&mut self, _input: &[f32], _output: &mut [f32]) -> SdrResult<(usize, usize)> {
            Err(SdrError::Resampler("broken".into()))
        }

        fn flush(&mut self, _input: &[f32], _output: &mut [f32]) -> SdrResult<(usize, usize)> {
            Err(SdrError::Resampler("broken".into()))
        }
    }

    #[test]
    fn works_in_kernel_chunks() {
        let mut resampler = AudioResampler::with_kernel(Box::new(Halver));
        let (mut input, reader) = RingBuffer::new::<f32>(64);
        let (writer, output) = RingBuffer::new::<f32>(64);
        resampler.set_reader(reader);
        resampler.set_writer(writer);

        input.push(&[1.0, 2.0, 3.0]);
        assert!(!resampler.can_process());
        input.push(&[4.0, 5.0]);
        resampler.process();
        assert_eq!(output.read_slice(), &[1.0, 3.0]);
        assert!(!resampler.can_process(), "one frame left over");
    }

    #[test]
    fn kernel_failure_terminates_the_stage() {
        let mut resampler = AudioResampler::with_kernel(Box::new(Broken));
        let (mut input, reader) = RingBuffer::new::<f32>(8);
        let (writer, output) = RingBuffer::new::<f32>(8);
        resampler.set_reader(reader);
        resampler.set_writer(writer);

        input.push(&[1.0]);
        resampler.process();
        assert!(output.is_terminated());
        assert!(input.is_terminated());
        assert!(Stage::is_terminated(&resampler));
    }

    #[test]
    fn trailing_frames_are_flushed_at_end_of_stream() {
        let mut resampler = AudioResampler::with_kernel(Box::new(Halver));
        let (mut input, reader) = RingBuffer::new::<f32>(64);
        let (writer, output) = RingBuffer::new::<f32>(64);
        resampler.set_reader(reader);
        resampler.set_writer(writer);

        input.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        while resampler.can_process() {
            resampler.process();
        }
        assert_eq!(output.read_slice(), &[1.0, 3.0]);

        drop(input);
        assert!(resampler.can_process(), "remainder waits for a flush");
        resampler.process();
        assert_eq!(output.read_slice(), &[1.0, 3.0, 5.0, 7.0]);
        assert!(!resampler.can_process(), "flush happens once");
        assert!(Stage::is_terminated(&resampler));
    }

    #[test]
    fn rubato_kernel_converts_rate() {
        let mut resampler = AudioResampler::from_rates(48_000, 24_000).unwrap();
        assert_eq!(resampler.ratio(), 0.5);
        let (mut input, reader) = RingBuffer::new::<f32>(8192);
        let (writer, output) = RingBuffer::new::<f32>(8192);
        resampler.set_reader(reader);
        resampler.set_writer(writer);

        input.push(&vec![0.25; 4096 + 300]);
        while resampler.can_process() {
            resampler.process();
        }
        // whole chunks only, the first one short by the interpolator delay
        let before_flush = output.available();
        assert!(
            before_flush.abs_diff(2048 - 32) <= 4,
            "four chunks at half rate should give about 2016, got {before_flush}"
        );

        drop(input);
        while resampler.can_process() {
            resampler.process();
        }
        let produced = output.available();
        assert!(
            produced.abs_diff(2198) <= 4,
            "4396 frames at half rate should give about 2198, got {produced}"
        );
        assert!(Stage::is_terminated(&resampler));
    }
}
