//! Sample rate conversion port

use crate::domain::SdrResult;

/// A mono `f32` resampler converting by a fixed ratio
///
/// Implementations may consume input in chunks of their own choosing and
/// keep internal history; callers feed [`ResamplerKernel::input_frames_next`]
/// frames at a time.
pub trait ResamplerKernel: Send {
    /// Output rate divided by input rate
    fn ratio(&self) -> f64;

    /// Input frames the next call to [`ResamplerKernel::process`] consumes
    fn input_frames_next(&self) -> usize;

    /// Upper bound on output frames a single call may produce
    fn output_frames_max(&self) -> usize;

    /// Resample `input` into `output`, returning `(frames_consumed, frames_produced)`
    fn process(&mut self, input: &[f32], output: &mut [f32]) -> SdrResult<(usize, usize)>;

    /// End of stream: resample the short remainder in `input` (possibly
    /// empty) and push out whatever the kernel still holds back. `output`
    /// has room for [`ResamplerKernel::output_frames_max`] frames.
    fn flush(&mut self, input: &[f32], output: &mut [f32]) -> SdrResult<(usize, usize)>;
}
