//! FIR filter design and direct-form evaluation
//!
//! Filters are evaluated by correlation: output sample `i` is
//! `sum(data[i + k] * taps[k])`, reading `taps.len()` samples ahead. That
//! lookahead is the filter's overhead; a caller must always have
//! `size + overhead` input samples to produce `size` outputs.

use std::f32::consts::PI;

use crate::domain::{ComplexF32, FilterSample, SdrError, SdrResult};
use crate::dsp::window::Window;

/// Number of taps for a filter with the given transition bandwidth
/// (relative to the sample rate). Always odd, so the filter is symmetric
/// around its middle tap.
pub fn filter_length(transition: f32) -> usize {
    let length = (4.0 / transition) as usize;
    if length % 2 == 0 {
        length + 1
    } else {
        length
    }
}

pub(crate) fn check_transition(transition: f32) -> SdrResult<()> {
    if transition.is_finite() && transition > 0.0 {
        Ok(())
    } else {
        Err(SdrError::Config(format!(
            "transition bandwidth must be positive, got {transition}"
        )))
    }
}

/// Something that turns a block of input into a block of output
pub trait Filter<T>: Send {
    /// Filter `size` samples from `input` into `output`, returning how many
    /// outputs were produced. `input` holds at least `size + overhead()`
    /// samples; `output` has room for at least `size`.
    fn apply(&mut self, input: &[T], output: &mut [T], size: usize) -> usize;

    /// Smallest `size` the filter works with
    fn min_processing_size(&self) -> usize {
        0
    }

    /// Extra input samples the filter reads beyond `size`
    fn overhead(&self) -> usize {
        0
    }
}

/// A filter that can compute any single output sample on demand
pub trait SampleFilter<T>: Filter<T> {
    fn process_sample(&self, data: &[T], index: usize) -> T;

    /// View `data` through this filter, computing outputs only when indexed
    fn sparse<'a>(&'a self, data: &'a [T]) -> SparseView<'a, T, Self>
    where
        Self: Sized,
    {
        SparseView { data, filter: self }
    }
}

/// Lazily filtered view over a slice
///
/// Decimators only need every Nth output, so they index this instead of
/// running the filter over every sample.
pub struct SparseView<'a, T, F: ?Sized> {
    data: &'a [T],
    filter: &'a F,
}

impl<T, F: SampleFilter<T> + ?Sized> SparseView<'_, T, F> {
    pub fn get(&self, index: usize) -> T {
        self.filter.process_sample(self.data, index)
    }
}

/// Filter tap representation: real taps scale, complex taps rotate
pub trait Tap: Copy + Send + Sync + 'static {
    fn weigh<T: FilterSample>(self, sample: T) -> T;
}

impl Tap for f32 {
    fn weigh<T: FilterSample>(self, sample: T) -> T {
        sample * self
    }
}

impl Tap for ComplexF32 {
    fn weigh<T: FilterSample>(self, sample: T) -> T {
        sample.mul_complex(self)
    }
}

/// Direct-form FIR filter over samples `T` with taps `U`
pub struct FirFilter<T, U> {
    taps: Vec<U>,
    _sample: std::marker::PhantomData<fn(T) -> T>,
}

impl<T: FilterSample, U: Tap> FirFilter<T, U> {
    pub fn new(taps: Vec<U>) -> SdrResult<Self> {
        if taps.is_empty() {
            return Err(SdrError::Config("FIR filter needs at least one tap".into()));
        }
        Ok(Self {
            taps,
            _sample: std::marker::PhantomData,
        })
    }

    pub fn taps(&self) -> &[U] {
        &self.taps
    }
}

impl<T: FilterSample> FirFilter<T, f32> {
    /// Windowed-sinc low-pass with `cutoff` relative to the sample rate
    pub fn lowpass(cutoff: f32, transition: f32, window: Window) -> SdrResult<Self> {
        check_transition(transition)?;
        check_cutoff(cutoff)?;
        Self::new(lowpass_taps(cutoff, filter_length(transition), window))
    }
}

impl<T: FilterSample> FirFilter<T, ComplexF32> {
    /// Complex band-pass passing `[low_cut, high_cut]` (relative frequencies,
    /// negative values select the lower sideband)
    pub fn bandpass(
        low_cut: f32,
        high_cut: f32,
        transition: f32,
        window: Window,
    ) -> SdrResult<Self> {
        check_transition(transition)?;
        check_band(low_cut, high_cut)?;
        Self::new(bandpass_taps(
            low_cut,
            high_cut,
            filter_length(transition),
            window,
        ))
    }
}

impl<T: FilterSample, U: Tap> Filter<T> for FirFilter<T, U> {
    fn apply(&mut self, input: &[T], output: &mut [T], size: usize) -> usize {
        for (i, out) in output[..size].iter_mut().enumerate() {
            *out = self.process_sample(input, i);
        }
        size
    }

    fn overhead(&self) -> usize {
        self.taps.len()
    }
}

impl<T: FilterSample, U: Tap> SampleFilter<T> for FirFilter<T, U> {
    fn process_sample(&self, data: &[T], index: usize) -> T {
        self.taps
            .iter()
            .zip(&data[index..])
            .fold(T::zero(), |acc, (&tap, &x)| acc + tap.weigh(x))
    }
}

fn check_cutoff(cutoff: f32) -> SdrResult<()> {
    if cutoff > 0.0 && cutoff <= 0.5 {
        Ok(())
    } else {
        Err(SdrError::Config(format!(
            "cutoff must be within (0, 0.5], got {cutoff}"
        )))
    }
}

pub(crate) fn check_band(low_cut: f32, high_cut: f32) -> SdrResult<()> {
    if low_cut < high_cut && low_cut >= -0.5 && high_cut <= 0.5 {
        Ok(())
    } else {
        Err(SdrError::Config(format!(
            "invalid passband [{low_cut}, {high_cut}]"
        )))
    }
}

/// Symmetric windowed-sinc low-pass taps normalized to unity DC gain
pub fn lowpass_taps(cutoff: f32, length: usize, window: Window) -> Vec<f32> {
    let middle = length / 2;
    let mut taps = vec![0.0f32; length];
    taps[middle] = 2.0 * PI * cutoff * window.kernel(0.0);
    for i in 1..=middle {
        let value = (2.0 * PI * cutoff * i as f32).sin() / i as f32
            * window.kernel(i as f32 / middle as f32);
        taps[middle - i] = value;
        taps[middle + i] = value;
    }

    let sum: f32 = taps.iter().sum();
    for tap in &mut taps {
        *tap /= sum;
    }
    taps
}

/// Complex band-pass taps: a low-pass of half the bandwidth, rotated to the
/// band centre and normalized by the sum of tap magnitudes
///
/// The rotation runs against the tap index because filters correlate
/// (`data[i + k] * taps[k]`); that way a tone at `+centre` passes.
pub fn bandpass_taps(low_cut: f32, high_cut: f32, length: usize, window: Window) -> Vec<ComplexF32> {
    let prototype = lowpass_taps((high_cut - low_cut) / 2.0, length, window);
    let centre = (high_cut + low_cut) / 2.0;

    let mut phase = 0.0f32;
    let mut taps: Vec<ComplexF32> = prototype
        .iter()
        .map(|&tap| {
            let rotated = ComplexF32::from_polar(tap, -phase);
            phase = (phase + 2.0 * PI * centre).rem_euclid(2.0 * PI);
            rotated
        })
        .collect();

    let sum: f32 = taps.iter().map(|t| t.norm()).sum();
    for tap in &mut taps {
        *tap /= sum;
    }
    taps
}
