//! `rubato` backed resampler kernel

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::domain::{SdrError, SdrResult};
use crate::ports::ResamplerKernel;

/// Input frames handed to the sinc interpolator per call
const CHUNK_FRAMES: usize = 1024;

/// Sinc interpolation length; the output lags the input by half of it
pub const SINC_LEN: usize = 128;

/// Mono sinc resampler with a fixed input chunk size
pub struct RubatoResampler {
    resampler: SincFixedIn<f32>,
    ratio: f64,
}

impl RubatoResampler {
    /// Resample by `ratio` (output rate / input rate)
    pub fn new(ratio: f64) -> SdrResult<Self> {
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(SdrError::Config(format!("invalid resampling ratio {ratio}")));
        }
        let params = SincInterpolationParameters {
            sinc_len: SINC_LEN,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        };
        let resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, 1)
            .map_err(|e| SdrError::Resampler(format!("Failed to create resampler: {e:?}")))?;
        log::debug!("Created sinc resampler, ratio {ratio:.6}");
        Ok(Self { resampler, ratio })
    }

    /// Resample between two integer sample rates
    pub fn from_rates(input_rate: u32, output_rate: u32) -> SdrResult<Self> {
        if input_rate == 0 {
            return Err(SdrError::UnsupportedSampleRate(input_rate));
        }
        if output_rate == 0 {
            return Err(SdrError::UnsupportedSampleRate(output_rate));
        }
        Self::new(output_rate as f64 / input_rate as f64)
    }

    /// Output frames the interpolator holds back, which only a flush releases
    pub fn delay_frames(&self) -> usize {
        (SINC_LEN as f64 / 2.0 * self.ratio).round() as usize
    }
}

impl ResamplerKernel for RubatoResampler {
    fn ratio(&self) -> f64 {
        self.ratio
    }

    fn input_frames_next(&self) -> usize {
        self.resampler.input_frames_next()
    }

    fn output_frames_max(&self) -> usize {
        self.resampler.output_frames_max()
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) -> SdrResult<(usize, usize)> {
        let frames = self.resampler.input_frames_next();
        if input.len() < frames {
            return Err(SdrError::Resampler(format!(
                "need {frames} input frames, got {}",
                input.len()
            )));
        }
        self.resampler
            .process_into_buffer(&[&input[..frames]], &mut [output], None)
            .map_err(|e| SdrError::Resampler(format!("{e:?}")))
    }

    fn flush(&mut self, input: &[f32], output: &mut [f32]) -> SdrResult<(usize, usize)> {
        let frames = self.resampler.input_frames_next();
        if input.len() > frames {
            return Err(SdrError::Resampler(format!(
                "flush takes at most {frames} frames, got {}",
                input.len()
            )));
        }
        let remainder = [input];
        let wave_in = (!input.is_empty()).then_some(&remainder[..]);
        // rubato pads to a whole chunk and reports the padded length
        let (_, produced) = self
            .resampler
            .process_partial_into_buffer(wave_in, &mut [&mut *output], None)
            .map_err(|e| SdrError::Resampler(format!("{e:?}")))?;
        // beyond the remainder and the delayed tail, the padding is silence
        let useful = ((input.len() + SINC_LEN / 2) as f64 * self.ratio).ceil() as usize;
        log::debug!("resampler flushed {} trailing frames", input.len());
        Ok((input.len(), produced.min(useful)))
    }
}
