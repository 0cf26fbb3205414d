//! Chain configuration
//!
//! Parameter sets for the configurable stages, grouped into a
//! [`PipelineConfig`] that can be saved to and loaded from JSON. Every
//! struct has sensible defaults, so partial files deserialize.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{SdrError, SdrResult};
use crate::dsp::window::Window;

/// Preset AGC time constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgcProfile {
    /// Reacts within a few hundred samples; suited to speech
    #[default]
    Fast,
    /// Long hang and slow decay; suited to steady carriers
    Slow,
}

impl AgcProfile {
    pub fn config(&self) -> AgcConfig {
        match self {
            AgcProfile::Fast => AgcConfig::default(),
            AgcProfile::Slow => AgcConfig {
                attack_rate: 0.01,
                decay_rate: 0.0001,
                hang_time: 600,
                ..AgcConfig::default()
            },
        }
    }
}

/// Automatic gain control parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgcConfig {
    /// Target output magnitude
    pub reference: f32,
    /// Fraction of the error applied per sample when the level is too high
    pub attack_rate: f32,
    /// Fraction of the error applied per sample when the level is too low
    pub decay_rate: f32,
    pub max_gain: f32,
    pub initial_gain: f32,
    /// Samples to hold the gain after an attack before decaying again
    pub hang_time: usize,
    /// Smoothing factor of the alpha-beta gain filter
    pub gain_filter_alpha: f32,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            reference: 0.8,
            attack_rate: 0.1,
            decay_rate: 0.001,
            max_gain: 65535.0,
            initial_gain: 1.0,
            hang_time: 200,
            gain_filter_alpha: 1.5,
        }
    }
}

impl AgcConfig {
    pub fn validate(&self) -> SdrResult<()> {
        if !(self.reference > 0.0) {
            return Err(SdrError::Config("AGC reference must be positive".into()));
        }
        if !(self.max_gain > 0.0) {
            return Err(SdrError::Config("AGC max gain must be positive".into()));
        }
        for (name, rate) in [("attack", self.attack_rate), ("decay", self.decay_rate)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SdrError::Config(format!(
                    "AGC {name} rate must be within [0, 1], got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Channel filter parameters. Frequencies are relative to the sample rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub low_cut: f32,
    pub high_cut: f32,
    pub transition: f32,
    pub window: Window,
    /// Filter by overlap-add FFT instead of direct convolution
    pub use_fft: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_cut: -0.1,
            high_cut: 0.1,
            transition: 0.05,
            window: Window::Blackman,
            use_fft: false,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> SdrResult<()> {
        crate::dsp::filter::check_transition(self.transition)?;
        crate::dsp::filter::check_band(self.low_cut, self.high_cut)
    }
}

/// Fractional decimator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimatorConfig {
    /// Input samples per output sample; may be fractional
    pub rate: f32,
    /// Interpolation points, rounded down to an even number
    pub num_poly_points: usize,
    /// Transition bandwidth of the anti-alias filter
    pub transition: f32,
    pub window: Window,
    /// Run the input through an anti-alias low-pass before interpolating
    pub prefilter: bool,
}

impl Default for DecimatorConfig {
    fn default() -> Self {
        Self {
            rate: 2.0,
            num_poly_points: 12,
            transition: 0.03,
            window: Window::Hamming,
            prefilter: true,
        }
    }
}

impl DecimatorConfig {
    pub fn validate(&self) -> SdrResult<()> {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(SdrError::Config(format!(
                "decimation rate must be positive, got {}",
                self.rate
            )));
        }
        if self.num_poly_points < 4 {
            return Err(SdrError::Config(
                "at least four interpolation points are needed".into(),
            ));
        }
        if self.prefilter {
            crate::dsp::filter::check_transition(self.transition)?;
            if self.rate - self.transition <= 1.0 {
                return Err(SdrError::Config(format!(
                    "rate {} is too low for an anti-alias filter with transition {}",
                    self.rate, self.transition
                )));
            }
        }
        Ok(())
    }
}

/// Symbol timing error detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingAlgorithm {
    #[default]
    Gardner,
    EarlyLate,
}

impl fmt::Display for TimingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingAlgorithm::Gardner => f.write_str("gardner"),
            TimingAlgorithm::EarlyLate => f.write_str("earlylate"),
        }
    }
}

impl FromStr for TimingAlgorithm {
    type Err = SdrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gardner" => Ok(TimingAlgorithm::Gardner),
            "earlylate" | "early-late" => Ok(TimingAlgorithm::EarlyLate),
            _ => Err(SdrError::Config(format!("unknown timing algorithm: {s}"))),
        }
    }
}

/// Symbol timing recovery parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub algorithm: TimingAlgorithm,
    /// Input samples per symbol
    pub decimation: usize,
    pub loop_gain: f32,
    /// Clamp for the timing error estimate
    pub max_error: f32,
    /// Estimate the error from the Q component instead of I
    pub use_q: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            algorithm: TimingAlgorithm::Gardner,
            decimation: 8,
            loop_gain: 0.5,
            max_error: 2.0,
            use_q: false,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> SdrResult<()> {
        if self.decimation < 4 {
            return Err(SdrError::Config(format!(
                "timing recovery needs at least 4 samples per symbol, got {}",
                self.decimation
            )));
        }
        if !(self.max_error > 0.0) {
            return Err(SdrError::Config("max timing error must be positive".into()));
        }
        Ok(())
    }
}

/// ADPCM codec parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdpcmConfig {
    /// Interleave sync frames so a decoder can join mid-stream
    pub sync: bool,
}

/// Everything needed to assemble a receive chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Profile name (e.g., "NFM 12k", "PSK31 narrow")
    pub name: String,
    /// Input sample rate in Hz
    pub sample_rate: u32,
    /// Capacity of each inter-stage buffer, in samples
    pub buffer_size: usize,
    pub agc: AgcConfig,
    pub filter: FilterConfig,
    pub decimator: DecimatorConfig,
    pub timing: TimingConfig,
    pub adpcm: AdpcmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            sample_rate: 48000,
            buffer_size: 65536,
            agc: AgcConfig::default(),
            filter: FilterConfig::default(),
            decimator: DecimatorConfig::default(),
            timing: TimingConfig::default(),
            adpcm: AdpcmConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> SdrResult<()> {
        if self.sample_rate == 0 {
            return Err(SdrError::UnsupportedSampleRate(self.sample_rate));
        }
        if self.buffer_size == 0 {
            return Err(SdrError::Config("buffer size must be positive".into()));
        }
        self.agc.validate()?;
        self.filter.validate()?;
        self.decimator.validate()?;
        self.timing.validate()
    }

    /// Rate after the fractional decimator, in Hz
    pub fn decimated_rate(&self) -> f32 {
        self.sample_rate as f32 / self.decimator.rate
    }

    /// Rate of the symbols leaving timing recovery, in Hz
    pub fn symbol_rate(&self) -> f32 {
        self.decimated_rate() / self.timing.decimation as f32
    }

    /// Read and validate a configuration file
    pub fn load(path: &Path) -> SdrResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("Loaded configuration '{}' from {}", config.name, path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> SdrResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        log::debug!("Saved configuration '{}' to {}", self.name, path.display());
        Ok(())
    }
}
