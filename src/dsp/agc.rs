//! Automatic Gain Control
//!
//! Envelope-following gain with fast attack, hang, and slow decay, smoothed
//! by an alpha-beta filter. Works on `i16`, `f32` and complex samples; each
//! representation normalizes and clips in its own range.

use crate::domain::{AgcConfig, ComplexF32, Sample, SdrResult};
use crate::module::{AnyLength, AnyLengthBlock};

/// Alpha-beta filter time step
const DT: f32 = 0.5;
/// Alpha-beta filter velocity gain
const BETA: f32 = 0.005;

/// Per-representation magnitude and output scaling
pub trait AgcSample: Sample {
    /// Magnitude normalized to full scale 1.0
    fn magnitude(self) -> f32;
    fn is_zero(self) -> bool;
    /// Apply `gain`, clipping to the representation's range
    fn scale(self, gain: f32) -> Self;
}

impl AgcSample for i16 {
    fn magnitude(self) -> f32 {
        (self as f32).abs() / i16::MAX as f32
    }

    fn is_zero(self) -> bool {
        self == 0
    }

    fn scale(self, gain: f32) -> Self {
        let val = gain * self as f32;
        if val >= i16::MAX as f32 {
            i16::MAX
        } else if val <= i16::MIN as f32 {
            i16::MIN
        } else {
            val as i16
        }
    }
}

impl AgcSample for f32 {
    fn magnitude(self) -> f32 {
        self.abs()
    }

    fn is_zero(self) -> bool {
        self == 0.0
    }

    fn scale(self, gain: f32) -> Self {
        (self * gain).clamp(-1.0, 1.0)
    }
}

impl AgcSample for ComplexF32 {
    fn magnitude(self) -> f32 {
        self.norm()
    }

    fn is_zero(self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    fn scale(self, gain: f32) -> Self {
        let val = self * gain;
        ComplexF32::new(val.re.clamp(-1.0, 1.0), val.im.clamp(-1.0, 1.0))
    }
}

pub struct Agc<T> {
    reference: f32,
    attack_rate: f32,
    decay_rate: f32,
    max_gain: f32,
    hang_time: usize,
    gain_filter_alpha: f32,
    gain: f32,
    hang_counter: usize,
    xk: f32,
    vk: f32,
    _sample: std::marker::PhantomData<fn(T) -> T>,
}

/// AGC running as a stream module
pub type AgcModule<T> = AnyLength<Agc<T>>;

impl<T: AgcSample> Agc<T> {
    /// AGC with the fast profile defaults
    pub fn new() -> Self {
        Self::with_config(&AgcConfig::default())
    }

    pub fn with_config(config: &AgcConfig) -> Self {
        Self {
            reference: config.reference,
            attack_rate: config.attack_rate,
            decay_rate: config.decay_rate,
            max_gain: config.max_gain,
            hang_time: config.hang_time,
            gain_filter_alpha: config.gain_filter_alpha,
            gain: config.initial_gain,
            hang_counter: 0,
            // smoother starts settled on the initial gain
            xk: config.initial_gain,
            vk: 0.0,
            _sample: std::marker::PhantomData,
        }
    }

    /// Validated construction from configuration
    pub fn from_config(config: &AgcConfig) -> SdrResult<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    pub fn module(config: &AgcConfig) -> SdrResult<AgcModule<T>> {
        Ok(AnyLength::new(Self::from_config(config)?))
    }

    /// Process a sample through AGC
    pub fn process_sample(&mut self, sample: T) -> T {
        // zero samples would demand infinite gain
        if !sample.is_zero() {
            let error = sample.magnitude() * self.gain / self.reference;
            let dgain = if error > 1.0 {
                self.hang_counter = self.hang_time;
                1.0 - self.attack_rate
            } else if self.hang_counter > 0 {
                self.hang_counter -= 1;
                1.0
            } else {
                1.0 + self.decay_rate
            };
            self.gain *= dgain;
        }

        let predicted = self.xk + self.vk * DT;
        let residual = self.gain - predicted;
        self.xk = predicted + self.gain_filter_alpha * residual;
        self.vk += BETA * residual / DT;
        self.gain = self.xk.clamp(0.0, self.max_gain);

        sample.scale(self.gain)
    }

    /// Get current gain value (useful for signal strength indication)
    pub fn current_gain(&self) -> f32 {
        self.gain
    }

    pub fn set_reference(&mut self, reference: f32) {
        self.reference = reference;
    }

    pub fn set_attack(&mut self, attack_rate: f32) {
        self.attack_rate = attack_rate;
    }

    pub fn set_decay(&mut self, decay_rate: f32) {
        self.decay_rate = decay_rate;
    }

    pub fn set_max_gain(&mut self, max_gain: f32) {
        self.max_gain = max_gain;
    }

    pub fn set_initial_gain(&mut self, gain: f32) {
        self.gain = gain;
        self.xk = gain;
        self.vk = 0.0;
    }

    pub fn set_hang_time(&mut self, hang_time: usize) {
        self.hang_time = hang_time;
    }

    /// Apply every parameter of `config` except the initial gain
    pub fn apply_config(&mut self, config: &AgcConfig) {
        self.reference = config.reference;
        self.attack_rate = config.attack_rate;
        self.decay_rate = config.decay_rate;
        self.max_gain = config.max_gain;
        self.hang_time = config.hang_time;
        self.gain_filter_alpha = config.gain_filter_alpha;
    }
}

impl<T: AgcSample> Default for Agc<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AgcSample> AnyLengthBlock for Agc<T> {
    type Input = T;
    type Output = T;

    fn process_block(&mut self, input: &[T], output: &mut [T]) {
        for (out, &x) in output.iter_mut().zip(input) {
            *out = self.process_sample(x);
        }
    }
}
