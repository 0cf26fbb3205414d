//! Symbol timing recovery
//!
//! Emits one sample per symbol from an oversampled complex stream and nudges
//! the symbol boundary by a correction derived from a timing error detector.
//! Each call assumes the window starts half a symbol before the sampling
//! point the previous call aimed for.

use crate::domain::{ComplexF32, SdrResult, TimingAlgorithm, TimingConfig};
use crate::module::{Bindings, Module};

/// Early-late wing as a fraction of a symbol
const EARLYLATE_RATIO: f32 = 0.25;

pub struct TimingRecovery {
    algorithm: TimingAlgorithm,
    decimation: usize,
    loop_gain: f32,
    max_error: f32,
    use_q: bool,
    correction_offset: i32,
    bindings: Bindings<ComplexF32, ComplexF32>,
}

/// Sample positions used for one symbol
struct Points {
    emit: usize,
    left: usize,
    mid: usize,
    right: usize,
    sign: f32,
}

impl TimingRecovery {
    pub fn new(config: &TimingConfig) -> SdrResult<Self> {
        config.validate()?;
        log::debug!(
            "timing recovery: {} at {} samples per symbol",
            config.algorithm,
            config.decimation
        );
        Ok(Self {
            algorithm: config.algorithm,
            decimation: config.decimation,
            loop_gain: config.loop_gain,
            max_error: config.max_error,
            use_q: config.use_q,
            correction_offset: 0,
            bindings: Bindings::new(),
        })
    }

    pub fn gardner(decimation: usize, loop_gain: f32) -> SdrResult<Self> {
        Self::new(&TimingConfig {
            algorithm: TimingAlgorithm::Gardner,
            decimation,
            loop_gain,
            ..TimingConfig::default()
        })
    }

    pub fn early_late(decimation: usize, loop_gain: f32) -> SdrResult<Self> {
        Self::new(&TimingConfig {
            algorithm: TimingAlgorithm::EarlyLate,
            decimation,
            loop_gain,
            ..TimingConfig::default()
        })
    }

    /// Correction applied to the last symbol advance, in samples
    pub fn correction_offset(&self) -> i32 {
        self.correction_offset
    }

    fn points(&self) -> Points {
        let half = self.decimation / 2;
        match self.algorithm {
            TimingAlgorithm::Gardner => Points {
                emit: half,
                left: half,
                mid: half * 2,
                right: half * 3,
                sign: -1.0,
            },
            TimingAlgorithm::EarlyLate => {
                let wing = (self.decimation as f32 * EARLYLATE_RATIO) as i32;
                Points {
                    emit: half,
                    left: (wing - self.correction_offset).max(0) as usize,
                    mid: half,
                    right: (wing * 3) as usize,
                    sign: 1.0,
                }
            }
        }
    }

    fn timing_error(&self, input: &[ComplexF32], points: &Points) -> f32 {
        let (left, mid, right) = (input[points.left], input[points.mid], input[points.right]);
        let error = if self.use_q {
            (right.im - left.im) * mid.im / 2.0
        } else {
            (right.re - left.re) * mid.re
        };
        error.clamp(-self.max_error, self.max_error)
    }
}

impl Module for TimingRecovery {
    type Input = ComplexF32;
    type Output = ComplexF32;

    fn bindings(&self) -> &Bindings<ComplexF32, ComplexF32> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<ComplexF32, ComplexF32> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        available > (self.decimation / 2) * 3 && writable > 0
    }

    fn process(&mut self) {
        let half = self.decimation / 2;
        let quarter = (self.decimation / 4) as f32;
        let offset = self.correction_offset as f32;
        if offset <= -0.9 * quarter || offset >= 0.9 * quarter {
            self.correction_offset = 0;
        }

        let points = self.points();
        let (symbol, error, available) = {
            let Some(reader) = self.bindings.reader() else {
                return;
            };
            let input = reader.read_slice();
            (input[points.emit], self.timing_error(input, &points), input.len())
        };

        self.correction_offset = (half as f32 * points.sign * error * self.loop_gain) as i32;
        let advance = (self.decimation as i32 + self.correction_offset).clamp(1, available as i32);

        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        writer.write_slice()[0] = symbol;
        writer.advance(1);
        reader.advance(advance as usize);
    }
}
