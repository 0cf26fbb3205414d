//! Window functions for filter design and spectral analysis
//!
//! A window kernel is evaluated over `[-1, 1]` with the peak at `0`. Tap
//! generators sample one half (`i / middle`), block windows sample the
//! whole span through [`Window::precalculate`].

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{ComplexF32, SdrError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// Rectangular window. Unwindowed FIR filters have poor stopband
    /// behaviour, this exists mostly for comparison.
    Boxcar,
    /// Better stopband attenuation than Hamming, slower rolloff
    #[default]
    Blackman,
    /// Faster rolloff than Blackman, worse stopband attenuation
    Hamming,
}

impl Window {
    /// Evaluate the window kernel at `rate`
    pub fn kernel(&self, rate: f32) -> f32 {
        match self {
            Window::Boxcar => 1.0,
            Window::Blackman => {
                let r = 0.5 + rate / 2.0;
                0.42 - 0.5 * (2.0 * PI * r).cos() + 0.08 * (4.0 * PI * r).cos()
            }
            Window::Hamming => {
                let r = 0.5 + rate / 2.0;
                0.54 - 0.46 * (2.0 * PI * r).cos()
            }
        }
    }

    /// Tabulate the window over a block of `size` samples
    pub fn precalculate(&self, size: usize) -> PrecalculatedWindow {
        let span = size.saturating_sub(1).max(1) as f32;
        let table = (0..size)
            .map(|i| {
                let rate = i as f32 / span;
                self.kernel(2.0 * rate + 1.0)
            })
            .collect();
        PrecalculatedWindow { table }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Window::Boxcar => "boxcar",
            Window::Blackman => "blackman",
            Window::Hamming => "hamming",
        };
        f.write_str(name)
    }
}

impl FromStr for Window {
    type Err = SdrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "boxcar" => Ok(Window::Boxcar),
            "blackman" => Ok(Window::Blackman),
            "hamming" => Ok(Window::Hamming),
            _ => Err(SdrError::UnknownWindow(s.to_string())),
        }
    }
}

/// A window evaluated once for a fixed block size
#[derive(Debug, Clone)]
pub struct PrecalculatedWindow {
    table: Vec<f32>,
}

impl PrecalculatedWindow {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn apply(&self, input: &[ComplexF32], output: &mut [ComplexF32]) {
        for ((out, &x), &w) in output.iter_mut().zip(input).zip(&self.table) {
            *out = x * w;
        }
    }

    pub fn apply_real(&self, input: &[f32], output: &mut [f32]) {
        for ((out, &x), &w) in output.iter_mut().zip(input).zip(&self.table) {
            *out = x * w;
        }
    }
}
