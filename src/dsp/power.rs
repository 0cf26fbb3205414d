//! Signal power measurement and squelch
//!
//! Both modules work on 1024-sample blocks, estimate the block power from
//! every `decimation`-th sample and report it on a channel. [`Power`] passes
//! every block through; [`Squelch`] only passes blocks at or above its level
//! and otherwise emits a few blocks of silence to flush downstream filters.

use crossbeam_channel::{Sender, TrySendError};

use crate::domain::ComplexF32;
use crate::module::{Bindings, Module};

/// Samples per measurement
pub const POWER_BLOCK: usize = 1024;

/// Silent blocks emitted after the squelch closes
const FLUSH_BLOCKS: u32 = 5;

/// Mean `|x|²` over every `decimation`-th sample of a block
fn block_power(block: &[ComplexF32], decimation: usize) -> f32 {
    let acc: f32 = block.iter().step_by(decimation).map(|x| x.norm_sqr()).sum();
    acc / (block.len() as f32 / decimation as f32).ceil()
}

struct Meter {
    decimation: usize,
    reports: Sender<f32>,
    disconnected: bool,
}

impl Meter {
    fn new(decimation: usize, reports: Sender<f32>) -> Self {
        Self {
            decimation: decimation.max(1),
            reports,
            disconnected: false,
        }
    }

    fn measure(&mut self, block: &[ComplexF32]) -> f32 {
        let power = block_power(block, self.decimation);
        match self.reports.try_send(power) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                if !self.disconnected {
                    log::debug!("power reports dropped, receiver is gone");
                    self.disconnected = true;
                }
            }
        }
        power
    }
}

/// Pass-through power meter
pub struct Power {
    meter: Meter,
    bindings: Bindings<ComplexF32, ComplexF32>,
}

impl Power {
    pub fn new(decimation: usize, reports: Sender<f32>) -> Self {
        Self {
            meter: Meter::new(decimation, reports),
            bindings: Bindings::new(),
        }
    }
}

impl Module for Power {
    type Input = ComplexF32;
    type Output = ComplexF32;

    fn bindings(&self) -> &Bindings<ComplexF32, ComplexF32> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<ComplexF32, ComplexF32> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        available > POWER_BLOCK && writable > POWER_BLOCK
    }

    fn process(&mut self) {
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let block = &reader.read_slice()[..POWER_BLOCK];
        self.meter.measure(block);
        writer.write_slice()[..POWER_BLOCK].copy_from_slice(block);
        writer.advance(POWER_BLOCK);
        reader.advance(POWER_BLOCK);
    }
}

/// Power-gated pass-through
pub struct Squelch {
    meter: Meter,
    level: f32,
    flush_counter: u32,
    bindings: Bindings<ComplexF32, ComplexF32>,
}

impl Squelch {
    /// Squelch at `level`; a level of zero keeps it open
    pub fn new(decimation: usize, reports: Sender<f32>, level: f32) -> Self {
        Self {
            meter: Meter::new(decimation, reports),
            level,
            flush_counter: 0,
            bindings: Bindings::new(),
        }
    }

    pub fn set_squelch(&mut self, level: f32) {
        self.level = level;
    }

    pub fn level(&self) -> f32 {
        self.level
    }
}

impl Module for Squelch {
    type Input = ComplexF32;
    type Output = ComplexF32;

    fn bindings(&self) -> &Bindings<ComplexF32, ComplexF32> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<ComplexF32, ComplexF32> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        available > POWER_BLOCK && writable > POWER_BLOCK
    }

    fn process(&mut self) {
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let block = &reader.read_slice()[..POWER_BLOCK];
        let power = self.meter.measure(block);

        if self.level == 0.0 || power >= self.level {
            writer.write_slice()[..POWER_BLOCK].copy_from_slice(block);
            writer.advance(POWER_BLOCK);
            self.flush_counter = 0;
        } else if self.flush_counter < FLUSH_BLOCKS {
            writer.write_slice()[..POWER_BLOCK].fill(ComplexF32::default());
            writer.advance(POWER_BLOCK);
            self.flush_counter += 1;
        }
        reader.advance(POWER_BLOCK);
    }
}
