//! Block-wise DC removal
//!
//! Subtracts the block mean, ramping linearly from the previous block's
//! level so block edges do not step.

use crate::module::{FixedLength, FixedLengthBlock};

const DC_BLOCK_LENGTH: usize = 1024;

#[derive(Default)]
pub struct DcBlock {
    last_dc_level: f32,
}

impl DcBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module() -> FixedLength<Self> {
        FixedLength::new(Self::new())
    }
}

impl FixedLengthBlock for DcBlock {
    type Input = f32;
    type Output = f32;

    fn length(&self) -> usize {
        DC_BLOCK_LENGTH
    }

    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        let len = input.len() as f32;
        let average = input.iter().sum::<f32>() / len;
        let step = average - self.last_dc_level;
        let start = self.last_dc_level;
        self.last_dc_level = average;

        for (i, (out, &x)) in output.iter_mut().zip(input).enumerate() {
            *out = x - (start + step * (i as f32 / len));
        }
    }
}
