//! IMA ADPCM compression for audio and spectrum streams
//!
//! Two 4-bit codes are packed per byte, first sample in the low nibble.
//! The encoder can interleave sync frames (`"SYNC"`, step index and
//! predictor as little-endian `i16`) so a decoder joining mid-stream can
//! pick up the codec state.

use crate::domain::{AdpcmConfig, SdrError, SdrResult};
use crate::module::{Bindings, Module};

const STEP_SIZE_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408,
    449, 494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630,
    9493, 10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

/// Step index adjustment per code, magnitude bits only
const INDEX_ADJUST_TABLE: [i32; 8] = [-1, -1, -1, -1, 2, 4, 6, 8];

const MAX_INDEX: i32 = STEP_SIZE_TABLE.len() as i32 - 1;

pub const SYNC_MAGIC: &[u8; 4] = b"SYNC";
/// Magic plus index and predictor
pub const SYNC_FRAME_LEN: usize = 8;
/// Data bytes between sync frames
pub const SYNC_INTERVAL: usize = 1000;

/// Samples of padding in front of every spectrum frame
pub const FFT_PAD_SAMPLES: usize = 10;
/// Spectrum values are scaled by this before encoding
const FFT_SCALE: f32 = 100.0;

/// Predictor and step index shared by encoder and decoder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdpcmCodec {
    predictor: i32,
    index: i32,
}

impl AdpcmCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.predictor = 0;
        self.index = 0;
    }

    pub fn index(&self) -> i16 {
        self.index as i16
    }

    pub fn predictor(&self) -> i16 {
        self.predictor as i16
    }

    pub fn step_size(&self) -> i32 {
        STEP_SIZE_TABLE[self.index as usize]
    }

    /// Restore state carried by a sync frame
    pub fn set_state(&mut self, index: i16, predictor: i16) -> SdrResult<()> {
        if !(0..=MAX_INDEX).contains(&(index as i32)) {
            return Err(SdrError::Config(format!("ADPCM step index {index} out of range")));
        }
        self.index = index as i32;
        self.predictor = predictor as i32;
        Ok(())
    }

    pub fn encode_sample(&mut self, sample: i16) -> u8 {
        let mut diff = sample as i32 - self.predictor;
        let mut step = self.step_size();
        let mut code = 0u8;

        if diff < 0 {
            code = 8;
            diff = -diff;
        }
        // code = 4 * diff / step, rounded the way the decoder reconstructs it
        for bit in [4u8, 2, 1] {
            if diff >= step {
                code |= bit;
                diff -= step;
            }
            step >>= 1;
        }

        self.decode_sample(code);
        code
    }

    /// Spectrum values, scaled by 100 to match what display clients expect
    pub fn encode_float(&mut self, value: f32) -> u8 {
        self.encode_sample((value * FFT_SCALE) as i16)
    }

    pub fn decode_sample(&mut self, code: u8) -> i16 {
        let step = self.step_size();
        // (code + 0.5) * step / 4
        let mut difference = step >> 3;
        if code & 1 != 0 {
            difference += step >> 2;
        }
        if code & 2 != 0 {
            difference += step >> 1;
        }
        if code & 4 != 0 {
            difference += step;
        }
        if code & 8 != 0 {
            difference = -difference;
        }

        self.predictor = (self.predictor + difference).clamp(i16::MIN as i32, i16::MAX as i32);
        self.index = (self.index + INDEX_ADJUST_TABLE[(code & 7) as usize]).clamp(0, MAX_INDEX);
        self.predictor as i16
    }

    fn encode_pair(&mut self, first: i16, second: i16) -> u8 {
        self.encode_sample(first) | (self.encode_sample(second) << 4)
    }

    fn sync_frame(&self) -> [u8; SYNC_FRAME_LEN] {
        let mut frame = [0u8; SYNC_FRAME_LEN];
        frame[..4].copy_from_slice(SYNC_MAGIC);
        frame[4..6].copy_from_slice(&self.index().to_le_bytes());
        frame[6..8].copy_from_slice(&self.predictor().to_le_bytes());
        frame
    }
}

/// `i16` audio to packed ADPCM bytes
pub struct AdpcmEncoder {
    codec: AdpcmCodec,
    sync: bool,
    /// Data bytes left before the next sync frame
    sync_counter: usize,
    bindings: Bindings<i16, u8>,
}

impl AdpcmEncoder {
    pub fn new(sync: bool) -> Self {
        Self {
            codec: AdpcmCodec::new(),
            sync,
            sync_counter: 0,
            bindings: Bindings::new(),
        }
    }

    pub fn from_config(config: &AdpcmConfig) -> Self {
        Self::new(config.sync)
    }

    pub fn codec(&self) -> &AdpcmCodec {
        &self.codec
    }
}

impl Module for AdpcmEncoder {
    type Input = i16;
    type Output = u8;

    fn bindings(&self) -> &Bindings<i16, u8> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<i16, u8> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        available >= 2 && writable > SYNC_FRAME_LEN
    }

    fn process(&mut self) {
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        // at most one sync frame per call
        let size = (reader.available() / 2)
            .min(writer.writable().saturating_sub(SYNC_FRAME_LEN))
            .min(SYNC_INTERVAL);
        let input = reader.read_slice();
        let output = writer.write_slice();

        let mut written = 0;
        for pair in input[..size * 2].chunks_exact(2) {
            if self.sync {
                if self.sync_counter == 0 {
                    output[written..written + SYNC_FRAME_LEN].copy_from_slice(&self.codec.sync_frame());
                    written += SYNC_FRAME_LEN;
                    self.sync_counter = SYNC_INTERVAL;
                }
                self.sync_counter -= 1;
            }
            output[written] = self.codec.encode_pair(pair[0], pair[1]);
            written += 1;
        }

        writer.advance(written);
        reader.advance(size * 2);
    }
}

/// Decoder codec state plus sync tracking
struct DecoderState {
    codec: AdpcmCodec,
    sync: bool,
    /// Whether the codec state has been taken from a sync frame
    synced: bool,
    /// Data bytes left before the next sync frame
    sync_counter: usize,
}

impl DecoderState {
    fn expects_frame(&self) -> bool {
        self.sync && (!self.synced || self.sync_counter == 0)
    }

    /// Consume a sync frame at the head of `input`, or one byte of garbage
    fn read_frame(&mut self, input: &[u8]) -> usize {
        let index = i16::from_le_bytes([input[4], input[5]]);
        let predictor = i16::from_le_bytes([input[6], input[7]]);
        if &input[..4] == SYNC_MAGIC && self.codec.set_state(index, predictor).is_ok() {
            if !self.synced {
                log::debug!("ADPCM decoder synchronised (index {index}, predictor {predictor})");
            }
            self.synced = true;
            self.sync_counter = SYNC_INTERVAL;
            SYNC_FRAME_LEN
        } else {
            if self.synced {
                log::warn!("ADPCM sync frame missing, searching");
            }
            self.synced = false;
            1
        }
    }
}

/// Packed ADPCM bytes back to `i16` audio
pub struct AdpcmDecoder {
    state: DecoderState,
    bindings: Bindings<u8, i16>,
}

impl AdpcmDecoder {
    /// Plain decoder for streams without sync frames
    pub fn new() -> Self {
        Self::with_sync(false)
    }

    pub fn from_config(config: &AdpcmConfig) -> Self {
        Self::with_sync(config.sync)
    }

    /// With `sync` set, the stream must carry sync frames as written by
    /// [`AdpcmEncoder`]; bytes before the first frame are skipped
    pub fn with_sync(sync: bool) -> Self {
        Self {
            state: DecoderState {
                codec: AdpcmCodec::new(),
                sync,
                synced: false,
                sync_counter: 0,
            },
            bindings: Bindings::new(),
        }
    }

    pub fn codec(&self) -> &AdpcmCodec {
        &self.state.codec
    }
}

impl Default for AdpcmDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for AdpcmDecoder {
    type Input = u8;
    type Output = i16;

    fn bindings(&self) -> &Bindings<u8, i16> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<u8, i16> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        let needed = if self.state.expects_frame() { SYNC_FRAME_LEN } else { 1 };
        available >= needed && writable >= 10
    }

    fn process(&mut self) {
        let Some((available, writable)) = self.bindings.counts() else {
            return;
        };
        let state = &mut self.state;
        let mut consumed = 0;
        let mut produced = 0;
        let mut output = vec![0i16; writable - writable % 2];
        {
            let Some(reader) = self.bindings.reader() else {
                return;
            };
            let input = reader.read_slice();
            while consumed < available && produced + 2 <= output.len() {
                if state.expects_frame() {
                    if available - consumed < SYNC_FRAME_LEN {
                        break;
                    }
                    consumed += state.read_frame(&input[consumed..]);
                    continue;
                }
                let mut run = (available - consumed).min((output.len() - produced) / 2);
                if state.sync {
                    run = run.min(state.sync_counter);
                    state.sync_counter -= run;
                }
                for &byte in &input[consumed..consumed + run] {
                    output[produced] = state.codec.decode_sample(byte & 0x0f);
                    output[produced + 1] = state.codec.decode_sample(byte >> 4);
                    produced += 2;
                }
                consumed += run;
            }
        }

        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        writer.write_slice()[..produced].copy_from_slice(&output[..produced]);
        writer.advance(produced);
        reader.advance(consumed);
    }
}

/// Spectrum frames to ADPCM, one independently decodable frame per FFT
pub struct FftAdpcmEncoder {
    codec: AdpcmCodec,
    fft_size: usize,
    bindings: Bindings<f32, u8>,
}

impl FftAdpcmEncoder {
    pub fn new(fft_size: usize) -> SdrResult<Self> {
        if fft_size == 0 || fft_size % 2 != 0 {
            return Err(SdrError::Config(format!(
                "FFT size for ADPCM must be even and positive, got {fft_size}"
            )));
        }
        Ok(Self {
            codec: AdpcmCodec::new(),
            fft_size,
            bindings: Bindings::new(),
        })
    }

    /// Output bytes per spectrum frame
    pub fn frame_bytes(&self) -> usize {
        (FFT_PAD_SAMPLES + self.fft_size) / 2
    }
}

impl Module for FftAdpcmEncoder {
    type Input = f32;
    type Output = u8;

    fn bindings(&self) -> &Bindings<f32, u8> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<f32, u8> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        available >= self.fft_size && writable >= self.frame_bytes()
    }

    fn process(&mut self) {
        let frame_bytes = self.frame_bytes();
        let fft_size = self.fft_size;
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let input = &reader.read_slice()[..fft_size];
        let output = &mut writer.write_slice()[..frame_bytes];

        // every frame starts from the default state; the padding absorbs
        // the codec's settling
        self.codec.reset();
        let (padding, body) = output.split_at_mut(FFT_PAD_SAMPLES / 2);
        for byte in padding.iter_mut() {
            *byte = self.codec.encode_float(input[0]) | (self.codec.encode_float(input[0]) << 4);
        }
        for (byte, pair) in body.iter_mut().zip(input.chunks_exact(2)) {
            *byte = self.codec.encode_float(pair[0]) | (self.codec.encode_float(pair[1]) << 4);
        }

        writer.advance(frame_bytes);
        reader.advance(fft_size);
    }
}
