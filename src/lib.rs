//! Streaming software-defined radio DSP engine
//!
//! Signal processing stages connected by single-producer single-consumer
//! ring buffers, each stage driven by its own worker thread or by a
//! synchronous driver loop.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Sample types, errors and configuration, no I/O dependencies
//! - `buffer/` - Ring buffer, wakeup signal and bounded intake
//! - `module/` - Stage contract, block wrappers, runner and sync driver
//! - `ports/` - Trait definitions for FFT and resampling kernels
//! - `adapters/` - rustfft and rubato implementations of the ports
//! - `dsp/` - Filters, demodulators, decimators and other stages
//! - `codec/` - IMA ADPCM encoding for audio and spectrum streams
//! - `modem/` - PSK-31 varicode decoding

// Core domain (pure, no I/O)
pub mod domain;
pub mod ports;

// Stream plumbing
pub mod buffer;
pub mod module;

// Processing stages
pub mod codec;
pub mod dsp;
pub mod modem;

// Adapters (external libraries)
pub mod adapters;
