//! PSK-31 character layer
//!
//! Varicode decoding of recovered symbol bits

pub mod varicode;

pub use varicode::{varicode, VaricodeDecoder};
