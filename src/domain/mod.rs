//! Core domain types
//!
//! Pure types with no I/O dependencies: sample formats, the error type and
//! stage configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
