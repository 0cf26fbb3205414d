//! Sample buffers connecting processing stages
//!
//! - [`RingBuffer`] - bounded SPSC buffer split into a [`Writer`] and a [`Reader`]
//! - [`Signal`] - wakeup shared by a buffer end and the stage waiting on it
//! - [`intake`] - non-blocking entry point for real-time driver callbacks

pub mod intake;
pub mod ringbuffer;
pub mod signal;

pub use intake::{intake, IntakeDrain, IntakeProducer};
pub use ringbuffer::{Reader, RingBuffer, Writer};
pub use signal::Signal;
