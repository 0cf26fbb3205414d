//! Module execution contract
//!
//! A module owns one [`Reader`] and one [`Writer`] through its [`Bindings`]
//! and makes progress in two phases: [`Module::can_process`] reports whether
//! a bounded unit of work is possible with the counts currently visible, and
//! [`Module::process`] performs exactly that unit and advances both cursors.
//!
//! Modules are driven either by an [`AsyncRunner`] (one worker thread each)
//! or by a [`SyncDriver`] (several modules in one loop). Both reach a module
//! through the object-safe [`Stage`] view, shared as `Arc<Mutex<_>>` so that
//! control setters and the driver serialize on the same lock.

pub mod block;
pub mod driver;
pub mod runner;

pub use block::{AnyLength, AnyLengthBlock, FixedLength, FixedLengthBlock};
pub use driver::SyncDriver;
pub use runner::AsyncRunner;

use std::sync::{Arc, Mutex};

use crate::buffer::{Reader, Signal, Writer};
use crate::domain::Sample;

/// The reader and writer a module is bound to, plus the signal both buffer
/// ends wake when the module may have become ready
pub struct Bindings<I, O> {
    reader: Option<Reader<I>>,
    writer: Option<Writer<O>>,
    signal: Signal,
    closed: bool,
}

impl<I: Sample, O: Sample> Bindings<I, O> {
    pub fn new() -> Self {
        Self {
            reader: None,
            writer: None,
            signal: Signal::new(),
            closed: false,
        }
    }

    pub fn set_reader(&mut self, reader: Reader<I>) {
        reader.attach(&self.signal);
        self.reader = Some(reader);
        self.signal.notify();
    }

    pub fn set_writer(&mut self, writer: Writer<O>) {
        writer.attach(&self.signal);
        self.writer = Some(writer);
        self.signal.notify();
    }

    pub fn reader(&self) -> Option<&Reader<I>> {
        self.reader.as_ref()
    }

    pub fn writer(&self) -> Option<&Writer<O>> {
        self.writer.as_ref()
    }

    /// Both ends, if bound
    pub fn ports(&mut self) -> Option<(&mut Reader<I>, &mut Writer<O>)> {
        match (self.reader.as_mut(), self.writer.as_mut()) {
            (Some(reader), Some(writer)) => Some((reader, writer)),
            _ => None,
        }
    }

    /// `(available, writable)` if both ends are bound
    pub fn counts(&self) -> Option<(usize, usize)> {
        match (&self.reader, &self.writer) {
            (Some(reader), Some(writer)) => Some((reader.available(), writer.writable())),
            _ => None,
        }
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Whether [`Bindings::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close both ends so neighbouring stages observe termination
    pub fn close(&mut self) {
        self.closed = true;
        if let Some(reader) = &self.reader {
            reader.close();
        }
        if let Some(writer) = &self.writer {
            writer.close();
        }
    }
}

impl<I: Sample, O: Sample> Default for Bindings<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

/// A stateful transformation from one sample stream to another
pub trait Module: Send {
    type Input: Sample;
    type Output: Sample;

    fn bindings(&self) -> &Bindings<Self::Input, Self::Output>;
    fn bindings_mut(&mut self) -> &mut Bindings<Self::Input, Self::Output>;

    /// Whether one unit of work is possible with `available` input samples
    /// and `writable` output slots
    fn can_process_with(&self, available: usize, writable: usize) -> bool;

    /// Whether one unit of work is possible right now. Unbound and closed
    /// modules are never ready.
    fn can_process(&self) -> bool {
        let bindings = self.bindings();
        !bindings.is_closed()
            && bindings
                .counts()
                .is_some_and(|(available, writable)| self.can_process_with(available, writable))
    }

    /// Perform the unit of work announced by [`Module::can_process`]
    fn process(&mut self);

    fn set_reader(&mut self, reader: Reader<Self::Input>) {
        self.bindings_mut().set_reader(reader);
    }

    fn set_writer(&mut self, writer: Writer<Self::Output>) {
        self.bindings_mut().set_writer(writer);
    }
}

/// Type-erased view of a [`Module`] used by runners and drivers
pub trait Stage: Send {
    fn ready(&self) -> bool;
    fn step(&mut self);
    fn wake_signal(&self) -> Signal;
    fn is_terminated(&self) -> bool;
    fn shutdown(&mut self);
}

impl<M: Module> Stage for M {
    fn ready(&self) -> bool {
        self.can_process()
    }

    fn step(&mut self) {
        self.process();
    }

    fn wake_signal(&self) -> Signal {
        self.bindings().signal().clone()
    }

    /// Closed, downstream went away, or upstream finished and what is left
    /// could not be processed even with an empty output buffer
    fn is_terminated(&self) -> bool {
        let bindings = self.bindings();
        if bindings.is_closed() || bindings.writer().is_some_and(|w| w.is_terminated()) {
            return true;
        }
        match (bindings.reader(), bindings.writer()) {
            (Some(reader), Some(writer)) => {
                reader.is_terminated()
                    && !self.can_process_with(reader.available(), writer.capacity())
            }
            (Some(reader), None) => reader.is_terminated(),
            _ => false,
        }
    }

    fn shutdown(&mut self) {
        self.bindings_mut().close();
    }
}

/// A stage shared between its driver and whoever calls its control setters
pub type SharedStage = Arc<Mutex<dyn Stage>>;

/// Wrap a module for sharing, keeping the concrete type for setters
pub fn shared<M: Module + 'static>(module: M) -> Arc<Mutex<M>> {
    Arc::new(Mutex::new(module))
}

/// Wire a new buffer between two modules
pub fn connect<A, B>(upstream: &mut A, downstream: &mut B, capacity: usize)
where
    A: Module,
    B: Module<Input = A::Output>,
{
    let (writer, reader) = crate::buffer::RingBuffer::new(capacity);
    upstream.set_writer(writer);
    downstream.set_reader(reader);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;

    #[test]
    fn unbound_bindings_report_no_counts() {
        let mut bindings = Bindings::<f32, f32>::new();
        assert!(bindings.counts().is_none());
        assert!(bindings.ports().is_none());
    }

    #[test]
    fn binding_attaches_module_signal() {
        let mut bindings = Bindings::<f32, f32>::new();
        let (mut writer, reader) = RingBuffer::new::<f32>(16);
        bindings.set_reader(reader);

        let seen = bindings.signal().generation();
        writer.push(&[1.0]);
        assert!(
            bindings.signal().generation() > seen,
            "a write upstream should wake the module that reads it"
        );
    }

    #[test]
    fn close_terminates_neighbours() {
        let mut bindings = Bindings::<f32, f32>::new();
        let (upstream, reader) = RingBuffer::new::<f32>(16);
        let (writer, downstream) = RingBuffer::new::<f32>(16);
        bindings.set_reader(reader);
        bindings.set_writer(writer);

        bindings.close();
        assert!(upstream.is_terminated());
        assert!(downstream.is_terminated());
    }
}
