//! Lock-free hand-off from a real-time callback into a processing chain
//!
//! Audio and SDR drivers deliver samples on a callback thread that must
//! never block. The callback pushes into a `ringbuf` queue through an
//! [`IntakeProducer`]; the thread that owns the chain drains it into the
//! first [`Writer`] with [`IntakeDrain::pump`]. When the queue is full the
//! newest samples are dropped and counted.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use super::Writer;
use crate::domain::Sample;

#[derive(Default)]
struct IntakeState {
    closed: AtomicBool,
    dropped: AtomicUsize,
}

/// Callback side of the hand-off
pub struct IntakeProducer<T> {
    producer: HeapProd<T>,
    state: Arc<IntakeState>,
}

/// Chain side of the hand-off
pub struct IntakeDrain<T> {
    consumer: HeapCons<T>,
    state: Arc<IntakeState>,
}

/// Create a hand-off queue holding up to `capacity` samples
pub fn intake<T: Sample>(capacity: usize) -> (IntakeProducer<T>, IntakeDrain<T>) {
    let rb = HeapRb::<T>::new(capacity);
    let (producer, consumer) = rb.split();
    let state = Arc::new(IntakeState::default());
    (
        IntakeProducer {
            producer,
            state: state.clone(),
        },
        IntakeDrain { consumer, state },
    )
}

impl<T: Sample> IntakeProducer<T> {
    /// Queue samples without blocking, returning how many were accepted
    pub fn push(&mut self, samples: &[T]) -> usize {
        let accepted = self.producer.push_slice(samples);
        let dropped = samples.len() - accepted;
        if dropped > 0 {
            self.state.dropped.fetch_add(dropped, Ordering::Relaxed);
        }
        accepted
    }

    /// Mark end of stream; the drain closes its writer once empty
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::Release);
    }
}

impl<T> Drop for IntakeProducer<T> {
    fn drop(&mut self) {
        self.state.closed.store(true, Ordering::Release);
    }
}

impl<T: Sample> IntakeDrain<T> {
    /// Move queued samples into `writer`, returning how many moved
    ///
    /// Once the producer is closed and the queue is empty the writer is
    /// closed as well, so the chain sees end of stream.
    pub fn pump(&mut self, writer: &mut Writer<T>) -> usize {
        let closed = self.state.closed.load(Ordering::Acquire);
        let n = self.consumer.occupied_len().min(writer.writable());
        let moved = self.consumer.pop_slice(&mut writer.write_slice()[..n]);
        writer.advance(moved);

        if closed && self.consumer.is_empty() {
            log::debug!("intake drained after producer closed, closing chain input");
            writer.close();
        }
        moved
    }

    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Samples dropped so far because the queue was full
    pub fn dropped(&self) -> usize {
        self.state.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire) && self.consumer.is_empty()
    }
}
