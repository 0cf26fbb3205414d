//! Single-producer single-consumer ring buffer with contiguous windows
//!
//! The backing store holds every slot twice (`2 * capacity`). Each committed
//! write is copied to its twin slot before it is published, so the whole
//! readable run and the whole writable run are always one contiguous slice,
//! whatever the cursor position. Modules rely on this to look ahead past the
//! wrap point (FIR overhead, interpolation windows) without copying.
//!
//! Counts are monotonic `usize` counters compared with wrapping arithmetic:
//! `available = written - read`, `writable = capacity - available`.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::signal::Signal;
use crate::domain::Sample;

struct Shared<T> {
    slots: Box<[UnsafeCell<T>]>,
    capacity: usize,
    read_count: AtomicUsize,
    write_count: AtomicUsize,
    writer_closed: AtomicBool,
    reader_closed: AtomicBool,
    /// Notified when data is written or the writer goes away
    reader_signal: Mutex<Signal>,
    /// Notified when space is freed or the reader goes away
    writer_signal: Mutex<Signal>,
}

// Slots are only touched through one Reader and one Writer, whose windows
// never overlap, and publication goes through the Acquire/Release counters.
unsafe impl<T: Send> Sync for Shared<T> {}
unsafe impl<T: Send> Send for Shared<T> {}

impl<T> Shared<T> {
    fn available(&self) -> usize {
        let written = self.write_count.load(Ordering::Acquire);
        let read = self.read_count.load(Ordering::Acquire);
        written.wrapping_sub(read)
    }

    fn signal_slot(slot: &Mutex<Signal>) -> MutexGuard<'_, Signal> {
        slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reader_signal(&self) -> Signal {
        Self::signal_slot(&self.reader_signal).clone()
    }

    fn writer_signal(&self) -> Signal {
        Self::signal_slot(&self.writer_signal).clone()
    }

    fn base_ptr(&self) -> *mut T {
        // UnsafeCell<T> has the same layout as T
        self.slots.as_ptr() as *mut T
    }
}

/// Entry point for creating buffers
pub struct RingBuffer;

impl RingBuffer {
    /// Create a buffer holding up to `capacity` samples and split it into its
    /// two ends
    ///
    /// # Panics
    ///
    /// Panics when `capacity` is zero.
    #[allow(clippy::new_ret_no_self)]
    pub fn new<T: Sample>(capacity: usize) -> (Writer<T>, Reader<T>) {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        let slots = (0..capacity * 2)
            .map(|_| UnsafeCell::new(T::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let shared = Arc::new(Shared {
            slots,
            capacity,
            read_count: AtomicUsize::new(0),
            write_count: AtomicUsize::new(0),
            writer_closed: AtomicBool::new(false),
            reader_closed: AtomicBool::new(false),
            reader_signal: Mutex::new(Signal::new()),
            writer_signal: Mutex::new(Signal::new()),
        });
        (
            Writer {
                shared: shared.clone(),
            },
            Reader { shared },
        )
    }

    /// A reader over a fixed set of samples whose writer is already closed
    pub fn from_slice<T: Sample>(data: &[T]) -> Reader<T> {
        let (mut writer, reader) = Self::new(data.len().max(1));
        writer.write_slice()[..data.len()].copy_from_slice(data);
        writer.advance(data.len());
        drop(writer);
        reader
    }
}

/// Consuming end of a [`RingBuffer`]
pub struct Reader<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Sample> Reader<T> {
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Samples ready to be read
    pub fn available(&self) -> usize {
        self.shared.available()
    }

    /// The readable window. Its length equals [`Reader::available`] at the
    /// time of the call.
    pub fn read_slice(&self) -> &[T] {
        let available = self.available();
        let read = self.shared.read_count.load(Ordering::Relaxed);
        let offset = read % self.shared.capacity;
        // SAFETY: [offset, offset + available) lies inside the doubled store
        // and holds published samples the writer will not touch until we
        // advance past them.
        unsafe { std::slice::from_raw_parts(self.shared.base_ptr().add(offset), available) }
    }

    /// Mark `n` samples as consumed
    ///
    /// # Panics
    ///
    /// Panics when `n` exceeds [`Reader::available`].
    pub fn advance(&mut self, n: usize) {
        let available = self.available();
        assert!(
            n <= available,
            "reader advanced by {n} but only {available} samples are available"
        );
        if n == 0 {
            return;
        }
        self.shared.read_count.fetch_add(n, Ordering::Release);
        self.shared.writer_signal().notify();
    }

    /// The writer has gone away. Remaining samples can still be read.
    pub fn is_terminated(&self) -> bool {
        self.shared.writer_closed.load(Ordering::Acquire)
    }

    /// Stop consuming; the writer observes termination
    pub fn close(&self) {
        if !self.shared.reader_closed.swap(true, Ordering::AcqRel) {
            self.shared.writer_signal().notify();
        }
    }

    /// Block until data arrives, the writer terminates, or [`Reader::unblock`]
    /// is called
    pub fn wait(&self) {
        let signal = self.shared.reader_signal();
        let seen = signal.generation();
        if self.available() > 0 || self.is_terminated() {
            return;
        }
        signal.wait(seen, None);
    }

    /// Wake every waiter on this end without guaranteeing data
    pub fn unblock(&self) {
        self.shared.reader_signal().notify();
    }

    /// Route wakeups for this end to `signal`
    pub fn attach(&self, signal: &Signal) {
        *Shared::<T>::signal_slot(&self.shared.reader_signal) = signal.clone();
    }
}

impl<T> Drop for Reader<T> {
    fn drop(&mut self) {
        if !self.shared.reader_closed.swap(true, Ordering::AcqRel) {
            self.shared.writer_signal().notify();
        }
    }
}

/// Producing end of a [`RingBuffer`]
pub struct Writer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Sample> Writer<T> {
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Free slots that can be written
    pub fn writable(&self) -> usize {
        self.shared.capacity - self.shared.available()
    }

    /// The writable window. Its length equals [`Writer::writable`] at the
    /// time of the call.
    pub fn write_slice(&mut self) -> &mut [T] {
        let writable = self.writable();
        let written = self.shared.write_count.load(Ordering::Relaxed);
        let offset = written % self.shared.capacity;
        // SAFETY: [offset, offset + writable) lies inside the doubled store
        // and contains no sample the reader may still observe.
        unsafe {
            std::slice::from_raw_parts_mut(self.shared.base_ptr().add(offset), writable)
        }
    }

    /// Publish `n` samples written through [`Writer::write_slice`]
    ///
    /// # Panics
    ///
    /// Panics when `n` exceeds [`Writer::writable`].
    pub fn advance(&mut self, n: usize) {
        let writable = self.writable();
        assert!(
            n <= writable,
            "writer advanced by {n} but only {writable} slots are writable"
        );
        if n == 0 {
            return;
        }
        let capacity = self.shared.capacity;
        let start = self.shared.write_count.load(Ordering::Relaxed) % capacity;
        let base = self.shared.base_ptr();
        for slot in start..start + n {
            let twin = if slot < capacity {
                slot + capacity
            } else {
                slot - capacity
            };
            // SAFETY: both slots belong to the window just written
            unsafe { *base.add(twin) = *base.add(slot) };
        }
        self.shared.write_count.fetch_add(n, Ordering::Release);
        self.shared.reader_signal().notify();
    }

    /// The reader has gone away; further output would be discarded
    pub fn is_terminated(&self) -> bool {
        self.shared.reader_closed.load(Ordering::Acquire)
    }

    /// Signal end of stream to the reader
    pub fn close(&self) {
        if !self.shared.writer_closed.swap(true, Ordering::AcqRel) {
            self.shared.reader_signal().notify();
        }
    }

    /// Block until space frees up, the reader terminates, or
    /// [`Writer::unblock`] is called
    pub fn wait(&self) {
        let signal = self.shared.writer_signal();
        let seen = signal.generation();
        if self.writable() > 0 || self.is_terminated() {
            return;
        }
        signal.wait(seen, None);
    }

    pub fn unblock(&self) {
        self.shared.writer_signal().notify();
    }

    /// Route wakeups for this end to `signal`
    pub fn attach(&self, signal: &Signal) {
        *Shared::<T>::signal_slot(&self.shared.writer_signal) = signal.clone();
    }

    /// Copy as much of `data` as fits and publish it, returning the count
    pub fn push(&mut self, data: &[T]) -> usize {
        let n = data.len().min(self.writable());
        self.write_slice()[..n].copy_from_slice(&data[..n]);
        self.advance(n);
        n
    }
}

impl<T> Drop for Writer<T> {
    fn drop(&mut self) {
        if !self.shared.writer_closed.swap(true, Ordering::AcqRel) {
            self.shared.reader_signal().notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn counts_track_writes_and_reads() {
        let (mut writer, mut reader) = RingBuffer::new::<f32>(1024);
        assert_eq!(writer.writable(), 1024);
        assert_eq!(reader.available(), 0);

        writer.write_slice()[..100].fill(1.0);
        writer.advance(100);
        assert_eq!(reader.available(), 100);
        assert_eq!(writer.writable(), 924);

        reader.advance(40);
        assert_eq!(reader.available(), 60);
        assert_eq!(writer.writable(), 964);
    }

    #[test]
    fn windows_stay_contiguous_across_the_wrap() {
        let (mut writer, mut reader) = RingBuffer::new::<i16>(8);

        writer.push(&[0, 1, 2, 3, 4, 5]);
        reader.advance(5);

        // Write position is now 6; this spans the physical end of the buffer
        let pushed = writer.push(&[6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(pushed, 7);
        assert_eq!(reader.read_slice(), &[5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(writer.writable(), 0);

        reader.advance(8);
        writer.push(&[13, 14, 15]);
        assert_eq!(reader.read_slice(), &[13, 14, 15]);
    }

    #[test]
    #[should_panic(expected = "only 3 samples are available")]
    fn advancing_past_available_panics() {
        let (mut writer, mut reader) = RingBuffer::new::<u8>(16);
        writer.push(&[1, 2, 3]);
        reader.advance(4);
    }

    #[test]
    #[should_panic(expected = "slots are writable")]
    fn advancing_past_writable_panics() {
        let (mut writer, _reader) = RingBuffer::new::<u8>(4);
        writer.advance(5);
    }

    #[test]
    fn dropping_writer_terminates_reader_but_keeps_data() {
        let (mut writer, reader) = RingBuffer::new::<f32>(16);
        writer.push(&[0.5; 4]);
        drop(writer);
        assert!(reader.is_terminated());
        assert_eq!(reader.available(), 4);
    }

    #[test]
    fn closing_reader_terminates_writer() {
        let (writer, reader) = RingBuffer::new::<f32>(16);
        reader.close();
        assert!(writer.is_terminated());
    }

    #[test]
    fn prefilled_reader_holds_data() {
        let reader = RingBuffer::from_slice(&[1u8, 2, 3]);
        assert!(reader.is_terminated());
        assert_eq!(reader.read_slice(), &[1, 2, 3]);
    }

    #[test]
    fn wait_wakes_on_data_from_another_thread() {
        let (mut writer, mut reader) = RingBuffer::new::<i16>(16);
        let producer = thread::spawn(move || {
            for chunk in 0..50i16 {
                while writer.writable() == 0 {
                    writer.wait();
                }
                writer.push(&[chunk]);
            }
        });

        let mut received = Vec::new();
        while received.len() < 50 {
            if reader.available() == 0 {
                reader.wait();
                continue;
            }
            let consumed = {
                let window = reader.read_slice();
                received.extend_from_slice(window);
                window.len()
            };
            reader.advance(consumed);
        }
        producer.join().expect("producer should finish");
        assert_eq!(received, (0..50).collect::<Vec<_>>());
    }
}
