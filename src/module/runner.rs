//! Worker thread driving one module
//!
//! The loop holds the module lock while it checks readiness and processes,
//! and releases it before waiting so control setters can get in between
//! units of work. A terminated buffer ends the loop and closes the module's
//! own ports, which in turn terminates its neighbours.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::SharedStage;
use crate::buffer::Signal;
use crate::domain::SdrResult;

pub struct AsyncRunner {
    name: String,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    signal: Signal,
    handle: Option<JoinHandle<()>>,
}

impl AsyncRunner {
    /// Spawn a worker thread for `stage`
    pub fn start(name: &str, stage: SharedStage) -> SdrResult<Self> {
        let signal = match stage.lock() {
            Ok(guard) => guard.wake_signal(),
            Err(poisoned) => poisoned.into_inner().wake_signal(),
        };
        let stop = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let stop = stop.clone();
            let running = running.clone();
            let signal = signal.clone();
            let thread_name = name.to_string();
            thread::Builder::new()
                .name(format!("csdr-{name}"))
                .spawn(move || {
                    run_loop(&thread_name, stage, &stop, &signal);
                    running.store(false, Ordering::SeqCst);
                })?
        };

        log::info!("Runner '{name}' started");
        Ok(Self {
            name: name.to_string(),
            stop,
            running,
            signal,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// False once the worker has exited, whether stopped or terminated
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the worker and wait for it. Safe to call repeatedly and after the
    /// worker already ended on its own.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.signal.notify();
        self.join_worker();
    }

    /// Wait for the worker to end on its own (end of stream)
    pub fn join(mut self) {
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Runner '{}' worker panicked", self.name);
            } else {
                log::info!("Runner '{}' stopped", self.name);
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for AsyncRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(name: &str, stage: SharedStage, stop: &AtomicBool, signal: &Signal) {
    loop {
        let Ok(mut guard) = stage.lock() else {
            log::error!("Runner '{name}': module lock poisoned, giving up");
            return;
        };
        if stop.load(Ordering::SeqCst) {
            return;
        }

        let seen = signal.generation();
        if guard.ready() {
            guard.step();
            continue;
        }

        if guard.is_terminated() {
            // the last write may have landed between the two checks
            if guard.ready() {
                continue;
            }
            log::debug!("Runner '{name}': buffer terminated, closing ports");
            guard.shutdown();
            return;
        }

        drop(guard);
        signal.wait(seen, Some(stop));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;
    use crate::module::{shared, AnyLength, AnyLengthBlock, Module};
    use std::time::{Duration, Instant};

    struct Negate;

    impl AnyLengthBlock for Negate {
        type Input = f32;
        type Output = f32;

        fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
            for (out, x) in output.iter_mut().zip(input) {
                *out = -x;
            }
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn runner_processes_and_stops() {
        let module = shared(AnyLength::new(Negate));
        let (mut input, reader) = RingBuffer::new::<f32>(256);
        let (writer, output) = RingBuffer::new::<f32>(256);
        {
            let mut m = module.lock().unwrap();
            m.set_reader(reader);
            m.set_writer(writer);
        }

        let mut runner = AsyncRunner::start("negate", module.clone()).unwrap();
        assert!(runner.is_running());

        input.push(&[1.0, 2.0, 3.0]);
        assert!(wait_for(|| output.available() == 3), "runner should process pushed data");
        assert_eq!(output.read_slice(), &[-1.0, -2.0, -3.0]);

        runner.stop();
        assert!(!runner.is_running());
        runner.stop();
    }

    #[test]
    fn runner_ends_on_upstream_termination() {
        let module = shared(AnyLength::new(Negate));
        let (mut input, reader) = RingBuffer::new::<f32>(64);
        let (writer, output) = RingBuffer::new::<f32>(64);
        {
            let mut m = module.lock().unwrap();
            m.set_reader(reader);
            m.set_writer(writer);
        }
        let runner = AsyncRunner::start("negate", module).unwrap();

        input.push(&[0.5; 10]);
        drop(input);

        assert!(wait_for(|| !runner.is_running()), "runner should exit after end of stream");
        assert_eq!(output.available(), 10, "queued data is processed before exiting");
        assert!(output.is_terminated(), "termination cascades downstream");
    }

    #[test]
    fn stop_on_idle_runner_returns() {
        let module = shared(AnyLength::new(Negate));
        let mut runner = AsyncRunner::start("idle", module).unwrap();
        runner.stop();
        assert!(!runner.is_running());
    }
}
