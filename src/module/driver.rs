//! Cooperative execution of several modules on the caller's thread

use super::SharedStage;

/// Drives a chain of stages in order without spawning threads
///
/// Each pass drains every stage as far as it will go before moving to the
/// next, so a chain listed upstream-first moves data end to end in one pass.
pub struct SyncDriver {
    stages: Vec<SharedStage>,
    finished: Vec<bool>,
}

impl SyncDriver {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// Append a stage; stages run in the order they were added
    pub fn add(&mut self, stage: SharedStage) -> &mut Self {
        self.stages.push(stage);
        self.finished.push(false);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// One pass over all stages. Returns whether any stage made progress.
    pub fn step_all(&mut self) -> bool {
        let mut progress = false;
        for (index, stage) in self.stages.iter().enumerate() {
            if self.finished[index] {
                continue;
            }
            let mut guard = match stage.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    log::error!("SyncDriver: stage {index} lock poisoned, skipping it");
                    self.finished[index] = true;
                    continue;
                }
            };
            while guard.ready() {
                guard.step();
                progress = true;
            }
            if guard.is_terminated() {
                log::debug!("SyncDriver: stage {index} terminated");
                guard.shutdown();
                self.finished[index] = true;
            }
        }
        progress
    }

    /// Keep passing over the chain until nothing moves. Returns the number of
    /// passes that made progress.
    pub fn run_until_idle(&mut self) -> usize {
        let mut passes = 0;
        while self.step_all() {
            passes += 1;
        }
        passes
    }

    /// Every stage has seen end of stream
    pub fn is_finished(&self) -> bool {
        self.finished.iter().all(|&done| done)
    }
}

impl Default for SyncDriver {
    fn default() -> Self {
        Self::new()
    }
}
