//! Process-wide job state shared by the controller, watcher and launcher.
//!
//! The running flag and a job generation counter are packed into a single
//! atomic word so that "is job N still the current running job" is one
//! load. The launcher clears the flag from its own task while the watcher
//! polls it, hence no lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

const RUNNING_BIT: u64 = 1;

/// Coarse lifecycle phase of the single training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
}

#[derive(Debug, Default)]
pub struct JobState {
    word: AtomicU64,
}

fn encode(generation: u64, running: bool) -> u64 {
    (generation << 1) | u64::from(running)
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> JobStatus {
        if self.is_running() {
            JobStatus::Running
        } else {
            JobStatus::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.word.load(Ordering::Acquire) & RUNNING_BIT == RUNNING_BIT
    }

    /// Generation of the most recently started job (0 before the first).
    pub fn generation(&self) -> u64 {
        self.word.load(Ordering::Acquire) >> 1
    }

    /// Transition Idle -> Running.
    ///
    /// Returns the new job's generation, or `None` if a job is already
    /// running.
    pub fn try_start(&self) -> Option<u64> {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            if current & RUNNING_BIT == RUNNING_BIT {
                return None;
            }
            let generation = (current >> 1) + 1;
            match self.word.compare_exchange(
                current,
                encode(generation, true),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(generation),
                Err(actual) => current = actual,
            }
        }
    }

    /// Whether job `generation` is the one currently running.
    pub fn is_current(&self, generation: u64) -> bool {
        self.word.load(Ordering::Acquire) == encode(generation, true)
    }

    /// Transition Running -> Idle for job `generation`.
    ///
    /// A no-op (returning `false`) if that job is no longer current.
    pub fn finish(&self, generation: u64) -> bool {
        self.word
            .compare_exchange(
                encode(generation, true),
                encode(generation, false),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn starts_idle() {
        let state = JobState::new();
        assert_eq!(state.status(), JobStatus::Idle);
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let state = JobState::new();
        assert_eq!(state.try_start(), Some(1));
        assert_eq!(state.try_start(), None);
        assert_eq!(state.status(), JobStatus::Running);
    }

    #[test]
    fn start_and_finish_alternate() {
        let state = JobState::new();
        for expected in 1..=5 {
            let generation = state.try_start().expect("idle state accepts a start");
            assert_eq!(generation, expected);
            assert!(state.is_current(generation));
            assert!(state.finish(generation));
            assert!(!state.is_running());
            assert!(!state.is_current(generation));
        }
    }

    #[test]
    fn stale_finish_does_not_touch_newer_job() {
        let state = JobState::new();
        let first = state.try_start().unwrap();
        assert!(state.finish(first));
        let second = state.try_start().unwrap();

        assert!(!state.finish(first));
        assert!(state.is_current(second));
        assert!(!state.is_current(first));
    }

    #[test]
    fn concurrent_starts_admit_exactly_one() {
        let state = Arc::new(JobState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.try_start())
            })
            .collect();

        let admitted = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();
        assert_eq!(admitted, 1);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Idle).unwrap(), "\"idle\"");
        assert_eq!(
            serde_json::to_string(&JobStatus::Running).unwrap(),
            "\"running\""
        );
    }
}
