//! The single status slot observed by the progress overlay.
//!
//! Every destination of every job writes into the same slot.  Each job
//! is stamped with a generation number when it starts; whether updates
//! from an older generation still land is decided by [`StalePolicy`].
//!
//! The slot is single-threaded (`Cell`/`RefCell`).  Listeners run
//! synchronously inside [`StatusSlot::set`] and must not subscribe new
//! listeners from within the callback.

use std::cell::{Cell, RefCell};
use std::fmt;

use tracing::debug;

use crate::options::StalePolicy;
use crate::types::JobStatus;

/// Callback invoked on every status change.
pub type StatusListener = Box<dyn Fn(&JobStatus)>;

/// Shared status slot with change listeners.
pub struct StatusSlot {
    status: RefCell<JobStatus>,
    generation: Cell<u64>,
    policy: StalePolicy,
    listeners: RefCell<Vec<StatusListener>>,
}

impl StatusSlot {
    /// Create an idle slot.
    #[must_use]
    pub fn new(policy: StalePolicy) -> Self {
        Self {
            status: RefCell::new(JobStatus::Idle),
            generation: Cell::new(0),
            policy,
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Snapshot of the current status.
    #[must_use]
    pub fn current(&self) -> JobStatus {
        self.status.borrow().clone()
    }

    /// Generation of the most recently started job (0 before any job).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Start a new job and return its generation.
    pub fn begin_job(&self) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        generation
    }

    /// Publish `status` on behalf of job `generation`.
    ///
    /// Returns `false` if the update was dropped because the job has
    /// been superseded and the policy is [`StalePolicy::DropStale`].
    pub fn set(&self, generation: u64, status: JobStatus) -> bool {
        if self.policy == StalePolicy::DropStale && generation != self.generation.get() {
            debug!(
                generation,
                current = self.generation.get(),
                "dropping status update from superseded job"
            );
            return false;
        }
        self.status.replace(status.clone());
        for listener in self.listeners.borrow().iter() {
            listener(&status);
        }
        true
    }

    /// Register a listener called after every accepted update.
    pub fn subscribe(&self, listener: impl Fn(&JobStatus) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    /// Reset to [`JobStatus::Idle`] once a terminal status has been on
    /// display long enough.
    ///
    /// Only acts if `generation` is still the latest job and the slot
    /// holds a terminal status, so a newer job's progress is never
    /// cleared.  Returns `true` if the slot was reset.
    pub fn revert_to_idle(&self, generation: u64) -> bool {
        if generation != self.generation.get() || !self.status.borrow().is_terminal() {
            return false;
        }
        self.set(generation, JobStatus::Idle)
    }
}

impl Default for StatusSlot {
    fn default() -> Self {
        Self::new(StalePolicy::default())
    }
}

impl fmt::Debug for StatusSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusSlot")
            .field("status", &self.status.borrow())
            .field("generation", &self.generation.get())
            .field("policy", &self.policy)
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    fn complete(text: &str) -> JobStatus {
        JobStatus::Complete { text: text.into() }
    }

    #[test]
    fn starts_idle_at_generation_zero() {
        let slot = StatusSlot::default();
        assert_eq!(slot.current(), JobStatus::Idle);
        assert_eq!(slot.generation(), 0);
    }

    #[test]
    fn listeners_see_every_update() {
        let slot = StatusSlot::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        slot.subscribe(move |status| sink.borrow_mut().push(status.text().to_owned()));

        let generation = slot.begin_job();
        slot.set(generation, JobStatus::Preparing);
        slot.set(generation, complete("done"));

        assert_eq!(*seen.borrow(), ["Preparing…", "done"]);
    }

    #[test]
    fn overwrite_policy_lets_stale_updates_through() {
        let slot = StatusSlot::new(StalePolicy::Overwrite);
        let old = slot.begin_job();
        let new = slot.begin_job();
        slot.set(new, JobStatus::Preparing);
        assert!(slot.set(old, complete("old job finished")));
        assert_eq!(slot.current(), complete("old job finished"));
    }

    #[test]
    fn drop_stale_policy_ignores_superseded_jobs() {
        let slot = StatusSlot::new(StalePolicy::DropStale);
        let old = slot.begin_job();
        let new = slot.begin_job();
        slot.set(new, JobStatus::Preparing);
        assert!(!slot.set(old, complete("old job finished")));
        assert_eq!(slot.current(), JobStatus::Preparing);
    }

    #[test]
    fn revert_only_clears_terminal_status_of_latest_job() {
        let slot = StatusSlot::default();
        let first = slot.begin_job();
        slot.set(first, complete("done"));
        assert!(slot.revert_to_idle(first));
        assert_eq!(slot.current(), JobStatus::Idle);

        slot.set(first, complete("done again"));
        let second = slot.begin_job();
        slot.set(second, JobStatus::Preparing);
        assert!(!slot.revert_to_idle(first), "must not clear a newer job");
        assert!(!slot.revert_to_idle(second), "not terminal yet");
        assert_eq!(slot.current(), JobStatus::Preparing);
    }
}
