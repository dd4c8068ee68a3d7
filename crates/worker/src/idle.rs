//! Idle-time job queue.
//!
//! # Purpose
//!
//! * Defers work (file rescans) out of notification callbacks to the next
//!   point the host is idle.
//! * Coalesces jobs by key: a job submitted while another job with the same
//!   key is still queued replaces it in place.
//!
//! # Modes
//!
//! | Mode | Who runs jobs |
//! |---|---|
//! | [`IdleMode::Manual`] | The host, by calling [`IdleQueue::run_pending`] at its idle points. |
//! | [`IdleMode::Background`] | A drain task on the blocking pool, spawned on submit. |
//!
//! # Invariants
//!
//! * Jobs run in submission order, a coalesced job keeping its original slot.
//! * Jobs never run while the queue lock is held, so a job may submit more
//!   jobs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{TaskClass, WorkGroup};

/// Who drains the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleMode {
	#[default]
	Manual,
	Background,
}

/// Outcome of [`IdleQueue::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
	Enqueued,
	/// An existing job with the same key was replaced.
	Coalesced,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueuedJob {
	key: Option<String>,
	job: Job,
}

struct Inner {
	mode: IdleMode,
	jobs: Mutex<VecDeque<QueuedJob>>,
	group: WorkGroup,
}

/// Queue of deferred jobs. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct IdleQueue {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for IdleQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IdleQueue")
			.field("mode", &self.inner.mode)
			.field("pending", &self.pending())
			.finish()
	}
}

impl Default for IdleQueue {
	fn default() -> Self {
		Self::new(IdleMode::default())
	}
}

impl IdleQueue {
	pub fn new(mode: IdleMode) -> Self {
		Self {
			inner: Arc::new(Inner {
				mode,
				jobs: Mutex::new(VecDeque::new()),
				group: WorkGroup::new(TaskClass::Scan),
			}),
		}
	}

	pub fn mode(&self) -> IdleMode {
		self.inner.mode
	}

	/// Number of queued, not yet started jobs.
	pub fn pending(&self) -> usize {
		self.inner.jobs.lock().len()
	}

	/// Queues `job`, coalescing with a queued job carrying the same `key`.
	pub fn submit(&self, key: Option<String>, job: impl FnOnce() + Send + 'static) -> SubmitOutcome {
		let outcome = {
			let mut jobs = self.inner.jobs.lock();
			let existing = key.as_ref().and_then(|key| jobs.iter_mut().find(|queued| queued.key.as_ref() == Some(key)));
			match existing {
				Some(queued) => {
					queued.job = Box::new(job);
					SubmitOutcome::Coalesced
				}
				None => {
					jobs.push_back(QueuedJob { key, job: Box::new(job) });
					SubmitOutcome::Enqueued
				}
			}
		};
		tracing::trace!(outcome = ?outcome, mode = ?self.inner.mode, "resrepo.worker.idle.submit");
		if self.inner.mode == IdleMode::Background && outcome == SubmitOutcome::Enqueued {
			let queue = self.clone();
			self.inner.group.spawn_blocking(move || {
				queue.run_pending();
			});
		}
		outcome
	}

	/// Removes a queued job without running it. Returns whether one existed.
	pub fn cancel(&self, key: &str) -> bool {
		let mut jobs = self.inner.jobs.lock();
		let before = jobs.len();
		jobs.retain(|queued| queued.key.as_deref() != Some(key));
		before != jobs.len()
	}

	/// Whether a job with `key` is queued.
	pub fn contains(&self, key: &str) -> bool {
		self.inner.jobs.lock().iter().any(|queued| queued.key.as_deref() == Some(key))
	}

	/// Runs queued jobs until the queue is empty, returning how many ran.
	pub fn run_pending(&self) -> usize {
		let mut ran = 0;
		loop {
			let next = self.inner.jobs.lock().pop_front();
			let Some(queued) = next else {
				break;
			};
			(queued.job)();
			ran += 1;
		}
		if ran > 0 {
			tracing::trace!(ran, "resrepo.worker.idle.drained");
		}
		ran
	}

	/// Drains the queue. In background mode this waits for drain tasks,
	/// in manual mode the jobs run on the calling thread.
	pub fn flush(&self, timeout: Duration) -> bool {
		match self.inner.mode {
			IdleMode::Manual => {
				self.run_pending();
				true
			}
			IdleMode::Background => {
				self.run_pending();
				self.inner.group.wait_idle(timeout)
			}
		}
	}
}
