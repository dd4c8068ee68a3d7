use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::TaskClass;

#[derive(Debug, Default)]
struct GroupState {
	in_flight: Mutex<usize>,
	idle: Condvar,
}

/// Tracks blocking work of one class so synchronous callers can wait for it.
///
/// Cloning yields another handle to the same group.
#[derive(Debug, Clone)]
pub struct WorkGroup {
	class: TaskClass,
	state: Arc<GroupState>,
}

/// Decrements the in-flight count when dropped, including on panic.
struct InFlight(Arc<GroupState>);

impl Drop for InFlight {
	fn drop(&mut self) {
		let mut count = self.0.in_flight.lock();
		*count -= 1;
		if *count == 0 {
			self.0.idle.notify_all();
		}
	}
}

impl WorkGroup {
	pub fn new(class: TaskClass) -> Self {
		Self {
			class,
			state: Arc::default(),
		}
	}

	/// Number of tasks spawned through this group that have not finished.
	pub fn in_flight(&self) -> usize {
		*self.state.in_flight.lock()
	}

	pub fn is_idle(&self) -> bool {
		self.in_flight() == 0
	}

	/// Runs `f` on the blocking pool, tracked by this group.
	pub fn spawn_blocking<F>(&self, f: F)
	where
		F: FnOnce() + Send + 'static,
	{
		*self.state.in_flight.lock() += 1;
		let guard = InFlight(self.state.clone());
		tracing::trace!(worker_class = self.class.as_str(), pending = self.in_flight(), "resrepo.worker.group.spawn");
		drop(crate::spawn_blocking(self.class, move || {
			let _guard = guard;
			f();
		}));
	}

	/// Blocks until every tracked task has finished or `timeout` elapses.
	///
	/// Returns `true` when the group is idle.
	pub fn wait_idle(&self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let mut count = self.state.in_flight.lock();
		while *count > 0 {
			if self.state.idle.wait_until(&mut count, deadline).timed_out() {
				return *count == 0;
			}
		}
		true
	}
}
