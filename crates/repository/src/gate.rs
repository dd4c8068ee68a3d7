//! Host-level model gate.
//!
//! Structural mutations of the resource model (event dispatch, deferred
//! rescans, synchronous flushes) run under the write side; readers that need
//! a consistent view across several queries hold the read side. Each
//! repository additionally guards its own bookkeeping with a private mutex,
//! so single queries are safe without the gate.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared read/write gate. Cloning yields another handle to the same gate.
#[derive(Debug, Clone, Default)]
pub struct ModelGate {
	lock: Arc<RwLock<()>>,
}

impl ModelGate {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read(&self) -> RwLockReadGuard<'_, ()> {
		self.lock.read()
	}

	/// Exclusive access for mutations. Not reentrant.
	pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
		self.lock.write()
	}

	pub fn is_write_locked(&self) -> bool {
		self.lock.is_locked_exclusive()
	}
}
