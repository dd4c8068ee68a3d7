use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Shared counter of generations. Clones tick the same counter.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	last: Arc<AtomicU64>,
}

impl GenerationClock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues a generation greater than every one issued before.
	pub fn next(&self) -> u64 {
		self.last.fetch_add(1, Ordering::AcqRel) + 1
	}

	/// Last issued generation; 0 before the first tick.
	pub fn current(&self) -> u64 {
		self.last.load(Ordering::Acquire)
	}
}

/// Handle of one queued or running rescan, tagged with the generation it
/// was queued at.
///
/// A newer request for the same file cancels the older token; the running
/// scan checks [`ScanToken::is_cancelled`] before publishing and throws its
/// result away. Scans forced by a synchronous flush run under a pinned
/// token, which cannot be cancelled.
#[derive(Debug, Clone)]
pub struct ScanToken {
	generation: u64,
	cancel: CancellationToken,
	pinned: bool,
}

impl ScanToken {
	pub fn new(generation: u64) -> Self {
		Self::with_pin(generation, false)
	}

	pub fn pinned(generation: u64) -> Self {
		Self::with_pin(generation, true)
	}

	fn with_pin(generation: u64, pinned: bool) -> Self {
		Self {
			generation,
			cancel: CancellationToken::new(),
			pinned,
		}
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	pub const fn is_pinned(&self) -> bool {
		self.pinned
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Marks the scan superseded. Ignored by pinned tokens.
	pub fn cancel(&self) {
		if self.pinned {
			return;
		}
		self.cancel.cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_one_counter() {
		let clock = GenerationClock::new();
		assert_eq!(clock.current(), 0);
		let other = clock.clone();
		assert_eq!(clock.next(), 1);
		assert_eq!(other.next(), 2);
		assert_eq!(clock.current(), 2);
	}

	#[test]
	fn cancellation_reaches_every_clone() {
		let token = ScanToken::new(4);
		let running = token.clone();
		token.cancel();
		assert!(running.is_cancelled());
		assert_eq!(running.generation(), 4);
	}

	#[test]
	fn pinned_scans_cannot_be_superseded() {
		let token = ScanToken::pinned(9);
		token.cancel();
		assert!(token.is_pinned());
		assert!(!token.is_cancelled());
	}
}
