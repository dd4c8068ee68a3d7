//! Process-wide modification counter.
//!
//! # Lifecycle
//!
//! * Initialized on first use, starting at 1.
//! * Never reset: closing a project or dropping repositories leaves it
//!   untouched, so a generation observed before a repository was recreated
//!   still compares as older than anything the new repository reports.

use std::sync::OnceLock;

use resrepo_worker::GenerationClock;

static CLOCK: OnceLock<GenerationClock> = OnceLock::new();

fn clock() -> &'static GenerationClock {
	CLOCK.get_or_init(GenerationClock::new)
}

/// Allocates a new generation, strictly greater than every earlier one.
pub fn next() -> u64 {
	clock().next()
}

/// Most recently allocated generation.
pub fn current() -> u64 {
	clock().current()
}
