//! Background execution primitives for resource repositories: task classes,
//! blocking-pool spawning, tracked work groups, the idle-time job queue and
//! scan cancellation tokens.

/// Task classification.
pub mod class;
/// Tracked groups of blocking work.
pub mod group;
/// Idle-time deferred job queue.
pub mod idle;
/// Blocking pool entry point.
pub mod spawn;
/// Generation clock and scan cancellation tokens.
pub mod token;

pub use class::TaskClass;
pub use group::WorkGroup;
pub use idle::{IdleMode, IdleQueue, SubmitOutcome};
pub use spawn::spawn_blocking;
pub use token::{GenerationClock, ScanToken};
