use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// A non-fatal problem found while scanning a resource file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
	pub path: PathBuf,
	pub message: String,
}

/// Receives problems found while scanning. Reporting never interrupts a
/// scan.
pub trait ProblemSink: Send + Sync {
	fn report(&self, problem: Problem);

	/// Forgets problems previously reported for `path`, called when the file
	/// scans cleanly again.
	fn clear(&self, _path: &Path) {}
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProblems;

impl ProblemSink for LogProblems {
	fn report(&self, problem: Problem) {
		tracing::warn!(path = %problem.path.display(), message = %problem.message, "resrepo.problem");
	}
}

/// Sink that keeps the latest problems per file, for diagnostics views.
#[derive(Debug, Default)]
pub struct CollectedProblems {
	problems: Mutex<Vec<Problem>>,
}

impl CollectedProblems {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn problems(&self) -> Vec<Problem> {
		self.problems.lock().clone()
	}

	pub fn for_path(&self, path: &Path) -> Vec<Problem> {
		self.problems.lock().iter().filter(|p| p.path == path).cloned().collect()
	}
}

impl ProblemSink for CollectedProblems {
	fn report(&self, problem: Problem) {
		tracing::debug!(path = %problem.path.display(), message = %problem.message, "resrepo.problem");
		self.problems.lock().push(problem);
	}

	fn clear(&self, path: &Path) {
		self.problems.lock().retain(|p| p.path != path);
	}
}
