use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use resrepo_worker::{IdleQueue, TaskClass, WorkGroup};

use crate::cache::{Fingerprinter, FsFingerprinter};
use crate::config::RepositoryConfig;
use crate::gate::ModelGate;
use crate::live::{DocumentProvider, DocumentStore};
use crate::problems::{LogProblems, ProblemSink};
use crate::xml::{ResourceParser, RoxmlParser};

/// Collaborators and shared services of every repository in one project.
///
/// Cloning is cheap; clones share the same queue, gate and collaborators.
#[derive(Clone)]
pub struct RepositoryContext {
	pub config: Arc<RepositoryConfig>,
	pub parser: Arc<dyn ResourceParser>,
	pub documents: Arc<dyn DocumentProvider>,
	pub fingerprinter: Arc<dyn Fingerprinter>,
	pub problems: Arc<dyn ProblemSink>,
	/// Deferred rescans.
	pub idle: IdleQueue,
	/// Background cache writes.
	pub cache_writes: WorkGroup,
	pub gate: ModelGate,
}

impl fmt::Debug for RepositoryContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RepositoryContext")
			.field("config", &self.config)
			.field("idle", &self.idle)
			.field("cache_writes", &self.cache_writes.in_flight())
			.finish_non_exhaustive()
	}
}

impl Default for RepositoryContext {
	fn default() -> Self {
		Self::new(RepositoryConfig::default())
	}
}

impl RepositoryContext {
	/// Context with the built-in collaborators: `roxmltree` parsing, an empty
	/// [`DocumentStore`], filesystem fingerprints and logged problems.
	pub fn new(config: RepositoryConfig) -> Self {
		let parser: Arc<dyn ResourceParser> = Arc::new(RoxmlParser);
		Self {
			idle: IdleQueue::new(config.scan.idle_mode.into()),
			config: Arc::new(config),
			documents: Arc::new(DocumentStore::new(parser.clone())),
			parser,
			fingerprinter: Arc::new(FsFingerprinter),
			problems: Arc::new(LogProblems),
			cache_writes: WorkGroup::new(TaskClass::CacheIo),
			gate: ModelGate::new(),
		}
	}

	pub fn with_parser(mut self, parser: Arc<dyn ResourceParser>) -> Self {
		self.parser = parser;
		self
	}

	pub fn with_documents(mut self, documents: Arc<dyn DocumentProvider>) -> Self {
		self.documents = documents;
		self
	}

	pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
		self.fingerprinter = fingerprinter;
		self
	}

	pub fn with_problems(mut self, problems: Arc<dyn ProblemSink>) -> Self {
		self.problems = problems;
		self
	}

	/// Blocks until queued cache writes have finished.
	pub fn wait_for_cache_writes(&self, timeout: Duration) -> bool {
		self.cache_writes.wait_idle(timeout)
	}
}
