//! Fixtures for unit tests.

use std::path::PathBuf;
use std::sync::Arc;

use resrepo_primitives::{ResourceNamespace, ResourceType};
use tempfile::TempDir;

use crate::config::RepositoryConfig;
use crate::context::RepositoryContext;
use crate::live::DocumentStore;
use crate::problems::CollectedProblems;
use crate::repository::ResourceRepository;
use crate::source::SourceRepository;

/// A temporary project root with its own cache directory and open-document
/// store.
pub(crate) struct Fixture {
	pub dir: TempDir,
	pub documents: Arc<DocumentStore>,
	pub problems: Arc<CollectedProblems>,
	pub ctx: RepositoryContext,
}

impl Fixture {
	/// Rescans run inline and caches are written on the calling thread.
	pub fn new() -> Self {
		Self::with(|_| {})
	}

	pub fn with(configure: impl FnOnce(&mut RepositoryConfig)) -> Self {
		let _ = tracing_subscriber::fmt::try_init();
		let dir = tempfile::tempdir().unwrap();
		let mut config = RepositoryConfig::default();
		config.cache.directory = Some(dir.path().join("cache"));
		config.cache.background_write = false;
		config.scan.defer_rescans = false;
		configure(&mut config);
		let documents = Arc::new(DocumentStore::default());
		let problems = Arc::new(CollectedProblems::new());
		let ctx = RepositoryContext::new(config).with_documents(documents.clone()).with_problems(problems.clone());
		Self { dir, documents, problems, ctx }
	}

	pub fn path(&self, relative: &str) -> PathBuf {
		self.dir.path().join(relative)
	}

	/// Writes `contents` to `relative`, creating parent folders.
	pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
		let path = self.path(relative);
		std::fs::create_dir_all(path.parent().unwrap()).unwrap();
		std::fs::write(&path, contents).unwrap();
		path
	}

	pub fn source(&self, relative: &str) -> Arc<SourceRepository> {
		SourceRepository::create(self.path(relative), ResourceNamespace::ResAuto, self.ctx.clone())
	}
}

pub(crate) fn values(body: &str) -> String {
	format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<resources>\n{body}\n</resources>\n")
}

/// Sorted `(type, name, qualifiers, value)` rows of every item.
pub(crate) fn summary(repo: &dyn ResourceRepository) -> Vec<(ResourceType, String, String, String)> {
	let mut rows = Vec::new();
	for namespace in repo.namespaces() {
		for kind in repo.resource_types(&namespace) {
			for item in repo.items(&namespace, kind).iter().flat_map(|map| map.values().flatten()) {
				rows.push((kind, item.name().to_string(), item.qualifiers().to_string(), format!("{:?}", item.value())));
			}
		}
	}
	rows.sort();
	rows
}

/// Names of the items of one type, sorted.
pub(crate) fn names(repo: &dyn ResourceRepository, kind: ResourceType) -> Vec<String> {
	let mut names: Vec<String> = repo.items(&ResourceNamespace::ResAuto, kind).map(|map| map.keys().cloned().collect()).unwrap_or_default();
	names.sort();
	names
}

/// Qualifier strings and scalar values of one name.
pub(crate) fn variants(repo: &dyn ResourceRepository, kind: ResourceType, name: &str) -> Vec<(String, String)> {
	repo.items_named(&ResourceNamespace::ResAuto, kind, name)
		.iter()
		.map(|item| (item.qualifiers().to_string(), item.value().as_scalar().unwrap_or_default().to_string()))
		.collect()
}
