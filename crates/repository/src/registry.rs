//! Shared folder repositories.
//!
//! # Purpose
//!
//! * One [`SourceRepository`] per (directory, namespace) and namespace mode,
//!   shared by every module that references the directory.
//! * Records which modules own each entry, so a model change can drop the
//!   folders no module of any project sharing the registry references.
//!
//! # Invariants
//!
//! * The two namespace modes are independent: the same directory can be
//!   loaded once per mode.
//! * An entry outlives the modules that requested it; only
//!   [`FolderRegistry::evict_unowned`] and [`FolderRegistry::reset`] drop
//!   entries, and eviction spares every entry that still has an owner.
//! * Owners are opaque strings; managers sharing a registry scope theirs so
//!   equal module names in two projects do not collide.
//! * The registry lock is held while a missing repository is loaded, so
//!   concurrent requests for one directory load it once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use resrepo_primitives::ResourceNamespace;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::config::Namespacing;
use crate::context::RepositoryContext;
use crate::source::SourceRepository;

type Key = (PathBuf, ResourceNamespace);

struct Entry {
	repo: Arc<SourceRepository>,
	owners: SmallVec<[String; 2]>,
}

#[derive(Default)]
struct Caches {
	/// Indexed by [`Namespacing`]: disabled first, then required.
	modes: [IndexMap<Key, Entry>; 2],
}

impl Caches {
	fn mode(&mut self, mode: Namespacing) -> &mut IndexMap<Key, Entry> {
		&mut self.modes[mode_index(mode)]
	}

	fn entries(&self) -> impl Iterator<Item = (&Key, &Entry)> {
		self.modes.iter().flatten()
	}
}

fn mode_index(mode: Namespacing) -> usize {
	match mode {
		Namespacing::Disabled => 0,
		Namespacing::Required => 1,
	}
}

/// Process-wide cache of folder repositories.
pub struct FolderRegistry {
	ctx: RepositoryContext,
	caches: Mutex<Caches>,
}

impl fmt::Debug for FolderRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FolderRegistry").field("len", &self.len()).finish_non_exhaustive()
	}
}

impl FolderRegistry {
	/// Repositories created by this registry share `ctx`.
	pub fn new(ctx: RepositoryContext) -> Self {
		Self {
			ctx,
			caches: Mutex::default(),
		}
	}

	pub fn context(&self) -> &RepositoryContext {
		&self.ctx
	}

	/// Repository of `directory`, loading it on first use. `owner` is
	/// recorded as one of the entry's owning modules.
	pub fn get(&self, directory: &Path, namespace: &ResourceNamespace, mode: Namespacing, owner: &str) -> Arc<SourceRepository> {
		let mut caches = self.caches.lock();
		let cache = caches.mode(mode);
		let key = (directory.to_path_buf(), namespace.clone());
		if let Some(entry) = cache.get_mut(&key) {
			if !entry.owners.iter().any(|existing| existing == owner) {
				entry.owners.push(owner.to_string());
			}
			return entry.repo.clone();
		}
		let repo = SourceRepository::create(directory, namespace.clone(), self.ctx.clone());
		tracing::debug!(dir = %directory.display(), namespace = %namespace, mode = ?mode, owner, "resrepo.registry.created");
		cache.insert(
			key,
			Entry {
				repo: repo.clone(),
				owners: SmallVec::from_iter([owner.to_string()]),
			},
		);
		repo
	}

	/// Repository of `directory` if it has already been loaded.
	pub fn get_cached(&self, directory: &Path, namespace: &ResourceNamespace, mode: Namespacing) -> Option<Arc<SourceRepository>> {
		let key = (directory.to_path_buf(), namespace.clone());
		self.caches.lock().mode(mode).get(&key).map(|entry| entry.repo.clone())
	}

	/// Modules that requested the repository of `directory`.
	pub fn owners(&self, directory: &Path, namespace: &ResourceNamespace, mode: Namespacing) -> Vec<String> {
		let key = (directory.to_path_buf(), namespace.clone());
		self.caches.lock().mode(mode).get(&key).map(|entry| entry.owners.to_vec()).unwrap_or_default()
	}

	/// Repositories whose directory is `path` or one of its ancestors, from
	/// both modes.
	pub fn repositories_under(&self, path: &Path) -> Vec<Arc<SourceRepository>> {
		let ancestors: FxHashSet<&Path> = path.ancestors().collect();
		self.caches.lock().entries().filter(|((dir, _), _)| ancestors.contains(dir.as_path())).map(|(_, entry)| entry.repo.clone()).collect()
	}

	/// Every repository, both modes.
	pub fn all(&self) -> Vec<Arc<SourceRepository>> {
		self.caches.lock().entries().map(|(_, entry)| entry.repo.clone()).collect()
	}

	/// Forgets `owner` on every entry whose directory is not in `keep`.
	pub fn release(&self, owner: &str, keep: &FxHashSet<PathBuf>) {
		let mut caches = self.caches.lock();
		for cache in &mut caches.modes {
			for ((dir, _), entry) in cache.iter_mut() {
				if !keep.contains(dir) {
					entry.owners.retain(|existing| existing != owner);
				}
			}
		}
		tracing::trace!(owner, kept = keep.len(), "resrepo.registry.released");
	}

	/// Forgets `owner` everywhere. Entries stay until evicted.
	pub fn dispose_module(&self, owner: &str) {
		self.release(owner, &FxHashSet::default());
	}

	/// Drops every entry no owner holds any more. Returns the number of
	/// dropped entries.
	pub fn evict_unowned(&self) -> usize {
		let mut caches = self.caches.lock();
		let mut evicted = 0;
		for cache in &mut caches.modes {
			let before = cache.len();
			cache.retain(|_, entry| !entry.owners.is_empty());
			evicted += before - cache.len();
		}
		if evicted > 0 {
			tracing::debug!(evicted, remaining = caches.entries().count(), "resrepo.registry.evicted");
		}
		evicted
	}

	/// Drops every entry.
	pub fn reset(&self) {
		let dropped = {
			let mut caches = self.caches.lock();
			std::mem::take(&mut caches.modes)
		};
		tracing::debug!(dropped = dropped.iter().map(IndexMap::len).sum::<usize>(), "resrepo.registry.reset");
	}

	pub fn len(&self) -> usize {
		self.caches.lock().entries().count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
