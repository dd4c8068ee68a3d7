//! Leaf repository over one resource directory.
//!
//! # Purpose
//!
//! * Owns the items of exactly one resource directory (a module's `res/`
//!   or an unpacked library), with per-file provenance.
//! * Keeps them current from fine-grained edit events, scheduling a file
//!   rescan only when an edit cannot be applied in place.
//!
//! # Lifecycle
//!
//! | Phase | What happens |
//! |---|---|
//! | Cache load | The persistent cache is read if its header matches. |
//! | Scan | Each qualifier folder is walked once; files the cache does not cover (or covers with a stale fingerprint) are parsed. |
//! | Commit | The files become the live table; the generation is set. |
//! | Cache write | When more than `freshness_threshold` of the XML files were parsed from source, a new cache is written in the background. |
//! | Incremental | Events from [`crate::ChangeRouter`] mutate the table. |
//!
//! # Invariants
//!
//! * Every item in the table belongs to exactly one [`ResourceFile`], and
//!   removing a file removes exactly its items.
//! * [`ResourceRepository::generation`] never decreases.
//! * Parents are notified only after the state lock is released.
//! * A file open in the [`crate::DocumentProvider`] is scanned in live mode
//!   and never taken from the cache.

mod load;
mod rescan;
mod scan;
mod update;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};
use resrepo_primitives::{FolderConfiguration, ResourceFolderType, ResourceNamespace, ResourceType};
use rustc_hash::{FxHashMap, FxHashSet};

use self::rescan::ScanState;
use crate::context::RepositoryContext;
use crate::error::CacheError;
use crate::events::{ChangeEvent, FsEvent};
use crate::file::ResourceFile;
use crate::generation;
use crate::item::ResourceItem;
use crate::links::links;
use crate::repository::{Invalidation, RepositoryId, ResourceRepository};
use crate::table::{NameMap, ResourceTable};

/// Counters of the initial load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadStats {
	/// XML files found by the initial scan.
	pub xml_total: usize,
	/// XML files parsed from source rather than taken from the cache.
	pub xml_parsed: usize,
	/// Files of any kind taken from the cache.
	pub cached_files: usize,
}

impl LoadStats {
	/// Whether few enough files were parsed that rewriting the cache is not
	/// worth it.
	pub fn is_fresh(&self, threshold: f64) -> bool {
		self.xml_parsed as f64 <= self.xml_total as f64 * threshold
	}
}

#[derive(Debug, Default)]
struct SourceState {
	table: ResourceTable,
	files: IndexMap<PathBuf, ResourceFile>,
}

impl SourceState {
	/// Replaces the items of `path` with those of `file`, or drops the file.
	/// Returns the types whose items changed.
	fn replace_file(&mut self, path: &Path, file: Option<ResourceFile>) -> Vec<ResourceType> {
		let mut types = Vec::new();
		if let Some(old) = self.files.shift_remove(path) {
			for item in &old.items {
				self.table.remove(item);
			}
			types.extend(old.types());
		}
		if let Some(file) = file {
			for item in &file.items {
				self.table.insert(item.clone());
			}
			types.extend(file.types());
			self.files.insert(path.to_path_buf(), file);
		}
		types.sort();
		types.dedup();
		types
	}
}

/// Resources of one directory.
pub struct SourceRepository {
	id: RepositoryId,
	directory: PathBuf,
	namespace: ResourceNamespace,
	ctx: RepositoryContext,
	this: Weak<SourceRepository>,
	state: Mutex<SourceState>,
	generation: AtomicU64,
	stats: LoadStats,
	loaded_from_cache: bool,
	scans: Mutex<FxHashMap<PathBuf, ScanState>>,
	scans_idle: Condvar,
}

impl fmt::Debug for SourceRepository {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SourceRepository")
			.field("id", &self.id)
			.field("directory", &self.directory)
			.field("namespace", &self.namespace)
			.field("generation", &self.generation())
			.finish_non_exhaustive()
	}
}

impl SourceRepository {
	/// Loads `directory`, from the persistent cache where possible.
	///
	/// A missing directory yields an empty repository that picks up files
	/// as they are created.
	pub fn create(directory: impl Into<PathBuf>, namespace: ResourceNamespace, ctx: RepositoryContext) -> Arc<Self> {
		let directory = directory.into();
		let load = load::initial_load(&directory, &namespace, &ctx);
		let mut state = SourceState::default();
		for (path, file) in load.files {
			state.replace_file(&path, Some(file));
		}
		let items = state.table.len();
		let repo = Arc::new_cyclic(|this| Self {
			id: RepositoryId::next(),
			directory,
			namespace,
			ctx,
			this: this.clone(),
			state: Mutex::new(state),
			generation: AtomicU64::new(generation::next()),
			stats: load.stats,
			loaded_from_cache: load.stats.cached_files > 0,
			scans: Mutex::default(),
			scans_idle: Condvar::new(),
		});
		tracing::debug!(
			dir = %repo.directory.display(),
			id = %repo.id,
			items,
			total = load.stats.xml_total,
			parsed = load.stats.xml_parsed,
			cached = load.stats.cached_files,
			"resrepo.load.done"
		);
		let cache = &repo.ctx.config.cache;
		if cache.enabled && !load.stats.is_fresh(cache.freshness_threshold) {
			repo.schedule_cache_write();
		}
		repo
	}

	pub fn directory(&self) -> &Path {
		&self.directory
	}

	pub fn namespace(&self) -> &ResourceNamespace {
		&self.namespace
	}

	pub fn context(&self) -> &RepositoryContext {
		&self.ctx
	}

	/// Whether any file of the initial load came from the persistent cache.
	pub fn loaded_from_cache(&self) -> bool {
		self.loaded_from_cache
	}

	pub fn load_stats(&self) -> LoadStats {
		self.stats
	}

	/// Paths of every known file, in scan order.
	pub fn resource_files(&self) -> Vec<PathBuf> {
		self.state.lock().files.keys().cloned().collect()
	}

	/// Snapshot of one file's bookkeeping.
	pub fn file_for(&self, path: &Path) -> Option<ResourceFile> {
		self.state.lock().files.get(path).cloned()
	}

	/// Number of items across all types.
	pub fn len(&self) -> usize {
		self.state.lock().table.len()
	}

	pub fn is_empty(&self) -> bool {
		self.state.lock().table.is_empty()
	}

	/// Applies one routed event.
	pub fn handle(&self, event: &ChangeEvent) {
		match event {
			ChangeEvent::Fs(event) => self.handle_fs_event(event),
			ChangeEvent::FileChanged(path) | ChangeEvent::BufferEdited(path) => self.schedule_rescan(path),
			ChangeEvent::Structural(edit) => self.handle_structural_edit(edit),
		}
	}

	/// Adds, removes or moves whole files and folders.
	pub fn handle_fs_event(&self, event: &FsEvent) {
		tracing::trace!(dir = %self.directory.display(), event = ?event, "resrepo.source.fs_event");
		match event {
			FsEvent::Created(path) => self.path_created(path),
			FsEvent::Deleted(path) => self.path_deleted(path),
			FsEvent::Moved { from, to } => {
				self.path_deleted(from);
				self.path_created(to);
			}
		}
	}

	fn path_created(&self, path: &Path) {
		if path.is_dir() {
			for file in load::files_under(&self.directory, path) {
				self.rescan_now(&file);
			}
		} else {
			self.rescan_now(path);
		}
	}

	fn path_deleted(&self, path: &Path) {
		let types = {
			let mut state = self.state.lock();
			let doomed: Vec<PathBuf> = state.files.keys().filter(|file| file.starts_with(path)).cloned().collect();
			let mut types = Vec::new();
			for file in doomed {
				types.extend(state.replace_file(&file, None));
			}
			types
		};
		self.structural_change(types);
	}

	/// Rescans `path` right away, binding its items to the open live
	/// document if there is one.
	pub fn convert_to_live(&self, path: &Path) {
		self.rescan_now(path);
	}

	/// Folder type and configuration of a file directly inside one of this
	/// repository's qualifier folders.
	fn folder_of(&self, path: &Path) -> Option<(ResourceFolderType, FolderConfiguration)> {
		let folder = path.parent()?;
		if folder.parent()? != self.directory {
			return None;
		}
		FolderConfiguration::for_folder(folder.file_name()?.to_str()?)
	}

	fn bump(&self) -> u64 {
		let next = generation::next();
		self.generation.fetch_max(next, Ordering::AcqRel);
		next
	}

	/// Bumps the generation and invalidates `types` in every parent.
	fn structural_change(&self, mut types: Vec<ResourceType>) {
		if types.is_empty() {
			return;
		}
		types.sort();
		types.dedup();
		let generation = self.bump();
		tracing::trace!(dir = %self.directory.display(), generation, types = ?types, "resrepo.source.changed");
		links().notify(self.id, &Invalidation::types(self.namespace.clone(), types));
	}

	/// Bumps the generation if any cached value was dropped.
	fn value_change(&self, cleared: bool) {
		if cleared {
			let generation = self.bump();
			tracing::trace!(dir = %self.directory.display(), generation, "resrepo.source.value_changed");
		}
	}

	/// Writes the persistent cache on the calling thread.
	pub fn write_cache(&self) -> Result<(), CacheError> {
		let (header, payload) = {
			let state = self.state.lock();
			load::cache_contents(&self.directory, &self.namespace, &self.ctx, &state)
		};
		let path = load::cache_path(&self.directory, &self.namespace, &self.ctx);
		crate::cache::write(&path, &header, &payload)
	}

	/// Writes the persistent cache on the worker pool, or inline when
	/// background writes are disabled. Failures are logged.
	pub fn schedule_cache_write(&self) {
		let write = |repo: &SourceRepository| {
			if let Err(error) = repo.write_cache() {
				tracing::warn!(dir = %repo.directory.display(), %error, "resrepo.cache.write_failed");
			}
		};
		if !self.ctx.config.cache.background_write {
			write(self);
			return;
		}
		let this = self.this.clone();
		self.ctx.cache_writes.spawn_blocking(move || {
			if let Some(repo) = this.upgrade() {
				write(&repo);
			}
		});
	}
}

impl ResourceRepository for SourceRepository {
	fn id(&self) -> RepositoryId {
		self.id
	}

	fn display_name(&self) -> String {
		self.directory.display().to_string()
	}

	fn namespaces(&self) -> Vec<ResourceNamespace> {
		self.state.lock().table.namespaces().cloned().collect()
	}

	fn resource_types(&self, namespace: &ResourceNamespace) -> Vec<ResourceType> {
		self.state.lock().table.types(namespace)
	}

	fn items(&self, namespace: &ResourceNamespace, kind: ResourceType) -> Option<Arc<NameMap>> {
		self.state.lock().table.get(namespace, kind).cloned()
	}

	/// All items when no file declares `<public>`, otherwise the declared
	/// ones.
	fn public_items(&self, namespace: &ResourceNamespace, kind: ResourceType) -> Vec<Arc<ResourceItem>> {
		let state = self.state.lock();
		let Some(map) = state.table.get(namespace, kind) else {
			return Vec::new();
		};
		let declared: FxHashSet<(ResourceType, &str)> = state.files.values().flat_map(|file| file.public.iter().map(|(kind, name)| (*kind, name.as_str()))).collect();
		map.iter()
			.filter(|(name, _)| declared.is_empty() || declared.contains(&(kind, name.as_str())))
			.flat_map(|(_, items)| items.iter().cloned())
			.collect()
	}

	fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	fn resource_dirs(&self) -> Vec<PathBuf> {
		vec![self.directory.clone()]
	}

	fn sync(&self) {
		self.sync_scans();
	}
}

impl Drop for SourceRepository {
	fn drop(&mut self) {
		links().forget(self.id);
	}
}
