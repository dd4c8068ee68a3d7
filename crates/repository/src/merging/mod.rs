//! Ordered union of child repositories.
//!
//! # Mental model
//!
//! * Children are ordered by priority: local children (overlays, highest
//!   priority first), then library children.
//! * A merged per-(namespace, type) map keeps, for every name, the items of
//!   the first child that declares each qualifier string. Later children
//!   only add qualifier strings nobody before them declared. Id and
//!   styleable items are never shadowed, but each leaf item appears once
//!   even when two children share it.
//! * With exactly one local child and no libraries the node is a pass-through:
//!   maps and generation come straight from the child.
//!
//! # Invariants
//!
//! * A merged map is published into the cache only if no invalidation
//!   arrived while it was being computed (epoch check).
//! * The cache lock is never held while calling into children or parents.
//! * [`ResourceRepository::generation`] never decreases, including across
//!   [`MergingRepository::set_children`].


use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use resrepo_primitives::{ResourceNamespace, ResourceType};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::generation;
use crate::item::ResourceItem;
use crate::links::links;
use crate::repository::{Invalidation, InvalidationTarget, RepositoryId, ResourceRepository};
use crate::table::NameMap;

/// Child list, swapped as a whole.
#[derive(Default)]
struct Children {
	local: Vec<Arc<dyn ResourceRepository>>,
	libraries: Vec<Arc<dyn ResourceRepository>>,
}

impl Children {
	fn all(&self) -> impl Iterator<Item = &Arc<dyn ResourceRepository>> {
		self.local.iter().chain(&self.libraries)
	}

	fn pass_through(&self) -> Option<&Arc<dyn ResourceRepository>> {
		match (self.local.as_slice(), self.libraries.is_empty()) {
			([only], true) => Some(only),
			_ => None,
		}
	}
}

#[derive(Default)]
struct MergeCache {
	/// `None` records a (namespace, type) known to have no items.
	maps: FxHashMap<(ResourceNamespace, ResourceType), Option<Arc<NameMap>>>,
	/// Bumped by every invalidation.
	epoch: u64,
	generation: u64,
	child_generations: Vec<u64>,
}

/// Internal node of the repository tree.
pub struct MergingRepository {
	id: RepositoryId,
	name: String,
	children: ArcSwap<Children>,
	cache: Mutex<MergeCache>,
}

impl fmt::Debug for MergingRepository {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let children = self.children.load();
		f.debug_struct("MergingRepository")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("local", &children.local.len())
			.field("libraries", &children.libraries.len())
			.finish()
	}
}

impl MergingRepository {
	pub fn new(name: impl Into<String>, local: Vec<Arc<dyn ResourceRepository>>, libraries: Vec<Arc<dyn ResourceRepository>>) -> Arc<Self> {
		let children = Children { local, libraries };
		let child_generations = children.all().map(|child| child.generation()).collect();
		let repo = Arc::new(Self {
			id: RepositoryId::next(),
			name: name.into(),
			cache: Mutex::new(MergeCache {
				generation: generation::next(),
				child_generations,
				..MergeCache::default()
			}),
			children: ArcSwap::from_pointee(children),
		});
		let target: Weak<dyn InvalidationTarget> = Arc::downgrade(&repo) as Weak<Self>;
		links().register(repo.id, target);
		for child in repo.children.load().all() {
			links().link(child.id(), repo.id);
		}
		tracing::debug!(id = %repo.id, name = %repo.name, "resrepo.merging.created");
		repo
	}

	/// Every child, local ones first.
	pub fn children(&self) -> Vec<Arc<dyn ResourceRepository>> {
		self.children.load().all().cloned().collect()
	}

	pub fn local_children(&self) -> Vec<Arc<dyn ResourceRepository>> {
		self.children.load().local.clone()
	}

	pub fn library_children(&self) -> Vec<Arc<dyn ResourceRepository>> {
		self.children.load().libraries.clone()
	}

	/// Replaces the children, rewiring parent links and invalidating
	/// everything.
	pub fn set_children(&self, local: Vec<Arc<dyn ResourceRepository>>, libraries: Vec<Arc<dyn ResourceRepository>>) {
		let old = self.children.swap(Arc::new(Children { local, libraries }));
		for child in old.all() {
			links().unlink(child.id(), self.id);
		}
		for child in self.children.load().all() {
			links().link(child.id(), self.id);
		}
		tracing::debug!(id = %self.id, name = %self.name, children = self.children.load().all().count(), "resrepo.merging.children_set");
		self.invalidate(&Invalidation::All);
	}

	fn merge(children: &Children, namespace: &ResourceNamespace, kind: ResourceType) -> Option<Arc<NameMap>> {
		let maps: Vec<Arc<NameMap>> = children.all().filter_map(|child| child.items(namespace, kind)).filter(|map| !map.is_empty()).collect();
		if let [only] = maps.as_slice() {
			return Some(only.clone());
		}
		let mut merged = NameMap::new();
		for map in &maps {
			for (name, items) in map.iter() {
				debug_assert!(items.iter().all(|item| item.namespace() == namespace && item.kind() == kind), "child returned items of another (namespace, type)");
				let entry = merged.entry(name.clone()).or_default();
				if kind.allows_duplicates() {
					// A child reachable along two paths must not repeat its items.
					let seen: FxHashSet<*const ResourceItem> = entry.iter().map(Arc::as_ptr).collect();
					entry.extend(items.iter().filter(|item| !seen.contains(&Arc::as_ptr(item))).cloned());
					continue;
				}
				let seen: FxHashSet<String> = entry.iter().map(|item| item.qualifiers().to_string()).collect();
				entry.extend(items.iter().filter(|item| !seen.contains(item.qualifiers())).cloned());
			}
		}
		(!merged.is_empty()).then(|| Arc::new(merged))
	}
}

impl ResourceRepository for MergingRepository {
	fn id(&self) -> RepositoryId {
		self.id
	}

	fn display_name(&self) -> String {
		self.name.clone()
	}

	fn namespaces(&self) -> Vec<ResourceNamespace> {
		let mut namespaces: Vec<_> = self.children.load().all().flat_map(|child| child.namespaces()).collect();
		namespaces.sort();
		namespaces.dedup();
		namespaces
	}

	fn resource_types(&self, namespace: &ResourceNamespace) -> Vec<ResourceType> {
		let mut types: Vec<_> = self.children.load().all().flat_map(|child| child.resource_types(namespace)).collect();
		types.sort();
		types.dedup();
		types
	}

	fn items(&self, namespace: &ResourceNamespace, kind: ResourceType) -> Option<Arc<NameMap>> {
		let children = self.children.load_full();
		if let Some(child) = children.pass_through() {
			return child.items(namespace, kind);
		}
		let key = (namespace.clone(), kind);
		let epoch = {
			let cache = self.cache.lock();
			if let Some(map) = cache.maps.get(&key) {
				return map.clone();
			}
			cache.epoch
		};
		let merged = Self::merge(&children, namespace, kind);
		let mut cache = self.cache.lock();
		if cache.epoch == epoch {
			cache.maps.insert(key, merged.clone());
		} else {
			tracing::trace!(id = %self.id, kind = %kind, "resrepo.merging.stale_merge");
		}
		merged
	}

	/// Merged items that some child exposes publicly.
	fn public_items(&self, namespace: &ResourceNamespace, kind: ResourceType) -> Vec<Arc<ResourceItem>> {
		let public: FxHashSet<*const ResourceItem> = self.children.load().all().flat_map(|child| child.public_items(namespace, kind)).map(|item| Arc::as_ptr(&item)).collect();
		let Some(map) = self.items(namespace, kind) else {
			return Vec::new();
		};
		map.values().flatten().filter(|item| public.contains(&Arc::as_ptr(item))).cloned().collect()
	}

	fn generation(&self) -> u64 {
		let children = self.children.load_full();
		if let Some(child) = children.pass_through() {
			let generation = child.generation();
			return generation.max(self.cache.lock().generation);
		}
		let current: Vec<u64> = children.all().map(|child| child.generation()).collect();
		let mut cache = self.cache.lock();
		if cache.child_generations != current {
			cache.generation = generation::next();
			cache.child_generations = current;
		}
		cache.generation
	}

	fn resource_dirs(&self) -> Vec<PathBuf> {
		let mut dirs: Vec<PathBuf> = Vec::new();
		for dir in self.children.load().all().flat_map(|child| child.resource_dirs()) {
			if !dirs.contains(&dir) {
				dirs.push(dir);
			}
		}
		dirs
	}

	fn sync(&self) {
		for child in self.children.load().all() {
			child.sync();
		}
	}
}

impl InvalidationTarget for MergingRepository {
	fn invalidate(&self, change: &Invalidation) {
		let current: Vec<u64> = self.children.load().all().map(|child| child.generation()).collect();
		{
			let mut cache = self.cache.lock();
			cache.epoch += 1;
			match change {
				Invalidation::All => cache.maps.clear(),
				Invalidation::Types { namespace, types } => cache.maps.retain(|(ns, kind), _| !(ns == namespace && types.contains(kind))),
			}
			cache.generation = generation::next();
			cache.child_generations = current;
		}
		tracing::trace!(id = %self.id, name = %self.name, change = ?change, "resrepo.merging.invalidated");
		links().notify(self.id, change);
	}
}

impl Drop for MergingRepository {
	fn drop(&mut self) {
		links().forget(self.id);
	}
}
