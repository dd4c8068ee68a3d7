use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use resrepo_primitives::{ResourceNamespace, ResourceType};
use smallvec::SmallVec;

use crate::item::ResourceItem;
use crate::table::NameMap;

/// Process-unique repository identity, used as the key of the link table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryId(u64);

impl RepositoryId {
	pub fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for RepositoryId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "repo#{}", self.0)
	}
}

/// What a child tells its parents after a structural change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
	All,
	Types {
		namespace: ResourceNamespace,
		types: SmallVec<[ResourceType; 4]>,
	},
}

impl Invalidation {
	pub fn types(namespace: ResourceNamespace, types: impl IntoIterator<Item = ResourceType>) -> Self {
		let mut types: SmallVec<[ResourceType; 4]> = types.into_iter().collect();
		types.sort();
		types.dedup();
		Self::Types { namespace, types }
	}

	pub fn affects(&self, namespace: &ResourceNamespace, kind: ResourceType) -> bool {
		match self {
			Self::All => true,
			Self::Types { namespace: ns, types } => ns == namespace && types.contains(&kind),
		}
	}

	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Types { types, .. } if types.is_empty())
	}
}

/// Read API shared by leaf and merging repositories.
pub trait ResourceRepository: Send + Sync + fmt::Debug {
	fn id(&self) -> RepositoryId;

	fn display_name(&self) -> String;

	fn namespaces(&self) -> Vec<ResourceNamespace>;

	fn resource_types(&self, namespace: &ResourceNamespace) -> Vec<ResourceType>;

	/// Items of one (namespace, type), `None` when there are none.
	fn items(&self, namespace: &ResourceNamespace, kind: ResourceType) -> Option<Arc<NameMap>>;

	fn items_named(&self, namespace: &ResourceNamespace, kind: ResourceType, name: &str) -> Vec<Arc<ResourceItem>> {
		self.items(namespace, kind).and_then(|map| map.get(name).cloned()).unwrap_or_default()
	}

	fn has_resources(&self, namespace: &ResourceNamespace, kind: ResourceType) -> bool {
		self.items(namespace, kind).is_some_and(|map| !map.is_empty())
	}

	/// Publicly visible subset of [`ResourceRepository::items`].
	fn public_items(&self, namespace: &ResourceNamespace, kind: ResourceType) -> Vec<Arc<ResourceItem>>;

	/// Modification counter; never decreases.
	fn generation(&self) -> u64;

	fn resource_dirs(&self) -> Vec<PathBuf>;

	/// Runs every pending and running rescan to completion.
	fn sync(&self);

	/// Every item, across namespaces and types.
	fn all_items(&self) -> Vec<Arc<ResourceItem>> {
		let mut out = Vec::new();
		for namespace in self.namespaces() {
			for kind in self.resource_types(&namespace) {
				if let Some(map) = self.items(&namespace, kind) {
					out.extend(map.values().flatten().cloned());
				}
			}
		}
		out
	}
}

/// Receiver of invalidations from children, i.e. a merging node.
pub trait InvalidationTarget: Send + Sync {
	fn invalidate(&self, change: &Invalidation);
}
