//! Sparse namespace x type x name table of items.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use resrepo_primitives::{ResourceNamespace, ResourceType};

use crate::item::ResourceItem;

/// Items of one (namespace, type), keyed by name in insertion order.
pub type NameMap = IndexMap<String, Vec<Arc<ResourceItem>>>;

/// Resource table.
///
/// Per-type maps are `Arc`-shared: readers (including merging parents) hold
/// cheap clones, and mutation copies a map only while someone else still
/// holds it.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
	maps: BTreeMap<ResourceNamespace, BTreeMap<ResourceType, Arc<NameMap>>>,
}

impl ResourceTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, namespace: &ResourceNamespace, kind: ResourceType) -> Option<&Arc<NameMap>> {
		self.maps.get(namespace)?.get(&kind)
	}

	pub fn items_named(&self, namespace: &ResourceNamespace, kind: ResourceType, name: &str) -> &[Arc<ResourceItem>] {
		self.get(namespace, kind).and_then(|map| map.get(name)).map_or(&[], Vec::as_slice)
	}

	pub fn namespaces(&self) -> impl Iterator<Item = &ResourceNamespace> {
		self.maps.keys()
	}

	pub fn types(&self, namespace: &ResourceNamespace) -> Vec<ResourceType> {
		self.maps.get(namespace).map(|types| types.keys().copied().collect()).unwrap_or_default()
	}

	pub fn insert(&mut self, item: Arc<ResourceItem>) {
		let map = self.maps.entry(item.namespace().clone()).or_default().entry(item.kind()).or_default();
		Arc::make_mut(map).entry(item.name().to_string()).or_default().push(item);
	}

	/// Removes `item` (by identity). Returns whether it was present.
	pub fn remove(&mut self, item: &Arc<ResourceItem>) -> bool {
		let Some(types) = self.maps.get_mut(item.namespace()) else {
			return false;
		};
		let Some(map) = types.get_mut(&item.kind()) else {
			return false;
		};
		let Some(position) = map.get(item.name()).and_then(|items| items.iter().position(|i| Arc::ptr_eq(i, item))) else {
			return false;
		};
		let names = Arc::make_mut(map);
		if let Some(items) = names.get_mut(item.name()) {
			items.remove(position);
			if items.is_empty() {
				names.shift_remove(item.name());
			}
		}
		if names.is_empty() {
			types.remove(&item.kind());
			if types.is_empty() {
				self.maps.remove(item.namespace());
			}
		}
		true
	}

	pub fn len(&self) -> usize {
		self.iter().count()
	}

	pub fn is_empty(&self) -> bool {
		self.maps.is_empty()
	}

	/// Every item, grouped by namespace, type and name.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceItem>> {
		self.maps.values().flat_map(|types| types.values()).flat_map(|names| names.values()).flatten()
	}

	pub fn clear(&mut self) {
		self.maps.clear();
	}
}
