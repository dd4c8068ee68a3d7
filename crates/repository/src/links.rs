//! Parent links between repositories.
//!
//! # Role
//!
//! Repositories never point at their parents. Instead this process-wide
//! table owns both directions of every edge: child id to parent ids, and
//! parent id to a weak handle of the parent. A child that changed asks the
//! table to notify its parents; the table upgrades the weak handles, drops
//! dead ones, and calls [`InvalidationTarget::invalidate`].
//!
//! # Concurrency & ordering
//!
//! * Callers must not hold their own repository lock while notifying.
//! * The table lock is released before any parent is called, so parents may
//!   recurse into the table to notify their own parents.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::repository::{Invalidation, InvalidationTarget, RepositoryId};

#[derive(Default)]
struct Edges {
	parents: FxHashMap<RepositoryId, SmallVec<[RepositoryId; 2]>>,
	targets: FxHashMap<RepositoryId, Weak<dyn InvalidationTarget>>,
}

/// The link table. Obtain the process-wide instance with [`links`].
#[derive(Default)]
pub struct LinkTable {
	edges: Mutex<Edges>,
}

static LINKS: OnceLock<LinkTable> = OnceLock::new();

/// Process-wide link table, created on first use.
pub fn links() -> &'static LinkTable {
	LINKS.get_or_init(LinkTable::default)
}

impl LinkTable {
	/// Registers `id` as a node that can receive invalidations.
	pub fn register(&self, id: RepositoryId, target: Weak<dyn InvalidationTarget>) {
		self.edges.lock().targets.insert(id, target);
	}

	pub fn link(&self, child: RepositoryId, parent: RepositoryId) {
		let mut edges = self.edges.lock();
		let parents = edges.parents.entry(child).or_default();
		if !parents.contains(&parent) {
			parents.push(parent);
		}
	}

	pub fn unlink(&self, child: RepositoryId, parent: RepositoryId) {
		let mut edges = self.edges.lock();
		if let Some(parents) = edges.parents.get_mut(&child) {
			parents.retain(|p| *p != parent);
			if parents.is_empty() {
				edges.parents.remove(&child);
			}
		}
	}

	/// Removes every edge into and out of `id`.
	pub fn forget(&self, id: RepositoryId) {
		let mut edges = self.edges.lock();
		edges.targets.remove(&id);
		edges.parents.remove(&id);
		edges.parents.retain(|_, parents| {
			parents.retain(|p| *p != id);
			!parents.is_empty()
		});
	}

	pub fn parents_of(&self, child: RepositoryId) -> Vec<RepositoryId> {
		self.edges.lock().parents.get(&child).map(|p| p.to_vec()).unwrap_or_default()
	}

	/// Delivers `change` to every live parent of `child`.
	pub fn notify(&self, child: RepositoryId, change: &Invalidation) {
		let targets: Vec<Arc<dyn InvalidationTarget>> = {
			let mut edges = self.edges.lock();
			let Some(parents) = edges.parents.get(&child).cloned() else {
				return;
			};
			let mut live = Vec::with_capacity(parents.len());
			for parent in parents {
				match edges.targets.get(&parent).and_then(Weak::upgrade) {
					Some(target) => live.push(target),
					None => {
						edges.targets.remove(&parent);
						if let Some(list) = edges.parents.get_mut(&child) {
							list.retain(|p| *p != parent);
						}
					}
				}
			}
			live
		};
		tracing::trace!(child = %child, parents = targets.len(), change = ?change, "resrepo.links.notify");
		for target in targets {
			target.invalidate(change);
		}
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;

	#[derive(Default)]
	struct Recorder(Mutex<Vec<Invalidation>>);

	impl InvalidationTarget for Recorder {
		fn invalidate(&self, change: &Invalidation) {
			self.0.lock().push(change.clone());
		}
	}

	#[test]
	fn notifies_live_parents_and_prunes_dead_ones() {
		let table = LinkTable::default();
		let child = RepositoryId::next();
		let (alive_id, dead_id) = (RepositoryId::next(), RepositoryId::next());
		let alive = Arc::new(Recorder::default());
		let dead = Arc::new(Recorder::default());
		let alive_dyn: Arc<dyn InvalidationTarget> = alive.clone();
		let dead_dyn: Arc<dyn InvalidationTarget> = dead.clone();
		table.register(alive_id, Arc::downgrade(&alive_dyn));
		table.register(dead_id, Arc::downgrade(&dead_dyn));
		table.link(child, alive_id);
		table.link(child, dead_id);
		drop((dead, dead_dyn));

		table.notify(child, &Invalidation::All);
		assert_eq!(*alive.0.lock(), vec![Invalidation::All]);
		assert_eq!(table.parents_of(child), vec![alive_id]);
	}

	#[test]
	fn forget_removes_both_directions() {
		let table = LinkTable::default();
		let (child, parent) = (RepositoryId::next(), RepositoryId::next());
		table.link(child, parent);
		table.link(child, parent);
		assert_eq!(table.parents_of(child), vec![parent]);
		table.forget(parent);
		assert!(table.parents_of(child).is_empty());
	}
}
