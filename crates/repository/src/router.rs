//! Host notification routing.
//!
//! # Mental model
//!
//! * The host delivers each user action on exactly one channel of
//!   [`ChangeEvent`]. The router finds the folder repositories whose
//!   directory is an ancestor of the affected paths and hands them the event
//!   under the model gate's write side.
//! * Afterwards, [`ResourceChangeListener`]s hear which repositories were
//!   touched and why: [`ChangeReasons::RESOURCE_EDIT`] when a generation
//!   moved, [`ChangeReasons::EDIT`] otherwise.
//! * Deferred rescans change repositories later, from
//!   [`ChangeRouter::run_idle`]; listeners are told about those too.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::context::RepositoryContext;
use crate::events::{ChangeEvent, ChangeReasons};
use crate::registry::FolderRegistry;
use crate::repository::{RepositoryId, ResourceRepository};
use crate::source::SourceRepository;

/// UI-facing change notification.
pub trait ResourceChangeListener: Send + Sync {
	/// `repositories` were touched by one routed event or idle pass.
	/// Empty for project-wide changes.
	fn resources_changed(&self, repositories: &[RepositoryId], reasons: ChangeReasons);
}

/// Registration handle returned by [`ChangeRouter::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
	next: u64,
	entries: Vec<(ListenerId, Arc<dyn ResourceChangeListener>)>,
}

/// Single subscriber to host file and edit notifications.
pub struct ChangeRouter {
	ctx: RepositoryContext,
	registry: Arc<FolderRegistry>,
	listeners: Mutex<Listeners>,
}

impl fmt::Debug for ChangeRouter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ChangeRouter")
			.field("registry", &self.registry)
			.field("listeners", &self.listeners.lock().entries.len())
			.finish_non_exhaustive()
	}
}

impl ChangeRouter {
	pub fn new(ctx: RepositoryContext, registry: Arc<FolderRegistry>) -> Self {
		Self {
			ctx,
			registry,
			listeners: Mutex::default(),
		}
	}

	pub fn add_listener(&self, listener: Arc<dyn ResourceChangeListener>) -> ListenerId {
		let mut listeners = self.listeners.lock();
		listeners.next += 1;
		let id = ListenerId(listeners.next);
		listeners.entries.push((id, listener));
		id
	}

	pub fn remove_listener(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.lock();
		let before = listeners.entries.len();
		listeners.entries.retain(|(existing, _)| *existing != id);
		before != listeners.entries.len()
	}

	/// Repositories that receive `event`, each once.
	pub fn targets(&self, event: &ChangeEvent) -> Vec<Arc<SourceRepository>> {
		let mut seen = FxHashSet::default();
		event
			.paths()
			.into_iter()
			.flat_map(|path| self.registry.repositories_under(path))
			.filter(|repo| seen.insert(repo.id()))
			.collect()
	}

	/// Delivers `event` and notifies listeners. Returns the number of
	/// repositories that received it.
	pub fn dispatch(&self, event: &ChangeEvent) -> usize {
		let targets = self.targets(event);
		if targets.is_empty() {
			tracing::trace!(event = ?event, "resrepo.router.unrouted");
			return 0;
		}
		let before: Vec<u64> = targets.iter().map(|repo| repo.generation()).collect();
		{
			let _gate = self.ctx.gate.write();
			for repo in &targets {
				tracing::trace!(repo = %repo.id(), event = ?event, "resrepo.router.deliver");
				repo.handle(event);
			}
		}
		let changed: Vec<RepositoryId> = targets.iter().zip(&before).filter(|(repo, before)| repo.generation() != **before).map(|(repo, _)| repo.id()).collect();
		if changed.is_empty() {
			let touched: Vec<RepositoryId> = targets.iter().map(|repo| repo.id()).collect();
			self.notify(&touched, ChangeReasons::EDIT);
		} else {
			self.notify(&changed, ChangeReasons::RESOURCE_EDIT);
		}
		targets.len()
	}

	/// Runs deferred rescans queued on the idle queue and reports the
	/// repositories they changed. Returns the number of jobs run.
	pub fn run_idle(&self) -> usize {
		let repos = self.registry.all();
		let before: Vec<u64> = repos.iter().map(|repo| repo.generation()).collect();
		let ran = self.ctx.idle.run_pending();
		let changed: Vec<RepositoryId> = repos.iter().zip(&before).filter(|(repo, before)| repo.generation() != **before).map(|(repo, _)| repo.id()).collect();
		if !changed.is_empty() {
			self.notify(&changed, ChangeReasons::RESOURCE_EDIT);
		}
		ran
	}

	/// Tells every listener about a change. Listeners are called outside the
	/// router's lock.
	pub fn notify(&self, repositories: &[RepositoryId], reasons: ChangeReasons) {
		let listeners: Vec<Arc<dyn ResourceChangeListener>> = self.listeners.lock().entries.iter().map(|(_, listener)| listener.clone()).collect();
		tracing::trace!(repositories = repositories.len(), reasons = ?reasons, listeners = listeners.len(), "resrepo.router.notify");
		for listener in listeners {
			listener.resources_changed(repositories, reasons);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use pretty_assertions::assert_eq;
	use resrepo_primitives::{ResourceNamespace, ResourceType};

	use super::*;
	use crate::config::Namespacing;
	use crate::events::FsEvent;
	use crate::testing::{Fixture, names, values};

	#[derive(Default)]
	struct Recorder(Mutex<Vec<(Vec<RepositoryId>, ChangeReasons)>>);

	impl ResourceChangeListener for Recorder {
		fn resources_changed(&self, repositories: &[RepositoryId], reasons: ChangeReasons) {
			self.0.lock().push((repositories.to_vec(), reasons));
		}
	}

	struct Setup {
		fixture: Fixture,
		router: ChangeRouter,
		recorder: Arc<Recorder>,
		app: Arc<SourceRepository>,
	}

	fn setup(defer: bool) -> Setup {
		let fixture = Fixture::with(|config| config.scan.defer_rescans = defer);
		fixture.write("app/res/values/strings.xml", &values(r#"<string name="app">App</string>"#));
		let registry = Arc::new(FolderRegistry::new(fixture.ctx.clone()));
		let app = registry.get(&fixture.path("app/res"), &ResourceNamespace::ResAuto, Namespacing::Disabled, "app");
		let router = ChangeRouter::new(fixture.ctx.clone(), registry);
		let recorder = Arc::new(Recorder::default());
		router.add_listener(recorder.clone());
		Setup { fixture, router, recorder, app }
	}

	#[test]
	fn created_file_reaches_its_repository() {
		let Setup { fixture, router, recorder, app } = setup(false);
		let path = fixture.write("app/res/values/more.xml", &values(r#"<string name="more">More</string>"#));

		assert_eq!(router.dispatch(&ChangeEvent::Fs(FsEvent::Created(path))), 1);
		assert_eq!(names(app.as_ref(), ResourceType::String), ["app", "more"]);
		assert_eq!(*recorder.0.lock(), [(vec![app.id()], ChangeReasons::RESOURCE_EDIT)]);
	}

	#[test]
	fn events_outside_resource_directories_are_dropped() {
		let Setup { router, recorder, .. } = setup(false);
		let event = ChangeEvent::FileChanged(PathBuf::from("/elsewhere/values/strings.xml"));
		assert_eq!(router.dispatch(&event), 0);
		assert!(recorder.0.lock().is_empty());
	}

	#[test]
	fn deferred_rescans_report_at_idle() {
		let Setup { fixture, router, recorder, app } = setup(true);
		let path = fixture.write("app/res/values/strings.xml", &values(r#"<string name="renamed">App</string>"#));

		router.dispatch(&ChangeEvent::FileChanged(path));
		assert_eq!(*recorder.0.lock(), [(vec![app.id()], ChangeReasons::EDIT)]);

		assert_eq!(router.run_idle(), 1);
		assert_eq!(names(app.as_ref(), ResourceType::String), ["renamed"]);
		assert_eq!(recorder.0.lock().last(), Some(&(vec![app.id()], ChangeReasons::RESOURCE_EDIT)));
	}

	#[test]
	fn removed_listeners_are_not_called() {
		let Setup { fixture, router, recorder, .. } = setup(false);
		let other = Arc::new(Recorder::default());
		let id = router.add_listener(other.clone());
		assert!(router.remove_listener(id));

		router.dispatch(&ChangeEvent::Fs(FsEvent::Deleted(fixture.path("app/res/values"))));
		assert_eq!(recorder.0.lock().len(), 1);
		assert!(other.0.lock().is_empty());
	}
}
