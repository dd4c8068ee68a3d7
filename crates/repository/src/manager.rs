//! Per-project facade over the repository tree.
//!
//! # Purpose
//!
//! * Builds, per module, three layered views out of shared folder
//!   repositories and caches them until the project model changes.
//!
//! # Layers
//!
//! | View | Local children | Library children |
//! |---|---|---|
//! | module resources | the module's folder repositories, in overlay order | - |
//! | project resources | module resources of the module, then of each transitive dependency once | - |
//! | app resources | project resources | libraries of the module and its dependencies, then the framework |
//!
//! # Invariants
//!
//! * A view, once built, keeps its identity across
//!   [`RepositoryManager::update_project_model`]; its children are replaced
//!   instead, which bumps its generation.
//! * The facet lock is never held while building a view.
//! * Registry owners are scoped to the manager, so a model update only
//!   releases this project's claims on shared folders.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use resrepo_primitives::{LocaleQualifier, ResourceNamespace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::Namespacing;
use crate::context::RepositoryContext;
use crate::error::Result;
use crate::events::{ChangeEvent, ChangeReasons};
use crate::merging::MergingRepository;
use crate::module::{LibrarySpec, ModuleSpec, ProjectModel};
use crate::registry::FolderRegistry;
use crate::repository::ResourceRepository;
use crate::router::ChangeRouter;
use crate::source::SourceRepository;

const FRAMEWORK_OWNER: &str = "<framework>";

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct Facets {
	module: FxHashMap<String, Arc<MergingRepository>>,
	project: FxHashMap<String, Arc<MergingRepository>>,
	app: FxHashMap<String, Arc<MergingRepository>>,
}

#[derive(Clone, Copy)]
enum Facet {
	Module,
	Project,
	App,
}

impl Facets {
	fn map(&mut self, facet: Facet) -> &mut FxHashMap<String, Arc<MergingRepository>> {
		match facet {
			Facet::Module => &mut self.module,
			Facet::Project => &mut self.project,
			Facet::App => &mut self.app,
		}
	}
}

/// Entry point for hosts: module, project and app resources of one project.
pub struct RepositoryManager {
	ctx: RepositoryContext,
	registry: Arc<FolderRegistry>,
	router: ChangeRouter,
	model: ArcSwap<ProjectModel>,
	facets: Mutex<Facets>,
	/// Prefix of every registry owner this manager records.
	scope: u64,
}

impl fmt::Debug for RepositoryManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RepositoryManager")
			.field("modules", &self.model.load().modules.len())
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

impl RepositoryManager {
	/// Manager with its own folder registry.
	pub fn new(ctx: RepositoryContext, model: ProjectModel) -> Result<Self> {
		let registry = Arc::new(FolderRegistry::new(ctx.clone()));
		Self::with_registry(registry, model)
	}

	/// Manager sharing `registry` (and its context) with other projects.
	pub fn with_registry(registry: Arc<FolderRegistry>, model: ProjectModel) -> Result<Self> {
		model.validate()?;
		let ctx = registry.context().clone();
		Ok(Self {
			router: ChangeRouter::new(ctx.clone(), registry.clone()),
			ctx,
			registry,
			model: ArcSwap::from_pointee(model),
			facets: Mutex::default(),
			scope: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
		})
	}

	pub fn context(&self) -> &RepositoryContext {
		&self.ctx
	}

	pub fn registry(&self) -> &Arc<FolderRegistry> {
		&self.registry
	}

	pub fn router(&self) -> &ChangeRouter {
		&self.router
	}

	pub fn project_model(&self) -> Arc<ProjectModel> {
		self.model.load_full()
	}

	/// Routes one host notification.
	pub fn dispatch(&self, event: &ChangeEvent) -> usize {
		self.router.dispatch(event)
	}

	fn mode(&self) -> Namespacing {
		self.ctx.config.namespacing
	}

	fn namespace_for(&self, package: Option<&str>) -> ResourceNamespace {
		match (self.mode(), package) {
			(Namespacing::Required, Some(package)) => ResourceNamespace::Package(Arc::from(package)),
			_ => ResourceNamespace::ResAuto,
		}
	}

	/// Registry owner standing for `module` of this project.
	fn owner(&self, module: &str) -> String {
		format!("{}/{module}", self.scope)
	}

	fn folder(&self, module: &ModuleSpec, dir: &Path) -> Arc<dyn ResourceRepository> {
		self.registry.get(dir, &self.namespace_for(module.package.as_deref()), self.mode(), &self.owner(&module.name))
	}

	fn library(&self, library: &LibrarySpec, module: &str) -> Arc<SourceRepository> {
		self.registry.get(&library.resource_dir, &self.namespace_for(library.package.as_deref()), self.mode(), &self.owner(module))
	}

	fn framework(&self, module: &ModuleSpec) -> Option<Arc<SourceRepository>> {
		let dir = module.framework_dir.as_ref()?;
		Some(self.registry.get(dir, &ResourceNamespace::Framework, self.mode(), &self.owner(FRAMEWORK_OWNER)))
	}

	fn cached(&self, facet: Facet, module: &str) -> Option<Arc<MergingRepository>> {
		self.facets.lock().map(facet).get(module).cloned()
	}

	/// Cached view, or a new one built from `children`. A view built
	/// concurrently by another caller wins.
	fn facet(&self, facet: Facet, module: &str, children: impl FnOnce() -> Result<Children>) -> Result<Arc<MergingRepository>> {
		if let Some(view) = self.cached(facet, module) {
			return Ok(view);
		}
		let (local, libraries) = children()?;
		let name = match facet {
			Facet::Module => format!("module:{module}"),
			Facet::Project => format!("project:{module}"),
			Facet::App => format!("app:{module}"),
		};
		let view = MergingRepository::new(name, local, libraries);
		Ok(self.facets.lock().map(facet).entry(module.to_string()).or_insert(view).clone())
	}

	fn module_children(&self, name: &str) -> Result<Children> {
		let model = self.model.load();
		let module = model.module(name)?;
		Ok((module.resource_dirs.iter().map(|dir| self.folder(module, dir)).collect(), Vec::new()))
	}

	/// Module resources of `name` and of its transitive dependencies, each
	/// once, so a module reached along two paths contributes its items once.
	fn project_children(&self, name: &str) -> Result<Children> {
		let model = self.model.load();
		let mut local: Vec<Arc<dyn ResourceRepository>> = Vec::new();
		for module in model.with_dependencies(name)? {
			let view: Arc<dyn ResourceRepository> = self.module_resources(&module.name)?;
			local.push(view);
		}
		Ok((local, Vec::new()))
	}

	fn app_children(&self, name: &str) -> Result<Children> {
		let model = self.model.load();
		let module = model.module(name)?;
		let mut libraries: Vec<Arc<dyn ResourceRepository>> = model.libraries_of(name)?.into_iter().map(|library| self.library(library, name) as Arc<dyn ResourceRepository>).collect();
		libraries.extend(self.framework(module).map(|repo| repo as Arc<dyn ResourceRepository>));
		let project: Arc<dyn ResourceRepository> = self.project_resources(name)?;
		Ok((vec![project], libraries))
	}

	/// Merge of the module's own resource directories.
	pub fn module_resources(&self, module: &str) -> Result<Arc<MergingRepository>> {
		self.facet(Facet::Module, module, || self.module_children(module))
	}

	/// Module resources plus those of every transitive dependency.
	pub fn project_resources(&self, module: &str) -> Result<Arc<MergingRepository>> {
		self.facet(Facet::Project, module, || self.project_children(module))
	}

	/// Project resources plus libraries and the framework.
	pub fn app_resources(&self, module: &str) -> Result<Arc<MergingRepository>> {
		self.facet(Facet::App, module, || self.app_children(module))
	}

	pub fn cached_module_resources(&self, module: &str) -> Option<Arc<MergingRepository>> {
		self.cached(Facet::Module, module)
	}

	pub fn cached_project_resources(&self, module: &str) -> Option<Arc<MergingRepository>> {
		self.cached(Facet::Project, module)
	}

	pub fn cached_app_resources(&self, module: &str) -> Option<Arc<MergingRepository>> {
		self.cached(Facet::App, module)
	}

	/// Repository holding the resources of `namespace`: the framework, or
	/// the module or library declaring that package. `None` for
	/// [`ResourceNamespace::ResAuto`] and unknown packages.
	pub fn resources_for_namespace(&self, namespace: &ResourceNamespace) -> Result<Option<Arc<dyn ResourceRepository>>> {
		let model = self.model.load();
		match namespace {
			ResourceNamespace::ResAuto => Ok(None),
			ResourceNamespace::Framework => Ok(model.modules.iter().find_map(|module| self.framework(module)).map(|repo| repo as Arc<dyn ResourceRepository>)),
			ResourceNamespace::Package(package) => {
				if let Some(module) = model.modules.iter().find(|module| module.package.as_deref() == Some(&**package)) {
					let view: Arc<dyn ResourceRepository> = self.module_resources(&module.name)?;
					return Ok(Some(view));
				}
				let library = model.modules.iter().flat_map(|module| module.libraries.iter().map(move |library| (module, library))).find(|(_, library)| library.package.as_deref() == Some(&**package));
				Ok(library.map(|(module, library)| self.library(library, &module.name) as Arc<dyn ResourceRepository>))
			}
		}
	}

	/// Repositories of every library in the project, each directory once.
	pub fn library_resources(&self) -> Vec<Arc<SourceRepository>> {
		let model = self.model.load();
		let mut seen = FxHashSet::default();
		model.modules
			.iter()
			.flat_map(|module| module.libraries.iter().map(move |library| (module, library)))
			.filter(|(_, library)| seen.insert(library.resource_dir.clone()))
			.map(|(module, library)| self.library(library, &module.name))
			.collect()
	}

	/// Repository of the library called `name`.
	pub fn find_library_resources(&self, name: &str) -> Option<Arc<SourceRepository>> {
		let model = self.model.load();
		model.modules.iter().find_map(|module| module.libraries.iter().find(|library| library.name == name).map(|library| self.library(library, &module.name)))
	}

	/// Resource directories of every module, in model order, each once.
	pub fn all_resource_dirs(&self) -> Vec<PathBuf> {
		let model = self.model.load();
		let mut dirs: Vec<PathBuf> = Vec::new();
		for dir in model.modules.iter().flat_map(|module| &module.resource_dirs) {
			if !dirs.contains(dir) {
				dirs.push(dir.clone());
			}
		}
		dirs
	}

	/// Locales of every item visible to `module`'s project resources, sorted.
	pub fn locales_in_project(&self, module: &str) -> Result<Vec<LocaleQualifier>> {
		let project = self.project_resources(module)?;
		let locales: BTreeSet<LocaleQualifier> = project.all_items().iter().filter_map(|item| item.configuration().locale().cloned()).collect();
		Ok(locales.into_iter().collect())
	}

	/// Distinct language codes of [`RepositoryManager::locales_in_project`].
	pub fn languages_in_project(&self, module: &str) -> Result<Vec<String>> {
		let languages: BTreeSet<String> = self.locales_in_project(module)?.iter().map(|locale| locale.language().to_string()).collect();
		Ok(languages.into_iter().collect())
	}

	/// Drops every view and releases this project's folder repositories;
	/// they are rebuilt on next use. Folders another project still owns
	/// stay loaded.
	pub fn reset_resources(&self) {
		*self.facets.lock() = Facets::default();
		let model = self.model.load();
		for module in &model.modules {
			self.registry.dispose_module(&self.owner(&module.name));
		}
		self.registry.dispose_module(&self.owner(FRAMEWORK_OWNER));
		let evicted = self.registry.evict_unowned();
		tracing::debug!(evicted, "resrepo.manager.reset");
		self.router.notify(&[], ChangeReasons::CONFIGURATION_CHANGED);
	}

	/// Replaces the project model. Built views of surviving modules get new
	/// children; views of removed modules are dropped, and so are folders
	/// no project sharing the registry still owns.
	pub fn update_project_model(&self, model: ProjectModel) -> Result<()> {
		model.validate()?;
		let old = self.model.swap(Arc::new(model));
		let model = self.model.load_full();
		let removed: Vec<&str> = old.modules.iter().map(|module| module.name.as_str()).filter(|name| model.module(name).is_err()).collect();
		for name in &removed {
			self.registry.dispose_module(&self.owner(name));
		}

		let built = {
			let mut guard = self.facets.lock();
			let facets = &mut *guard;
			for map in [&mut facets.module, &mut facets.project, &mut facets.app] {
				map.retain(|name, _| model.module(name).is_ok());
			}
			[Facet::Module, Facet::Project, Facet::App].map(|facet| facets.map(facet).iter().map(|(name, view)| (name.clone(), view.clone())).collect::<Vec<_>>())
		};
		let [modules, projects, apps] = built;
		for (name, view) in modules {
			let (local, libraries) = self.module_children(&name)?;
			view.set_children(local, libraries);
		}
		for (name, view) in projects {
			let (local, libraries) = self.project_children(&name)?;
			view.set_children(local, libraries);
		}
		for (name, view) in apps {
			let (local, libraries) = self.app_children(&name)?;
			view.set_children(local, libraries);
		}

		for module in &model.modules {
			self.registry.release(&self.owner(&module.name), &model.dirs_owned_by(&module.name)?);
		}
		self.registry.release(&self.owner(FRAMEWORK_OWNER), &model.framework_dirs());
		let evicted = self.registry.evict_unowned();
		tracing::debug!(modules = model.modules.len(), removed = removed.len(), evicted, "resrepo.manager.model_updated");
		self.router.notify(&[], ChangeReasons::CONFIGURATION_CHANGED);
		Ok(())
	}

	/// Runs every pending rescan of every folder repository.
	pub fn sync(&self) {
		for repo in self.registry.all() {
			repo.sync();
		}
	}
}

type Children = (Vec<Arc<dyn ResourceRepository>>, Vec<Arc<dyn ResourceRepository>>);
