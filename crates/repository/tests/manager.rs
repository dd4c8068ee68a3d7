//! End-to-end tests of the manager facade: layered views, routing of host
//! events, and project model updates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use resrepo::{
	ChangeEvent, ChangeReasons, FolderRegistry, FsEvent, LibrarySpec, ModuleSpec, Namespacing, ProjectModel, RepositoryConfig, RepositoryContext, RepositoryId, RepositoryManager, ResourceChangeListener,
	ResourceRepository,
};
use resrepo_primitives::{ResourceNamespace, ResourceType};
use tempfile::TempDir;

struct Project {
	root: TempDir,
}

impl Project {
	fn new() -> Self {
		let _ = tracing_subscriber::fmt::try_init();
		Self {
			root: tempfile::tempdir().unwrap(),
		}
	}

	fn path(&self, relative: &str) -> PathBuf {
		self.root.path().join(relative)
	}

	fn strings(&self, relative: &str, body: &str) -> PathBuf {
		let path = self.path(relative);
		std::fs::create_dir_all(path.parent().unwrap()).unwrap();
		std::fs::write(&path, format!("<resources>{body}</resources>")).unwrap();
		path
	}

	fn context(&self, namespacing: Namespacing) -> RepositoryContext {
		let mut config = RepositoryConfig::default();
		config.namespacing = namespacing;
		config.cache.directory = Some(self.path("cache"));
		config.cache.background_write = false;
		config.scan.defer_rescans = false;
		RepositoryContext::new(config)
	}

	fn model(&self) -> ProjectModel {
		ProjectModel::new([
			ModuleSpec::new("app")
				.with_package("com.example.app")
				.with_resource_dir(self.path("app/src/debug/res"))
				.with_resource_dir(self.path("app/src/main/res"))
				.with_dependency("core")
				.with_library(LibrarySpec {
					name: "widgets".into(),
					package: Some("com.example.widgets".into()),
					resource_dir: self.path("libs/widgets/res"),
				})
				.with_framework_dir(self.path("sdk/res")),
			ModuleSpec::new("core").with_package("com.example.core").with_resource_dir(self.path("core/src/main/res")),
		])
	}

	fn populate(&self) {
		self.strings("app/src/debug/res/values/strings.xml", r#"<string name="app_name">Debug App</string>"#);
		self.strings("app/src/main/res/values/strings.xml", r#"<string name="app_name">App</string><string name="welcome">Welcome</string>"#);
		self.strings("app/src/main/res/values-fr/strings.xml", r#"<string name="welcome">Bienvenue</string>"#);
		self.strings("core/src/main/res/values/strings.xml", r#"<string name="welcome">Core welcome</string><string name="core_only">Core</string>"#);
		self.strings("core/src/main/res/values-de-rAT/strings.xml", r#"<string name="core_only">Kern</string>"#);
		self.strings("libs/widgets/res/values/strings.xml", r#"<string name="core_only">Library</string><string name="widget_label">Widget</string>"#);
		self.strings("sdk/res/values/strings.xml", r#"<string name="ok">OK</string>"#);
	}
}

fn scalar(repo: &dyn ResourceRepository, name: &str) -> Option<String> {
	let items = repo.items_named(&ResourceNamespace::ResAuto, ResourceType::String, name);
	let item = items.iter().find(|item| item.qualifiers().is_empty())?;
	item.value().as_scalar().map(str::to_string)
}

fn string_names(repo: &dyn ResourceRepository, namespace: &ResourceNamespace) -> Vec<String> {
	let mut names: Vec<String> = repo.items(namespace, ResourceType::String).map(|map| map.keys().cloned().collect()).unwrap_or_default();
	names.sort();
	names
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(Vec<RepositoryId>, ChangeReasons)>>);

impl ResourceChangeListener for Recorder {
	fn resources_changed(&self, repositories: &[RepositoryId], reasons: ChangeReasons) {
		self.0.lock().push((repositories.to_vec(), reasons));
	}
}

#[test]
fn views_layer_module_dependencies_libraries_and_framework() {
	let project = Project::new();
	project.populate();
	let manager = RepositoryManager::new(project.context(Namespacing::Disabled), project.model()).unwrap();
	let ns = ResourceNamespace::ResAuto;

	let module = manager.module_resources("app").unwrap();
	assert_eq!(string_names(module.as_ref(), &ns), ["app_name", "welcome"]);
	assert_eq!(scalar(module.as_ref(), "app_name").as_deref(), Some("Debug App"));

	let project_view = manager.project_resources("app").unwrap();
	assert_eq!(string_names(project_view.as_ref(), &ns), ["app_name", "core_only", "welcome"]);
	assert_eq!(scalar(project_view.as_ref(), "welcome").as_deref(), Some("Welcome"));

	let app = manager.app_resources("app").unwrap();
	assert_eq!(string_names(app.as_ref(), &ns), ["app_name", "core_only", "welcome", "widget_label"]);
	assert_eq!(scalar(app.as_ref(), "core_only").as_deref(), Some("Core"));
	assert_eq!(string_names(app.as_ref(), &ResourceNamespace::Framework), ["ok"]);

	assert!(Arc::ptr_eq(&manager.cached_app_resources("app").unwrap(), &app));
	assert!(manager.cached_app_resources("core").is_none());
	assert!(manager.app_resources("nope").is_err());
}

#[test]
fn shared_directories_are_loaded_once() {
	let project = Project::new();
	project.populate();
	let manager = RepositoryManager::new(project.context(Namespacing::Disabled), project.model()).unwrap();

	manager.app_resources("app").unwrap();
	manager.app_resources("core").unwrap();
	// debug, main, core, widgets, sdk
	assert_eq!(manager.registry().len(), 5);
	assert_eq!(manager.library_resources().len(), 1);
	assert!(manager.find_library_resources("widgets").is_some());
	assert!(manager.find_library_resources("missing").is_none());
	assert_eq!(manager.all_resource_dirs().len(), 3);
}

#[test]
fn locales_cover_the_whole_project() {
	let project = Project::new();
	project.populate();
	let manager = RepositoryManager::new(project.context(Namespacing::Disabled), project.model()).unwrap();

	let tags: Vec<String> = manager.locales_in_project("app").unwrap().iter().map(|locale| locale.language_tag()).collect();
	assert_eq!(tags, ["de-AT", "fr"]);
	assert_eq!(manager.languages_in_project("app").unwrap(), ["de", "fr"]);
}

#[test]
fn namespaced_projects_resolve_packages() {
	let project = Project::new();
	project.populate();
	let manager = RepositoryManager::new(project.context(Namespacing::Required), project.model()).unwrap();

	let core = manager.resources_for_namespace(&ResourceNamespace::Package("com.example.core".into())).unwrap().unwrap();
	assert_eq!(core.namespaces(), [ResourceNamespace::Package("com.example.core".into())]);
	let widgets = manager.resources_for_namespace(&ResourceNamespace::Package("com.example.widgets".into())).unwrap().unwrap();
	assert_eq!(widgets.resource_dirs(), [project.path("libs/widgets/res")]);
	assert!(manager.resources_for_namespace(&ResourceNamespace::Framework).unwrap().is_some());
	assert!(manager.resources_for_namespace(&ResourceNamespace::ResAuto).unwrap().is_none());

	let app = manager.app_resources("app").unwrap();
	let namespaces = app.namespaces();
	assert_eq!(namespaces.len(), 4);
	assert!(namespaces.contains(&ResourceNamespace::Framework));
}

#[test]
fn empty_directory_fills_in_through_routed_events() {
	let project = Project::new();
	let model = ProjectModel::new([ModuleSpec::new("app").with_resource_dir(project.path("app/res"))]);
	let manager = RepositoryManager::new(project.context(Namespacing::Disabled), model).unwrap();
	let recorder = Arc::new(Recorder::default());
	manager.router().add_listener(recorder.clone());

	let module = manager.module_resources("app").unwrap();
	assert!(module.all_items().is_empty());
	let before = module.generation();

	let path = project.strings("app/res/values/strings.xml", r#"<string name="app_name">Foo</string>"#);
	assert_eq!(manager.dispatch(&ChangeEvent::Fs(FsEvent::Created(path))), 1);

	let items = module.all_items();
	assert_eq!(items.len(), 1);
	assert_eq!((items[0].kind(), items[0].name()), (ResourceType::String, "app_name"));
	assert_eq!(items[0].value().as_scalar(), Some("Foo"));
	assert!(module.generation() > before);
	assert_eq!(recorder.0.lock().last().map(|(_, reasons)| *reasons), Some(ChangeReasons::RESOURCE_EDIT));
}

#[test]
fn file_edits_propagate_to_every_view() {
	let project = Project::new();
	project.populate();
	let manager = RepositoryManager::new(project.context(Namespacing::Disabled), project.model()).unwrap();
	let app = manager.app_resources("app").unwrap();
	let before = app.generation();

	let path = project.strings("core/src/main/res/values/strings.xml", r#"<string name="core_only">Core 2</string>"#);
	manager.dispatch(&ChangeEvent::FileChanged(path));
	manager.sync();

	assert!(app.generation() > before);
	assert_eq!(scalar(app.as_ref(), "core_only").as_deref(), Some("Core 2"));
	assert_eq!(scalar(app.as_ref(), "welcome").as_deref(), Some("Welcome"));
}

#[test]
fn model_updates_keep_views_and_evict_folders() {
	let project = Project::new();
	project.populate();
	let manager = RepositoryManager::new(project.context(Namespacing::Disabled), project.model()).unwrap();
	let recorder = Arc::new(Recorder::default());
	manager.router().add_listener(recorder.clone());
	let module = manager.module_resources("app").unwrap();
	manager.app_resources("app").unwrap();
	let before = module.generation();

	let model = ProjectModel::new([ModuleSpec::new("app").with_resource_dir(project.path("app/src/main/res"))]);
	manager.update_project_model(model).unwrap();

	assert!(Arc::ptr_eq(&manager.module_resources("app").unwrap(), &module));
	assert!(module.generation() > before);
	assert_eq!(scalar(module.as_ref(), "app_name").as_deref(), Some("App"));
	assert_eq!(manager.registry().len(), 1);
	assert!(manager.cached_project_resources("core").is_none());
	assert_eq!(recorder.0.lock().last().map(|(_, reasons)| *reasons), Some(ChangeReasons::CONFIGURATION_CHANGED));

	let bad = ProjectModel::new([ModuleSpec::new("app").with_dependency("ghost")]);
	assert!(manager.update_project_model(bad).is_err());
	assert_eq!(manager.project_model().modules[0].resource_dirs, [project.path("app/src/main/res")]);

	manager.reset_resources();
	assert!(manager.registry().is_empty());
	assert!(manager.cached_module_resources("app").is_none());
	assert!(!Arc::ptr_eq(&manager.module_resources("app").unwrap(), &module));
}

#[test]
fn diamond_dependencies_contribute_shared_items_once() {
	let project = Project::new();
	std::fs::create_dir_all(project.path("base/res/layout")).unwrap();
	std::fs::write(
		project.path("base/res/layout/card.xml"),
		r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android"><TextView android:id="@+id/title"/></FrameLayout>"#,
	)
	.unwrap();
	project.strings("base/res/values/attrs.xml", r#"<declare-styleable name="Card"><attr name="elevation" format="dimension"/></declare-styleable>"#);
	project.strings("left/res/values/strings.xml", r#"<string name="left">Left</string>"#);
	project.strings("right/res/values/strings.xml", r#"<string name="right">Right</string>"#);
	let model = ProjectModel::new([
		ModuleSpec::new("app").with_dependency("left").with_dependency("right"),
		ModuleSpec::new("left").with_resource_dir(project.path("left/res")).with_dependency("base"),
		ModuleSpec::new("right").with_resource_dir(project.path("right/res")).with_dependency("base"),
		ModuleSpec::new("base").with_resource_dir(project.path("base/res")),
	]);
	let manager = RepositoryManager::new(project.context(Namespacing::Disabled), model).unwrap();
	let ns = ResourceNamespace::ResAuto;

	let app = manager.app_resources("app").unwrap();
	assert_eq!(app.items_named(&ns, ResourceType::Id, "title").len(), 1);
	assert_eq!(app.items_named(&ns, ResourceType::Styleable, "Card").len(), 1);
	assert_eq!(string_names(app.as_ref(), &ns), ["left", "right"]);
	let left = manager.project_resources("left").unwrap();
	assert_eq!(left.items_named(&ns, ResourceType::Id, "title").len(), 1);
}

#[test]
fn model_updates_keep_folders_other_projects_still_use() {
	let project = Project::new();
	project.populate();
	let registry = Arc::new(FolderRegistry::new(project.context(Namespacing::Disabled)));
	let first = RepositoryManager::with_registry(registry.clone(), project.model()).unwrap();
	let second = RepositoryManager::with_registry(registry.clone(), project.model()).unwrap();
	first.app_resources("app").unwrap();
	first.app_resources("core").unwrap();
	let app = second.app_resources("app").unwrap();
	assert_eq!(registry.len(), 5);

	first.update_project_model(ProjectModel::new([ModuleSpec::new("app").with_resource_dir(project.path("app/src/main/res"))])).unwrap();
	assert_eq!(registry.len(), 5);
	let widgets = project.path("libs/widgets/res");
	assert_eq!(registry.owners(&widgets, &ResourceNamespace::ResAuto, Namespacing::Disabled).len(), 1);

	let path = project.strings("libs/widgets/res/values/more.xml", r#"<string name="late_widget">Late</string>"#);
	assert_eq!(second.dispatch(&ChangeEvent::Fs(FsEvent::Created(path))), 1);
	assert!(string_names(app.as_ref(), &ResourceNamespace::ResAuto).contains(&"late_widget".to_string()));

	second.reset_resources();
	assert_eq!(registry.len(), 1);
	assert!(registry.get_cached(&project.path("app/src/main/res"), &ResourceNamespace::ResAuto, Namespacing::Disabled).is_some());
	first.reset_resources();
	assert!(registry.is_empty());
}

#[test]
fn cold_start_reuses_the_persistent_cache() {
	let project = Project::new();
	project.populate();
	let first = RepositoryManager::new(project.context(Namespacing::Disabled), project.model()).unwrap();
	let expected = string_names(first.app_resources("app").unwrap().as_ref(), &ResourceNamespace::ResAuto);
	drop(first);

	let second = RepositoryManager::new(project.context(Namespacing::Disabled), project.model()).unwrap();
	let app = second.app_resources("app").unwrap();
	assert_eq!(string_names(app.as_ref(), &ResourceNamespace::ResAuto), expected);
	let cached = second.registry().all().iter().filter(|repo| repo.loaded_from_cache()).count();
	assert_eq!(cached, 5);
	assert!(Path::new(&project.path("cache")).is_dir());
}
