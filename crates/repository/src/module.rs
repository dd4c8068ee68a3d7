//! Project model consumed by the [`crate::RepositoryManager`].
//!
//! The host describes its modules once and replaces the whole model when
//! the project structure changes. A model can also be read from TOML:
//!
//! ```toml
//! [[modules]]
//! name = "app"
//! package = "com.example.app"
//! resource_dirs = ["app/src/debug/res", "app/src/main/res"]
//! dependencies = ["core"]
//! framework_dir = "sdk/platforms/android-34/data/res"
//!
//! [[modules.libraries]]
//! name = "appcompat"
//! package = "androidx.appcompat"
//! resource_dir = "libs/appcompat/res"
//! ```

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RepositoryError, Result};

/// An unpacked library with its own resource directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibrarySpec {
	pub name: String,
	#[serde(default)]
	pub package: Option<String>,
	pub resource_dir: PathBuf,
}

/// One module of the project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleSpec {
	pub name: String,
	pub package: Option<String>,
	/// Highest priority first: a directory overrides the ones after it.
	pub resource_dirs: Vec<PathBuf>,
	/// Names of modules whose resources this module sees, highest priority
	/// first.
	pub dependencies: Vec<String>,
	pub libraries: Vec<LibrarySpec>,
	pub framework_dir: Option<PathBuf>,
}

impl ModuleSpec {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn with_package(mut self, package: impl Into<String>) -> Self {
		self.package = Some(package.into());
		self
	}

	pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.resource_dirs.push(dir.into());
		self
	}

	pub fn with_dependency(mut self, module: impl Into<String>) -> Self {
		self.dependencies.push(module.into());
		self
	}

	pub fn with_library(mut self, library: LibrarySpec) -> Self {
		self.libraries.push(library);
		self
	}

	pub fn with_framework_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.framework_dir = Some(dir.into());
		self
	}
}

/// Every module of a project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectModel {
	pub modules: Vec<ModuleSpec>,
}

impl ProjectModel {
	pub fn new(modules: impl IntoIterator<Item = ModuleSpec>) -> Self {
		Self { modules: modules.into_iter().collect() }
	}

	pub fn from_toml(text: &str) -> Result<Self> {
		let model: Self = toml::from_str(text).map_err(ConfigError::from)?;
		model.validate()?;
		Ok(model)
	}

	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml(&text)
	}

	pub fn module(&self, name: &str) -> Result<&ModuleSpec> {
		self.modules.iter().find(|module| module.name == name).ok_or_else(|| RepositoryError::UnknownModule(name.to_string()))
	}

	/// `name` followed by its transitive dependencies, each once, in
	/// priority order.
	pub fn with_dependencies(&self, name: &str) -> Result<Vec<&ModuleSpec>> {
		let mut order = Vec::new();
		let mut seen = FxHashSet::default();
		let mut stack = vec![self.module(name)?];
		while let Some(module) = stack.pop() {
			if !seen.insert(module.name.as_str()) {
				continue;
			}
			order.push(module);
			for dependency in module.dependencies.iter().rev() {
				stack.push(self.module(dependency)?);
			}
		}
		Ok(order)
	}

	/// Libraries of `name` and its transitive dependencies, each directory
	/// once.
	pub fn libraries_of(&self, name: &str) -> Result<Vec<&LibrarySpec>> {
		let mut seen = FxHashSet::default();
		Ok(self.with_dependencies(name)?.into_iter().flat_map(|module| &module.libraries).filter(|library| seen.insert(library.resource_dir.as_path())).collect())
	}

	/// Directories the views of `name` request for it: its own resource
	/// directories and every library visible to it.
	pub fn dirs_owned_by(&self, name: &str) -> Result<FxHashSet<PathBuf>> {
		let module = self.module(name)?;
		let mut dirs: FxHashSet<PathBuf> = module.resource_dirs.iter().cloned().collect();
		dirs.extend(self.libraries_of(name)?.into_iter().map(|library| library.resource_dir.clone()));
		Ok(dirs)
	}

	/// Framework directories of every module.
	pub fn framework_dirs(&self) -> FxHashSet<PathBuf> {
		self.modules.iter().filter_map(|module| module.framework_dir.clone()).collect()
	}

	/// Checks that every dependency names a module and that dependencies
	/// form no cycle.
	pub fn validate(&self) -> Result<()> {
		#[derive(Clone, Copy, PartialEq)]
		enum Mark {
			Visiting,
			Done,
		}

		fn visit<'a>(model: &'a ProjectModel, module: &'a ModuleSpec, marks: &mut FxHashMap<&'a str, Mark>) -> Result<()> {
			match marks.get(module.name.as_str()) {
				Some(Mark::Done) => return Ok(()),
				Some(Mark::Visiting) => return Err(RepositoryError::DependencyCycle(module.name.clone())),
				None => {}
			}
			marks.insert(module.name.as_str(), Mark::Visiting);
			for dependency in &module.dependencies {
				visit(model, model.module(dependency)?, marks)?;
			}
			marks.insert(module.name.as_str(), Mark::Done);
			Ok(())
		}

		let mut marks = FxHashMap::default();
		for module in &self.modules {
			visit(self, module, &mut marks)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn model() -> ProjectModel {
		ProjectModel::new([
			ModuleSpec::new("app").with_dependency("feature").with_dependency("core").with_library(LibrarySpec {
				name: "appcompat".into(),
				package: None,
				resource_dir: "libs/appcompat".into(),
			}),
			ModuleSpec::new("feature").with_dependency("core"),
			ModuleSpec::new("core").with_library(LibrarySpec {
				name: "appcompat".into(),
				package: None,
				resource_dir: "libs/appcompat".into(),
			}),
		])
	}

	#[test]
	fn dependencies_are_visited_once_in_priority_order() {
		let model = model();
		let order: Vec<&str> = model.with_dependencies("app").unwrap().iter().map(|module| module.name.as_str()).collect();
		assert_eq!(order, ["app", "feature", "core"]);
		assert_eq!(model.libraries_of("app").unwrap().len(), 1);
		assert!(model.validate().is_ok());
	}

	#[test]
	fn cycles_and_unknown_modules_are_rejected() {
		let cyclic = ProjectModel::new([ModuleSpec::new("a").with_dependency("b"), ModuleSpec::new("b").with_dependency("a")]);
		assert!(matches!(cyclic.validate(), Err(RepositoryError::DependencyCycle(_))));

		let dangling = ProjectModel::new([ModuleSpec::new("a").with_dependency("missing")]);
		assert!(matches!(dangling.validate(), Err(RepositoryError::UnknownModule(name)) if name == "missing"));
	}

	#[test]
	fn model_reads_from_toml() {
		let model = ProjectModel::from_toml(
			r#"
[[modules]]
name = "app"
package = "com.example.app"
resource_dirs = ["app/src/debug/res", "app/src/main/res"]
framework_dir = "sdk/res"

[[modules.libraries]]
name = "appcompat"
resource_dir = "libs/appcompat/res"
"#,
		)
		.unwrap();
		let app = model.module("app").unwrap();
		assert_eq!(app.resource_dirs.len(), 2);
		assert_eq!(app.libraries[0].name, "appcompat");
		assert_eq!(model.dirs_owned_by("app").unwrap().len(), 3);
		assert_eq!(model.framework_dirs().len(), 1);
		assert!(matches!(ProjectModel::from_toml("[[modules]]\nbogus = 1"), Err(RepositoryError::Config(_))));
	}
}
