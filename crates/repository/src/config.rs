//! Repository configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields a usable configuration:
//!
//! ```toml
//! tool_version = "1.4.0"
//! namespacing = "disabled"
//!
//! [cache]
//! enabled = true
//! directory = "/var/cache/resrepo"
//! freshness_threshold = 0.05
//! background_write = true
//!
//! [scan]
//! defer_rescans = true
//! idle_mode = "manual"
//! ```

use std::path::{Path, PathBuf};

use resrepo_worker::IdleMode;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Whether resources are partitioned by package namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespacing {
	/// Application and library resources share [`resrepo_primitives::ResourceNamespace::ResAuto`].
	#[default]
	Disabled,
	/// Each package gets its own namespace.
	Required,
}

/// Persistent cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
	pub enabled: bool,
	/// Directory holding cache files. Defaults to `<tmp>/resrepo-cache`.
	pub directory: Option<PathBuf>,
	/// Largest fraction of XML files parsed from source for which the cache
	/// still counts as fresh and is not rewritten.
	pub freshness_threshold: f64,
	/// Write caches on the blocking pool instead of the calling thread.
	pub background_write: bool,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			directory: None,
			freshness_threshold: 0.05,
			background_write: true,
		}
	}
}

impl CacheConfig {
	pub fn directory(&self) -> PathBuf {
		self.directory.clone().unwrap_or_else(|| std::env::temp_dir().join("resrepo-cache"))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleModeConfig {
	#[default]
	Manual,
	Background,
}

impl From<IdleModeConfig> for IdleMode {
	fn from(mode: IdleModeConfig) -> Self {
		match mode {
			IdleModeConfig::Manual => IdleMode::Manual,
			IdleModeConfig::Background => IdleMode::Background,
		}
	}
}

/// Rescan scheduling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
	/// Queue file rescans for the next idle point instead of running them
	/// inside the notification that caused them.
	pub defer_rescans: bool,
	pub idle_mode: IdleModeConfig,
}

impl Default for ScanConfig {
	fn default() -> Self {
		Self {
			defer_rescans: true,
			idle_mode: IdleModeConfig::Manual,
		}
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
	/// Version of the host tool. Part of every cache header, so an upgrade
	/// invalidates old caches.
	pub tool_version: String,
	pub namespacing: Namespacing,
	pub cache: CacheConfig,
	pub scan: ScanConfig,
}

impl Default for RepositoryConfig {
	fn default() -> Self {
		Self {
			tool_version: env!("CARGO_PKG_VERSION").to_string(),
			namespacing: Namespacing::default(),
			cache: CacheConfig::default(),
			scan: ScanConfig::default(),
		}
	}
}

impl RepositoryConfig {
	pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml(&text)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let threshold = self.cache.freshness_threshold;
		if !(0.0..=1.0).contains(&threshold) {
			return Err(ConfigError::Invalid {
				field: "cache.freshness_threshold",
				message: format!("{threshold} is outside 0.0..=1.0"),
			});
		}
		if self.tool_version.is_empty() {
			return Err(ConfigError::Invalid {
				field: "tool_version",
				message: "must not be empty".to_string(),
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_document_uses_defaults() {
		let config = RepositoryConfig::from_toml("").unwrap();
		assert_eq!(config, RepositoryConfig::default());
		assert_eq!(config.cache.freshness_threshold, 0.05);
		assert!(config.scan.defer_rescans);
	}

	#[test]
	fn sections_override_defaults() {
		let config = RepositoryConfig::from_toml(
			r#"
tool_version = "9.9"
namespacing = "required"

[cache]
enabled = false
freshness_threshold = 0.2

[scan]
idle_mode = "background"
"#,
		)
		.unwrap();
		assert_eq!(config.tool_version, "9.9");
		assert_eq!(config.namespacing, Namespacing::Required);
		assert!(!config.cache.enabled);
		assert_eq!(config.cache.freshness_threshold, 0.2);
		assert!(config.cache.background_write);
		assert_eq!(IdleMode::from(config.scan.idle_mode), IdleMode::Background);
	}

	#[test]
	fn rejects_out_of_range_threshold_and_unknown_keys() {
		let err = RepositoryConfig::from_toml("[cache]\nfreshness_threshold = 1.5").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid { field: "cache.freshness_threshold", .. }));
		assert!(matches!(RepositoryConfig::from_toml("bogus = 1"), Err(ConfigError::Toml(_))));
	}

	#[test]
	fn load_reports_missing_file() {
		let err = RepositoryConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}
}
