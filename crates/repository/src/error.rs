//! Error types.
//!
//! Data-shape failures (a malformed file, a stale cache) are absorbed at the
//! repository boundary: parse errors go to the [`crate::ProblemSink`], cache
//! errors to the log. Only configuration and project-model errors reach
//! callers.

use std::path::PathBuf;

use thiserror::Error;

use crate::live::TagId;

/// Failure to turn file contents into an element tree.
#[derive(Debug, Error)]
pub enum ParseError {
	#[error("I/O error reading {path}: {error}")]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},

	#[error("{path} is not valid UTF-8")]
	Encoding { path: PathBuf },

	#[error("malformed XML in {path}: {message}")]
	Xml { path: PathBuf, message: String },
}

impl ParseError {
	pub fn path(&self) -> &std::path::Path {
		match self {
			Self::Io { path, .. } | Self::Encoding { path } | Self::Xml { path, .. } => path,
		}
	}
}

/// Failure to read or write a persistent cache file.
#[derive(Debug, Error)]
pub enum CacheError {
	#[error("I/O error on cache file {path}: {error}")]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},

	#[error("cache encoding failed: {0}")]
	Encode(#[from] postcard::Error),

	/// The temp file is already deleted when this is returned.
	#[error("failed to move cache file into place at {path}: {error}")]
	Persist { path: PathBuf, error: std::io::Error },

	#[error("cache header mismatch")]
	HeaderMismatch,
}

/// Failure to load a [`crate::RepositoryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("I/O error reading {path}: {error}")]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},

	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("invalid value for {field}: {message}")]
	Invalid { field: &'static str, message: String },
}

/// Failure to edit a live document.
#[derive(Debug, Error)]
pub enum DocumentError {
	#[error("no tag {0:?} in document")]
	UnknownTag(TagId),

	#[error("document has no root element")]
	NoRoot,

	#[error("cannot move a tag into its own subtree")]
	Cycle,

	#[error("I/O error on {path}: {error}")]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},

	#[error(transparent)]
	Parse(#[from] ParseError),
}

/// Failure reported by the [`crate::RepositoryManager`].
#[derive(Debug, Error)]
pub enum RepositoryError {
	#[error("unknown module: {0}")]
	UnknownModule(String),

	#[error("module dependency cycle through {0}")]
	DependencyCycle(String),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Result type for manager operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
