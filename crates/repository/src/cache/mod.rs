//! Persistent repository cache.
//!
//! # Purpose
//!
//! * Speeds up cold start: a [`crate::SourceRepository`] whose directory
//!   has not changed since the last run rebuilds its table from one binary
//!   file instead of parsing every XML file.
//!
//! # Mental model
//!
//! * One cache file per (directory, namespace), named by a hash of both.
//! * The header pins the directory, tool version and item format. Any
//!   mismatch, including a filename hash collision between two directories,
//!   is a cache miss.
//! * Every backing file carries a fingerprint. Readers check fingerprints
//!   file by file, so one edited file only costs a re-parse of that file.
//!
//! # Failure semantics
//!
//! Reading never fails loudly: any error is a miss, logged at debug. Writing
//! is atomic (temp file in the target directory, fsync, rename); failures
//! are logged at warn and the temp file is removed.

mod fingerprint;
mod format;

use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};

use resrepo_primitives::ResourceNamespace;
use rustc_hash::FxHasher;

pub use self::fingerprint::{Fingerprinter, FsFingerprinter};
pub use self::format::{CacheHeader, CachePayload, CachedFile, CachedItem, CachedName, CachedType, FORMAT_VERSION, MAGIC, SCHEMA_VERSION, decode_header, decode_payload, encode};
use crate::error::CacheError;

/// Cache file for `directory` inside `cache_dir`.
pub fn cache_file_path(cache_dir: &Path, directory: &Path, namespace: &ResourceNamespace) -> PathBuf {
	let mut hasher = FxHasher::default();
	directory.hash(&mut hasher);
	namespace.hash(&mut hasher);
	cache_dir.join(format!("{:016x}.bin", hasher.finish()))
}

/// Reads the cache at `path` if its header matches `expected`.
pub fn read(path: &Path, expected: &CacheHeader) -> Option<CachePayload> {
	let data = match std::fs::read(path) {
		Ok(data) => data,
		Err(error) => {
			tracing::debug!(path = %path.display(), %error, "resrepo.cache.miss");
			return None;
		}
	};
	let result = decode_header(&data).and_then(|(header, rest)| {
		if header != *expected {
			return Err(CacheError::HeaderMismatch);
		}
		decode_payload(rest)
	});
	match result {
		Ok(payload) => {
			tracing::debug!(path = %path.display(), files = payload.files.len(), "resrepo.cache.hit");
			Some(payload)
		}
		Err(error) => {
			tracing::debug!(path = %path.display(), %error, "resrepo.cache.rejected");
			None
		}
	}
}

/// Atomically replaces the cache at `path`.
pub fn write(path: &Path, header: &CacheHeader, payload: &CachePayload) -> Result<(), CacheError> {
	let bytes = encode(header, payload)?;
	let parent = path.parent().unwrap_or(Path::new("."));
	let io = |error| CacheError::Io { path: path.to_path_buf(), error };
	std::fs::create_dir_all(parent).map_err(io)?;
	// Dropping the temp file on an early return deletes it.
	let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io)?;
	temp.write_all(&bytes).map_err(io)?;
	temp.as_file().sync_all().map_err(io)?;
	temp.persist(path).map_err(|failed| CacheError::Persist {
		path: path.to_path_buf(),
		error: failed.error,
	})?;
	tracing::debug!(path = %path.display(), bytes = bytes.len(), files = payload.files.len(), "resrepo.cache.written");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn file_name_depends_on_directory_and_namespace() {
		let cache = Path::new("/cache");
		let a = cache_file_path(cache, Path::new("/p/app/res"), &ResourceNamespace::ResAuto);
		let b = cache_file_path(cache, Path::new("/p/lib/res"), &ResourceNamespace::ResAuto);
		let c = cache_file_path(cache, Path::new("/p/app/res"), &ResourceNamespace::package("com.example"));
		assert_ne!(a, b);
		assert_ne!(a, c);
		assert_eq!(a, cache_file_path(cache, Path::new("/p/app/res"), &ResourceNamespace::ResAuto));
		assert_eq!(a.extension().and_then(|e| e.to_str()), Some("bin"));
	}

	#[test]
	fn header_for_another_directory_is_a_miss() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cache.bin");
		let header = CacheHeader::new(PathBuf::from("/p/app/res"), "1.0", ResourceNamespace::ResAuto);
		write(&path, &header, &CachePayload::default()).unwrap();
		assert_eq!(read(&path, &header), Some(CachePayload::default()));

		let collided = CacheHeader::new(PathBuf::from("/p/other/res"), "1.0", ResourceNamespace::ResAuto);
		assert_eq!(read(&path, &collided), None);
		let upgraded = CacheHeader::new(PathBuf::from("/p/app/res"), "2.0", ResourceNamespace::ResAuto);
		assert_eq!(read(&path, &upgraded), None);
	}

	#[test]
	fn write_leaves_no_temp_files() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("cache.bin");
		let header = CacheHeader::new(PathBuf::from("/p/app/res"), "1.0", ResourceNamespace::ResAuto);
		write(&path, &header, &CachePayload::default()).unwrap();
		write(&path, &header, &CachePayload::default()).unwrap();
		let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
		assert_eq!(entries.len(), 1);
	}
}
