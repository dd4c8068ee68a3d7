use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::UNIX_EPOCH;

use rustc_hash::FxHasher;

/// Stable content fingerprint of a file, used to validate cache entries.
pub trait Fingerprinter: Send + Sync {
	/// `None` when the file cannot be inspected (missing, permission denied).
	fn fingerprint(&self, path: &Path) -> Option<u64>;
}

/// Hash of the file's modification time and length.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFingerprinter;

impl Fingerprinter for FsFingerprinter {
	fn fingerprint(&self, path: &Path) -> Option<u64> {
		let meta = std::fs::metadata(path).ok()?;
		let modified = meta.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
		let mut hasher = FxHasher::default();
		modified.as_nanos().hash(&mut hasher);
		meta.len().hash(&mut hasher);
		Some(hasher.finish())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fingerprint_tracks_length() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("strings.xml");
		std::fs::write(&path, "a").unwrap();
		let first = FsFingerprinter.fingerprint(&path).unwrap();
		assert_eq!(FsFingerprinter.fingerprint(&path), Some(first));
		std::fs::write(&path, "ab").unwrap();
		assert_ne!(FsFingerprinter.fingerprint(&path), Some(first));
		assert_eq!(FsFingerprinter.fingerprint(&dir.path().join("missing.xml")), None);
	}
}
