use std::path::{Path, PathBuf};

use bitflags::bitflags;

use crate::live::StructuralEdit;

/// Whole-file or whole-directory change on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
	Created(PathBuf),
	Deleted(PathBuf),
	/// Move or rename.
	Moved { from: PathBuf, to: PathBuf },
}

/// One host notification. Exactly one channel fires per user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
	Fs(FsEvent),
	/// File contents changed and no live document is open for it.
	FileChanged(PathBuf),
	/// A text buffer was edited before any structured view exists.
	BufferEdited(PathBuf),
	/// Fine-grained edit of a live document.
	Structural(StructuralEdit),
}

impl ChangeEvent {
	/// Paths whose ancestors decide which repositories receive the event.
	pub fn paths(&self) -> Vec<&Path> {
		match self {
			Self::Fs(FsEvent::Created(path) | FsEvent::Deleted(path)) | Self::FileChanged(path) | Self::BufferEdited(path) => vec![path.as_path()],
			Self::Fs(FsEvent::Moved { from, to }) => vec![from.as_path(), to.as_path()],
			Self::Structural(edit) => vec![edit.path.as_path()],
		}
	}
}

bitflags! {
	/// Why listeners are being told about a change.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct ChangeReasons: u8 {
		/// Resource items or values changed.
		const RESOURCE_EDIT = 1 << 0;
		/// A resource file was edited without changing any resource.
		const EDIT = 1 << 1;
		/// Resource directories or the module structure changed.
		const CONFIGURATION_CHANGED = 1 << 2;
	}
}
