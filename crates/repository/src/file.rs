use std::path::Path;
use std::sync::Arc;

use resrepo_primitives::{FolderConfiguration, ResourceFolderType, ResourceType};

use crate::item::ResourceItem;
use crate::live::{LiveDocument, TagId};

/// How a file's items were produced.
#[derive(Debug, Clone)]
pub enum FileMode {
	/// Parsed from disk or loaded from the persistent cache.
	Static,
	/// Scanned from an open live document; items are bound to its tags.
	Live(Arc<dyn LiveDocument>),
}

/// One scanned file and the items it contributed, in declaration order.
#[derive(Debug, Clone)]
pub struct ResourceFile {
	pub path: Arc<Path>,
	pub folder_type: ResourceFolderType,
	pub configuration: Arc<FolderConfiguration>,
	pub mode: FileMode,
	pub items: Vec<Arc<ResourceItem>>,
	/// `<public type=".." name=".."/>` declarations of a values file.
	pub public: Vec<(ResourceType, String)>,
	/// The file failed to parse and contributes nothing.
	pub failed: bool,
	/// Whether the file is XML (only XML files count towards cache freshness).
	pub is_xml: bool,
	/// Fingerprint taken before the file was read; `None` for live files.
	pub fingerprint: Option<u64>,
}

impl ResourceFile {
	pub fn document(&self) -> Option<&Arc<dyn LiveDocument>> {
		match &self.mode {
			FileMode::Live(doc) => Some(doc),
			FileMode::Static => None,
		}
	}

	pub fn is_live(&self) -> bool {
		matches!(self.mode, FileMode::Live(_))
	}

	/// Item declared by `tag`, with its index in [`ResourceFile::items`].
	pub fn item_for_tag(&self, tag: TagId) -> Option<(usize, &Arc<ResourceItem>)> {
		self.items.iter().enumerate().find(|(_, item)| item.tag() == Some(tag))
	}

	/// Types contributed by this file.
	pub fn types(&self) -> Vec<ResourceType> {
		let mut types: Vec<_> = self.items.iter().map(|item| item.kind()).collect();
		types.sort();
		types.dedup();
		types
	}
}
