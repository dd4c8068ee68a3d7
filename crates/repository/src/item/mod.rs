//! Resource items.
//!
//! # Mental model
//!
//! * Identity (`namespace`, `kind`, `name`, configuration, source) is fixed at
//!   construction. Renaming an item means replacing it.
//! * The value is computed lazily from the item's [`ItemBody`] and cached
//!   inside the item until [`ResourceItem::invalidate_value`] clears it.
//! * A body is either a detached element ([`ItemBody::Static`], from a file
//!   parse or the persistent cache) or a handle into a live document
//!   ([`ItemBody::Live`]). Static items never observe edits; the owning file
//!   must be rescanned in live mode first.

mod value;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use resrepo_primitives::{FolderConfiguration, ResourceNamespace, ResourceType};

pub use self::value::{AttrFormats, AttrValue, ResourceValue, StyleItem, StyleValue, parse_value, unescape_string};
use crate::live::{LiveDocument, TagId};
use crate::xml::XmlElement;

/// Where an item was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSource {
	pub file: Arc<Path>,
	/// Declaring tag, for items scanned from a live document.
	pub tag: Option<TagId>,
}

/// Handle to a tag in a live document.
#[derive(Clone)]
pub struct LiveTag {
	pub document: Arc<dyn LiveDocument>,
	pub tag: TagId,
}

impl fmt::Debug for LiveTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LiveTag")
			.field("document", &self.document.path())
			.field("tag", &self.tag)
			.finish()
	}
}

/// Backing node of an item.
#[derive(Debug, Clone)]
pub enum ItemBody {
	/// Detached element; `None` for file resources and inline ids.
	Static(Option<Arc<XmlElement>>),
	Live(LiveTag),
}

impl ItemBody {
	pub fn is_live(&self) -> bool {
		matches!(self, Self::Live(_))
	}

	/// Current element, read from the live document when live.
	pub fn element(&self) -> Option<Arc<XmlElement>> {
		match self {
			Self::Static(element) => element.clone(),
			Self::Live(live) => live.document.snapshot(live.tag).map(Arc::new),
		}
	}
}

/// One resource declaration.
pub struct ResourceItem {
	namespace: ResourceNamespace,
	kind: ResourceType,
	name: String,
	configuration: Arc<FolderConfiguration>,
	source: Option<ItemSource>,
	body: ItemBody,
	value: Mutex<Option<Arc<ResourceValue>>>,
}

impl fmt::Debug for ResourceItem {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResourceItem")
			.field("namespace", &self.namespace)
			.field("kind", &self.kind)
			.field("name", &self.name)
			.field("qualifiers", &self.configuration.qualifier_string())
			.field("source", &self.source)
			.field("live", &self.body.is_live())
			.finish()
	}
}

impl ResourceItem {
	pub fn new(
		namespace: ResourceNamespace,
		kind: ResourceType,
		name: impl Into<String>,
		configuration: Arc<FolderConfiguration>,
		source: Option<ItemSource>,
		body: ItemBody,
	) -> Self {
		Self {
			namespace,
			kind,
			name: name.into(),
			configuration,
			source,
			body,
			value: Mutex::new(None),
		}
	}

	/// Item with no source file, e.g. one created programmatically.
	pub fn synthetic(namespace: ResourceNamespace, kind: ResourceType, name: impl Into<String>, element: Option<XmlElement>) -> Self {
		Self::new(namespace, kind, name, Arc::default(), None, ItemBody::Static(element.map(Arc::new)))
	}

	/// Same declaration under a different name.
	pub fn renamed(&self, name: impl Into<String>) -> Self {
		Self::new(self.namespace.clone(), self.kind, name, self.configuration.clone(), self.source.clone(), self.body.clone())
	}

	pub fn namespace(&self) -> &ResourceNamespace {
		&self.namespace
	}

	pub fn kind(&self) -> ResourceType {
		self.kind
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn configuration(&self) -> &Arc<FolderConfiguration> {
		&self.configuration
	}

	pub fn qualifiers(&self) -> &str {
		self.configuration.qualifier_string()
	}

	pub fn source(&self) -> Option<&ItemSource> {
		self.source.as_ref()
	}

	pub fn file(&self) -> Option<&Path> {
		self.source.as_ref().map(|source| &*source.file)
	}

	pub fn tag(&self) -> Option<TagId> {
		self.source.as_ref().and_then(|source| source.tag)
	}

	pub fn body(&self) -> &ItemBody {
		&self.body
	}

	/// Shadowing key used when merging repositories.
	pub fn override_key(&self) -> (&str, &str) {
		(&self.name, self.qualifiers())
	}

	/// Computed value, cached until invalidated.
	pub fn value(&self) -> Arc<ResourceValue> {
		let mut cached = self.value.lock();
		if let Some(value) = cached.as_ref() {
			return value.clone();
		}
		let element = self.body.element();
		let value = Arc::new(parse_value(self.kind, &self.name, element.as_deref(), self.file()));
		*cached = Some(value.clone());
		value
	}

	/// Whether a computed value is currently cached.
	pub fn has_cached_value(&self) -> bool {
		self.value.lock().is_some()
	}

	/// Drops the cached value. Returns whether one was cached.
	pub fn invalidate_value(&self) -> bool {
		self.value.lock().take().is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::live::SharedDocument;

	#[test]
	fn value_is_cached_until_invalidated() {
		let item = ResourceItem::synthetic(ResourceNamespace::ResAuto, ResourceType::String, "a", Some(XmlElement::new("string").with_text("x")));
		assert!(!item.has_cached_value());
		assert!(!item.invalidate_value());
		assert_eq!(item.value().as_scalar(), Some("x"));
		assert!(item.has_cached_value());
		assert!(item.invalidate_value());
		assert!(!item.has_cached_value());
	}

	#[test]
	fn live_items_read_current_document_content() {
		let doc = Arc::new(SharedDocument::new(
			"/res/values/strings.xml",
			XmlElement::new("resources").with_child(XmlElement::new("string").with_attr("name", "a").with_text("old")),
		));
		let tag = doc.find(|name, _| name == "string").unwrap();
		let item = ResourceItem::new(
			ResourceNamespace::ResAuto,
			ResourceType::String,
			"a",
			Arc::default(),
			Some(ItemSource {
				file: Arc::from(Path::new("/res/values/strings.xml")),
				tag: Some(tag),
			}),
			ItemBody::Live(LiveTag {
				document: doc.clone(),
				tag,
			}),
		);
		assert_eq!(item.value().as_scalar(), Some("old"));
		doc.set_text(tag, "new").unwrap();
		assert_eq!(item.value().as_scalar(), Some("old"));
		assert!(item.invalidate_value());
		assert_eq!(item.value().as_scalar(), Some("new"));
	}

	#[test]
	fn renamed_keeps_source_and_configuration() {
		let config = Arc::new(FolderConfiguration::parse("fr").unwrap());
		let item = ResourceItem::new(ResourceNamespace::ResAuto, ResourceType::Id, "old", config, None, ItemBody::Static(None));
		let renamed = item.renamed("new");
		assert_eq!(renamed.name(), "new");
		assert_eq!(renamed.override_key(), ("new", "fr"));
	}
}
