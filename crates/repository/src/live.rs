//! Live editable documents.
//!
//! # Mental model
//!
//! * A live document is an editable element tree whose tags carry stable
//!   [`TagId`]s. Items scanned from a live document are bound to their tag,
//!   which is how incremental updates find them again while their content
//!   (including the `name` attribute) is being edited.
//! * Every mutation of a [`SharedDocument`] returns the [`StructuralEdit`]
//!   describing it. The host feeds those edits to the change router.
//! * [`DocumentStore`] is the in-process [`DocumentProvider`]: it opens files
//!   into live documents and saves them back.
//!
//! # Invariants
//!
//! * A `TagId` is never reused within one document, including after removal.
//! * Text runs are kept as written; whitespace handling belongs to value
//!   parsing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::DocumentError;
use crate::xml::{ResourceParser, XmlAttribute, XmlElement, XmlNode};

/// Structural identity of a tag inside one live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(u64);

impl TagId {
	pub const fn raw(self) -> u64 {
		self.0
	}
}

/// Shape of one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
	TagAdded { parent: TagId, tag: TagId },
	/// `subtree` lists the removed tag and every descendant.
	TagRemoved {
		parent: TagId,
		tag: TagId,
		subtree: Vec<TagId>,
	},
	TagMoved { tag: TagId, from: TagId, to: TagId },
	AttributeChanged {
		tag: TagId,
		name: String,
		old: Option<String>,
		new: Option<String>,
	},
	TextChanged { tag: TagId, old: String, new: String },
	CommentChanged { parent: TagId },
	/// The whole document was replaced.
	Reloaded,
}

/// One fine-grained edit of a live document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralEdit {
	pub path: PathBuf,
	pub kind: EditKind,
}

impl StructuralEdit {
	/// Whether the edit only touched whitespace between tags.
	pub fn is_whitespace_only(&self) -> bool {
		match &self.kind {
			EditKind::TextChanged { old, new, .. } => old.trim().is_empty() && new.trim().is_empty(),
			_ => false,
		}
	}
}

/// Read access to a live document.
pub trait LiveDocument: Send + Sync + fmt::Debug {
	fn path(&self) -> &Path;
	fn root(&self) -> Option<TagId>;
	fn contains(&self, tag: TagId) -> bool;
	fn tag_name(&self, tag: TagId) -> Option<String>;
	fn attribute(&self, tag: TagId, name: &str) -> Option<String>;
	fn attributes(&self, tag: TagId) -> Vec<XmlAttribute>;
	fn parent(&self, tag: TagId) -> Option<TagId>;
	fn child_tags(&self, tag: TagId) -> Vec<TagId>;
	/// Detached copy of `tag` and its subtree.
	fn snapshot(&self, tag: TagId) -> Option<XmlElement>;
	/// Number of edits applied since the document was opened.
	fn revision(&self) -> u64;
}

/// Source of live documents for files that are open for editing.
pub trait DocumentProvider: Send + Sync {
	fn live_document(&self, path: &Path) -> Option<Arc<dyn LiveDocument>>;
}

#[derive(Debug, Clone)]
enum LiveChild {
	Tag(TagId),
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone)]
struct LiveElement {
	name: String,
	attributes: Vec<XmlAttribute>,
	children: Vec<LiveChild>,
	parent: Option<TagId>,
}

#[derive(Debug, Default)]
struct DocumentTree {
	nodes: FxHashMap<TagId, LiveElement>,
	root: Option<TagId>,
	next_id: u64,
	revision: u64,
	dirty: bool,
}

impl DocumentTree {
	fn alloc(&mut self) -> TagId {
		self.next_id += 1;
		TagId(self.next_id)
	}

	fn build(&mut self, element: XmlElement, parent: Option<TagId>) -> TagId {
		let id = self.alloc();
		let mut children = Vec::with_capacity(element.children.len());
		for child in element.children {
			children.push(match child {
				XmlNode::Element(child) => LiveChild::Tag(self.build(child, Some(id))),
				XmlNode::Text(text) => LiveChild::Text(text),
			});
		}
		self.nodes.insert(
			id,
			LiveElement {
				name: element.name,
				attributes: element.attributes,
				children,
				parent,
			},
		);
		id
	}

	fn node(&self, tag: TagId) -> Result<&LiveElement, DocumentError> {
		self.nodes.get(&tag).ok_or(DocumentError::UnknownTag(tag))
	}

	fn node_mut(&mut self, tag: TagId) -> Result<&mut LiveElement, DocumentError> {
		self.nodes.get_mut(&tag).ok_or(DocumentError::UnknownTag(tag))
	}

	fn snapshot(&self, tag: TagId) -> Option<XmlElement> {
		let node = self.nodes.get(&tag)?;
		let mut element = XmlElement::new(node.name.clone());
		element.attributes = node.attributes.clone();
		for child in &node.children {
			match child {
				LiveChild::Tag(id) => element.children.extend(self.snapshot(*id).map(XmlNode::Element)),
				LiveChild::Text(text) => match element.children.last_mut() {
					Some(XmlNode::Text(previous)) => previous.push_str(text),
					_ => element.children.push(XmlNode::Text(text.clone())),
				},
				LiveChild::Comment(_) => {}
			}
		}
		Some(element)
	}

	fn subtree(&self, tag: TagId, out: &mut Vec<TagId>) {
		out.push(tag);
		if let Some(node) = self.nodes.get(&tag) {
			for child in &node.children {
				if let LiveChild::Tag(id) = child {
					self.subtree(*id, out);
				}
			}
		}
	}

	/// Child index at which to insert before the `index`-th child tag.
	fn slot_for(node: &LiveElement, index: Option<usize>) -> usize {
		let Some(index) = index else {
			return node.children.len();
		};
		node.children
			.iter()
			.enumerate()
			.filter(|(_, child)| matches!(child, LiveChild::Tag(_)))
			.nth(index)
			.map_or(node.children.len(), |(slot, _)| slot)
	}

	fn detach(&mut self, tag: TagId) -> Result<TagId, DocumentError> {
		let parent = self.node(tag)?.parent.ok_or(DocumentError::NoRoot)?;
		self.node_mut(parent)?.children.retain(|child| !matches!(child, LiveChild::Tag(id) if *id == tag));
		Ok(parent)
	}

	fn touch(&mut self) {
		self.revision += 1;
		self.dirty = true;
	}
}

/// Editable document shared between the host and the repositories.
#[derive(Debug)]
pub struct SharedDocument {
	path: PathBuf,
	tree: RwLock<DocumentTree>,
}

impl SharedDocument {
	pub fn new(path: impl Into<PathBuf>, root: XmlElement) -> Self {
		let mut tree = DocumentTree::default();
		let id = tree.build(root, None);
		tree.root = Some(id);
		Self {
			path: path.into(),
			tree: RwLock::new(tree),
		}
	}

	fn edit(&self, kind: EditKind) -> StructuralEdit {
		tracing::trace!(path = %self.path.display(), kind = ?kind, "resrepo.document.edit");
		StructuralEdit { path: self.path.clone(), kind }
	}

	pub fn is_dirty(&self) -> bool {
		self.tree.read().dirty
	}

	/// Inserts `element` under `parent`, before the `index`-th child tag or
	/// at the end.
	pub fn insert(&self, parent: TagId, index: Option<usize>, element: XmlElement) -> Result<(TagId, StructuralEdit), DocumentError> {
		let mut tree = self.tree.write();
		let slot = DocumentTree::slot_for(tree.node(parent)?, index);
		let tag = tree.build(element, Some(parent));
		tree.node_mut(parent)?.children.insert(slot, LiveChild::Tag(tag));
		tree.touch();
		drop(tree);
		Ok((tag, self.edit(EditKind::TagAdded { parent, tag })))
	}

	/// Removes `tag` and its subtree.
	pub fn remove(&self, tag: TagId) -> Result<StructuralEdit, DocumentError> {
		let mut tree = self.tree.write();
		let mut subtree = Vec::new();
		tree.subtree(tag, &mut subtree);
		let parent = tree.detach(tag)?;
		for id in &subtree {
			tree.nodes.remove(id);
		}
		tree.touch();
		drop(tree);
		Ok(self.edit(EditKind::TagRemoved { parent, tag, subtree }))
	}

	/// Moves `tag` under `to`, before the `index`-th child tag or at the end.
	pub fn move_tag(&self, tag: TagId, to: TagId, index: Option<usize>) -> Result<StructuralEdit, DocumentError> {
		let mut tree = self.tree.write();
		let mut subtree = Vec::new();
		tree.subtree(tag, &mut subtree);
		if subtree.contains(&to) {
			return Err(DocumentError::Cycle);
		}
		tree.node(to)?;
		let from = tree.detach(tag)?;
		let slot = DocumentTree::slot_for(tree.node(to)?, index);
		tree.node_mut(to)?.children.insert(slot, LiveChild::Tag(tag));
		tree.node_mut(tag)?.parent = Some(to);
		tree.touch();
		drop(tree);
		Ok(self.edit(EditKind::TagMoved { tag, from, to }))
	}

	/// Sets (`Some`) or removes (`None`) an attribute.
	pub fn set_attribute(&self, tag: TagId, name: &str, value: Option<&str>) -> Result<StructuralEdit, DocumentError> {
		let mut tree = self.tree.write();
		let node = tree.node_mut(tag)?;
		let position = node.attributes.iter().position(|a| a.name == name);
		let old = match (position, value) {
			(Some(i), Some(value)) => Some(std::mem::replace(&mut node.attributes[i].value, value.to_string())),
			(Some(i), None) => Some(node.attributes.remove(i).value),
			(None, Some(value)) => {
				node.attributes.push(XmlAttribute {
					name: name.to_string(),
					value: value.to_string(),
				});
				None
			}
			(None, None) => None,
		};
		tree.touch();
		drop(tree);
		Ok(self.edit(EditKind::AttributeChanged {
			tag,
			name: name.to_string(),
			old,
			new: value.map(str::to_string),
		}))
	}

	/// Replaces the direct text content of `tag`, keeping child tags.
	pub fn set_text(&self, tag: TagId, text: &str) -> Result<StructuralEdit, DocumentError> {
		let mut tree = self.tree.write();
		let node = tree.node_mut(tag)?;
		let mut old = String::new();
		let mut slot = None;
		let mut index = 0;
		node.children.retain(|child| {
			let keep = match child {
				LiveChild::Text(existing) => {
					old.push_str(existing);
					slot.get_or_insert(index);
					false
				}
				_ => true,
			};
			if keep {
				index += 1;
			}
			keep
		});
		if !text.is_empty() {
			node.children.insert(slot.unwrap_or(0), LiveChild::Text(text.to_string()));
		}
		tree.touch();
		drop(tree);
		Ok(self.edit(EditKind::TextChanged {
			tag,
			old,
			new: text.to_string(),
		}))
	}

	/// Appends a comment under `parent`.
	pub fn insert_comment(&self, parent: TagId, text: &str) -> Result<StructuralEdit, DocumentError> {
		let mut tree = self.tree.write();
		tree.node_mut(parent)?.children.push(LiveChild::Comment(text.to_string()));
		tree.touch();
		drop(tree);
		Ok(self.edit(EditKind::CommentChanged { parent }))
	}

	/// Replaces the whole document.
	pub fn replace(&self, root: XmlElement) -> StructuralEdit {
		let mut tree = self.tree.write();
		let (next_id, revision) = (tree.next_id, tree.revision);
		*tree = DocumentTree {
			next_id,
			revision,
			..DocumentTree::default()
		};
		let id = tree.build(root, None);
		tree.root = Some(id);
		tree.touch();
		drop(tree);
		self.edit(EditKind::Reloaded)
	}

	/// Finds the first tag, in document order, matching `predicate`.
	pub fn find(&self, predicate: impl Fn(&str, &[XmlAttribute]) -> bool) -> Option<TagId> {
		let tree = self.tree.read();
		let mut order = Vec::new();
		tree.subtree(tree.root?, &mut order);
		order.into_iter().find(|id| tree.nodes.get(id).is_some_and(|node| predicate(&node.name, &node.attributes)))
	}

	/// Serialized document text.
	pub fn to_xml(&self) -> Result<String, DocumentError> {
		let tree = self.tree.read();
		let root = tree.root.and_then(|root| tree.snapshot(root)).ok_or(DocumentError::NoRoot)?;
		Ok(root.to_document_string())
	}

	fn mark_saved(&self) {
		self.tree.write().dirty = false;
	}
}

impl LiveDocument for SharedDocument {
	fn path(&self) -> &Path {
		&self.path
	}

	fn root(&self) -> Option<TagId> {
		self.tree.read().root
	}

	fn contains(&self, tag: TagId) -> bool {
		self.tree.read().nodes.contains_key(&tag)
	}

	fn tag_name(&self, tag: TagId) -> Option<String> {
		self.tree.read().nodes.get(&tag).map(|node| node.name.clone())
	}

	fn attribute(&self, tag: TagId, name: &str) -> Option<String> {
		let tree = self.tree.read();
		let node = tree.nodes.get(&tag)?;
		node.attributes.iter().find(|a| a.name == name).map(|a| a.value.clone())
	}

	fn attributes(&self, tag: TagId) -> Vec<XmlAttribute> {
		self.tree.read().nodes.get(&tag).map(|node| node.attributes.clone()).unwrap_or_default()
	}

	fn parent(&self, tag: TagId) -> Option<TagId> {
		self.tree.read().nodes.get(&tag)?.parent
	}

	fn child_tags(&self, tag: TagId) -> Vec<TagId> {
		let tree = self.tree.read();
		let Some(node) = tree.nodes.get(&tag) else {
			return Vec::new();
		};
		node.children
			.iter()
			.filter_map(|child| match child {
				LiveChild::Tag(id) => Some(*id),
				_ => None,
			})
			.collect()
	}

	fn snapshot(&self, tag: TagId) -> Option<XmlElement> {
		self.tree.read().snapshot(tag)
	}

	fn revision(&self) -> u64 {
		self.tree.read().revision
	}
}

/// In-process registry of open documents.
pub struct DocumentStore {
	parser: Arc<dyn ResourceParser>,
	open: RwLock<FxHashMap<PathBuf, Arc<SharedDocument>>>,
}

impl fmt::Debug for DocumentStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentStore").field("open", &self.open.read().len()).finish()
	}
}

impl Default for DocumentStore {
	fn default() -> Self {
		Self::new(Arc::new(crate::xml::RoxmlParser))
	}
}

impl DocumentStore {
	pub fn new(parser: Arc<dyn ResourceParser>) -> Self {
		Self {
			parser,
			open: RwLock::default(),
		}
	}

	/// Opens `path` for editing, or returns the already open document.
	pub fn open(&self, path: &Path) -> Result<Arc<SharedDocument>, DocumentError> {
		if let Some(doc) = self.get(path) {
			return Ok(doc);
		}
		let bytes = std::fs::read(path).map_err(|error| DocumentError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let root = self.parser.parse(path, &bytes)?;
		let doc = Arc::new(SharedDocument::new(path, root));
		let mut open = self.open.write();
		let doc = open.entry(path.to_path_buf()).or_insert(doc).clone();
		tracing::debug!(path = %path.display(), "resrepo.document.open");
		Ok(doc)
	}

	pub fn get(&self, path: &Path) -> Option<Arc<SharedDocument>> {
		self.open.read().get(path).cloned()
	}

	pub fn is_open(&self, path: &Path) -> bool {
		self.open.read().contains_key(path)
	}

	/// Closes a document without saving. Returns whether it was open.
	pub fn close(&self, path: &Path) -> bool {
		self.open.write().remove(path).is_some()
	}

	/// Writes the document back to its file.
	pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
		let doc = self.get(path).ok_or(DocumentError::NoRoot)?;
		let text = doc.to_xml()?;
		std::fs::write(path, text).map_err(|error| DocumentError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		doc.mark_saved();
		Ok(())
	}
}

impl DocumentProvider for DocumentStore {
	fn live_document(&self, path: &Path) -> Option<Arc<dyn LiveDocument>> {
		self.get(path).map(|doc| doc as Arc<dyn LiveDocument>)
	}
}
