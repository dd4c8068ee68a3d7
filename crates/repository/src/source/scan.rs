//! Item extraction from one file.
//!
//! The same extraction runs over a detached [`XmlElement`] (files parsed
//! from disk) and over a live document (files open for editing), through
//! the [`TagTree`] view. Only the item bodies differ: static scans copy the
//! declaring element, live scans bind the item to its tag.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use resrepo_primitives::name::{existing_id_name, new_id_name};
use resrepo_primitives::{ANDROID_URI, FolderConfiguration, ResourceFolderType, ResourceNamespace, ResourceType, is_valid_value_name, resource_name_for_file, validate_file_resource_name};

use crate::context::RepositoryContext;
use crate::error::ParseError;
use crate::file::{FileMode, ResourceFile};
use crate::item::{ItemBody, ItemSource, LiveTag, ResourceItem};
use crate::live::{LiveDocument, TagId};
use crate::problems::Problem;
use crate::xml::{XmlAttribute, XmlElement};

pub(super) const RESOURCES_TAG: &str = "resources";
pub(super) const PUBLIC_TAG: &str = "public";
const ATTR_TAG: &str = "attr";
const TOOLS_URI: &str = "http://schemas.android.com/tools";

/// Read-only view over an element tree.
pub(super) trait TagTree {
	type Node: Copy;

	fn root(&self) -> Option<Self::Node>;
	fn name(&self, node: Self::Node) -> String;
	fn attr(&self, node: Self::Node, name: &str) -> Option<String>;
	fn attributes(&self, node: Self::Node) -> Vec<XmlAttribute>;
	fn children(&self, node: Self::Node) -> Vec<Self::Node>;
	fn tag(&self, node: Self::Node) -> Option<TagId>;
	/// Body carrying the node's content, for value items.
	fn body(&self, node: Self::Node) -> ItemBody;
	/// Body that only points at the node, for id items.
	fn marker(&self, node: Self::Node) -> ItemBody;
}

pub(super) struct StaticTree<'a>(pub &'a XmlElement);

impl<'a> TagTree for StaticTree<'a> {
	type Node = &'a XmlElement;

	fn root(&self) -> Option<Self::Node> {
		Some(self.0)
	}

	fn name(&self, node: Self::Node) -> String {
		node.name.clone()
	}

	fn attr(&self, node: Self::Node, name: &str) -> Option<String> {
		node.attr(name).map(str::to_string)
	}

	fn attributes(&self, node: Self::Node) -> Vec<XmlAttribute> {
		node.attributes.clone()
	}

	fn children(&self, node: Self::Node) -> Vec<Self::Node> {
		node.child_elements().collect()
	}

	fn tag(&self, _node: Self::Node) -> Option<TagId> {
		None
	}

	fn body(&self, node: Self::Node) -> ItemBody {
		ItemBody::Static(Some(Arc::new(node.clone())))
	}

	fn marker(&self, _node: Self::Node) -> ItemBody {
		ItemBody::Static(None)
	}
}

pub(super) struct LiveTree<'a>(pub &'a Arc<dyn LiveDocument>);

impl LiveTree<'_> {
	fn live(&self, tag: TagId) -> ItemBody {
		ItemBody::Live(LiveTag {
			document: self.0.clone(),
			tag,
		})
	}
}

impl TagTree for LiveTree<'_> {
	type Node = TagId;

	fn root(&self) -> Option<TagId> {
		self.0.root()
	}

	fn name(&self, node: TagId) -> String {
		self.0.tag_name(node).unwrap_or_default()
	}

	fn attr(&self, node: TagId, name: &str) -> Option<String> {
		self.0.attribute(node, name)
	}

	fn attributes(&self, node: TagId) -> Vec<XmlAttribute> {
		self.0.attributes(node)
	}

	fn children(&self, node: TagId) -> Vec<TagId> {
		self.0.child_tags(node)
	}

	fn tag(&self, node: TagId) -> Option<TagId> {
		Some(node)
	}

	fn body(&self, node: TagId) -> ItemBody {
		self.live(node)
	}

	fn marker(&self, node: TagId) -> ItemBody {
		self.live(node)
	}
}

/// Identity shared by every item of one file.
pub(super) struct FileScope<'a> {
	pub namespace: &'a ResourceNamespace,
	pub path: &'a Arc<Path>,
	pub folder_type: ResourceFolderType,
	pub configuration: &'a Arc<FolderConfiguration>,
}

impl FileScope<'_> {
	pub fn item(&self, kind: ResourceType, name: impl Into<String>, tag: Option<TagId>, body: ItemBody) -> Arc<ResourceItem> {
		let source = ItemSource {
			file: self.path.clone(),
			tag,
		};
		Arc::new(ResourceItem::new(self.namespace.clone(), kind, name, self.configuration.clone(), Some(source), body))
	}

	/// The single item of a file resource, `None` when the file name is not a
	/// valid resource name.
	pub fn file_item(&self) -> Result<Option<Arc<ResourceItem>>, String> {
		let Some(kind) = self.folder_type.file_resource_type() else {
			return Ok(None);
		};
		let file_name = self.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
		let name = resource_name_for_file(file_name);
		validate_file_resource_name(name).map_err(|err| err.to_string())?;
		Ok(Some(self.item(kind, name, None, ItemBody::Static(None))))
	}
}

/// `<public type=".." name=".."/>` declaration carried by `node`.
pub(super) fn public_declaration<T: TagTree>(tree: &T, node: T::Node) -> Option<(ResourceType, String)> {
	let kind = ResourceType::from_name(&tree.attr(node, "type")?)?;
	Some((kind, tree.attr(node, "name")?))
}

/// Whether a `<declare-styleable>` child declares an attr of its own, rather
/// than referencing one declared elsewhere.
pub(super) fn is_nested_attr_declaration<T: TagTree>(tree: &T, node: T::Node) -> bool {
	tree.name(node) == ATTR_TAG && tree.attr(node, "name").is_some_and(|name| !name.starts_with("android:")) && (tree.attr(node, "format").is_some() || !tree.children(node).is_empty())
}

/// Items declared by one child of `<resources>`: the item itself and, for
/// a declare-styleable, its nested attr declarations.
pub(super) fn value_items<T: TagTree>(scope: &FileScope<'_>, tree: &T, node: T::Node) -> Vec<Arc<ResourceItem>> {
	let type_attr = tree.attr(node, "type");
	let Some(kind) = ResourceType::from_value_tag(&tree.name(node), type_attr.as_deref()) else {
		return Vec::new();
	};
	let Some(name) = tree.attr(node, "name").filter(|name| is_valid_value_name(name)) else {
		return Vec::new();
	};
	let mut items = vec![scope.item(kind, name, tree.tag(node), tree.body(node))];
	if kind == ResourceType::Styleable {
		for child in tree.children(node) {
			if is_nested_attr_declaration(tree, child)
				&& let Some(name) = tree.attr(child, "name").filter(|name| is_valid_value_name(name))
			{
				items.push(scope.item(ResourceType::Attr, name, tree.tag(child), tree.body(child)));
			}
		}
	}
	items
}

/// Items and public declarations of a values file.
pub(super) fn scan_values<T: TagTree>(scope: &FileScope<'_>, tree: &T) -> (Vec<Arc<ResourceItem>>, Vec<(ResourceType, String)>) {
	let mut items = Vec::new();
	let mut public = Vec::new();
	let Some(root) = tree.root().filter(|root| tree.name(*root) == RESOURCES_TAG) else {
		return (items, public);
	};
	for child in tree.children(root) {
		if tree.name(child) == PUBLIC_TAG {
			public.extend(public_declaration(tree, child));
		} else {
			items.extend(value_items(scope, tree, child));
		}
	}
	(items, public)
}

/// Prefixes bound to the android and tools namespaces at one element.
/// Undeclared namespaces keep their conventional prefix; a prefix rebound
/// to another namespace stops matching.
#[derive(Debug, Clone)]
struct Prefixes {
	android: Option<String>,
	tools: Option<String>,
}

impl Default for Prefixes {
	fn default() -> Self {
		Self {
			android: Some("android".to_string()),
			tools: Some("tools".to_string()),
		}
	}
}

impl Prefixes {
	fn declared_on(&self, attributes: &[XmlAttribute]) -> Self {
		let mut prefixes = self.clone();
		for attr in attributes {
			let Some(prefix) = attr.name.strip_prefix("xmlns:") else {
				continue;
			};
			for (uri, bound) in [(ANDROID_URI, &mut prefixes.android), (TOOLS_URI, &mut prefixes.tools)] {
				if attr.value == uri {
					*bound = Some(prefix.to_string());
				} else if bound.as_deref() == Some(prefix) {
					*bound = None;
				}
			}
		}
		prefixes
	}

	fn is_android_id(&self, name: &str) -> bool {
		name.split_once(':').is_some_and(|(prefix, local)| self.android.as_deref() == Some(prefix) && local == "id")
	}

	fn is_tools(&self, name: &str) -> bool {
		name.split_once(':').is_some_and(|(prefix, _)| self.tools.as_deref() == Some(prefix))
	}
}

/// Ids declared inline in a layout, menu or navigation file, in declaration
/// order, with the node each one binds to.
///
/// The id attribute is matched by namespace, whatever prefix the file
/// binds to it. `android:id="@+id/x"` binds `x` to its own tag. Any other
/// attribute holding `@+id/x` (a forward reference such as `layout_below`)
/// leaves `x` pending; a later `android:id="@id/x"` claims it. Ids still pending at
/// the end bind to the tag that first mentioned them.
pub(super) fn scan_ids<T: TagTree>(tree: &T) -> IndexMap<String, T::Node> {
	let mut ids = IndexMap::new();
	let mut pending: IndexMap<String, T::Node> = IndexMap::new();
	let Some(root) = tree.root() else {
		return ids;
	};
	let mut stack = vec![(root, Prefixes::default())];
	while let Some((node, inherited)) = stack.pop() {
		let attributes = tree.attributes(node);
		let prefixes = inherited.declared_on(&attributes);
		for attr in &attributes {
			if attr.name.starts_with("xmlns") || prefixes.is_tools(&attr.name) {
				continue;
			}
			if let Some(id) = new_id_name(&attr.value) {
				if prefixes.is_android_id(&attr.name) {
					pending.shift_remove(id);
					ids.entry(id.to_string()).or_insert(node);
				} else if !ids.contains_key(id) {
					pending.entry(id.to_string()).or_insert(node);
				}
			} else if prefixes.is_android_id(&attr.name)
				&& let Some(id) = existing_id_name(&attr.value)
				&& pending.shift_remove(id).is_some()
			{
				ids.entry(id.to_string()).or_insert(node);
			}
		}
		let mut children = tree.children(node);
		children.reverse();
		stack.extend(children.into_iter().map(|child| (child, prefixes.clone())));
	}
	for (id, node) in pending {
		ids.entry(id).or_insert(node);
	}
	ids.retain(|name, _| is_valid_value_name(name));
	ids
}

pub(super) fn id_items<T: TagTree>(scope: &FileScope<'_>, tree: &T) -> Vec<Arc<ResourceItem>> {
	scan_ids(tree).into_iter().map(|(name, node)| scope.item(ResourceType::Id, name, tree.tag(node), tree.marker(node))).collect()
}

pub(super) fn is_xml(path: &Path) -> bool {
	path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// Scans one file of a qualifier folder.
///
/// Returns `None` for files that cannot hold resources (non-XML files in
/// `values`). Parse failures are reported to the problem sink and yield a
/// `failed` file without items.
pub(super) fn scan_file(
	namespace: &ResourceNamespace,
	ctx: &RepositoryContext,
	path: &Path,
	folder_type: ResourceFolderType,
	configuration: Arc<FolderConfiguration>,
) -> Option<ResourceFile> {
	let is_xml = is_xml(path);
	if folder_type == ResourceFolderType::Values && !is_xml {
		return None;
	}
	let path: Arc<Path> = Arc::from(path);
	ctx.problems.clear(&path);
	let mut file = ResourceFile {
		path: path.clone(),
		folder_type,
		configuration: configuration.clone(),
		mode: FileMode::Static,
		items: Vec::new(),
		public: Vec::new(),
		failed: false,
		is_xml,
		fingerprint: None,
	};
	let scope = FileScope {
		namespace,
		path: &path,
		folder_type,
		configuration: &configuration,
	};
	let report = |message: String| {
		ctx.problems.report(Problem {
			path: path.to_path_buf(),
			message,
		})
	};

	if is_xml && let Some(document) = ctx.documents.live_document(&path) {
		fill(&scope, &LiveTree(&document), &mut file, report);
		file.mode = FileMode::Live(document);
		return Some(file);
	}

	file.fingerprint = ctx.fingerprinter.fingerprint(&path);
	if !(is_xml && (folder_type == ResourceFolderType::Values || folder_type.is_id_generating())) {
		match scope.file_item() {
			Ok(item) => file.items.extend(item),
			Err(message) => report(message),
		}
		return Some(file);
	}
	let parsed = std::fs::read(&path)
		.map_err(|error| ParseError::Io {
			path: path.to_path_buf(),
			error,
		})
		.and_then(|bytes| ctx.parser.parse(&path, &bytes));
	match parsed {
		Ok(root) => fill(&scope, &StaticTree(&root), &mut file, report),
		Err(error) => {
			report(error.to_string());
			file.failed = true;
		}
	}
	Some(file)
}

fn fill<T: TagTree>(scope: &FileScope<'_>, tree: &T, file: &mut ResourceFile, report: impl Fn(String)) {
	if scope.folder_type == ResourceFolderType::Values {
		(file.items, file.public) = scan_values(scope, tree);
		return;
	}
	match scope.file_item() {
		Ok(item) => file.items.extend(item),
		Err(message) => report(message),
	}
	if scope.folder_type.is_id_generating() {
		file.items.extend(id_items(scope, tree));
	}
}
