//! Incremental updates from structural edits.
//!
//! # Classification
//!
//! | Edit | Effect |
//! |---|---|
//! | comment or whitespace | ignored |
//! | any edit of a static file | rescan (the rescan binds the file to its live document) |
//! | tag added under `<resources>` | one new item, or a rescan for `<declare-styleable>` and `<public>` |
//! | tag removed under `<resources>` | its items removed by tag |
//! | `name` attribute of a value tag | item replaced under the new name |
//! | `type` attribute, `<public>` edits | rescan |
//! | text, other attributes, children of an item | that item's value invalidated |
//! | structure below `<declare-styleable>` | rescan |
//! | `name`/`format` of a nested `<attr>` | nested item renamed, or rescan if it appears or disappears |
//! | `@+id/` edits in layout, menu, navigation | at most one id added and one removed, ids rebound to the tag now declaring them, otherwise rescan |
//! | `xmlns` declarations in layout, menu, navigation | rescan |
//! | any edit in a `color` folder | generation bump, `color` invalidated |
//! | tag moved, document reloaded | rescan |

use std::sync::Arc;

use resrepo_primitives::{ResourceFolderType, ResourceNamespace, ResourceType, is_valid_value_name};

use super::scan::{self, FileScope, LiveTree, PUBLIC_TAG, TagTree};
use super::{SourceRepository, SourceState};
use crate::file::ResourceFile;
use crate::live::{EditKind, LiveDocument, StructuralEdit, TagId};
use crate::table::ResourceTable;

/// What an edit did to the repository.
#[derive(Debug, PartialEq, Eq)]
enum EditOutcome {
	Ignored,
	/// Only cached values changed; `cleared` when one had been computed.
	Values { cleared: bool },
	/// Items were added, removed or renamed.
	Structural(Vec<ResourceType>),
	Rescan,
}

fn same_document(a: &Arc<dyn LiveDocument>, b: &Arc<dyn LiveDocument>) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Tags from the child of `root` containing `tag` down to `tag`. `None` when
/// `tag` is `root` or not attached under it.
fn chain_from_root(document: &dyn LiveDocument, root: TagId, tag: TagId) -> Option<Vec<TagId>> {
	let mut chain = vec![tag];
	let mut current = tag;
	loop {
		let parent = document.parent(current)?;
		if parent == root {
			chain.reverse();
			return Some(chain);
		}
		chain.push(parent);
		current = parent;
	}
}

struct EditTarget<'a> {
	namespace: &'a ResourceNamespace,
	table: &'a mut ResourceTable,
	file: &'a mut ResourceFile,
	document: Arc<dyn LiveDocument>,
}

impl EditTarget<'_> {
	fn scope(&self) -> FileScope<'_> {
		FileScope {
			namespace: self.namespace,
			path: &self.file.path,
			folder_type: self.file.folder_type,
			configuration: &self.file.configuration,
		}
	}
}

impl SourceRepository {
	/// Applies one fine-grained edit of a live document.
	pub fn handle_structural_edit(&self, edit: &StructuralEdit) {
		if edit.is_whitespace_only() || matches!(edit.kind, EditKind::CommentChanged { .. }) {
			tracing::trace!(path = %edit.path.display(), "resrepo.edit.ignored");
			return;
		}
		let outcome = {
			let mut state = self.state.lock();
			self.apply_edit(&mut state, edit)
		};
		tracing::trace!(path = %edit.path.display(), kind = ?edit.kind, outcome = ?outcome, "resrepo.edit.applied");
		match outcome {
			EditOutcome::Ignored => {}
			EditOutcome::Values { cleared } => self.value_change(cleared),
			EditOutcome::Structural(types) => self.structural_change(types),
			EditOutcome::Rescan => self.schedule_rescan(&edit.path),
		}
	}

	fn apply_edit(&self, state: &mut SourceState, edit: &StructuralEdit) -> EditOutcome {
		let SourceState { table, files } = state;
		let Some(file) = files.get_mut(&edit.path) else {
			return if self.folder_of(&edit.path).is_some() { EditOutcome::Rescan } else { EditOutcome::Ignored };
		};
		let Some(document) = file.document().cloned() else {
			return EditOutcome::Rescan;
		};
		let current = self.ctx.documents.live_document(&edit.path);
		if !current.is_some_and(|current| same_document(&current, &document)) {
			return EditOutcome::Rescan;
		}
		if matches!(edit.kind, EditKind::TagMoved { .. } | EditKind::Reloaded) {
			return EditOutcome::Rescan;
		}
		let folder_type = file.folder_type;
		let mut target = EditTarget {
			namespace: &self.namespace,
			table,
			file,
			document,
		};
		match folder_type {
			ResourceFolderType::Values => self.values_edit(&mut target, &edit.kind),
			folder if folder.is_id_generating() => id_edit(&mut target, &edit.kind),
			ResourceFolderType::Color => EditOutcome::Structural(vec![ResourceType::Color]),
			_ => EditOutcome::Ignored,
		}
	}

	fn values_edit(&self, target: &mut EditTarget<'_>, kind: &EditKind) -> EditOutcome {
		let Some(root) = target.document.root() else {
			return EditOutcome::Rescan;
		};
		match kind {
			EditKind::TagAdded { parent, tag } if *parent == root => self.add_value_tag(target, *tag),
			EditKind::TagAdded { parent, .. } => nested_edit(target, root, *parent, true),
			EditKind::TagRemoved { parent, subtree, .. } if *parent == root => remove_value_tags(target, subtree),
			EditKind::TagRemoved { parent, .. } => nested_edit(target, root, *parent, true),
			EditKind::AttributeChanged { tag, .. } if *tag == root => EditOutcome::Ignored,
			EditKind::AttributeChanged { tag, name, .. } => self.value_attribute_changed(target, root, *tag, name),
			EditKind::TextChanged { tag, .. } if *tag == root => EditOutcome::Ignored,
			EditKind::TextChanged { tag, .. } => nested_edit(target, root, *tag, false),
			EditKind::TagMoved { .. } | EditKind::Reloaded => EditOutcome::Rescan,
			EditKind::CommentChanged { .. } => EditOutcome::Ignored,
		}
	}

	/// New child of `<resources>`.
	fn add_value_tag(&self, target: &mut EditTarget<'_>, tag: TagId) -> EditOutcome {
		let tree = LiveTree(&target.document);
		let Some(name) = target.document.tag_name(tag) else {
			return EditOutcome::Rescan;
		};
		if name == PUBLIC_TAG {
			return EditOutcome::Rescan;
		}
		let type_attr = target.document.attribute(tag, "type");
		match ResourceType::from_value_tag(&name, type_attr.as_deref()) {
			None => EditOutcome::Ignored,
			Some(ResourceType::Styleable) => EditOutcome::Rescan,
			Some(kind) => {
				let items = scan::value_items(&target.scope(), &tree, tag);
				if items.is_empty() {
					return EditOutcome::Ignored;
				}
				for item in items {
					target.table.insert(item.clone());
					target.file.items.push(item);
				}
				EditOutcome::Structural(vec![kind])
			}
		}
	}

	fn value_attribute_changed(&self, target: &mut EditTarget<'_>, root: TagId, tag: TagId, attribute: &str) -> EditOutcome {
		let Some(chain) = chain_from_root(target.document.as_ref(), root, tag) else {
			return EditOutcome::Rescan;
		};
		let top = chain[0];
		if chain.len() == 1 {
			if target.document.tag_name(tag).as_deref() == Some(PUBLIC_TAG) {
				return EditOutcome::Rescan;
			}
			return match attribute {
				"name" => self.rename_value_tag(target, tag),
				"type" => EditOutcome::Rescan,
				_ => match target.file.item_for_tag(tag) {
					Some((_, item)) => EditOutcome::Values { cleared: item.invalidate_value() },
					None => EditOutcome::Ignored,
				},
			};
		}
		let Some((_, item)) = target.file.item_for_tag(top) else {
			return EditOutcome::Ignored;
		};
		if item.kind() == ResourceType::Styleable && chain.len() == 2 && matches!(attribute, "name" | "format") {
			return self.nested_attr_changed(target, top, chain[1]);
		}
		nested_edit(target, root, tag, false)
	}

	/// `name` attribute of a child of `<resources>` changed.
	fn rename_value_tag(&self, target: &mut EditTarget<'_>, tag: TagId) -> EditOutcome {
		let Some((index, old)) = target.file.item_for_tag(tag).map(|(index, item)| (index, item.clone())) else {
			// The tag had no valid name before; it may declare an item now.
			return self.add_value_tag(target, tag);
		};
		target.table.remove(&old);
		target.file.items.remove(index);
		if let Some(name) = target.document.attribute(tag, "name").filter(|name| is_valid_value_name(name)) {
			let renamed = Arc::new(old.renamed(name));
			target.table.insert(renamed.clone());
			target.file.items.insert(index, renamed);
		}
		EditOutcome::Structural(vec![old.kind()])
	}

	/// `name` or `format` of an `<attr>` directly inside a declare-styleable
	/// changed.
	fn nested_attr_changed(&self, target: &mut EditTarget<'_>, styleable: TagId, attr: TagId) -> EditOutcome {
		let tree = LiveTree(&target.document);
		let name = target.document.attribute(attr, "name").filter(|name| is_valid_value_name(name));
		let declares = scan::is_nested_attr_declaration(&tree, attr) && name.is_some();
		let existing = target.file.item_for_tag(attr).map(|(index, item)| (index, item.clone()));
		let styleable_cleared = target.file.item_for_tag(styleable).is_some_and(|(_, item)| item.invalidate_value());
		match (existing, declares, name) {
			(Some((index, old)), true, Some(name)) => {
				if old.name() == name {
					return EditOutcome::Values {
						cleared: old.invalidate_value() | styleable_cleared,
					};
				}
				let renamed = Arc::new(old.renamed(name));
				target.table.remove(&old);
				target.table.insert(renamed.clone());
				target.file.items[index] = renamed;
				EditOutcome::Structural(vec![ResourceType::Attr])
			}
			(None, false, _) => EditOutcome::Values { cleared: styleable_cleared },
			_ => EditOutcome::Rescan,
		}
	}
}

/// Edit below a child of `<resources>`: invalidates the enclosing item.
fn nested_edit(target: &mut EditTarget<'_>, root: TagId, tag: TagId, structure: bool) -> EditOutcome {
	let Some(chain) = chain_from_root(target.document.as_ref(), root, tag) else {
		return EditOutcome::Rescan;
	};
	let Some((_, item)) = target.file.item_for_tag(chain[0]) else {
		return EditOutcome::Ignored;
	};
	if item.kind() != ResourceType::Styleable {
		return EditOutcome::Values { cleared: item.invalidate_value() };
	}
	if structure {
		return EditOutcome::Rescan;
	}
	let mut cleared = item.invalidate_value();
	if let Some(&attr) = chain.get(1)
		&& let Some((_, nested)) = target.file.item_for_tag(attr)
	{
		cleared |= nested.invalidate_value();
	}
	EditOutcome::Values { cleared }
}

/// Children of `<resources>` removed; `subtree` lists every removed tag.
fn remove_value_tags(target: &mut EditTarget<'_>, subtree: &[TagId]) -> EditOutcome {
	let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut target.file.items).into_iter().partition(|item| item.tag().is_some_and(|tag| subtree.contains(&tag)));
	target.file.items = kept;
	if removed.is_empty() {
		// An unknown tag, or a `<public>` declaration.
		return if target.file.public.is_empty() { EditOutcome::Ignored } else { EditOutcome::Rescan };
	}
	for item in &removed {
		target.table.remove(item);
	}
	EditOutcome::Structural(removed.iter().map(|item| item.kind()).collect())
}

/// Reconciles inline ids of a layout, menu or navigation file.
fn id_edit(target: &mut EditTarget<'_>, kind: &EditKind) -> EditOutcome {
	match kind {
		EditKind::TextChanged { .. } | EditKind::CommentChanged { .. } => return EditOutcome::Ignored,
		EditKind::AttributeChanged { name, old, new, .. } => {
			let mentions_id = |value: &Option<String>| value.as_deref().is_some_and(|value| value.starts_with('@') && value.contains("id/"));
			if name.starts_with("xmlns") {
				// Rebinding a prefix can change which attribute declares ids.
				return EditOutcome::Rescan;
			}
			if name.starts_with("tools:") || !(mentions_id(old) || mentions_id(new)) {
				return EditOutcome::Ignored;
			}
		}
		EditKind::TagMoved { .. } | EditKind::Reloaded => return EditOutcome::Rescan,
		EditKind::TagAdded { .. } | EditKind::TagRemoved { .. } => {}
	}
	let fresh = scan::scan_ids(&LiveTree(&target.document));
	let current: Vec<String> = target.file.items.iter().filter(|item| item.kind() == ResourceType::Id).map(|item| item.name().to_string()).collect();
	let removed: Vec<&String> = current.iter().filter(|name| !fresh.contains_key(*name)).collect();
	let added: Vec<(&String, &TagId)> = fresh.iter().filter(|(name, _)| !current.contains(name)).collect();
	let moved: Vec<(usize, TagId)> = target
		.file
		.items
		.iter()
		.enumerate()
		.filter(|(_, item)| item.kind() == ResourceType::Id)
		.filter_map(|(index, item)| fresh.get(item.name()).filter(|&&tag| item.tag() != Some(tag)).map(|&tag| (index, tag)))
		.collect();
	if removed.is_empty() && added.is_empty() && moved.is_empty() {
		return EditOutcome::Ignored;
	}
	if removed.len() > 1 || added.len() > 1 {
		return EditOutcome::Rescan;
	}
	for (index, tag) in moved {
		let name = target.file.items[index].name().to_string();
		let rebound = target.scope().item(ResourceType::Id, name, Some(tag), LiveTree(&target.document).marker(tag));
		let previous = std::mem::replace(&mut target.file.items[index], rebound.clone());
		target.table.remove(&previous);
		target.table.insert(rebound);
	}
	for name in removed {
		if let Some(index) = target.file.items.iter().position(|item| item.kind() == ResourceType::Id && item.name() == name.as_str()) {
			let item = target.file.items.remove(index);
			target.table.remove(&item);
		}
	}
	for (name, &tag) in added {
		let item = target.scope().item(ResourceType::Id, name.clone(), Some(tag), LiveTree(&target.document).marker(tag));
		target.table.insert(item.clone());
		target.file.items.push(item);
	}
	EditOutcome::Structural(vec![ResourceType::Id])
}
