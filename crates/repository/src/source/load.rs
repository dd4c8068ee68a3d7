//! Initial load and persistent cache conversion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use resrepo_primitives::{FolderConfiguration, ResourceFolderType, ResourceNamespace, ResourceType};
use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use super::scan::{self, FileScope};
use super::{LoadStats, SourceState};
use crate::cache::{self, CacheHeader, CachePayload, CachedFile, CachedItem, CachedName, CachedType};
use crate::context::RepositoryContext;
use crate::file::{FileMode, ResourceFile};
use crate::item::{ItemBody, ResourceItem};
use crate::xml::XmlElement;

pub(super) struct InitialLoad {
	pub files: IndexMap<PathBuf, ResourceFile>,
	pub stats: LoadStats,
}

pub(super) fn is_hidden(path: &Path) -> bool {
	path.file_name().and_then(|name| name.to_str()).is_none_or(|name| name.starts_with('.'))
}

pub(super) fn cache_path(directory: &Path, namespace: &ResourceNamespace, ctx: &RepositoryContext) -> PathBuf {
	cache::cache_file_path(&ctx.config.cache.directory(), directory, namespace)
}

fn cache_header(directory: &Path, namespace: &ResourceNamespace, ctx: &RepositoryContext) -> CacheHeader {
	CacheHeader::new(directory.to_path_buf(), ctx.config.tool_version.clone(), namespace.clone())
}

/// Files of every qualifier folder at or below `root`, in name order.
///
/// `root` is the resource directory itself or one of its qualifier folders.
pub(super) fn files_under(directory: &Path, root: &Path) -> Vec<PathBuf> {
	let depth = if root == directory { 2 } else { 1 };
	WalkDir::new(root)
		.min_depth(depth)
		.max_depth(depth)
		.sort_by_file_name()
		.into_iter()
		.filter_map(Result::ok)
		.filter(|entry| entry.file_type().is_file() && !is_hidden(entry.path()))
		.map(walkdir::DirEntry::into_path)
		.collect()
}

/// Cache contents that survived header validation, consumed file by file.
struct CachedSnapshot {
	payload: CachePayload,
	index: FxHashMap<PathBuf, usize>,
	/// Per file: `(position, type, name, body)`.
	items: Vec<Vec<(u32, ResourceType, String, Option<XmlElement>)>>,
}

impl CachedSnapshot {
	fn new(payload: CachePayload) -> Self {
		let index = payload.files.iter().enumerate().map(|(i, file)| (file.path.clone(), i)).collect();
		let mut items = vec![Vec::new(); payload.files.len()];
		for ty in &payload.types {
			for name in &ty.names {
				for item in &name.items {
					if let Some(slot) = items.get_mut(item.file as usize) {
						slot.push((item.position, ty.kind, name.name.clone(), item.body.clone()));
					}
				}
			}
		}
		for slot in &mut items {
			slot.sort_by_key(|(position, ..)| *position);
		}
		Self { payload, index, items }
	}

	/// Cached version of `path`, if its record matches the folder and its
	/// fingerprint still matches the file on disk.
	fn take(&mut self, relative: &Path, path: &Path, folder_type: ResourceFolderType, configuration: &Arc<FolderConfiguration>, namespace: &ResourceNamespace, ctx: &RepositoryContext) -> Option<ResourceFile> {
		let &index = self.index.get(relative)?;
		let record = &self.payload.files[index];
		let qualifiers = self.payload.configurations.get(record.configuration as usize)?;
		if record.folder_type != folder_type || qualifiers != configuration.qualifier_string() {
			return None;
		}
		if ctx.documents.live_document(path).is_some() {
			return None;
		}
		let fingerprint = ctx.fingerprinter.fingerprint(path)?;
		if fingerprint != record.fingerprint {
			tracing::debug!(path = %path.display(), "resrepo.cache.stale_file");
			return None;
		}
		let path: Arc<Path> = Arc::from(path);
		let scope = FileScope {
			namespace,
			path: &path,
			folder_type,
			configuration,
		};
		let items = std::mem::take(&mut self.items[index])
			.into_iter()
			.map(|(_, kind, name, body)| scope.item(kind, name, None, ItemBody::Static(body.map(Arc::new))))
			.collect();
		Some(ResourceFile {
			path: path.clone(),
			folder_type,
			configuration: configuration.clone(),
			mode: FileMode::Static,
			items,
			public: record.public.clone(),
			failed: false,
			is_xml: record.is_xml,
			fingerprint: Some(fingerprint),
		})
	}
}

/// Cache read plus full directory scan.
pub(super) fn initial_load(directory: &Path, namespace: &ResourceNamespace, ctx: &RepositoryContext) -> InitialLoad {
	let mut snapshot = ctx
		.config
		.cache
		.enabled
		.then(|| cache::read(&cache_path(directory, namespace, ctx), &cache_header(directory, namespace, ctx)))
		.flatten()
		.map(CachedSnapshot::new);
	let mut files = IndexMap::new();
	let mut stats = LoadStats::default();

	let folders = WalkDir::new(directory).min_depth(1).max_depth(1).sort_by_file_name().into_iter().filter_map(Result::ok);
	for folder in folders.filter(|entry| entry.file_type().is_dir()) {
		let Some((folder_type, configuration)) = folder.file_name().to_str().and_then(FolderConfiguration::for_folder) else {
			tracing::trace!(folder = %folder.path().display(), "resrepo.load.skip_folder");
			continue;
		};
		let configuration = Arc::new(configuration);
		for path in files_under(directory, folder.path()) {
			let is_xml = scan::is_xml(&path);
			let relative = path.strip_prefix(directory).unwrap_or(&path).to_path_buf();
			let cached = snapshot.as_mut().and_then(|snapshot| snapshot.take(&relative, &path, folder_type, &configuration, namespace, ctx));
			let file = match cached {
				Some(file) => {
					stats.cached_files += 1;
					Some(file)
				}
				None => {
					stats.xml_parsed += usize::from(is_xml);
					scan::scan_file(namespace, ctx, &path, folder_type, configuration.clone())
				}
			};
			if let Some(file) = file {
				stats.xml_total += usize::from(file.is_xml);
				files.insert(path, file);
			}
		}
	}
	InitialLoad { files, stats }
}

/// Header and payload describing the current static files.
///
/// Live files, failed files and files without a fingerprint are left out
/// and get parsed again on the next load.
pub(super) fn cache_contents(directory: &Path, namespace: &ResourceNamespace, ctx: &RepositoryContext, state: &SourceState) -> (CacheHeader, CachePayload) {
	let mut payload = CachePayload::default();
	let mut configurations: FxHashMap<String, u32> = FxHashMap::default();
	let mut file_index: FxHashMap<&Path, u32> = FxHashMap::default();
	let mut positions: FxHashMap<*const ResourceItem, u32> = FxHashMap::default();

	for (path, file) in &state.files {
		let (Some(fingerprint), FileMode::Static, false) = (file.fingerprint, &file.mode, file.failed) else {
			continue;
		};
		let Ok(relative) = path.strip_prefix(directory) else {
			continue;
		};
		let qualifiers = file.configuration.qualifier_string().to_string();
		let next = configurations.len() as u32;
		let configuration = *configurations.entry(qualifiers.clone()).or_insert_with(|| {
			payload.configurations.push(qualifiers);
			next
		});
		file_index.insert(path.as_path(), payload.files.len() as u32);
		positions.extend(file.items.iter().enumerate().map(|(position, item)| (Arc::as_ptr(item), position as u32)));
		payload.files.push(CachedFile {
			path: relative.to_path_buf(),
			configuration,
			folder_type: file.folder_type,
			fingerprint,
			is_xml: file.is_xml,
			public: file.public.clone(),
		});
	}

	for kind in state.table.types(namespace) {
		let Some(map) = state.table.get(namespace, kind) else {
			continue;
		};
		let mut names = Vec::new();
		for (name, items) in map.iter() {
			let items: Vec<CachedItem> = items
				.iter()
				.filter_map(|item| {
					let file = *file_index.get(item.file()?)?;
					let position = *positions.get(&Arc::as_ptr(item))?;
					let ItemBody::Static(body) = item.body() else {
						return None;
					};
					Some(CachedItem {
						file,
						position,
						body: body.as_deref().cloned(),
					})
				})
				.collect();
			if !items.is_empty() {
				names.push(CachedName { name: name.clone(), items });
			}
		}
		if !names.is_empty() {
			payload.types.push(CachedType { kind, names });
		}
	}
	(cache_header(directory, namespace, ctx), payload)
}
