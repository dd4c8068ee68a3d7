//! Layered, incrementally updated repositories of application resources.
//!
//! Leaf [`SourceRepository`]s index one resource directory each and keep
//! themselves current from host notifications routed by the
//! [`ChangeRouter`]. [`MergingRepository`] nodes combine them with override
//! rules, and the [`RepositoryManager`] assembles per-module views out of
//! folders shared through the [`FolderRegistry`]. Every repository exposes a
//! generation counter that never decreases, so consumers can detect
//! staleness without comparing contents.

/// Persistent binary cache of folder repositories.
pub mod cache;
/// Repository configuration.
pub mod config;
/// Shared collaborators and services.
pub mod context;
/// Error types.
pub mod error;
/// Host notifications and change reasons.
pub mod events;
/// Per-file bookkeeping.
pub mod file;
/// Model read/write gate.
pub mod gate;
/// Process-wide generation counter.
pub mod generation;
/// Resource items and their values.
pub mod item;
/// Child-to-parent invalidation links.
pub mod links;
/// Live editable documents.
pub mod live;
/// Per-project facade.
pub mod manager;
/// Merging repositories.
pub mod merging;
/// Project model.
pub mod module;
/// Problem reporting.
pub mod problems;
/// Shared folder repositories.
pub mod registry;
/// Read API shared by every repository.
pub mod repository;
/// Host notification routing.
pub mod router;
/// Leaf repositories.
pub mod source;
/// Namespace x type x name item table.
pub mod table;
#[cfg(test)]
mod testing;
/// Element trees and parsing.
pub mod xml;

pub use cache::{FsFingerprinter, Fingerprinter};
pub use config::{CacheConfig, IdleModeConfig, Namespacing, RepositoryConfig, ScanConfig};
pub use context::RepositoryContext;
pub use error::{CacheError, ConfigError, DocumentError, ParseError, RepositoryError};
pub use events::{ChangeEvent, ChangeReasons, FsEvent};
pub use file::{FileMode, ResourceFile};
pub use gate::ModelGate;
pub use item::{ItemBody, ItemSource, ResourceItem, ResourceValue};
pub use live::{DocumentProvider, DocumentStore, EditKind, LiveDocument, SharedDocument, StructuralEdit, TagId};
pub use manager::RepositoryManager;
pub use merging::MergingRepository;
pub use module::{LibrarySpec, ModuleSpec, ProjectModel};
pub use problems::{CollectedProblems, LogProblems, Problem, ProblemSink};
pub use registry::FolderRegistry;
pub use repository::{Invalidation, InvalidationTarget, RepositoryId, ResourceRepository};
pub use router::{ChangeRouter, ListenerId, ResourceChangeListener};
pub use source::{LoadStats, SourceRepository};
pub use table::{NameMap, ResourceTable};
pub use xml::{ResourceParser, RoxmlParser, XmlAttribute, XmlElement, XmlNode};
