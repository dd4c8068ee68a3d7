//! Core vocabulary for resource repositories: resource and folder types,
//! namespaces, qualifier configurations, names and references.

/// Resource name validation and id prefix helpers.
pub mod name;
/// Resource namespaces.
pub mod namespace;
/// Folder qualifier parsing and canonical configurations.
pub mod qualifiers;
/// Resource and resource folder types.
pub mod resource_type;
/// Resource references (`@type/name`).
pub mod url;

pub use name::{InvalidName, is_valid_value_name, resource_name_for_file, validate_file_resource_name, validate_value_name};
pub use namespace::{ANDROID_URI, AUTO_URI, ResourceNamespace};
pub use qualifiers::{FolderConfiguration, LocaleQualifier, Qualifier, QualifierError, QualifierKind};
pub use resource_type::{ResourceFolderType, ResourceType, UnknownName};
pub use url::{ResourceUrl, UrlError};
