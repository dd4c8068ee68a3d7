//! Resource types and resource folder types.
//!
//! A [`ResourceType`] names the kind of a single resource (`string`, `layout`,
//! `styleable`, ...). A [`ResourceFolderType`] names the kind of a resource
//! *folder* (`values`, `layout`, `drawable`, ...). The relationship between
//! the two is many-to-many: a `values` folder produces value resources of
//! almost every type, a `layout` folder produces `layout` items plus inline
//! `id` items.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a single resource declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
	Anim,
	Animator,
	Array,
	Attr,
	Bool,
	Color,
	Dimen,
	Drawable,
	Font,
	Fraction,
	Id,
	Integer,
	Interpolator,
	Layout,
	Menu,
	Mipmap,
	Navigation,
	Plurals,
	Raw,
	String,
	Style,
	Styleable,
	Transition,
	Xml,
}

impl ResourceType {
	/// Every resource type, in declaration order.
	pub const ALL: [ResourceType; 24] = [
		Self::Anim,
		Self::Animator,
		Self::Array,
		Self::Attr,
		Self::Bool,
		Self::Color,
		Self::Dimen,
		Self::Drawable,
		Self::Font,
		Self::Fraction,
		Self::Id,
		Self::Integer,
		Self::Interpolator,
		Self::Layout,
		Self::Menu,
		Self::Mipmap,
		Self::Navigation,
		Self::Plurals,
		Self::Raw,
		Self::String,
		Self::Style,
		Self::Styleable,
		Self::Transition,
		Self::Xml,
	];

	/// Name used in resource references (`@string/foo`) and `<item type="...">`.
	pub const fn name(self) -> &'static str {
		match self {
			Self::Anim => "anim",
			Self::Animator => "animator",
			Self::Array => "array",
			Self::Attr => "attr",
			Self::Bool => "bool",
			Self::Color => "color",
			Self::Dimen => "dimen",
			Self::Drawable => "drawable",
			Self::Font => "font",
			Self::Fraction => "fraction",
			Self::Id => "id",
			Self::Integer => "integer",
			Self::Interpolator => "interpolator",
			Self::Layout => "layout",
			Self::Menu => "menu",
			Self::Mipmap => "mipmap",
			Self::Navigation => "navigation",
			Self::Plurals => "plurals",
			Self::Raw => "raw",
			Self::String => "string",
			Self::Style => "style",
			Self::Styleable => "styleable",
			Self::Transition => "transition",
			Self::Xml => "xml",
		}
	}

	/// Looks up a type by its reference name.
	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|ty| ty.name() == name)
	}

	/// Classifies a child tag of a `<resources>` element.
	///
	/// `type_attr` is the value of the tag's `type` attribute, consulted for
	/// `<item>` tags only. Returns `None` for tags that do not declare a
	/// resource (`<public>`, `<eat-comment>`, `<skip>`, unknown tags).
	pub fn from_value_tag(tag: &str, type_attr: Option<&str>) -> Option<Self> {
		match tag {
			"item" => type_attr.and_then(Self::from_name).filter(|ty| *ty != Self::Styleable),
			"declare-styleable" => Some(Self::Styleable),
			"string-array" | "integer-array" | "array" => Some(Self::Array),
			"styleable" | "public" | "public-group" | "eat-comment" | "skip" => None,
			other => Self::from_name(other),
		}
	}

	/// Tag name used when this type is declared in a values file.
	pub const fn value_tag(self) -> &'static str {
		match self {
			Self::Styleable => "declare-styleable",
			other => other.name(),
		}
	}

	/// Whether several same-key declarations of this type coexist instead of
	/// shadowing each other.
	pub const fn allows_duplicates(self) -> bool {
		matches!(self, Self::Id | Self::Styleable)
	}

	/// Whether items of this type can be declared inside a values file.
	pub const fn is_value_type(self) -> bool {
		!matches!(
			self,
			Self::Anim | Self::Animator | Self::Font | Self::Interpolator | Self::Layout | Self::Menu | Self::Mipmap | Self::Navigation | Self::Raw | Self::Transition | Self::Xml
		)
	}
}

impl fmt::Display for ResourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for ResourceType {
	type Err = UnknownName;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_name(s).ok_or_else(|| UnknownName(s.to_string()))
	}
}

/// Kind of a resource folder, derived from the folder name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceFolderType {
	Anim,
	Animator,
	Color,
	Drawable,
	Font,
	Interpolator,
	Layout,
	Menu,
	Mipmap,
	Navigation,
	Raw,
	Transition,
	Values,
	Xml,
}

impl ResourceFolderType {
	pub const ALL: [ResourceFolderType; 14] = [
		Self::Anim,
		Self::Animator,
		Self::Color,
		Self::Drawable,
		Self::Font,
		Self::Interpolator,
		Self::Layout,
		Self::Menu,
		Self::Mipmap,
		Self::Navigation,
		Self::Raw,
		Self::Transition,
		Self::Values,
		Self::Xml,
	];

	/// Folder name prefix (`values`, `layout`, ...).
	pub const fn name(self) -> &'static str {
		match self {
			Self::Anim => "anim",
			Self::Animator => "animator",
			Self::Color => "color",
			Self::Drawable => "drawable",
			Self::Font => "font",
			Self::Interpolator => "interpolator",
			Self::Layout => "layout",
			Self::Menu => "menu",
			Self::Mipmap => "mipmap",
			Self::Navigation => "navigation",
			Self::Raw => "raw",
			Self::Transition => "transition",
			Self::Values => "values",
			Self::Xml => "xml",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|ty| ty.name() == name)
	}

	/// Splits a folder name into its type and the (possibly empty) qualifier
	/// suffix, e.g. `values-fr-rCA` becomes `(Values, "fr-rCA")`.
	pub fn split_folder_name(folder: &str) -> Option<(Self, &str)> {
		let (prefix, rest) = match folder.split_once('-') {
			Some((prefix, rest)) => (prefix, rest),
			None => (folder, ""),
		};
		Some((Self::from_name(prefix)?, rest))
	}

	/// Resource type of the single item produced by each file in this folder.
	///
	/// `None` for `values`, whose files declare any number of value items.
	pub const fn file_resource_type(self) -> Option<ResourceType> {
		Some(match self {
			Self::Anim => ResourceType::Anim,
			Self::Animator => ResourceType::Animator,
			Self::Color => ResourceType::Color,
			Self::Drawable => ResourceType::Drawable,
			Self::Font => ResourceType::Font,
			Self::Interpolator => ResourceType::Interpolator,
			Self::Layout => ResourceType::Layout,
			Self::Menu => ResourceType::Menu,
			Self::Mipmap => ResourceType::Mipmap,
			Self::Navigation => ResourceType::Navigation,
			Self::Raw => ResourceType::Raw,
			Self::Transition => ResourceType::Transition,
			Self::Xml => ResourceType::Xml,
			Self::Values => return None,
		})
	}

	/// Whether XML files in this folder may declare `@+id/` resources inline.
	pub const fn is_id_generating(self) -> bool {
		matches!(self, Self::Layout | Self::Menu | Self::Navigation)
	}

	/// Resource types that files in this folder can contribute.
	pub fn related_types(self) -> Vec<ResourceType> {
		match self {
			Self::Values => ResourceType::ALL.into_iter().filter(|ty| ty.is_value_type()).collect(),
			other => {
				let mut types = Vec::with_capacity(2);
				types.extend(other.file_resource_type());
				if other.is_id_generating() {
					types.push(ResourceType::Id);
				}
				types
			}
		}
	}
}

impl fmt::Display for ResourceFolderType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// A name that does not match any known resource or folder type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type: {0}")]
pub struct UnknownName(pub String);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn value_tags_classify_to_types() {
		assert_eq!(ResourceType::from_value_tag("string", None), Some(ResourceType::String));
		assert_eq!(ResourceType::from_value_tag("string-array", None), Some(ResourceType::Array));
		assert_eq!(ResourceType::from_value_tag("declare-styleable", None), Some(ResourceType::Styleable));
		assert_eq!(ResourceType::from_value_tag("item", Some("dimen")), Some(ResourceType::Dimen));
		assert_eq!(ResourceType::from_value_tag("item", None), None);
		assert_eq!(ResourceType::from_value_tag("public", None), None);
		assert_eq!(ResourceType::from_value_tag("bogus", None), None);
	}

	#[test]
	fn folder_names_split_into_type_and_qualifiers() {
		assert_eq!(ResourceFolderType::split_folder_name("values"), Some((ResourceFolderType::Values, "")));
		assert_eq!(ResourceFolderType::split_folder_name("values-fr-rCA"), Some((ResourceFolderType::Values, "fr-rCA")));
		assert_eq!(ResourceFolderType::split_folder_name("mipmap-anydpi-v26"), Some((ResourceFolderType::Mipmap, "anydpi-v26")));
		assert_eq!(ResourceFolderType::split_folder_name("assets"), None);
	}

	#[test]
	fn id_generating_folders_contribute_ids() {
		assert_eq!(ResourceFolderType::Layout.related_types(), vec![ResourceType::Layout, ResourceType::Id]);
		assert_eq!(ResourceFolderType::Drawable.related_types(), vec![ResourceType::Drawable]);
		assert!(ResourceFolderType::Values.related_types().contains(&ResourceType::Styleable));
		assert!(!ResourceFolderType::Values.related_types().contains(&ResourceType::Layout));
	}
}
