//! Resource name rules.

/// Prefix of an attribute value declaring a new id (`@+id/name`).
pub const NEW_ID_PREFIX: &str = "@+id/";

/// Prefix of an attribute value referencing an existing id (`@id/name`).
pub const ID_PREFIX: &str = "@id/";

/// Why a resource name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidName {
	#[error("resource name is empty")]
	Empty,
	#[error("'{name}' must start with a letter or underscore")]
	BadStart { name: String },
	#[error("'{name}' contains invalid character '{ch}'")]
	BadChar { name: String, ch: char },
	#[error("'{name}' is a reserved keyword")]
	Keyword { name: String },
}

const KEYWORDS: &[&str] = &[
	"abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const", "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
	"finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
	"return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Validates the name of a value resource (`<string name="...">`).
///
/// Dots, dashes and colons are allowed and map to underscores in generated
/// field names; every dot-separated segment must still be a valid
/// identifier.
pub fn validate_value_name(name: &str) -> Result<(), InvalidName> {
	let name = name.strip_prefix("android:").unwrap_or(name);
	if name.is_empty() {
		return Err(InvalidName::Empty);
	}
	let mut chars = name.chars();
	if let Some(first) = chars.next()
		&& !(first.is_alphabetic() || first == '_')
	{
		return Err(InvalidName::BadStart { name: name.to_string() });
	}
	if let Some(ch) = chars.find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ':'))) {
		return Err(InvalidName::BadChar { name: name.to_string(), ch });
	}
	if KEYWORDS.contains(&name) {
		return Err(InvalidName::Keyword { name: name.to_string() });
	}
	Ok(())
}

pub fn is_valid_value_name(name: &str) -> bool {
	validate_value_name(name).is_ok()
}

/// Validates a resource name derived from a file name.
///
/// File resources are restricted to lowercase letters, digits and
/// underscores.
pub fn validate_file_resource_name(name: &str) -> Result<(), InvalidName> {
	if name.is_empty() {
		return Err(InvalidName::Empty);
	}
	if name.starts_with(|c: char| c.is_ascii_digit()) {
		return Err(InvalidName::BadStart { name: name.to_string() });
	}
	if let Some(ch) = name.chars().find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')) {
		return Err(InvalidName::BadChar { name: name.to_string(), ch });
	}
	if KEYWORDS.contains(&name) {
		return Err(InvalidName::Keyword { name: name.to_string() });
	}
	Ok(())
}

/// Resource name of a file: everything before the first dot.
///
/// `tab_press.9.png` is `tab_press`.
pub fn resource_name_for_file(file_name: &str) -> &str {
	file_name.split_once('.').map_or(file_name, |(stem, _)| stem)
}

/// Extracts the id name from an `@+id/name` attribute value.
pub fn new_id_name(value: &str) -> Option<&str> {
	value.strip_prefix(NEW_ID_PREFIX).filter(|name| !name.is_empty())
}

/// Extracts the id name from an `@id/name` attribute value.
pub fn existing_id_name(value: &str) -> Option<&str> {
	value.strip_prefix(ID_PREFIX).filter(|name| !name.is_empty())
}

/// Java-style field name for a resource name (`Theme.App` becomes `Theme_App`).
pub fn field_name(name: &str) -> String {
	name.chars().map(|c| if matches!(c, '.' | '-' | ':') { '_' } else { c }).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn value_names() {
		assert!(is_valid_value_name("app_name"));
		assert!(is_valid_value_name("Theme.App.Dark"));
		assert!(is_valid_value_name("android:textColor"));
		assert_eq!(validate_value_name(""), Err(InvalidName::Empty));
		assert_eq!(validate_value_name("1abc"), Err(InvalidName::BadStart { name: "1abc".into() }));
		assert_eq!(validate_value_name("a b"), Err(InvalidName::BadChar { name: "a b".into(), ch: ' ' }));
		assert_eq!(validate_value_name("class"), Err(InvalidName::Keyword { name: "class".into() }));
	}

	#[test]
	fn file_names() {
		assert_eq!(resource_name_for_file("tab_press.9.png"), "tab_press");
		assert_eq!(resource_name_for_file("raw_blob"), "raw_blob");
		assert!(validate_file_resource_name("activity_main").is_ok());
		assert!(validate_file_resource_name("ActivityMain").is_err());
	}

	#[test]
	fn id_prefixes() {
		assert_eq!(new_id_name("@+id/button"), Some("button"));
		assert_eq!(new_id_name("@+id/"), None);
		assert_eq!(new_id_name("@id/button"), None);
		assert_eq!(existing_id_name("@id/button"), Some("button"));
		assert_eq!(field_name("Theme.App-x"), "Theme_App_x");
	}
}
