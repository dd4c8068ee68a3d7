use std::fmt;
use std::str::FromStr;

use crate::resource_type::ResourceType;

/// Parsed resource reference such as `@string/app_name`,
/// `@android:color/white`, `@+id/button` or `?attr/colorPrimary`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUrl {
	pub namespace: Option<String>,
	pub kind: ResourceType,
	pub name: String,
	/// `@+` form, declaring the resource on first use.
	pub create: bool,
	/// `?` form, resolved against the current theme.
	pub theme: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
	#[error("'{0}' is not a resource reference")]
	NotAReference(String),
	#[error("unknown resource type in '{0}'")]
	UnknownType(String),
	#[error("missing resource name in '{0}'")]
	MissingName(String),
}

impl ResourceUrl {
	pub fn new(kind: ResourceType, name: impl Into<String>) -> Self {
		Self {
			namespace: None,
			kind,
			name: name.into(),
			create: false,
			theme: false,
		}
	}

	/// Parses a reference, or returns `Ok(None)` for the null references
	/// `@null` and `@empty`.
	pub fn parse(value: &str) -> Result<Option<Self>, UrlError> {
		let value = value.trim();
		if matches!(value, "@null" | "@empty") {
			return Ok(None);
		}
		let (theme, rest) = if let Some(rest) = value.strip_prefix('?') {
			(true, rest)
		} else if let Some(rest) = value.strip_prefix('@') {
			(false, rest)
		} else {
			return Err(UrlError::NotAReference(value.to_string()));
		};
		let (create, rest) = match rest.strip_prefix('+') {
			Some(rest) if !theme => (true, rest),
			_ => (false, rest),
		};
		let rest = rest.strip_prefix('*').unwrap_or(rest);

		let (head, name) = match rest.split_once('/') {
			Some((head, name)) => (Some(head), name),
			None if theme => (None, rest),
			None => return Err(UrlError::MissingName(value.to_string())),
		};
		// `?android:attr/foo`, `?android:foo`, `@android:string/foo`
		let (namespace, kind_name, name) = match head {
			Some(head) => match head.split_once(':') {
				Some((ns, kind)) => (Some(ns), Some(kind), name),
				None => (None, Some(head), name),
			},
			None => match name.split_once(':') {
				Some((ns, name)) => (Some(ns), None, name),
				None => (None, None, name),
			},
		};
		let kind = match kind_name {
			Some(kind) => ResourceType::from_name(kind).ok_or_else(|| UrlError::UnknownType(value.to_string()))?,
			None => ResourceType::Attr,
		};
		if name.is_empty() {
			return Err(UrlError::MissingName(value.to_string()));
		}
		Ok(Some(Self {
			namespace: namespace.map(str::to_string),
			kind,
			name: name.to_string(),
			create,
			theme,
		}))
	}

	/// Whether `value` looks like a reference (starts with `@` or `?`).
	pub fn is_reference(value: &str) -> bool {
		let value = value.trim_start();
		value.starts_with('@') || value.starts_with('?')
	}
}

impl fmt::Display for ResourceUrl {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(if self.theme { "?" } else { "@" })?;
		if self.create {
			f.write_str("+")?;
		}
		if let Some(ns) = &self.namespace {
			write!(f, "{ns}:")?;
		}
		write!(f, "{}/{}", self.kind, self.name)
	}
}

impl FromStr for ResourceUrl {
	type Err = UrlError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)?.ok_or_else(|| UrlError::NotAReference(s.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_plain_and_namespaced_references() {
		let url: ResourceUrl = "@string/app_name".parse().unwrap();
		assert_eq!(url, ResourceUrl::new(ResourceType::String, "app_name"));

		let url: ResourceUrl = "@android:color/white".parse().unwrap();
		assert_eq!(url.namespace.as_deref(), Some("android"));
		assert_eq!(url.kind, ResourceType::Color);
		assert_eq!(url.to_string(), "@android:color/white");
	}

	#[test]
	fn parses_new_ids_and_theme_attrs() {
		let url: ResourceUrl = "@+id/button".parse().unwrap();
		assert!(url.create);
		assert_eq!(url.kind, ResourceType::Id);

		let url: ResourceUrl = "?colorPrimary".parse().unwrap();
		assert!(url.theme);
		assert_eq!(url.kind, ResourceType::Attr);
		assert_eq!(url.name, "colorPrimary");

		let url: ResourceUrl = "?android:attr/textColor".parse().unwrap();
		assert_eq!(url.namespace.as_deref(), Some("android"));
		assert_eq!(url.to_string(), "?android:attr/textColor");
	}

	#[test]
	fn null_and_malformed_references() {
		assert_eq!(ResourceUrl::parse("@null"), Ok(None));
		assert!(matches!(ResourceUrl::parse("hello"), Err(UrlError::NotAReference(_))));
		assert!(matches!(ResourceUrl::parse("@bogus/x"), Err(UrlError::UnknownType(_))));
		assert!(matches!(ResourceUrl::parse("@string"), Err(UrlError::MissingName(_))));
	}
}
