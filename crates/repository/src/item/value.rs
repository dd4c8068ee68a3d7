//! Typed resource values.
//!
//! Values are computed from an item's element by one function,
//! [`parse_value`], that switches on the resource type.

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use resrepo_primitives::{ResourceType, ResourceUrl};

use crate::xml::XmlElement;

bitflags! {
	/// Formats accepted by an `<attr>`.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct AttrFormats: u16 {
		const REFERENCE = 1 << 0;
		const STRING = 1 << 1;
		const COLOR = 1 << 2;
		const DIMENSION = 1 << 3;
		const BOOLEAN = 1 << 4;
		const INTEGER = 1 << 5;
		const FLOAT = 1 << 6;
		const FRACTION = 1 << 7;
		const ENUM = 1 << 8;
		const FLAGS = 1 << 9;
	}
}

impl AttrFormats {
	/// Parses a `format="color|reference"` attribute, ignoring unknown names.
	pub fn parse(formats: &str) -> Self {
		formats
			.split('|')
			.map(|name| match name.trim() {
				"reference" => Self::REFERENCE,
				"string" => Self::STRING,
				"color" => Self::COLOR,
				"dimension" => Self::DIMENSION,
				"boolean" => Self::BOOLEAN,
				"integer" => Self::INTEGER,
				"float" => Self::FLOAT,
				"fraction" => Self::FRACTION,
				"enum" => Self::ENUM,
				"flags" => Self::FLAGS,
				_ => Self::empty(),
			})
			.fold(Self::empty(), |acc, f| acc | f)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleItem {
	pub name: String,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleValue {
	/// Explicit `parent` attribute, or the prefix of a dotted name.
	pub parent: Option<String>,
	pub items: Vec<StyleItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrValue {
	pub formats: AttrFormats,
	/// Enum or flag names with their numeric value, when it parses.
	pub values: Vec<(String, Option<i64>)>,
}

/// Computed value of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceValue {
	/// Literal text (strings, colors, dimensions, booleans, integers).
	Scalar(String),
	Reference(ResourceUrl),
	/// `@null` or `@empty`.
	Null,
	/// File-backed resource.
	File(PathBuf),
	Id,
	Style(StyleValue),
	Array(Vec<String>),
	/// `(quantity, text)` pairs.
	Plurals(Vec<(String, String)>),
	/// Attribute names referenced by a `<declare-styleable>`.
	Styleable(Vec<String>),
	Attr(AttrValue),
}

impl ResourceValue {
	pub fn as_scalar(&self) -> Option<&str> {
		match self {
			Self::Scalar(text) => Some(text),
			_ => None,
		}
	}
}

/// Computes the value of an item of type `kind` named `name`.
///
/// `element` is the declaring tag for value resources; `file` is the backing
/// file for file resources.
pub fn parse_value(kind: ResourceType, name: &str, element: Option<&XmlElement>, file: Option<&Path>) -> ResourceValue {
	if kind == ResourceType::Id && element.is_none_or(|e| e.name != "item") {
		return ResourceValue::Id;
	}
	let Some(element) = element else {
		return match file {
			Some(path) => ResourceValue::File(path.to_path_buf()),
			None => ResourceValue::Null,
		};
	};
	match kind {
		ResourceType::Style => ResourceValue::Style(parse_style(name, element)),
		ResourceType::Array => ResourceValue::Array(element.child_elements().filter(|c| c.name == "item").map(|c| scalar_text(c, true)).collect()),
		ResourceType::Plurals => ResourceValue::Plurals(
			element
				.child_elements()
				.filter(|c| c.name == "item")
				.filter_map(|c| Some((c.attr("quantity")?.to_string(), scalar_text(c, true))))
				.collect(),
		),
		ResourceType::Styleable => ResourceValue::Styleable(element.child_elements().filter(|c| c.name == "attr").filter_map(|c| c.attr("name").map(str::to_string)).collect()),
		ResourceType::Attr => ResourceValue::Attr(parse_attr(element)),
		ResourceType::Id => ResourceValue::Id,
		ResourceType::String => classify(scalar_text(element, true)),
		_ => classify(scalar_text(element, false)),
	}
}

fn classify(text: String) -> ResourceValue {
	if ResourceUrl::is_reference(&text) {
		match ResourceUrl::parse(&text) {
			Ok(Some(url)) => return ResourceValue::Reference(url),
			Ok(None) => return ResourceValue::Null,
			// `?` and `@` also start plain strings such as "@home".
			Err(_) => {}
		}
	}
	ResourceValue::Scalar(text)
}

fn scalar_text(element: &XmlElement, string_rules: bool) -> String {
	let raw = element.text();
	if string_rules { unescape_string(&raw) } else { raw.trim().to_string() }
}

fn parse_style(name: &str, element: &XmlElement) -> StyleValue {
	let parent = match element.attr("parent") {
		Some(parent) => Some(parent.trim_start_matches("@style/").to_string()).filter(|p| !p.is_empty()),
		None => name.rsplit_once('.').map(|(prefix, _)| prefix.to_string()),
	};
	let items = element
		.child_elements()
		.filter(|c| c.name == "item")
		.filter_map(|c| {
			Some(StyleItem {
				name: c.attr("name")?.to_string(),
				value: c.text().trim().to_string(),
			})
		})
		.collect();
	StyleValue { parent, items }
}

fn parse_attr(element: &XmlElement) -> AttrValue {
	let mut formats = element.attr("format").map(AttrFormats::parse).unwrap_or_default();
	let mut values = Vec::new();
	for child in element.child_elements() {
		let format = match child.name.as_str() {
			"enum" => AttrFormats::ENUM,
			"flag" => AttrFormats::FLAGS,
			_ => continue,
		};
		formats |= format;
		if let Some(name) = child.attr("name") {
			values.push((name.to_string(), child.attr("value").and_then(parse_int)));
		}
	}
	AttrValue { formats, values }
}

fn parse_int(value: &str) -> Option<i64> {
	let value = value.trim();
	match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
		Some(hex) => i64::from_str_radix(hex, 16).ok(),
		None => value.parse().ok(),
	}
}

/// Applies string resource rules: whitespace outside quotes collapses to a
/// single space, leading/trailing whitespace is dropped, double quotes are
/// removed, and backslash escapes are resolved.
pub fn unescape_string(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	let mut quoted = false;
	let mut pending_space = false;
	let mut chars = raw.chars();
	while let Some(c) = chars.next() {
		match c {
			'"' => {
				quoted = !quoted;
				continue;
			}
			'\\' => {
				if pending_space && !out.is_empty() {
					out.push(' ');
				}
				pending_space = false;
				match chars.next() {
					Some('n') => out.push('\n'),
					Some('t') => out.push('\t'),
					Some('u') => {
						let hex: String = chars.by_ref().take(4).collect();
						match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
							Some(ch) => out.push(ch),
							None => out.push_str(&hex),
						}
					}
					Some(other) => out.push(other),
					None => {}
				}
				continue;
			}
			c if c.is_whitespace() && !quoted => {
				pending_space = true;
				continue;
			}
			_ => {}
		}
		if pending_space && !out.is_empty() {
			out.push(' ');
		}
		pending_space = false;
		out.push(c);
	}
	out
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn parse(kind: ResourceType, name: &str, element: XmlElement) -> ResourceValue {
		parse_value(kind, name, Some(&element), None)
	}

	#[test]
	fn strings_follow_escaping_rules() {
		assert_eq!(unescape_string("  Hello \n   world  "), "Hello world");
		assert_eq!(unescape_string("\"  keep  spaces \""), "  keep  spaces ");
		assert_eq!(unescape_string(r#"It\'s a \"test\"\n"#), "It's a \"test\"\n");
		assert_eq!(unescape_string(r"été"), "été");
	}

	#[test]
	fn scalars_and_references() {
		let value = parse(ResourceType::String, "app_name", XmlElement::new("string").with_text(" Foo "));
		assert_eq!(value, ResourceValue::Scalar("Foo".into()));

		let value = parse(ResourceType::Color, "accent", XmlElement::new("color").with_text("@color/red"));
		assert_eq!(value, ResourceValue::Reference(ResourceUrl::new(ResourceType::Color, "red")));

		let value = parse(ResourceType::Drawable, "none", XmlElement::new("drawable").with_text("@null"));
		assert_eq!(value, ResourceValue::Null);

		let value = parse(ResourceType::String, "handle", XmlElement::new("string").with_text("@home"));
		assert_eq!(value, ResourceValue::Scalar("@home".into()));
	}

	#[test]
	fn style_parent_is_explicit_or_implied() {
		let style = XmlElement::new("style")
			.with_attr("name", "Theme.App")
			.with_child(XmlElement::new("item").with_attr("name", "colorPrimary").with_text("@color/red"));
		let ResourceValue::Style(value) = parse(ResourceType::Style, "Theme.App", style) else {
			panic!("expected style");
		};
		assert_eq!(value.parent.as_deref(), Some("Theme"));
		assert_eq!(value.items, vec![StyleItem { name: "colorPrimary".into(), value: "@color/red".into() }]);

		let style = XmlElement::new("style").with_attr("parent", "@style/Base");
		let ResourceValue::Style(value) = parse(ResourceType::Style, "Theme.App", style) else {
			panic!("expected style");
		};
		assert_eq!(value.parent.as_deref(), Some("Base"));
	}

	#[test]
	fn arrays_plurals_and_styleables() {
		let array = XmlElement::new("string-array")
			.with_child(XmlElement::new("item").with_text("one"))
			.with_child(XmlElement::new("item").with_text("two"));
		assert_eq!(parse(ResourceType::Array, "a", array), ResourceValue::Array(vec!["one".into(), "two".into()]));

		let plurals = XmlElement::new("plurals").with_child(XmlElement::new("item").with_attr("quantity", "one").with_text("%d song"));
		assert_eq!(parse(ResourceType::Plurals, "p", plurals), ResourceValue::Plurals(vec![("one".into(), "%d song".into())]));

		let styleable = XmlElement::new("declare-styleable")
			.with_child(XmlElement::new("attr").with_attr("name", "size").with_attr("format", "dimension"))
			.with_child(XmlElement::new("attr").with_attr("name", "android:text"));
		assert_eq!(parse(ResourceType::Styleable, "View", styleable), ResourceValue::Styleable(vec!["size".into(), "android:text".into()]));
	}

	#[test]
	fn attrs_collect_formats_and_values() {
		let attr = XmlElement::new("attr")
			.with_attr("name", "mode")
			.with_attr("format", "integer")
			.with_child(XmlElement::new("enum").with_attr("name", "fast").with_attr("value", "0x10"))
			.with_child(XmlElement::new("enum").with_attr("name", "slow").with_attr("value", "bogus"));
		let ResourceValue::Attr(value) = parse(ResourceType::Attr, "mode", attr) else {
			panic!("expected attr");
		};
		assert_eq!(value.formats, AttrFormats::INTEGER | AttrFormats::ENUM);
		assert_eq!(value.values, vec![("fast".into(), Some(16)), ("slow".into(), None)]);
	}

	#[test]
	fn ids_and_files() {
		assert_eq!(parse_value(ResourceType::Id, "button", None, None), ResourceValue::Id);
		let path = Path::new("/res/layout/main.xml");
		assert_eq!(parse_value(ResourceType::Layout, "main", None, Some(path)), ResourceValue::File(path.to_path_buf()));
	}
}
