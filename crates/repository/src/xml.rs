//! Detached XML element trees and the parser boundary.
//!
//! [`XmlElement`] is the static form every resource value is computed from:
//! files parsed from disk, cache-loaded items, and snapshots of live
//! documents all end up as the same tree. Comments are not part of the tree.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One attribute. Names keep their prefix (`android:id`, `xmlns:tools`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlAttribute {
	pub name: String,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XmlNode {
	Element(XmlElement),
	Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XmlElement {
	pub name: String,
	pub attributes: Vec<XmlAttribute>,
	pub children: Vec<XmlNode>,
}

impl XmlElement {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	/// Builder: appends an attribute.
	pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.push(XmlAttribute {
			name: name.into(),
			value: value.into(),
		});
		self
	}

	/// Builder: appends a text node.
	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.children.push(XmlNode::Text(text.into()));
		self
	}

	/// Builder: appends a child element.
	pub fn with_child(mut self, child: XmlElement) -> Self {
		self.children.push(XmlNode::Element(child));
		self
	}

	pub fn attr(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
	}

	pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
		self.children.iter().filter_map(|child| match child {
			XmlNode::Element(element) => Some(element),
			XmlNode::Text(_) => None,
		})
	}

	pub fn has_child_elements(&self) -> bool {
		self.child_elements().next().is_some()
	}

	/// Concatenated text of this element and all descendants.
	pub fn text(&self) -> String {
		let mut out = String::new();
		self.collect_text(&mut out);
		out
	}

	fn collect_text(&self, out: &mut String) {
		for child in &self.children {
			match child {
				XmlNode::Text(text) => out.push_str(text),
				XmlNode::Element(element) => element.collect_text(out),
			}
		}
	}

	/// Depth-first pre-order walk over this element and its descendants.
	pub fn walk(&self, visit: &mut impl FnMut(&XmlElement)) {
		visit(self);
		for child in self.child_elements() {
			child.walk(visit);
		}
	}

	/// Serializes the tree as an XML document.
	pub fn to_document_string(&self) -> String {
		let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
		self.write_to(&mut out);
		out.push('\n');
		out
	}

	fn write_to(&self, out: &mut String) {
		out.push('<');
		out.push_str(&self.name);
		for attr in &self.attributes {
			out.push(' ');
			out.push_str(&attr.name);
			out.push_str("=\"");
			escape_into(&attr.value, true, out);
			out.push('"');
		}
		if self.children.is_empty() {
			out.push_str("/>");
			return;
		}
		out.push('>');
		for child in &self.children {
			match child {
				XmlNode::Text(text) => escape_into(text, false, out),
				XmlNode::Element(element) => element.write_to(out),
			}
		}
		out.push_str("</");
		out.push_str(&self.name);
		out.push('>');
	}
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' if attribute => out.push_str("&quot;"),
			c => out.push(c),
		}
	}
}

/// Turns file bytes into an element tree.
pub trait ResourceParser: Send + Sync {
	fn parse(&self, path: &Path, bytes: &[u8]) -> Result<XmlElement, ParseError>;
}

/// [`ResourceParser`] backed by `roxmltree`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoxmlParser;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

impl ResourceParser for RoxmlParser {
	fn parse(&self, path: &Path, bytes: &[u8]) -> Result<XmlElement, ParseError> {
		let text = std::str::from_utf8(bytes).map_err(|_| ParseError::Encoding { path: path.to_path_buf() })?;
		let text = text.strip_prefix('\u{feff}').unwrap_or(text);
		let doc = roxmltree::Document::parse(text).map_err(|err| ParseError::Xml {
			path: path.to_path_buf(),
			message: err.to_string(),
		})?;
		Ok(convert(doc.root_element(), None))
	}
}

/// Namespace declarations made on `node` itself, as `xmlns` attributes.
fn declarations(node: roxmltree::Node<'_, '_>, parent: Option<roxmltree::Node<'_, '_>>) -> Vec<XmlAttribute> {
	let inherited = |ns: &roxmltree::Namespace<'_>| parent.is_some_and(|parent| parent.namespaces().any(|other| other.name() == ns.name() && other.uri() == ns.uri()));
	node.namespaces()
		.filter(|ns| ns.uri() != XML_NS && !inherited(ns))
		.map(|ns| XmlAttribute {
			name: match ns.name() {
				Some(prefix) => format!("xmlns:{prefix}"),
				None => "xmlns".to_string(),
			},
			value: ns.uri().to_string(),
		})
		.collect()
}

fn qualified(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
	match namespace.and_then(|uri| node.lookup_prefix(uri)) {
		Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
		_ => local.to_string(),
	}
}

fn convert(node: roxmltree::Node<'_, '_>, parent: Option<roxmltree::Node<'_, '_>>) -> XmlElement {
	let tag = node.tag_name();
	let mut element = XmlElement::new(qualified(node, tag.namespace(), tag.name()));
	element.attributes = declarations(node, parent);
	element.attributes.extend(node.attributes().map(|attr| XmlAttribute {
		name: qualified(node, attr.namespace(), attr.name()),
		value: attr.value().to_string(),
	}));
	for child in node.children() {
		if child.is_element() {
			element.children.push(XmlNode::Element(convert(child, Some(node))));
		} else if child.is_text()
			&& let Some(text) = child.text()
		{
			// Adjacent runs split by a comment become one node.
			match element.children.last_mut() {
				Some(XmlNode::Text(previous)) => previous.push_str(text),
				_ => element.children.push(XmlNode::Text(text.to_string())),
			}
		}
	}
	element
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	const LAYOUT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android" android:orientation="vertical">
	<!-- header -->
	<TextView android:id="@+id/title" android:text="a &amp; b"/>
</LinearLayout>"#;

	#[test]
	fn parses_prefixed_attributes_and_declarations() {
		let root = RoxmlParser.parse(Path::new("main.xml"), LAYOUT.as_bytes()).unwrap();
		assert_eq!(root.name, "LinearLayout");
		assert_eq!(root.attr("xmlns:android"), Some("http://schemas.android.com/apk/res/android"));
		assert_eq!(root.attr("android:orientation"), Some("vertical"));
		let text_view = root.child_elements().next().unwrap();
		assert_eq!(text_view.attr("android:id"), Some("@+id/title"));
		assert_eq!(text_view.attr("android:text"), Some("a & b"));
	}

	#[test]
	fn serialization_reparses_to_same_tree() {
		let root = RoxmlParser.parse(Path::new("main.xml"), LAYOUT.as_bytes()).unwrap();
		let again = RoxmlParser.parse(Path::new("main.xml"), root.to_document_string().as_bytes()).unwrap();
		assert_eq!(root, again);
	}

	#[test]
	fn malformed_input_is_a_parse_error() {
		let err = RoxmlParser.parse(Path::new("bad.xml"), b"<resources><string>").unwrap_err();
		assert!(matches!(err, ParseError::Xml { .. }));
		assert_eq!(err.path(), Path::new("bad.xml"));
		let err = RoxmlParser.parse(Path::new("bin.xml"), &[0xff, 0xfe, 0x00]).unwrap_err();
		assert!(matches!(err, ParseError::Encoding { .. }));
	}

	#[test]
	fn text_concatenates_descendants() {
		let element = XmlElement::new("string").with_text("Hello ").with_child(XmlElement::new("b").with_text("world"));
		assert_eq!(element.text(), "Hello world");
	}
}
