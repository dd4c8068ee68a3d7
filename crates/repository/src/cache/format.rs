//! On-disk records of the persistent cache.
//!
//! # Layout
//!
//! | Offset | Content |
//! |---|---|
//! | 0 | [`MAGIC`] (8 bytes) |
//! | 8 | [`SCHEMA_VERSION`] (u32, little endian) |
//! | 12 | postcard [`CacheHeader`] |
//! | .. | postcard [`CachePayload`] |
//!
//! The header is decoded on its own first so a directory or version
//! mismatch is detected without decoding the payload.

use std::path::PathBuf;

use resrepo_primitives::{ResourceFolderType, ResourceNamespace, ResourceType};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::xml::XmlElement;

/// Magic bytes identifying a resource repository cache file.
pub const MAGIC: &[u8; 8] = b"RESRCACH";

/// Binary schema version. Bumped when the record layout changes.
pub const SCHEMA_VERSION: u32 = 2;

/// Item-shape version. Bumped when the meaning of cached items changes.
pub const FORMAT_VERSION: &str = "resrepo-items-2";

const PREAMBLE_SIZE: usize = MAGIC.len() + size_of::<u32>();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHeader {
	pub format_version: String,
	/// Absolute resource directory the cache was written for.
	pub directory: PathBuf,
	pub tool_version: String,
	pub namespace: ResourceNamespace,
}

impl CacheHeader {
	pub fn new(directory: PathBuf, tool_version: impl Into<String>, namespace: ResourceNamespace) -> Self {
		Self {
			format_version: FORMAT_VERSION.to_string(),
			directory,
			tool_version: tool_version.into(),
			namespace,
		}
	}
}

/// One backing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFile {
	/// Path relative to the resource directory.
	pub path: PathBuf,
	/// Index into [`CachePayload::configurations`].
	pub configuration: u32,
	pub folder_type: ResourceFolderType,
	pub fingerprint: u64,
	pub is_xml: bool,
	pub public: Vec<(ResourceType, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedItem {
	/// Index into [`CachePayload::files`].
	pub file: u32,
	/// Position among the items of its file, in document order.
	pub position: u32,
	/// Declaring element of value items; `None` for file resources and ids.
	pub body: Option<XmlElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedName {
	pub name: String,
	pub items: Vec<CachedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedType {
	pub kind: ResourceType,
	pub names: Vec<CachedName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CachePayload {
	/// Canonical qualifier strings.
	pub configurations: Vec<String>,
	pub files: Vec<CachedFile>,
	pub types: Vec<CachedType>,
}

/// Serializes a complete cache file.
pub fn encode(header: &CacheHeader, payload: &CachePayload) -> Result<Vec<u8>, CacheError> {
	let mut out = Vec::with_capacity(4096);
	out.extend_from_slice(MAGIC);
	out.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
	out = postcard::to_extend(header, out)?;
	out = postcard::to_extend(payload, out)?;
	Ok(out)
}

/// Validates the preamble and decodes the header, returning the rest.
pub fn decode_header(data: &[u8]) -> Result<(CacheHeader, &[u8]), CacheError> {
	if data.len() < PREAMBLE_SIZE || &data[..MAGIC.len()] != MAGIC {
		return Err(CacheError::HeaderMismatch);
	}
	let version = data[MAGIC.len()..PREAMBLE_SIZE].try_into().map(u32::from_le_bytes).map_err(|_| CacheError::HeaderMismatch)?;
	if version != SCHEMA_VERSION {
		return Err(CacheError::HeaderMismatch);
	}
	let (header, rest) = postcard::take_from_bytes::<CacheHeader>(&data[PREAMBLE_SIZE..])?;
	if header.format_version != FORMAT_VERSION {
		return Err(CacheError::HeaderMismatch);
	}
	Ok((header, rest))
}

pub fn decode_payload(rest: &[u8]) -> Result<CachePayload, CacheError> {
	Ok(postcard::from_bytes(rest)?)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn header() -> CacheHeader {
		CacheHeader::new(PathBuf::from("/project/app/res"), "1.0", ResourceNamespace::ResAuto)
	}

	#[test]
	fn header_and_payload_decode_separately() {
		let payload = CachePayload {
			configurations: vec![String::new(), "fr".into()],
			files: vec![CachedFile {
				path: PathBuf::from("values-fr/strings.xml"),
				configuration: 1,
				folder_type: ResourceFolderType::Values,
				fingerprint: 42,
				is_xml: true,
				public: Vec::new(),
			}],
			types: vec![CachedType {
				kind: ResourceType::String,
				names: vec![CachedName {
					name: "app_name".into(),
					items: vec![CachedItem {
						file: 0,
						position: 0,
						body: Some(XmlElement::new("string").with_attr("name", "app_name").with_text("Foo")),
					}],
				}],
			}],
		};
		let bytes = encode(&header(), &payload).unwrap();
		let (decoded, rest) = decode_header(&bytes).unwrap();
		assert_eq!(decoded, header());
		assert_eq!(decode_payload(rest).unwrap(), payload);
	}

	#[test]
	fn wrong_magic_or_version_is_a_mismatch() {
		let mut bytes = encode(&header(), &CachePayload::default()).unwrap();
		bytes[8] = bytes[8].wrapping_add(1);
		assert!(matches!(decode_header(&bytes), Err(CacheError::HeaderMismatch)));
		assert!(matches!(decode_header(b"NOTACACHE..."), Err(CacheError::HeaderMismatch)));
		assert!(matches!(decode_header(b"RES"), Err(CacheError::HeaderMismatch)));
	}
}
