use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// XML namespace URI of framework attributes (`android:id`, ...).
pub const ANDROID_URI: &str = "http://schemas.android.com/apk/res/android";

/// XML namespace URI used by non-namespaced application resources.
pub const AUTO_URI: &str = "http://schemas.android.com/apk/res-auto";

/// Partition of the resource name space.
///
/// Non-namespaced projects put every application and library resource into
/// [`ResourceNamespace::ResAuto`]; namespaced projects give each package its
/// own partition. Framework resources always live in
/// [`ResourceNamespace::Framework`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceNamespace {
	ResAuto,
	Package(Arc<str>),
	Framework,
}

impl ResourceNamespace {
	pub fn package(name: impl AsRef<str>) -> Self {
		Self::Package(Arc::from(name.as_ref()))
	}

	/// Prefix used in references (`@android:string/ok`), if any.
	pub fn prefix(&self) -> Option<&str> {
		match self {
			Self::ResAuto => None,
			Self::Package(name) => Some(name),
			Self::Framework => Some("android"),
		}
	}

	/// XML namespace URI for attributes in this namespace.
	pub fn xml_uri(&self) -> String {
		match self {
			Self::ResAuto => AUTO_URI.to_string(),
			Self::Package(name) => format!("http://schemas.android.com/apk/res/{name}"),
			Self::Framework => ANDROID_URI.to_string(),
		}
	}

	/// Resolves a reference prefix relative to `self`.
	///
	/// `None` means "this namespace"; `android` always means the framework.
	pub fn resolve_prefix(&self, prefix: Option<&str>) -> Self {
		match prefix {
			None => self.clone(),
			Some("android") => Self::Framework,
			Some(package) => Self::package(package),
		}
	}
}

impl fmt::Display for ResourceNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ResAuto => f.write_str("res-auto"),
			Self::Package(name) => f.write_str(name),
			Self::Framework => f.write_str("android"),
		}
	}
}
