//! Folder configurations: the ordered qualifier list encoded in a resource
//! folder name (`values-fr-rCA-land-v21`).
//!
//! # Mental model
//!
//! * A folder name is `<folder-type>[-<qualifier>]*`.
//! * Qualifiers must appear in the fixed [`QualifierKind`] order; a folder
//!   whose qualifiers are out of order or unrecognized is not a resource
//!   folder at all.
//! * The canonical qualifier string (lowercase keywords, `r`-prefixed upper
//!   case regions) is the identity used for dedup and merging.
//!
//! # Invariants
//!
//! * Two configurations are equal iff their canonical qualifier strings are
//!   equal.
//! * A locale occupies one or two folder segments (`fr`, `fr-rCA`) or a single
//!   `b+` segment (`b+sr+Latn`).

use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::resource_type::ResourceFolderType;

/// Qualifier kinds in mandatory folder-name order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualifierKind {
	CountryCode,
	NetworkCode,
	Locale,
	LayoutDirection,
	SmallestWidth,
	ScreenWidth,
	ScreenHeight,
	ScreenSize,
	ScreenRatio,
	ScreenRound,
	WideColorGamut,
	HighDynamicRange,
	Orientation,
	UiMode,
	NightMode,
	Density,
	Touchscreen,
	Keyboard,
	TextInput,
	NavigationState,
	Navigation,
	ScreenDimension,
	Version,
}

impl QualifierKind {
	pub const ALL: [QualifierKind; 23] = [
		Self::CountryCode,
		Self::NetworkCode,
		Self::Locale,
		Self::LayoutDirection,
		Self::SmallestWidth,
		Self::ScreenWidth,
		Self::ScreenHeight,
		Self::ScreenSize,
		Self::ScreenRatio,
		Self::ScreenRound,
		Self::WideColorGamut,
		Self::HighDynamicRange,
		Self::Orientation,
		Self::UiMode,
		Self::NightMode,
		Self::Density,
		Self::Touchscreen,
		Self::Keyboard,
		Self::TextInput,
		Self::NavigationState,
		Self::Navigation,
		Self::ScreenDimension,
		Self::Version,
	];

	const fn keywords(self) -> &'static [&'static str] {
		match self {
			Self::LayoutDirection => &["ldltr", "ldrtl"],
			Self::ScreenSize => &["small", "normal", "large", "xlarge"],
			Self::ScreenRatio => &["long", "notlong"],
			Self::ScreenRound => &["round", "notround"],
			Self::WideColorGamut => &["widecg", "nowidecg"],
			Self::HighDynamicRange => &["highdr", "lowdr"],
			Self::Orientation => &["port", "land", "square"],
			Self::UiMode => &["car", "desk", "television", "appliance", "watch", "vrheadset"],
			Self::NightMode => &["night", "notnight"],
			Self::Density => &["ldpi", "mdpi", "tvdpi", "hdpi", "xhdpi", "xxhdpi", "xxxhdpi", "nodpi", "anydpi"],
			Self::Touchscreen => &["notouch", "stylus", "finger"],
			Self::Keyboard => &["keysexposed", "keyshidden", "keyssoft"],
			Self::TextInput => &["nokeys", "qwerty", "12key"],
			Self::NavigationState => &["navexposed", "navhidden"],
			Self::Navigation => &["nonav", "dpad", "trackball", "wheel"],
			_ => &[],
		}
	}

	/// Parses one folder segment as this kind, returning its canonical form.
	///
	/// Locale and version are handled by dedicated parsers.
	fn parse_segment(self, segment: &str) -> Option<String> {
		let lower = segment.to_ascii_lowercase();
		if self.keywords().contains(&lower.as_str()) {
			return Some(lower);
		}
		let ok = match self {
			Self::CountryCode => digits_after(&lower, "mcc", "").is_some_and(|d| d.len() == 3),
			Self::NetworkCode => digits_after(&lower, "mnc", "").is_some_and(|d| (1..=3).contains(&d.len())),
			Self::SmallestWidth => digits_after(&lower, "sw", "dp").is_some(),
			Self::ScreenWidth => digits_after(&lower, "w", "dp").is_some(),
			Self::ScreenHeight => digits_after(&lower, "h", "dp").is_some(),
			Self::Density => digits_after(&lower, "", "dpi").is_some(),
			Self::ScreenDimension => lower
				.split_once('x')
				.is_some_and(|(w, h)| is_digits(w) && is_digits(h)),
			_ => false,
		};
		ok.then_some(lower)
	}
}

fn is_digits(s: &str) -> bool {
	!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn digits_after<'a>(s: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
	let digits = s.strip_prefix(prefix)?.strip_suffix(suffix)?;
	is_digits(digits).then_some(digits)
}

/// Language, optional script and optional region of a locale qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocaleQualifier {
	language: Box<str>,
	script: Option<Box<str>>,
	region: Option<Box<str>>,
}

impl LocaleQualifier {
	pub fn new(language: &str, script: Option<&str>, region: Option<&str>) -> Self {
		Self {
			language: language.to_ascii_lowercase().into(),
			script: script.map(title_case),
			region: region.map(|r| r.to_ascii_uppercase().into()),
		}
	}

	pub fn language(&self) -> &str {
		&self.language
	}

	pub fn script(&self) -> Option<&str> {
		self.script.as_deref()
	}

	pub fn region(&self) -> Option<&str> {
		self.region.as_deref()
	}

	/// BCP 47 tag, e.g. `fr-CA` or `sr-Latn`.
	pub fn language_tag(&self) -> String {
		let mut tag = self.language.to_string();
		for part in [self.script.as_deref(), self.region.as_deref()].into_iter().flatten() {
			tag.push('-');
			tag.push_str(part);
		}
		tag
	}

	/// Parses a locale from the start of `segments`, returning the number of
	/// segments consumed.
	fn parse_segments(segments: &[&str]) -> Option<(Self, usize)> {
		let first = *segments.first()?;
		if let Some(bcp) = first.strip_prefix("b+").or_else(|| first.strip_prefix("B+")) {
			return Self::parse_bcp47(bcp).map(|locale| (locale, 1));
		}
		if !is_language(first) {
			return None;
		}
		match segments.get(1).and_then(|seg| parse_region(seg)) {
			Some(region) => Some((Self::new(first, None, Some(region)), 2)),
			None => Some((Self::new(first, None, None), 1)),
		}
	}

	fn parse_bcp47(tag: &str) -> Option<Self> {
		let mut parts = tag.split('+');
		let language = parts.next().filter(|l| (2..=3).contains(&l.len()) && l.bytes().all(|b| b.is_ascii_alphabetic()))?;
		let mut script = None;
		let mut region = None;
		for part in parts {
			if part.len() == 4 && script.is_none() && region.is_none() && part.bytes().all(|b| b.is_ascii_alphabetic()) {
				script = Some(part);
			} else if region.is_none() && is_region_code(part) {
				region = Some(part);
			} else {
				return None;
			}
		}
		Some(Self::new(language, script, region))
	}
}

impl fmt::Display for LocaleQualifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.script.is_some() {
			write!(f, "b+{}", self.language)?;
			for part in [self.script.as_deref(), self.region.as_deref()].into_iter().flatten() {
				write!(f, "+{part}")?;
			}
			return Ok(());
		}
		f.write_str(&self.language)?;
		if let Some(region) = &self.region {
			write!(f, "-r{region}")?;
		}
		Ok(())
	}
}

fn title_case(s: &str) -> Box<str> {
	let mut out = String::with_capacity(s.len());
	for (i, c) in s.chars().enumerate() {
		if i == 0 {
			out.push(c.to_ascii_uppercase());
		} else {
			out.push(c.to_ascii_lowercase());
		}
	}
	out.into()
}

fn is_language(segment: &str) -> bool {
	let len_ok = segment.len() == 2 || (segment.len() == 3 && !is_reserved_keyword(segment));
	len_ok && segment.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Three-letter qualifier keywords that would otherwise parse as languages.
fn is_reserved_keyword(segment: &str) -> bool {
	let lower = segment.to_ascii_lowercase();
	QualifierKind::ALL.iter().any(|kind| kind.keywords().contains(&lower.as_str()))
}

fn is_region_code(s: &str) -> bool {
	(s.len() == 2 && s.bytes().all(|b| b.is_ascii_alphabetic())) || (s.len() == 3 && is_digits(s))
}

fn parse_region(segment: &str) -> Option<&str> {
	let rest = segment.strip_prefix('r').or_else(|| segment.strip_prefix('R'))?;
	is_region_code(rest).then_some(rest)
}

/// One parsed qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
	Locale(LocaleQualifier),
	Version(u32),
	Value { kind: QualifierKind, segment: Box<str> },
}

impl Qualifier {
	pub fn kind(&self) -> QualifierKind {
		match self {
			Self::Locale(_) => QualifierKind::Locale,
			Self::Version(_) => QualifierKind::Version,
			Self::Value { kind, .. } => *kind,
		}
	}
}

impl fmt::Display for Qualifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Locale(locale) => locale.fmt(f),
			Self::Version(v) => write!(f, "v{v}"),
			Self::Value { segment, .. } => f.write_str(segment),
		}
	}
}

/// Error returned when a qualifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QualifierError {
	#[error("unrecognized qualifier '{segment}'")]
	Unrecognized { segment: String },
	#[error("qualifier '{segment}' is out of order")]
	OutOfOrder { segment: String },
}

/// Parsed qualifier list of a resource folder.
#[derive(Debug, Clone, Default)]
pub struct FolderConfiguration {
	qualifiers: SmallVec<[Qualifier; 2]>,
	canonical: Box<str>,
}

impl FolderConfiguration {
	/// Configuration with no qualifiers (`values`, `layout`, ...).
	pub fn default_config() -> Self {
		Self::default()
	}

	/// Parses a dash-separated qualifier string (without folder type prefix).
	pub fn parse(qualifiers: &str) -> Result<Self, QualifierError> {
		if qualifiers.is_empty() {
			return Ok(Self::default());
		}
		let segments: Vec<&str> = qualifiers.split('-').collect();
		let mut parsed: SmallVec<[Qualifier; 2]> = SmallVec::new();
		let mut next_kind = 0;
		let mut i = 0;
		while i < segments.len() {
			let segment = segments[i];
			let mut matched = None;
			for (idx, kind) in QualifierKind::ALL.iter().enumerate().skip(next_kind) {
				let hit = match kind {
					QualifierKind::Locale => LocaleQualifier::parse_segments(&segments[i..]).map(|(locale, used)| (Qualifier::Locale(locale), used)),
					QualifierKind::Version => parse_version(segment).map(|v| (Qualifier::Version(v), 1)),
					other => other.parse_segment(segment).map(|canonical| {
						(
							Qualifier::Value {
								kind: *other,
								segment: canonical.into(),
							},
							1,
						)
					}),
				};
				if let Some((qualifier, used)) = hit {
					matched = Some((idx, qualifier, used));
					break;
				}
			}
			let Some((idx, qualifier, used)) = matched else {
				let earlier = QualifierKind::ALL[..next_kind].iter().any(|kind| match kind {
					QualifierKind::Locale => LocaleQualifier::parse_segments(&segments[i..]).is_some(),
					QualifierKind::Version => parse_version(segment).is_some(),
					other => other.parse_segment(segment).is_some(),
				});
				let segment = segment.to_string();
				return Err(if earlier {
					QualifierError::OutOfOrder { segment }
				} else {
					QualifierError::Unrecognized { segment }
				});
			};
			parsed.push(qualifier);
			next_kind = idx + 1;
			i += used;
		}
		Ok(Self::from_qualifiers(parsed))
	}

	/// Parses a full folder name into its folder type and configuration.
	///
	/// Returns `None` for folders that are not resource folders.
	pub fn for_folder(folder_name: &str) -> Option<(ResourceFolderType, Self)> {
		let (folder_type, qualifiers) = ResourceFolderType::split_folder_name(folder_name)?;
		let config = Self::parse(qualifiers).ok()?;
		Some((folder_type, config))
	}

	fn from_qualifiers(qualifiers: SmallVec<[Qualifier; 2]>) -> Self {
		let canonical = qualifiers.iter().map(ToString::to_string).collect::<Vec<_>>().join("-");
		Self {
			qualifiers,
			canonical: canonical.into(),
		}
	}

	/// Canonical qualifier string, empty for the default configuration.
	pub fn qualifier_string(&self) -> &str {
		&self.canonical
	}

	pub fn is_default(&self) -> bool {
		self.qualifiers.is_empty()
	}

	pub fn qualifiers(&self) -> &[Qualifier] {
		&self.qualifiers
	}

	pub fn get(&self, kind: QualifierKind) -> Option<&Qualifier> {
		self.qualifiers.iter().find(|q| q.kind() == kind)
	}

	pub fn locale(&self) -> Option<&LocaleQualifier> {
		match self.get(QualifierKind::Locale)? {
			Qualifier::Locale(locale) => Some(locale),
			_ => None,
		}
	}

	pub fn version(&self) -> Option<u32> {
		match self.get(QualifierKind::Version)? {
			Qualifier::Version(v) => Some(*v),
			_ => None,
		}
	}

	/// Folder name for `folder_type` with this configuration.
	pub fn folder_name(&self, folder_type: ResourceFolderType) -> String {
		if self.is_default() {
			folder_type.name().to_string()
		} else {
			format!("{}-{}", folder_type.name(), self.canonical)
		}
	}
}

fn parse_version(segment: &str) -> Option<u32> {
	let digits = segment.strip_prefix('v').or_else(|| segment.strip_prefix('V'))?;
	if !is_digits(digits) {
		return None;
	}
	digits.parse().ok()
}

impl PartialEq for FolderConfiguration {
	fn eq(&self, other: &Self) -> bool {
		self.canonical == other.canonical
	}
}

impl Eq for FolderConfiguration {}

impl Hash for FolderConfiguration {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.canonical.hash(state);
	}
}

impl fmt::Display for FolderConfiguration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.canonical)
	}
}

#[cfg(test)]
mod tests;
