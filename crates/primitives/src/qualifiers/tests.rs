use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

#[test]
fn default_configuration_has_empty_string() {
	let config = FolderConfiguration::parse("").unwrap();
	assert!(config.is_default());
	assert_eq!(config.qualifier_string(), "");
	assert_eq!(config, FolderConfiguration::default_config());
}

#[test]
fn locale_with_region_spans_two_segments() {
	let config = FolderConfiguration::parse("fr-rCA").unwrap();
	let locale = config.locale().unwrap();
	assert_eq!(locale.language(), "fr");
	assert_eq!(locale.region(), Some("CA"));
	assert_eq!(locale.language_tag(), "fr-CA");
	assert_eq!(config.qualifier_string(), "fr-rCA");
}

#[test]
fn bcp47_locale_keeps_script() {
	let config = FolderConfiguration::parse("b+sr+latn").unwrap();
	let locale = config.locale().unwrap();
	assert_eq!(locale.script(), Some("Latn"));
	assert_eq!(config.qualifier_string(), "b+sr+Latn");
	assert_eq!(locale.language_tag(), "sr-Latn");
}

#[test]
fn canonical_string_normalizes_case() {
	let config = FolderConfiguration::parse("FR-rca-LAND-XHDPI-V21").unwrap();
	assert_eq!(config.qualifier_string(), "fr-rCA-land-xhdpi-v21");
	assert_eq!(config.version(), Some(21));
}

#[test]
fn mixed_qualifiers_parse_in_order() {
	let config = FolderConfiguration::parse("mcc310-mnc004-en-rUS-ldrtl-sw600dp-w720dp-h480dp-large-long-round-port-car-night-400dpi-finger-keyshidden-qwerty-navexposed-dpad-480x320-v26").unwrap();
	assert_eq!(config.qualifiers().len(), 21);
	assert_eq!(config.get(QualifierKind::UiMode).map(ToString::to_string).as_deref(), Some("car"));
	assert_eq!(config.get(QualifierKind::Density).map(ToString::to_string).as_deref(), Some("400dpi"));
}

#[test]
fn three_letter_keywords_are_not_languages() {
	let config = FolderConfiguration::parse("car").unwrap();
	assert!(config.locale().is_none());
	assert!(config.get(QualifierKind::UiMode).is_some());
}

#[test]
fn out_of_order_qualifiers_are_rejected() {
	assert_eq!(FolderConfiguration::parse("v21-land"), Err(QualifierError::OutOfOrder { segment: "land".into() }));
	assert_eq!(FolderConfiguration::parse("bogus"), Err(QualifierError::Unrecognized { segment: "bogus".into() }));
}

#[test]
fn folder_names_round_trip() {
	let (folder_type, config) = FolderConfiguration::for_folder("values-de-night").unwrap();
	assert_eq!(folder_type, ResourceFolderType::Values);
	assert_eq!(config.folder_name(folder_type), "values-de-night");
	assert!(FolderConfiguration::for_folder("values-notaqualifier").is_none());
	assert!(FolderConfiguration::for_folder("libs").is_none());
}

proptest! {
	/// Re-parsing a canonical string yields the same configuration.
	#[test]
	fn canonical_string_is_a_fixed_point(
		lang in prop::sample::select(vec!["", "en", "fr-rCA", "b+es+419", "de"]),
		orientation in prop::sample::select(vec!["", "port", "land"]),
		density in prop::sample::select(vec!["", "mdpi", "xxhdpi", "nodpi", "320dpi"]),
		version in prop::option::of(1u32..40),
	) {
		let version = version.map(|v| format!("v{v}")).unwrap_or_default();
		let raw = [lang, orientation, density, version.as_str()].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
		let config = FolderConfiguration::parse(&raw).unwrap();
		let again = FolderConfiguration::parse(config.qualifier_string()).unwrap();
		prop_assert_eq!(config.qualifier_string(), again.qualifier_string());
	}
}
