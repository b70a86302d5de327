use trellis_core::coordinate::Coordinate;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;

fn all_shapes() -> Vec<Coordinate> {
    let module = ModuleId::new("org.acme", "core");
    let base = Coordinate::new(module, Version::of("1.2.3"));
    vec![
        base.clone(),
        base.with_version(Version::UNSPECIFIED),
        base.with_classifier_and_type("sources", ""),
        base.with_classifier_and_type("", "pom"),
        base.with_classifier_and_type("linux-x86_64", "so"),
        base.with_classifier_and_type("classifier", "")
            .with_version(Version::UNSPECIFIED),
        base.with_classifier_and_type("", "extension")
            .with_version(Version::UNSPECIFIED),
    ]
}

#[test]
fn every_coordinate_round_trips() {
    for c in all_shapes() {
        let parsed = Coordinate::parse(&c.to_string()).unwrap();
        assert_eq!(parsed, c, "round trip of {c}");
    }
}

#[test]
fn short_strings_parse_back() {
    for c in all_shapes() {
        let parsed = Coordinate::parse(&c.to_short_string()).unwrap();
        assert_eq!(parsed, c, "short form {}", c.to_short_string());
    }
}

#[test]
fn five_field_form_is_fixed() {
    let c = Coordinate::parse("group:name:classifier::").unwrap();
    assert_eq!(c.to_string(), "group:name:classifier::");
    let c = Coordinate::parse("group:name::extension:").unwrap();
    assert_eq!(c.to_string(), "group:name::extension:");
}

#[test]
fn four_field_form_reads_classifier() {
    let c = Coordinate::parse("org.lwjgl:lwjgl:natives-linux:3.3.1").unwrap();
    assert_eq!(c.classifier(), "natives-linux");
    assert_eq!(c.type_(), "");
    assert_eq!(c.version().value(), "3.3.1");
}

#[test]
fn parse_errors_are_parse_errors() {
    let err = Coordinate::parse("org.acme").unwrap_err();
    assert!(err.to_string().starts_with("Parse error"));
}

#[test]
fn checked_classifier_and_type_keep_the_round_trip() {
    let base = Coordinate::new(ModuleId::new("org.acme", "core"), "1.0".parse().unwrap());

    let native = base.try_with_classifier_and_type("linux-x86_64", "so").unwrap();
    assert_eq!(Coordinate::parse(&native.to_string()).unwrap(), native);

    let err = base.try_with_classifier_and_type("linux:x86", "").unwrap_err();
    assert!(err.to_string().contains("invalid classifier 'linux:x86'"));
    assert!(base.try_with_classifier_and_type("", "tar gz").is_err());
}

#[test]
fn parsed_versions_cannot_break_the_textual_form() {
    assert!("1.0:beta".parse::<Version>().is_err());
    assert!(Coordinate::parse("org.acme:core:sources:jar:1.0:beta").is_err());
}
