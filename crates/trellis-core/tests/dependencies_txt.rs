use std::fs;

use trellis_core::dependencies_txt::{DependenciesTxt, Section};
use trellis_core::module_id::ModuleId;

#[test]
fn load_returns_none_without_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(DependenciesTxt::load(dir.path()).unwrap().is_none());
}

#[test]
fn load_reads_sections_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("dependencies.txt"),
        "[compile]\norg.acme:core:1.0\n\n[test]\norg.junit.jupiter:junit-jupiter:5.10.1\n",
    )
    .unwrap();
    let txt = DependenciesTxt::load(dir.path()).unwrap().unwrap();
    assert_eq!(txt.section(Section::Compile).len(), 1);
    assert_eq!(txt.compute_test_deps().len(), 2);
}

#[test]
fn grand_parent_versions_are_inherited_and_overridden() {
    let root = tempfile::tempdir().unwrap();
    fs::write(
        root.path().join("dependencies.txt"),
        "[version-provider]\norg.acme:core:1.0\norg.acme:util:1.0\n",
    )
    .unwrap();
    let module = root.path().join("module");
    fs::create_dir(&module).unwrap();
    fs::write(
        module.join("dependencies.txt"),
        "[version]\norg.acme:core:2.0\n\n[compile]\norg.acme:core\norg.acme:util\n",
    )
    .unwrap();

    let txt = DependenciesTxt::load(&module).unwrap().unwrap();
    let provider = txt.version_provider();
    let core = ModuleId::parse("org.acme:core").unwrap();
    let util = ModuleId::parse("org.acme:util").unwrap();
    assert_eq!(provider.version_of(&core).unwrap().value(), "2.0");
    assert_eq!(provider.version_of(&util).unwrap().value(), "1.0");
    assert!(txt
        .compute_compile_deps()
        .assert_no_unspecified_version()
        .is_ok());
}

#[test]
fn parse_error_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("dependencies.txt"), "[nope]\n").unwrap();
    let err = DependenciesTxt::load(dir.path()).unwrap_err();
    assert!(err.to_string().contains("dependencies.txt"));
    assert!(err.to_string().contains("[nope]"));
}
