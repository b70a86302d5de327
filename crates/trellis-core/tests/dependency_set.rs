use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trellis_core::conflict::ConflictStrategy;
use trellis_core::dependency::{ComputedDependency, Dependency, Exclusion, Transitivity};
use trellis_core::dependency_set::{DependencySet, Hint};
use trellis_core::module_id::ModuleId;
use trellis_core::version_provider::VersionProvider;

#[test]
fn normalised_take_highest_ignores_unspecified() {
    let set = DependencySet::of()
        .and_str("g:m:2.0")
        .unwrap()
        .and_str("g:m:2.8")
        .unwrap()
        .and_str("g:m")
        .unwrap();
    let normalised = set.normalised(ConflictStrategy::TakeHighest).unwrap();
    assert_eq!(normalised.len(), 1);
    assert_eq!(
        normalised.get("g:m").unwrap().coordinate.version().value(),
        "2.8"
    );
}

#[test]
fn normalised_keeps_distinct_classifiers() {
    let set = DependencySet::of()
        .and_str("g:m:1.0")
        .unwrap()
        .and_str("g:m:sources:1.0")
        .unwrap();
    assert_eq!(set.normalised(ConflictStrategy::Fail).unwrap().len(), 2);
}

#[test]
fn operations_never_mutate_the_receiver() {
    let base = DependencySet::of().and_str("g:a:1").unwrap();
    let _ = base.and_str("g:b:1").unwrap();
    let _ = base.minus(&ModuleId::parse("g:a").unwrap());
    let _ = base.with_local_exclusions([Exclusion::parse("x:y").unwrap()]);
    assert_eq!(base.len(), 1);
    assert!(base.get("g:a").unwrap().exclusions.is_empty());
}

#[test]
fn transitivity_edits() {
    let set = DependencySet::of()
        .and_str("g:a:1")
        .unwrap()
        .and_with_transitivity("g:b:1", Transitivity::Compile)
        .unwrap();
    let replaced =
        set.with_global_transitivity_replacement(Some(Transitivity::Compile), Transitivity::None);
    assert_eq!(replaced.get("g:b").unwrap().transitivity, Some(Transitivity::None));
    assert_eq!(replaced.get("g:a").unwrap().transitivity, None);

    let a = ModuleId::parse("g:a").unwrap();
    let pinned = set.with_transitivity(&a, Transitivity::Runtime);
    assert_eq!(pinned.get("g:a").unwrap().transitivity, Some(Transitivity::Runtime));
}

#[test]
fn local_exclusions_on_named_module() {
    let set = DependencySet::of()
        .and_str("g:a:1")
        .unwrap()
        .and_str("g:b:1")
        .unwrap()
        .with_local_exclusions_on(
            &ModuleId::parse("g:a").unwrap(),
            &[Exclusion::parse("x:y").unwrap()],
        );
    assert_eq!(set.get("g:a").unwrap().exclusions.len(), 1);
    assert!(set.get("g:b").unwrap().exclusions.is_empty());
}

#[test]
fn hint_last_if_and_first() {
    let set = DependencySet::of().and_str("g:a:1").unwrap();
    let dep = Dependency::parse("g:b:1", std::path::Path::new("")).unwrap();
    let last = set.and_at(&Hint::last_if(true), dep.clone()).unwrap();
    assert_eq!(last.entries()[1].module_id().unwrap().name(), "b");
    let first = set.and_at(&Hint::first_if(true), dep).unwrap();
    assert_eq!(first.entries()[0].module_id().unwrap().name(), "b");
}

#[test]
fn version_provider_merges_right_wins() {
    let set = DependencySet::of()
        .with_version_provider(VersionProvider::of().and_str("g:a", "1").unwrap())
        .and_version_provider(&VersionProvider::of().and_str("g:a", "2").unwrap());
    assert_eq!(
        set.version_provider()
            .version_of(&ModuleId::parse("g:a").unwrap())
            .unwrap()
            .value(),
        "2"
    );
}

#[test]
fn computed_dependency_runs_producer_when_files_missing() {
    let dir = tempfile::tempdir().unwrap();
    let output: PathBuf = dir.path().join("out.jar");
    let calls = Arc::new(AtomicUsize::new(0));

    let target = output.clone();
    let counter = calls.clone();
    let computed = ComputedDependency::of("sibling project", vec![output.clone()], move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::fs::write(&target, b"jar")?;
        Ok(())
    });

    assert_eq!(computed.ensure_files().unwrap(), [output.clone()]);
    assert_eq!(computed.ensure_files().unwrap(), [output]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn computed_dependency_fails_when_nothing_is_produced() {
    let dir = tempfile::tempdir().unwrap();
    let computed =
        ComputedDependency::of("broken", vec![dir.path().join("never.jar")], || Ok(()));
    assert!(computed.ensure_files().is_err());
}

#[test]
fn ide_project_dirs_are_distinct() {
    let computed = ComputedDependency::of("p", vec![], || Ok(())).with_ide_project_dir("../p");
    let set = DependencySet::of()
        .and(computed.clone())
        .and(computed.with_ide_project_dir("../p"));
    assert_eq!(set.ide_project_dirs().len(), 1);
}
