use std::fs;
use std::path::Path;

use trellis_core::coordinate::Coordinate;
use trellis_core::dependency_set::DependencySet;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;
use trellis_maven::DirectoryRepository;
use trellis_resolver::{DependencyResolver, RepoSet, RepositoryClient, RepositoryError};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn pom(group: &str, name: &str, version: &str, body: &str) -> String {
    format!(
        r#"<project>
    <groupId>{group}</groupId>
    <artifactId>{name}</artifactId>
    <version>{version}</version>
    {body}
</project>"#
    )
}

fn dependency(group: &str, name: &str, version: &str) -> String {
    format!(
        "<dependency><groupId>{group}</groupId><artifactId>{name}</artifactId><version>{version}</version></dependency>"
    )
}

/// `org.acme:app:1.0` -> `org.acme:core:2.0` -> `org.slf4j:slf4j-api` (managed by the parent)
fn layout(root: &Path) {
    write(
        root,
        "org/acme/acme-parent/1/acme-parent-1.pom",
        &pom(
            "org.acme",
            "acme-parent",
            "1",
            r#"<properties><slf4j.version>2.0.9</slf4j.version></properties>
    <dependencyManagement><dependencies>
        <dependency>
            <groupId>org.slf4j</groupId>
            <artifactId>slf4j-api</artifactId>
            <version>${slf4j.version}</version>
        </dependency>
    </dependencies></dependencyManagement>"#,
        ),
    );
    write(
        root,
        "org/acme/core/2.0/core-2.0.pom",
        r#"<project>
    <parent>
        <groupId>org.acme</groupId>
        <artifactId>acme-parent</artifactId>
        <version>1</version>
    </parent>
    <artifactId>core</artifactId>
    <version>2.0</version>
    <dependencies>
        <dependency>
            <groupId>org.slf4j</groupId>
            <artifactId>slf4j-api</artifactId>
        </dependency>
        <dependency>
            <groupId>junit</groupId>
            <artifactId>junit</artifactId>
            <version>4.13.2</version>
            <scope>test</scope>
        </dependency>
    </dependencies>
</project>"#,
    );
    write(root, "org/acme/core/2.0/core-2.0.jar", "jar");
    write(
        root,
        "org/acme/app/1.0/app-1.0.pom",
        &pom(
            "org.acme",
            "app",
            "1.0",
            &format!(
                "<dependencies>{}</dependencies>",
                dependency("org.acme", "core", "2.0")
            ),
        ),
    );
    write(root, "org/acme/app/1.0/app-1.0.jar", "jar");
    write(
        root,
        "org/slf4j/slf4j-api/2.0.9/slf4j-api-2.0.9.pom",
        &pom("org.slf4j", "slf4j-api", "2.0.9", ""),
    );
    write(root, "org/slf4j/slf4j-api/2.0.9/slf4j-api-2.0.9.jar", "jar");
}

fn coordinate(s: &str) -> Coordinate {
    Coordinate::parse(s).unwrap()
}

#[tokio::test]
async fn descriptor_carries_scopes_and_parent_managed_versions() {
    let dir = tempfile::tempdir().unwrap();
    layout(dir.path());
    let repo = DirectoryRepository::new("local", dir.path());

    let descriptor = repo
        .fetch_descriptor(&coordinate("org.acme:core:2.0"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(descriptor.dependencies.len(), 2);
    assert_eq!(descriptor.dependencies[0].coordinate.to_short_string(), "org.slf4j:slf4j-api");
    assert_eq!(descriptor.dependencies[1].scope, "test");
    assert_eq!(descriptor.configurations, ["compile", "test"]);
    assert_eq!(
        descriptor.managed_version(&ModuleId::new("org.slf4j", "slf4j-api")),
        Some(&Version::of("2.0.9"))
    );
}

#[tokio::test]
async fn missing_module_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let repo = DirectoryRepository::new("local", dir.path());
    let c = coordinate("org.acme:ghost:1.0");
    assert_eq!(repo.fetch_descriptor(&c).await.unwrap(), None);
    assert_eq!(repo.fetch_artifact(&c).await.unwrap(), None);
    assert!(repo
        .list_versions(c.module_id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn dependencies_that_cannot_form_a_coordinate_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        "<dependencies>{}<dependency><groupId>org.acme</groupId><artifactId>odd</artifactId><version>1.0</version><classifier>linux:x86</classifier></dependency></dependencies>",
        dependency("org.acme", "core", "2.0")
    );
    write(
        dir.path(),
        "org/acme/host/1.0/host-1.0.pom",
        &pom("org.acme", "host", "1.0", &body),
    );
    let repo = DirectoryRepository::new("local", dir.path());

    let descriptor = repo
        .fetch_descriptor(&coordinate("org.acme:host:1.0"))
        .await
        .unwrap()
        .unwrap();
    let names: Vec<String> = descriptor
        .dependencies
        .iter()
        .map(|d| d.coordinate.to_string())
        .collect();
    assert_eq!(names, ["org.acme:core:::2.0"]);
}

#[tokio::test]
async fn jar_without_pom_has_an_empty_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "org/acme/bare/1.0/bare-1.0.jar", "jar");
    let repo = DirectoryRepository::new("local", dir.path());
    let descriptor = repo
        .fetch_descriptor(&coordinate("org.acme:bare:1.0"))
        .await
        .unwrap();
    assert_eq!(descriptor, Some(Default::default()));
}

#[tokio::test]
async fn malformed_pom_is_a_repository_error() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "org/acme/broken/1.0/broken-1.0.pom",
        "<project><dependencies></project>",
    );
    let repo = DirectoryRepository::new("local", dir.path());
    let err = repo
        .fetch_descriptor(&coordinate("org.acme:broken:1.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Malformed { .. }), "{err}");
}

#[tokio::test]
async fn versions_come_from_metadata_when_present() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "org/acme/core/maven-metadata.xml",
        r#"<metadata><versioning><versions>
            <version>1.0</version><version>1.1</version>
        </versions></versioning></metadata>"#,
    );
    write(dir.path(), "org/acme/core/9.9/core-9.9.jar", "jar");
    let repo = DirectoryRepository::new("local", dir.path());
    let versions = repo
        .list_versions(&ModuleId::new("org.acme", "core"))
        .await
        .unwrap();
    assert_eq!(versions, [Version::of("1.0"), Version::of("1.1")]);
}

#[tokio::test]
async fn versions_fall_back_to_directories() {
    let dir = tempfile::tempdir().unwrap();
    for version in ["1.10", "1.2", "1.9"] {
        write(
            dir.path(),
            &format!("org/acme/core/{version}/core-{version}.jar"),
            "jar",
        );
    }
    let repo = DirectoryRepository::new("local", dir.path());
    let versions = repo
        .list_versions(&ModuleId::new("org.acme", "core"))
        .await
        .unwrap();
    assert_eq!(
        versions,
        [Version::of("1.2"), Version::of("1.9"), Version::of("1.10")]
    );
}

#[tokio::test]
async fn classified_artifact_path() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "org/acme/core/2.0/core-2.0-sources.jar", "src");
    let repo = DirectoryRepository::new("local", dir.path());
    let path = repo
        .fetch_artifact(&coordinate("org.acme:core:sources:2.0"))
        .await
        .unwrap()
        .unwrap();
    assert!(path.ends_with("org/acme/core/2.0/core-2.0-sources.jar"));
}

#[tokio::test]
async fn resolves_through_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    layout(dir.path());
    let resolver =
        DependencyResolver::of(RepoSet::default().and(DirectoryRepository::new("local", dir.path())));
    let deps = DependencySet::of().and_str("org.acme:app:1.0").unwrap();

    let result = resolver.resolve(&deps).await.unwrap();

    assert!(!result.has_errors(), "{}", result.error_report());
    assert_eq!(
        result.version_of(&ModuleId::new("org.slf4j", "slf4j-api")),
        Some(&Version::of("2.0.9"))
    );
    assert!(!result.contains(&ModuleId::new("junit", "junit")));
    let names: Vec<String> = result
        .files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["app-1.0.jar", "core-2.0.jar", "slf4j-api-2.0.9.jar"]);
}
