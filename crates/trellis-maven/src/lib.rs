//! Maven-layout directory repositories: POM reading, `maven-metadata.xml`
//! version listing and artifact lookup.

pub mod metadata;
pub mod pom;
pub mod repository;

pub use repository::DirectoryRepository;
