use std::fmt;
use std::str::FromStr;

use trellis_util::errors::{TrellisError, TrellisResult};

use crate::module_id::ModuleId;
use crate::version::Version;

/// Identifies a single artifact: `group:name:classifier:type:version`.
///
/// Classifier and type are empty strings when unset. The textual form always
/// carries all five fields so that `Coordinate::parse(&c.to_string()) == c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    module_id: ModuleId,
    classifier: String,
    type_: String,
    version: Version,
}

impl Coordinate {
    /// Build a coordinate without checks. The textual form parses back to it
    /// only when the version holds no `:` or whitespace, which any version
    /// obtained through `str::parse` guarantees.
    pub fn new(module_id: ModuleId, version: Version) -> Self {
        Self {
            module_id,
            classifier: String::new(),
            type_: String::new(),
            version,
        }
    }

    /// Parse any of the accepted shapes:
    ///
    /// - `group:name`
    /// - `group:name:version`
    /// - `group:name:classifier:version`
    /// - `group:name:classifier:type:version`
    ///
    /// Classifier, type and version may be empty. `?` stands for an
    /// unspecified version.
    pub fn parse(s: &str) -> TrellisResult<Self> {
        let s = s.trim();
        let parts: Vec<&str> = s.split(':').collect();
        let (classifier, type_, version) = match parts.as_slice() {
            [_, _] => ("", "", ""),
            [_, _, v] => ("", "", *v),
            [_, _, c, v] => (*c, "", *v),
            [_, _, c, t, v] => (*c, *t, *v),
            _ => {
                return Err(TrellisError::parse(format!(
                    "'{s}' has {} colon-separated fields, expected 2 to 5",
                    parts.len()
                )))
            }
        };
        let module_id = ModuleId::parse(&format!("{}:{}", parts[0], parts[1]))?;
        for (what, field) in [("classifier", classifier), ("type", type_)] {
            check_field(s, what, field)?;
        }
        let version: Version = version.parse()?;
        Ok(Self {
            module_id,
            classifier: classifier.to_string(),
            type_: type_.to_string(),
            version,
        })
    }

    /// Cheap syntactic check used to tell coordinates from file paths.
    pub fn looks_like(s: &str) -> bool {
        let s = s.trim();
        !s.contains('/') && !s.contains('\\') && Self::parse(s).is_ok()
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn with_version(&self, version: Version) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }

    /// Unchecked; see [`Coordinate::try_with_classifier_and_type`] for values
    /// that do not come from trusted literals.
    pub fn with_classifier_and_type(
        &self,
        classifier: impl Into<String>,
        type_: impl Into<String>,
    ) -> Self {
        Self {
            classifier: classifier.into(),
            type_: type_.into(),
            ..self.clone()
        }
    }

    /// Like [`Coordinate::with_classifier_and_type`], rejecting a classifier
    /// or type holding `:` or whitespace.
    pub fn try_with_classifier_and_type(
        &self,
        classifier: &str,
        type_: &str,
    ) -> TrellisResult<Self> {
        let described = format!("{}:{classifier}:{type_}", self.module_id);
        check_field(&described, "classifier", classifier)?;
        check_field(&described, "type", type_)?;
        Ok(self.with_classifier_and_type(classifier, type_))
    }

    /// Type used to locate the artifact file; an empty type means `jar`.
    pub fn effective_type(&self) -> &str {
        if self.type_.is_empty() {
            "jar"
        } else {
            &self.type_
        }
    }

    /// Only the main artifact of a module brings its own dependencies along.
    pub fn is_transitive_by_default(&self) -> bool {
        self.classifier.is_empty() && self.effective_type() == "jar"
    }

    /// A classifier-less `pom` coordinate imports managed versions.
    pub fn is_bom(&self) -> bool {
        self.classifier.is_empty() && self.type_ == "pom"
    }

    /// `name-version[-classifier].type`
    pub fn file_name(&self) -> String {
        let mut file = format!("{}-{}", self.module_id.name(), self.version);
        if !self.classifier.is_empty() {
            file.push('-');
            file.push_str(&self.classifier);
        }
        file.push('.');
        file.push_str(self.effective_type());
        file
    }

    /// Compact rendering that drops empty trailing fields, used in trees and logs.
    ///
    /// The result still parses back to the same coordinate.
    pub fn to_short_string(&self) -> String {
        if !self.type_.is_empty() {
            self.to_string()
        } else if !self.classifier.is_empty() {
            format!("{}:{}:{}", self.module_id, self.classifier, self.version)
        } else if !self.version.is_unspecified() {
            format!("{}:{}", self.module_id, self.version)
        } else {
            self.module_id.to_string()
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.module_id, self.classifier, self.type_, self.version
        )
    }
}

impl FromStr for Coordinate {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn check_field(coordinate: &str, what: &str, field: &str) -> TrellisResult<()> {
    if field.contains(':') || field.chars().any(char::is_whitespace) {
        return Err(TrellisError::parse(format!(
            "'{coordinate}' has an invalid {what} '{field}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_field_shorthand_expands() {
        let c = Coordinate::parse("com.google.guava:guava:31.0-jre").unwrap();
        assert_eq!(c.classifier(), "");
        assert_eq!(c.type_(), "");
        assert_eq!(c.version().value(), "31.0-jre");
        assert_eq!(c.to_string(), "com.google.guava:guava:::31.0-jre");
    }

    #[test]
    fn empty_fields_round_trip() {
        let c = Coordinate::parse("group:name:classifier::").unwrap();
        assert_eq!(c.classifier(), "classifier");
        assert!(c.version().is_unspecified());

        let c = Coordinate::parse("group:name::extension:").unwrap();
        assert_eq!(c.classifier(), "");
        assert_eq!(c.type_(), "extension");
        assert!(c.version().is_unspecified());
        assert_eq!(Coordinate::parse(&c.to_string()).unwrap(), c);
    }

    #[test]
    fn question_mark_is_unspecified() {
        let c = Coordinate::parse("g:n:?").unwrap();
        assert!(c.version().is_unspecified());
    }

    #[test]
    fn rejects_too_many_fields() {
        assert!(Coordinate::parse("a:b:c:d:e:f").is_err());
        assert!(Coordinate::parse("a").is_err());
        assert!(Coordinate::parse("a:b:1 .0").is_err());
    }

    #[test]
    fn file_names() {
        let jar = Coordinate::parse("org.acme:core:1.0").unwrap();
        assert_eq!(jar.file_name(), "core-1.0.jar");
        let sources = Coordinate::parse("org.acme:core:sources:1.0").unwrap();
        assert_eq!(sources.file_name(), "core-1.0-sources.jar");
        let pom = Coordinate::parse("org.acme:bom::pom:2.0").unwrap();
        assert_eq!(pom.file_name(), "bom-2.0.pom");
        assert!(pom.is_bom());
        assert!(!pom.is_transitive_by_default());
        assert!(jar.is_transitive_by_default());
    }

    #[test]
    fn short_string() {
        assert_eq!(
            Coordinate::parse("g:n:1.0").unwrap().to_short_string(),
            "g:n:1.0"
        );
        assert_eq!(Coordinate::parse("g:n").unwrap().to_short_string(), "g:n");
        assert_eq!(
            Coordinate::parse("g:n::pom:1.0").unwrap().to_short_string(),
            "g:n::pom:1.0"
        );
    }
}
