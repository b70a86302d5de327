use std::fmt;
use std::str::FromStr;

use trellis_util::errors::{TrellisError, TrellisResult};

use crate::coordinate::Coordinate;
use crate::version::Version;

/// A `group:name` pair, independent of version.
///
/// This is the key under which conflicting versions are detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    group: String,
    name: String,
}

impl ModuleId {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parse `group:name`. Both parts must be non-blank and whitespace free.
    pub fn parse(s: &str) -> TrellisResult<Self> {
        let s = s.trim();
        let (group, name) = s
            .split_once(':')
            .ok_or_else(|| TrellisError::parse(format!("'{s}' is not a group:name module id")))?;
        if name.contains(':') {
            return Err(TrellisError::parse(format!(
                "'{s}' is not a group:name module id"
            )));
        }
        check_part(s, "group", group)?;
        check_part(s, "name", name)?;
        Ok(Self::new(group, name))
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `group:*` matches every module of the group.
    pub fn is_wildcard(&self) -> bool {
        self.name.ends_with('*')
    }

    /// Match `other` against this id, treating a trailing `*` in the name as
    /// a prefix wildcard (`org.acme:*`, `org.acme:core-*`).
    pub fn matches(&self, other: &ModuleId) -> bool {
        if self.group != other.group {
            return false;
        }
        match self.name.strip_suffix('*') {
            Some(prefix) => other.name.starts_with(prefix),
            None => self.name == other.name,
        }
    }

    /// The wildcard id covering every module of this group.
    pub fn group_wildcard(&self) -> ModuleId {
        Self::new(self.group.clone(), "*")
    }

    pub fn to_coordinate(&self, version: Version) -> Coordinate {
        Coordinate::new(self.clone(), version)
    }

    /// Directory path of this module in a Maven layout (`org/acme/core`).
    pub fn to_path(&self) -> String {
        format!("{}/{}", self.group.replace('.', "/"), self.name)
    }
}

fn check_part(source: &str, what: &str, part: &str) -> TrellisResult<()> {
    if part.is_empty() {
        return Err(TrellisError::parse(format!("'{source}' has an empty {what}")));
    }
    if part.chars().any(char::is_whitespace) {
        return Err(TrellisError::parse(format!(
            "'{source}' has whitespace in its {what}"
        )));
    }
    Ok(())
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl FromStr for ModuleId {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id = ModuleId::parse("com.google.guava:guava").unwrap();
        assert_eq!(id.group(), "com.google.guava");
        assert_eq!(id.name(), "guava");
        assert_eq!(id.to_string(), "com.google.guava:guava");
    }

    #[test]
    fn rejects_malformed() {
        assert!(ModuleId::parse("guava").is_err());
        assert!(ModuleId::parse(":guava").is_err());
        assert!(ModuleId::parse("a:b:c").is_err());
        assert!(ModuleId::parse("a b:c").is_err());
    }

    #[test]
    fn wildcard_matching() {
        let all = ModuleId::parse("org.acme:*").unwrap();
        let prefix = ModuleId::parse("org.acme:core-*").unwrap();
        let core = ModuleId::new("org.acme", "core-api");
        assert!(all.is_wildcard());
        assert!(all.matches(&core));
        assert!(prefix.matches(&core));
        assert!(!prefix.matches(&ModuleId::new("org.acme", "web")));
        assert!(!all.matches(&ModuleId::new("org.other", "core-api")));
    }

    #[test]
    fn maven_path() {
        assert_eq!(
            ModuleId::new("org.acme.tools", "core").to_path(),
            "org/acme/tools/core"
        );
    }
}
