//! Problems recorded while resolving.
//!
//! Resolution errors are data: they are attached to tree nodes and collected
//! in the result, and only become a failed call through
//! [`ResolveResult::assert_no_error`](crate::result::ResolveResult::assert_no_error).

use std::fmt;

use thiserror::Error;
use trellis_core::coordinate::Coordinate;
use trellis_core::module_id::ModuleId;
use trellis_core::version::Version;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// No repository has the module, or none could be asked.
    #[error("Unable to resolve {coordinate}: {reason}")]
    UnresolvedModule { coordinate: String, reason: String },

    /// Divergent versions requested under the `fail` strategy.
    #[error("Conflicting versions of {module}: {}", join(versions))]
    Conflict {
        module: ModuleId,
        versions: Vec<Version>,
    },

    /// The subtree was not expanded because the resolution was cancelled
    /// or ran out of time.
    #[error("Resolution of {coordinate} was cancelled")]
    Cancelled { coordinate: String },

    #[error("{description} did not produce its files: {message}")]
    ComputedDependency {
        description: String,
        message: String,
    },
}

impl ResolutionError {
    pub fn unresolved(coordinate: &Coordinate, reason: impl Into<String>) -> Self {
        Self::UnresolvedModule {
            coordinate: coordinate.to_short_string(),
            reason: reason.into(),
        }
    }

    pub fn cancelled(coordinate: &Coordinate) -> Self {
        Self::Cancelled {
            coordinate: coordinate.to_short_string(),
        }
    }
}

fn join(versions: &[Version]) -> String {
    versions
        .iter()
        .map(Version::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every error of a resolution, one per line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub errors: Vec<ResolutionError>,
}

impl ErrorReport {
    pub fn new(errors: Vec<ResolutionError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "No resolution errors.");
        }
        writeln!(f, "Resolution errors ({}):", self.errors.len())?;
        for e in &self.errors {
            writeln!(f, "  {e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = ErrorReport::default();
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "No resolution errors.");
    }

    #[test]
    fn report_lists_each_error() {
        let report = ErrorReport::new(vec![
            ResolutionError::unresolved(
                &Coordinate::parse("org.example:lib:1.0").unwrap(),
                "not found in central",
            ),
            ResolutionError::Conflict {
                module: ModuleId::new("org.example", "util"),
                versions: vec![Version::of("1.0"), Version::of("2.0")],
            },
        ]);
        assert_eq!(report.len(), 2);
        let s = report.to_string();
        assert!(s.contains("Unable to resolve org.example:lib:1.0: not found in central"));
        assert!(s.contains("Conflicting versions of org.example:util: 1.0, 2.0"));
    }
}
