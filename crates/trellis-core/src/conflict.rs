use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trellis_util::errors::TrellisError;

use crate::version::Version;

/// Policy for picking one version when a module is requested several times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// Keep the version seen first.
    TakeFirst,
    #[default]
    TakeHighest,
    TakeLowest,
    /// Divergent versions are an error.
    Fail,
}

impl ConflictStrategy {
    /// Choose between the version retained so far and a newly requested one.
    ///
    /// An unspecified version always loses. Returns `None` when the strategy
    /// is [`ConflictStrategy::Fail`] and both versions are specified and differ.
    pub fn select(self, retained: &Version, candidate: &Version) -> Option<Version> {
        if candidate.is_unspecified() {
            return Some(retained.clone());
        }
        if retained.is_unspecified() {
            return Some(candidate.clone());
        }
        let ord = candidate.compare(retained);
        if ord == Ordering::Equal {
            return Some(retained.clone());
        }
        match self {
            Self::TakeFirst => Some(retained.clone()),
            Self::TakeHighest if ord == Ordering::Greater => Some(candidate.clone()),
            Self::TakeHighest => Some(retained.clone()),
            Self::TakeLowest if ord == Ordering::Less => Some(candidate.clone()),
            Self::TakeLowest => Some(retained.clone()),
            Self::Fail => None,
        }
    }

    /// Whether `candidate` would replace `retained`.
    pub fn prefers(self, retained: &Version, candidate: &Version) -> bool {
        matches!(self.select(retained, candidate), Some(v) if &v != retained)
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TakeFirst => "take-first",
            Self::TakeHighest => "take-highest",
            Self::TakeLowest => "take-lowest",
            Self::Fail => "fail",
        };
        f.write_str(s)
    }
}

impl FromStr for ConflictStrategy {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "take-first" | "first" => Ok(Self::TakeFirst),
            "take-highest" | "highest" => Ok(Self::TakeHighest),
            "take-lowest" | "lowest" => Ok(Self::TakeLowest),
            "fail" => Ok(Self::Fail),
            other => Err(TrellisError::parse(format!(
                "unknown conflict strategy '{other}'"
            ))),
        }
    }
}
