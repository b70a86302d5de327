use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use trellis_util::errors::{TrellisError, TrellisResult};

use crate::conflict::ConflictStrategy;
use crate::dependency::Transitivity;

pub const FILE_NAME: &str = "trellis.toml";

/// Knobs of a resolution run, read from `[resolution]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolutionParameters {
    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,

    /// Transitivity of entries that neither declare one nor carry a qualifier.
    #[serde(default = "default_transitivity")]
    pub default_transitivity: Transitivity,

    /// Turn recorded resolution errors into a failed call.
    #[serde(default)]
    pub fail_on_error: bool,

    /// Per repository call.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Whole resolution; none by default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(default)]
    pub include_optional: bool,
}

impl Default for ResolutionParameters {
    fn default() -> Self {
        Self {
            conflict_strategy: ConflictStrategy::default(),
            default_transitivity: default_transitivity(),
            fail_on_error: false,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            timeout_ms: None,
            max_concurrent_fetches: default_max_concurrent_fetches(),
            include_optional: false,
        }
    }
}

fn default_transitivity() -> Transitivity {
    Transitivity::Runtime
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrent_fetches() -> usize {
    8
}

impl ResolutionParameters {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn with_conflict_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = strategy;
        self
    }

    pub fn with_default_transitivity(mut self, transitivity: Transitivity) -> Self {
        self.default_transitivity = transitivity;
        self
    }

    pub fn with_fail_on_error(mut self, fail: bool) -> Self {
        self.fail_on_error = fail;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_include_optional(mut self, include: bool) -> Self {
        self.include_optional = include;
        self
    }
}

/// Project settings loaded from `trellis.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub resolution: ResolutionParameters,

    /// Repository name to directory path or URL, tried in name order.
    #[serde(default)]
    pub repositories: BTreeMap<String, String>,
}

impl Settings {
    /// Load `trellis.toml` from `dir`, or return defaults if the file doesn't exist.
    pub fn load(dir: &Path) -> TrellisResult<Self> {
        let path = Self::path_in(dir);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| TrellisError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&content).map_err(|e| match e {
            TrellisError::Config { message } => TrellisError::Config {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> TrellisResult<Self> {
        toml::from_str(content).map_err(|e| TrellisError::Config {
            message: format!("Failed to parse settings: {e}"),
        })
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(FILE_NAME)
    }
}
