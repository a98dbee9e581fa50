//! Where the registry looks for coverage maps.

use std::path::{Path, PathBuf};

/// Environment variable overriding the coverage data directory.
pub const DATA_DIR_ENV: &str = "SURVEY_COVERAGE_DATA_DIR";

/// Glob that coverage map file names must match.
pub const COVERAGE_PATTERN: &str = "*-DR*.fits";

/// Settings for building a [`SurveyRegistry`](crate::SurveyRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub data_dir: PathBuf,
}

impl RegistryConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The packaged data directory, unless [`DATA_DIR_ENV`] is set.
    pub fn from_env() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::with_data_dir(dir),
            _ => Self::default(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::with_data_dir(default_data_dir())
    }
}

/// The `data/` directory shipped alongside this crate.
pub fn default_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}
