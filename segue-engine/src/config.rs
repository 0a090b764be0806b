//! Engine configuration
//!
//! TOML layout:
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [engine]
//! worker_parallelism = 8
//! batch_size = 64
//! cache_capacity = 10000
//! max_candidates = 5000
//!
//! [assembly]
//! length = 20
//! tempo_tolerance = 0.02
//! min_similarity = 0.6
//! energy_curve = "plateau"
//! certification_threshold = 0.8
//! min_descriptor_score = 0.7
//!
//! [[genre_matrix]]
//! a = "house"
//! b = "afrobeat"
//! weight = 0.75
//! ```
//!
//! Every section and field is optional; omitted values take the defaults.

use crate::compatibility::{GenreCompatibilityMatrix, GenrePairEntry};
use crate::error::AssemblyError;
use crate::playlist::AssemblyConfig;
use segue_common::config::{load_toml_or_default, ConfigResolver, LoggingConfig};
use segue_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Worker pool and resource limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Concurrent vector computations (default: CPU count, clamped to 2-16)
    pub worker_parallelism: usize,
    /// Candidates per batch between cancellation checks
    pub batch_size: usize,
    /// Maximum cached vectors
    pub cache_capacity: usize,
    /// Maximum candidates taken from a source
    pub max_candidates: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            worker_parallelism: num_cpus::get().clamp(2, 16),
            batch_size: 64,
            cache_capacity: 10_000,
            max_candidates: 5_000,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> std::result::Result<(), AssemblyError> {
        for (name, value) in [
            ("worker_parallelism", self.worker_parallelism),
            ("batch_size", self.batch_size),
            ("max_candidates", self.max_candidates),
        ] {
            if value == 0 {
                return Err(AssemblyError::InvalidConfiguration(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegueConfig {
    pub logging: LoggingConfig,
    pub engine: EngineSettings,
    pub assembly: AssemblyConfig,
    /// Extra genre pairs merged over the built-in matrix
    pub genre_matrix: Vec<GenrePairEntry>,
}

impl SegueConfig {
    /// Load from the first configured location, or defaults
    ///
    /// # Errors
    /// `Error::Config` if a file exists but is malformed
    pub fn load(resolver: &ConfigResolver) -> Result<Self> {
        let path = resolver.resolve();
        let config: SegueConfig = load_toml_or_default(path.as_deref())?;
        debug!(
            workers = config.engine.worker_parallelism,
            batch_size = config.engine.batch_size,
            genre_overrides = config.genre_matrix.len(),
            "Engine configuration resolved"
        );
        Ok(config)
    }

    /// Parse configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse configuration failed: {}", e)))
    }

    /// Built-in genre matrix with the configured overrides applied
    pub fn genre_matrix(&self) -> Result<Arc<GenreCompatibilityMatrix>> {
        if self.genre_matrix.is_empty() {
            return Ok(GenreCompatibilityMatrix::builtin());
        }
        Ok(Arc::new(GenreCompatibilityMatrix::builtin_with_overrides(&self.genre_matrix)?))
    }
}
