//! Collector configuration.

use crate::error::ConfigError;

/// Maximum number of simulation paths allowed.
pub const MAX_PATHS: usize = 10_000_000;

/// Configuration for a node-data collection run.
///
/// Immutable once built; use [`CollectorConfig::builder`].
///
/// # Examples
///
/// ```
/// use lmm_pricing::CollectorConfig;
///
/// let config = CollectorConfig::builder()
///     .n_paths(8_192)
///     .chunk_size(1_024)
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.n_paths(), 8_192);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectorConfig {
    n_paths: usize,
    chunk_size: usize,
}

impl CollectorConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }

    /// Number of simulation paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Paths per parallel work unit.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a bound is violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_paths == 0 || self.n_paths > MAX_PATHS {
            return Err(ConfigError::InvalidPathCount(self.n_paths));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        Ok(())
    }
}

/// Builder for [`CollectorConfig`].
#[derive(Clone, Debug, Default)]
pub struct CollectorConfigBuilder {
    n_paths: Option<usize>,
    chunk_size: Option<usize>,
}

impl CollectorConfigBuilder {
    /// Sets the number of simulation paths.
    #[inline]
    pub fn n_paths(mut self, n_paths: usize) -> Self {
        self.n_paths = Some(n_paths);
        self
    }

    /// Sets the paths-per-work-unit chunk size (defaults to 1024).
    #[inline]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on a missing path count or violated bound.
    pub fn build(self) -> Result<CollectorConfig, ConfigError> {
        let n_paths = self
            .n_paths
            .ok_or(ConfigError::MissingParameter { name: "n_paths" })?;
        let config = CollectorConfig {
            n_paths,
            chunk_size: self.chunk_size.unwrap_or(1024),
        };
        config.validate()?;
        Ok(config)
    }
}
