//! Ranking engine tuning knobs.
//!
//! # Responsibility
//! - Hold the sampler window sizes and rating model constants.
//! - Load overrides from an optional TOML file.
//!
//! # Invariants
//! - A validated config has `2 <= pool_size`, `1 <= focus_size <= pool_size`,
//!   a finite `default_strength` and a finite positive `k_factor`.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_POOL_SIZE: usize = 200;
pub const DEFAULT_FOCUS_SIZE: usize = 30;
pub const DEFAULT_STRENGTH: f64 = 1500.0;
pub const DEFAULT_K_FACTOR: f64 = 24.0;

/// Engine configuration. Fields missing from a config file keep defaults.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingConfig {
    /// Upper bound of the least-compared working pool.
    pub pool_size: usize,
    /// Size of the random focus window at the head of the pool.
    pub focus_size: usize,
    /// Strength assigned to newly created items.
    pub default_strength: f64,
    /// Rating update sensitivity.
    pub k_factor: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            focus_size: DEFAULT_FOCUS_SIZE,
            default_strength: DEFAULT_STRENGTH,
            k_factor: DEFAULT_K_FACTOR,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// A value is outside its legal range.
    Invalid(String),
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(message) => write!(f, "invalid ranking config: {message}"),
            Self::Read { path, source } => {
                write!(f, "failed to read config at {}: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "failed to parse config at {}: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "failed to parse config: {source}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(_) => None,
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl RankingConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|source| ConfigError::Parse { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_toml_str(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size < 2 {
            return Err(ConfigError::Invalid(format!(
                "pool_size must be at least 2, got {}",
                self.pool_size
            )));
        }
        if self.focus_size == 0 || self.focus_size > self.pool_size {
            return Err(ConfigError::Invalid(format!(
                "focus_size must be within 1..={}, got {}",
                self.pool_size, self.focus_size
            )));
        }
        if !self.default_strength.is_finite() {
            return Err(ConfigError::Invalid(
                "default_strength must be finite".to_string(),
            ));
        }
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "k_factor must be finite and positive, got {}",
                self.k_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RankingConfig, DEFAULT_FOCUS_SIZE};
    use std::path::Path;

    #[test]
    fn defaults_are_valid() {
        let config = RankingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool_size, 200);
        assert_eq!(config.k_factor, 24.0);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = RankingConfig::from_toml_str("pool_size = 50\nk_factor = 32.0\n")
            .expect("partial config should parse");
        assert_eq!(config.pool_size, 50);
        assert_eq!(config.focus_size, DEFAULT_FOCUS_SIZE);
        assert_eq!(config.k_factor, 32.0);
        assert_eq!(config.default_strength, 1500.0);
    }

    #[test]
    fn focus_larger_than_pool_is_rejected() {
        let err = RankingConfig::from_toml_str("pool_size = 10\nfocus_size = 11\n")
            .expect_err("focus_size above pool_size must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_and_bad_k_are_rejected() {
        assert!(matches!(
            RankingConfig::from_toml_str("pool = 3\n"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            RankingConfig::from_toml_str("k_factor = 0.0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = RankingConfig::load(Path::new("/nonexistent/pairrank/config.toml"))
            .expect("missing file should not fail");
        assert_eq!(config, RankingConfig::default());
    }

    #[test]
    fn file_parse_error_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranking.toml");
        std::fs::write(&path, "focus_size = \"many\"\n").unwrap();

        let err = RankingConfig::load(&path).expect_err("bad value type must fail");
        assert!(err.to_string().contains("ranking.toml"));
    }
}
