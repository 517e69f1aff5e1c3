#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::store::http::DEFAULT_BASE_URL;
use crate::timeline::{TimelineScale, DEFAULT_ROW_HEIGHT};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub timeline: TimelineConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, seeded from `seed_file` or the built-in sample.
    #[default]
    Memory,
    /// The dashboard's REST API at `base_url`.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub base_url: String,
    pub seed_file: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            base_url: DEFAULT_BASE_URL.to_owned(),
            seed_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    pub scale: TimelineScale,
    pub row_height: f32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            scale: TimelineScale::Week,
            row_height: DEFAULT_ROW_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

impl Config {
    /// Read `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::IoPath {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let row_height = self.timeline.row_height;
        if !row_height.is_finite() || !(12.0..=200.0).contains(&row_height) {
            return Err(ConfigError::InvalidValue {
                key: "timeline.row_height".to_owned(),
                msg: format!("{row_height} is outside 12..=200"),
            });
        }
        if self.store.backend == StoreBackend::Http && self.store.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "store.base_url".to_owned(),
                msg: "required when backend = \"http\"".to_owned(),
            });
        }
        Ok(())
    }
}

pub fn default_path() -> Result<PathBuf, ConfigError> {
    let proj = ProjectDirs::from("com", "gantt-timeline", "gantt-timeline")
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(proj.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\nbackend = \"http\"\nbase_url = \"https://pm.example.com/api\"\n\n[timeline]\nscale = \"month\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Http);
        assert_eq!(config.store.base_url, "https://pm.example.com/api");
        assert_eq!(config.timeline.scale, TimelineScale::Month);
        assert_eq!(config.timeline.row_height, DEFAULT_ROW_HEIGHT);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn out_of_range_row_height_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeline]\nrow_height = 2.0\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "timeline.row_height"));
    }

    #[test]
    fn malformed_toml_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeline\nscale = ").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
