#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};

use crate::config::{self, Config, StoreBackend};
use crate::timeline::TimelineScale;

#[derive(Debug, Parser)]
#[command(name = "gantt-timeline", version, about = "Interactive project timeline")]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Read and write tasks through the REST API at this base URL
    #[arg(long, conflicts_with = "seed")]
    pub api_url: Option<String>,

    /// Seed the in-memory store from a JSON array of tasks
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Initial window granularity
    #[arg(long, value_enum)]
    pub scale: Option<ScaleArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScaleArg {
    Day,
    Week,
    Month,
}

impl From<ScaleArg> for TimelineScale {
    fn from(value: ScaleArg) -> Self {
        match value {
            ScaleArg::Day => TimelineScale::Day,
            ScaleArg::Week => TimelineScale::Week,
            ScaleArg::Month => TimelineScale::Month,
        }
    }
}

impl Cli {
    /// Layer command-line overrides on top of `config`.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.api_url {
            config.store.backend = StoreBackend::Http;
            config.store.base_url = url.clone();
        }
        if let Some(seed) = &self.seed {
            config.store.backend = StoreBackend::Memory;
            config.store.seed_file = Some(seed.clone());
        }
        if let Some(scale) = self.scale {
            config.timeline.scale = scale.into();
        }
        config
    }

    /// Load the config file, apply overrides, and validate the result.
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => config::default_path()?,
        };
        let config = Config::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        let config = self.apply(config);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_switches_to_http_backend() {
        let cli = Cli::parse_from(["gantt-timeline", "--api-url", "http://pm.local/api", "--scale", "month"]);
        let config = cli.apply(Config::default());
        assert_eq!(config.store.backend, StoreBackend::Http);
        assert_eq!(config.store.base_url, "http://pm.local/api");
        assert_eq!(config.timeline.scale, TimelineScale::Month);
    }

    #[test]
    fn seed_and_api_url_conflict() {
        let parsed = Cli::try_parse_from(["gantt-timeline", "--api-url", "http://x", "--seed", "t.json"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn explicit_config_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[log]\nfilter = \"debug\"\n").unwrap();
        let cli = Cli::parse_from(["gantt-timeline", "--config", path.to_str().unwrap()]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.log.filter, "debug");
    }
}
