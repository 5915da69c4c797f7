use hv_types::{config_error, HvError, HvResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::providers::{CsvPriceSource, PriceSource, SamplePriceSource};
use crate::yahoo::{YahooPriceSource, DEFAULT_YAHOO_URL};

pub const ENV_SOURCE: &str = "HISTVAR_SOURCE";
pub const ENV_BASE_URL: &str = "HISTVAR_BASE_URL";
pub const ENV_DATA_DIR: &str = "HISTVAR_DATA_DIR";
pub const ENV_TIMEOUT_SECS: &str = "HISTVAR_TIMEOUT_SECS";

/// Kinds of price sources supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Yahoo,
    Csv,
    Sample,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Yahoo => "yahoo",
            SourceKind::Csv => "csv",
            SourceKind::Sample => "sample",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SourceKind {
    type Err = HvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(SourceKind::Yahoo),
            "csv" => Ok(SourceKind::Csv),
            "sample" => Ok(SourceKind::Sample),
            other => Err(config_error!("Unknown price source '{}', expected yahoo, csv or sample", other)),
        }
    }
}

/// Price source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for PriceSourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            base_url: DEFAULT_YAHOO_URL.to_string(),
            data_dir: PathBuf::from("./data"),
            timeout_secs: 30,
        }
    }
}

impl PriceSourceConfig {
    /// Defaults overridden by `HISTVAR_*` environment variables.
    pub fn from_env() -> HvResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> HvResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(kind) = lookup(ENV_SOURCE) {
            config.kind = kind.parse()?;
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| config_error!("{} must be a whole number of seconds, got '{}'", ENV_TIMEOUT_SECS, secs))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HvResult<()> {
        if self.timeout_secs == 0 {
            return Err(config_error!("Network timeout must be at least one second"));
        }
        if self.kind == SourceKind::Yahoo && self.base_url.trim().is_empty() {
            return Err(config_error!("Yahoo source requires a base URL"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Instantiate the configured source.
    pub fn build(&self) -> HvResult<Box<dyn PriceSource>> {
        self.validate()?;
        tracing::debug!("Building {} price source", self.kind);

        let source: Box<dyn PriceSource> = match self.kind {
            SourceKind::Yahoo => Box::new(YahooPriceSource::new(&self.base_url, self.timeout())?),
            SourceKind::Csv => Box::new(CsvPriceSource::new(&self.data_dir)),
            SourceKind::Sample => Box::new(SamplePriceSource::new()),
        };
        Ok(source)
    }
}
