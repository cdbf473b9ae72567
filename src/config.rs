use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::ValueEnum;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::{
    cli::BrowseArgs,
    client::{ClientSettings, StartPosition},
    tui::{
        BrowseSettings,
        ingest::{DEFAULT_PAGE_BUDGET, IngestOptions, RecordKey},
    },
};

const CONFIG_FILE_ENV: &str = "KTUI_CONFIG_FILE";
const ENV_PREFIX: &str = "KTUI";
const DEFAULT_PARTITION_KEY: &str = "partition-1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_position: Option<StartPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_key: Option<RecordKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, strum::Display, strum::EnumIter)]
#[value(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfigKey {
    Region,
    Profile,
    EndpointUrl,
    PageBudget,
    StartPosition,
    RecordKey,
    PartitionKey,
    ExportDir,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config directory")]
    DirNotFound,
    #[error("Failed to find config file")]
    PathError,
    #[error("Failed to load config file: {0}")]
    LoadError(String),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: ConfigKey,
        value: String,
        reason: String,
    },
}

/// Path to the configuration file
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_FILE_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut path = dirs::config_dir().ok_or(ConfigError::DirNotFound)?;
    path.push("kinesis-tui");
    path.push("config.toml");
    Ok(path)
}

/// Config file merged with `KTUI_*` environment variables.
pub fn load_config(path: &Path) -> Result<CliConfig, ConfigError> {
    let cfg = Config::builder()
        .add_source(
            File::new(path.to_str().ok_or(ConfigError::PathError)?, FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .map_err(|e| ConfigError::LoadError(e.to_string()))?;

    cfg.try_deserialize::<CliConfig>()
        .map_err(|e| ConfigError::LoadError(e.to_string()))
}

/// Only what is stored on disk, used when editing the file.
pub fn load_file_config(path: &Path) -> Result<CliConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            toml::from_str(&contents).map_err(|e| ConfigError::LoadError(e.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CliConfig::default()),
        Err(e) => Err(ConfigError::LoadError(e.to_string())),
    }
}

pub fn save_config(path: &Path, cfg: &CliConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    }

    let toml = toml::to_string(cfg).map_err(|e| ConfigError::WriteError(e.to_string()))?;
    std::fs::write(path, toml).map_err(|e| ConfigError::WriteError(e.to_string()))?;

    Ok(())
}

impl CliConfig {
    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::Region => self.region.clone(),
            ConfigKey::Profile => self.profile.clone(),
            ConfigKey::EndpointUrl => self.endpoint_url.clone(),
            ConfigKey::PageBudget => self.page_budget.map(|n| n.to_string()),
            ConfigKey::StartPosition => self.start_position.map(|p| p.to_string()),
            ConfigKey::RecordKey => self.record_key.map(|k| k.to_string()),
            ConfigKey::PartitionKey => self.partition_key.clone(),
            ConfigKey::ExportDir => self.export_dir.as_ref().map(|p| p.display().to_string()),
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
            reason,
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(invalid("must not be empty".into()));
        }

        match key {
            ConfigKey::Region => self.region = Some(value.to_owned()),
            ConfigKey::Profile => self.profile = Some(value.to_owned()),
            ConfigKey::EndpointUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid("expected an http:// or https:// URL".into()));
                }
                self.endpoint_url = Some(value.to_owned());
            }
            ConfigKey::PageBudget => {
                let budget = value.parse::<u32>().map_err(|e| invalid(e.to_string()))?;
                self.page_budget = Some(budget);
            }
            ConfigKey::StartPosition => {
                let position = <StartPosition as FromStr>::from_str(value)
                    .map_err(|_| invalid("expected trim-horizon or latest".into()))?;
                self.start_position = Some(position);
            }
            ConfigKey::RecordKey => {
                let record_key = <RecordKey as FromStr>::from_str(value).map_err(|_| {
                    invalid("expected arrival-timestamp or sequence-number".into())
                })?;
                self.record_key = Some(record_key);
            }
            ConfigKey::PartitionKey => self.partition_key = Some(value.to_owned()),
            ConfigKey::ExportDir => self.export_dir = Some(PathBuf::from(value)),
        }
        Ok(())
    }

    pub fn unset(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::Region => self.region = None,
            ConfigKey::Profile => self.profile = None,
            ConfigKey::EndpointUrl => self.endpoint_url = None,
            ConfigKey::PageBudget => self.page_budget = None,
            ConfigKey::StartPosition => self.start_position = None,
            ConfigKey::RecordKey => self.record_key = None,
            ConfigKey::PartitionKey => self.partition_key = None,
            ConfigKey::ExportDir => self.export_dir = None,
        }
    }

    pub fn entries(&self) -> Vec<(ConfigKey, Option<String>)> {
        ConfigKey::iter().map(|key| (key, self.get(key))).collect()
    }

    /// Applies command-line overrides and fills in defaults.
    pub fn resolve(self, args: BrowseArgs) -> (ClientSettings, BrowseSettings) {
        let client = ClientSettings {
            region: args.region.or(self.region),
            profile: args.profile.or(self.profile),
            endpoint_url: args.endpoint_url.or(self.endpoint_url),
            partition_key: args
                .partition_key
                .or(self.partition_key)
                .unwrap_or_else(|| DEFAULT_PARTITION_KEY.to_owned()),
        };
        let browse = BrowseSettings {
            ingest: IngestOptions {
                page_budget: args
                    .page_budget
                    .or(self.page_budget)
                    .unwrap_or(DEFAULT_PAGE_BUDGET),
                start: args
                    .start_position
                    .or(self.start_position)
                    .unwrap_or_default(),
                record_key: args.record_key.or(self.record_key).unwrap_or_default(),
            },
            export_dir: args
                .export_dir
                .or(self.export_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        (client, browse)
    }
}
