//! Configuration file handling.
//!
//! The configuration file is stored at `$PRESUPUESTOS_HOME/config.json`. It names the published
//! spreadsheet and describes how that spreadsheet is laid out: format, sheet name, extra header
//! aliases and, for sheets without usable titles, positional column names.

use crate::api::{self, Source};
use crate::error::{ErrorType, IntoResult, Res, Result};
use crate::normalize::{Normalizer, SourceFormat};
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "presupuestos";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const DEFAULT_TOP_N: usize = 10;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$PRESUPUESTOS_HOME` and from there it loads `$PRESUPUESTOS_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the home directory and writes an initial `config.json` pointing at `source_url`,
    /// with default settings for everything else.
    ///
    /// # Errors
    /// - Returns an error if `source_url` is not something a `Source` can be built for.
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>, source_url: &str) -> Result<Self> {
        Self::try_create(dir.into(), source_url)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn try_create(maybe_relative: PathBuf, source_url: &str) -> Res<Self> {
        let _ = api::source_for(source_url, None).context("The source URL is not usable")?;

        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the presupuestos home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = ConfigFile {
            source_url: source_url.trim().to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    /// Validates that the home directory and its config file exist, then loads the config file.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::try_load(home.into()).await.pub_result(ErrorType::Config)
    }

    async fn try_load(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The presupuestos home directory is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn source_url(&self) -> &str {
        &self.config_file.source_url
    }

    pub fn format(&self) -> SourceFormat {
        self.config_file.format
    }

    pub fn top_n(&self) -> usize {
        self.config_file.top_n
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.config_file.timeout_secs.map(Duration::from_secs)
    }

    /// Builds the `Normalizer` described by this configuration.
    pub fn normalizer(&self) -> Result<Normalizer> {
        let file = &self.config_file;
        let mut builder = Normalizer::builder().format(file.format);
        if let Some(sheet_name) = &file.sheet_name {
            builder = builder.sheet_name(sheet_name);
        }
        for (header, canonical) in &file.aliases {
            builder = builder.alias(header, canonical);
        }
        if let Some(columns) = &file.columns {
            builder = builder.positional_columns(columns);
        }
        builder.build()
    }

    /// Builds the `Source` for `url_override`, or for the configured URL when there is none.
    pub fn source(&self, url_override: Option<&str>) -> Result<Box<dyn Source>> {
        let url = url_override.unwrap_or(self.source_url());
        api::source_for(url, self.timeout()).pub_result(ErrorType::Config)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "presupuestos",
///   "config_version": 1,
///   "source_url": "https://example.com/presupuesto.xlsx",
///   "format": "auto",
///   "sheet_name": "Base datos",
///   "aliases": { "monto": "importe" },
///   "top_n": 10,
///   "timeout_secs": 30
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "presupuestos"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Where the spreadsheet is published: an http(s) URL, a file URL or a local path
    source_url: String,

    #[serde(default)]
    format: SourceFormat,

    /// The worksheet to read from XLSX sources. Defaults to "Base datos"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sheet_name: Option<String>,

    /// Header aliases added on top of the built-in ones
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    aliases: BTreeMap<String, String>,

    /// Canonical column names assigned by position, ignoring the sheet's own header titles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<String>>,

    /// How many rows `top` prints when `-n` is not given
    #[serde(default = "default_top_n")]
    top_n: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            source_url: String::new(),
            format: SourceFormat::Auto,
            sheet_name: None,
            aliases: BTreeMap::new(),
            columns: None,
            top_n: DEFAULT_TOP_N,
            timeout_secs: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path` and validates `app_name`.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .context("Unable to load the config file")?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}
