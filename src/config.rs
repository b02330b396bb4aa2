// Copyright 2023-2024 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Server configuration.
//!
//! Values are read from (in increasing order of precedence) built-in defaults, a TOML file and
//! environment variables named like `DAVCORE__SERVER__BASE_PREFIX`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use log::LevelFilter;
use serde::Deserialize;

use crate::hook::HookBackend;
use crate::rights::RightsBackend;

/// Environment variable overriding the location of the configuration file.
pub const CONFIG_ENV: &str = "DAVCORE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub server: ServerConfig,
    pub rights: RightsConfig,
    pub hook: HookConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Prefix prepended to every href in responses, e.g.: `/dav`.
    pub base_prefix: String,
    /// Encoding of request and response bodies.
    pub encoding: String,
    /// Seconds to wait for a request body.
    pub request_timeout: u64,
    /// Maximum size of a request body, in bytes.
    pub max_content_length: u64,
    /// Realm sent to anonymous clients when authentication is required.
    pub realm: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            base_prefix: String::new(),
            encoding: "utf-8".into(),
            request_timeout: 30,
            max_content_length: 100_000_000,
            realm: "davcore - Password Required".into(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RightsConfig {
    pub backend: RightsBackend,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    pub backend: HookBackend,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per principal.
    pub folder: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            folder: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("davcore")
                .join("collections"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LevelFilter::Info,
        }
    }
}

/// Location of the configuration file when none is given explicitly.
///
/// Uses [`CONFIG_ENV`] if set, and `davcore/config.toml` inside the user's configuration
/// directory otherwise.
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join("davcore").join("config.toml")))
}

/// Load the configuration.
///
/// An explicitly given `path` must exist; the default location may be missing.
///
/// # Errors
///
/// If the file cannot be read or parsed, or a value has the wrong type.
pub fn load(path: Option<&Path>) -> Result<Configuration, ConfigError> {
    let mut builder = Config::builder();
    match path {
        Some(path) => {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        None => {
            if let Some(path) = default_path() {
                builder = builder.add_source(
                    File::from(path.as_path())
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }
    }
    builder
        .add_source(
            Environment::with_prefix("DAVCORE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
