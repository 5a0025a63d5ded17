//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheConfig;
use crate::infra::images::DerivativeSpec;
use crate::rate_limit::RateBudget;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vitrine";
const ENV_PREFIX: &str = "VITRINE";

const DEFAULT_PUBLIC_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_ADMIN_ADDR: &str = "127.0.0.1:3001";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_DERIVATIVE_DIR: &str = "uploads/derivatives";
const DEFAULT_UPLOAD_LIMIT_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_CONTACT_LIMIT: u32 = 5;
const DEFAULT_CONTACT_WINDOW_SECS: u64 = 60;
const DEFAULT_SUBSCRIBE_LIMIT: u32 = 3;
const DEFAULT_SUBSCRIBE_WINDOW_SECS: u64 = 60;
const DEFAULT_RATE_PRUNE_INTERVAL_SECS: u64 = 300;

/// Command-line arguments for the vitrine binary.
#[derive(Debug, Parser)]
#[command(name = "vitrine", version, about = "Vitrine content back end")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VITRINE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub uploads: UploadSettings,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitSettings,
    pub images: ImageSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseSettings::default(),
            uploads: UploadSettings::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitSettings::default(),
            images: ImageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            public_addr: DEFAULT_PUBLIC_ADDR.parse().expect("valid default address"),
            admin_addr: DEFAULT_ADMIN_ADDR.parse().expect("valid default address"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: NonZeroU32::new(DEFAULT_DB_MAX_CONNECTIONS)
                .expect("default is non-zero"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub directory: PathBuf,
    pub derivative_directory: PathBuf,
    pub max_request_bytes: NonZeroU64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_UPLOAD_DIR),
            derivative_directory: PathBuf::from(DEFAULT_DERIVATIVE_DIR),
            max_request_bytes: NonZeroU64::new(DEFAULT_UPLOAD_LIMIT_BYTES)
                .expect("default is non-zero"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub contact_limit: u32,
    pub contact_window_secs: u64,
    pub subscribe_limit: u32,
    pub subscribe_window_secs: u64,
    /// Cadence of the background sweep that reclaims elapsed windows.
    pub prune_interval_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            contact_limit: DEFAULT_CONTACT_LIMIT,
            contact_window_secs: DEFAULT_CONTACT_WINDOW_SECS,
            subscribe_limit: DEFAULT_SUBSCRIBE_LIMIT,
            subscribe_window_secs: DEFAULT_SUBSCRIBE_WINDOW_SECS,
            prune_interval_secs: DEFAULT_RATE_PRUNE_INTERVAL_SECS,
        }
    }
}

impl RateLimitSettings {
    pub fn contact_budget(&self) -> RateBudget {
        RateBudget::new(
            self.contact_limit,
            Duration::from_secs(self.contact_window_secs),
        )
    }

    pub fn subscribe_budget(&self) -> RateBudget {
        RateBudget::new(
            self.subscribe_limit,
            Duration::from_secs(self.subscribe_window_secs),
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DerivativeSpecSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
}

impl Default for DerivativeSpecSettings {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            quality: 85,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// RGB background that transparent pixels are flattened onto.
    pub background: [u8; 3],
    pub display: DerivativeSpecSettings,
    pub thumbnail: DerivativeSpecSettings,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            background: [255, 255, 255],
            display: DerivativeSpecSettings::default(),
            thumbnail: DerivativeSpecSettings {
                max_width: 480,
                max_height: 360,
                quality: 80,
            },
        }
    }
}

impl ImageSettings {
    /// The display derivative comes first; its path is the one persisted on
    /// the owning entity.
    pub fn derivative_specs(&self) -> Vec<DerivativeSpec> {
        vec![
            DerivativeSpec {
                label: "display".to_string(),
                max_width: self.display.max_width,
                max_height: self.display.max_height,
                quality: self.display.quality,
            },
            DerivativeSpec {
                label: "thumb".to_string(),
                max_width: self.thumbnail.max_width,
                max_height: self.thumbnail.max_height,
                quality: self.thumbnail.quality,
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

impl LoggingSettings {
    pub fn level(&self) -> LevelFilter {
        self.level.into()
    }
}

/// Parse CLI arguments and load settings with layered precedence.
pub fn load_with_cli() -> Result<(CliArgs, Settings), SettingsError> {
    let args = CliArgs::parse();
    let settings = load(args.config_file.as_deref())?;
    Ok((args, settings))
}

/// Load settings: packaged defaults, then a local `vitrine.toml`, then an
/// explicit config file, then `VITRINE_*` environment variables.
pub fn load(config_file: Option<&std::path::Path>) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}
