use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::broadcast::{Delivery, FailurePolicy};
use crate::extension::MESSAGE_LOGGER;

/// Main msgtap configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub tap: TapConfig,
    pub sinks: SinkConfig,
    pub host: HostConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Delivery mode as written in config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    #[default]
    Inline,
    Queued,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TapConfig {
    pub delivery: DeliveryMode,
    /// Bounded queue size for queued delivery
    pub queue_capacity: usize,
    pub failure_policy: FailurePolicy,
}

impl TapConfig {
    pub fn delivery(&self) -> Delivery {
        match self.delivery {
            DeliveryMode::Inline => Delivery::Inline,
            DeliveryMode::Queued => Delivery::Queued {
                capacity: self.queue_capacity,
            },
        }
    }
}

/// Sink type
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Write to JSONL files under `path`
    File,
    /// Print to stdout
    Stdout,
    /// Send to HTTP endpoint
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    pub enabled: bool,
    /// Which sinks to send events to
    pub sinks: Vec<SinkKind>,
    /// HTTP endpoint for http sink
    pub http_endpoint: Option<String>,
    /// Include the message text in output (can be verbose)
    pub include_message: bool,
    /// Directory for the file sink
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    pub name: String,
    pub dispatchers: Vec<DispatcherConfig>,
    /// Behavior extension names, applied in order
    pub behaviors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatcherConfig {
    pub listen_uri: String,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    pub name: String,
    pub contract: String,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryMode::Inline,
            queue_capacity: 1024,
            failure_policy: FailurePolicy::Isolate,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sinks: vec![SinkKind::File],
            http_endpoint: None,
            include_message: true,
            path: Config::msgtap_dir().join("taps"),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            dispatchers: vec![DispatcherConfig {
                listen_uri: "http://localhost:8080/service".to_string(),
                endpoints: vec![EndpointConfig {
                    name: "default".to_string(),
                    contract: "IService".to_string(),
                }],
            }],
            behaviors: vec![MESSAGE_LOGGER.to_string()],
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("MSGTAP_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from MSGTAP_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(dir) = std::env::var("MSGTAP_DIR") {
            let path = PathBuf::from(dir).join("msgtap.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from MSGTAP_DIR: {}", e);
                    }
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("msgtap").join("msgtap.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./msgtap.yaml (for development)
        let local_config = PathBuf::from("msgtap.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Directory holding msgtap.yaml and the default tap log
    pub fn msgtap_dir() -> PathBuf {
        std::env::var("MSGTAP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("msgtap"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
