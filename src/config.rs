use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Duration;
use tracing::{debug, trace};

use crate::notifications::expo::{EXPO_CHUNK_LIMIT, EXPO_PUSH_URL};
use crate::thresholds::Thresholds;
use crate::util;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory ring buffer (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Readings older than this are deleted by the daily cleanup
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./readings.db")
}

fn default_retention_days() -> u32 {
    30
}

/// Upper bound for `alerts.realert_interval_secs` (one week)
pub const MAX_REALERT_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for `storage.retention_days` (about 100 years)
pub const MAX_RETENTION_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub push: PushConfig,
    pub alerts: AlertsConfig,

    /// Storage configuration (optional - defaults to in-memory)
    pub storage: Option<StorageConfig>,

    pub api: ApiSettings,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id_prefix: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    /// 0, 1 or 2
    pub qos: u8,
    pub air_topic: String,
    pub water_topic: String,
    pub reconnect_delay_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id_prefix: "hydro-hub".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            qos: 1,
            air_topic: "sensor33/air".to_string(),
            water_topic: "sensor33/water".to_string(),
            reconnect_delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub url: String,
    pub access_token: Option<String>,
    pub chunk_size: usize,
    pub timeout_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: EXPO_PUSH_URL.to_string(),
            access_token: None,
            chunk_size: EXPO_CHUNK_LIMIT,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// How often a sustained critical status is repeated
    pub realert_interval_secs: u64,

    /// Overrides the built-in threshold table
    pub thresholds: Option<Thresholds>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            realert_interval_secs: 30 * 60,
            thresholds: None,
        }
    }
}

impl AlertsConfig {
    /// The re-alert interval, capped at [`MAX_REALERT_INTERVAL_SECS`]
    pub fn realert_interval(&self) -> Duration {
        let secs = self.realert_interval_secs.min(MAX_REALERT_INTERVAL_SECS);
        Duration::seconds(secs as i64)
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub enabled: bool,
    pub bind_addr: IpAddr,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: IpAddr::V4(util::DEFAULT_ADDR),
            port: util::DEFAULT_PORT,
            enable_cors: true,
        }
    }
}

impl Config {
    /// Apply environment overrides on top of the file contents
    pub fn apply_env(&mut self) {
        if let Some(host) = util::get_mqtt_host() {
            self.mqtt.host = host;
        }
        if let Some(username) = util::get_mqtt_username() {
            self.mqtt.username = Some(username);
        }
        if let Some(password) = util::get_mqtt_password() {
            self.mqtt.password = Some(password);
        }
        if let Some(token) = util::get_expo_access_token() {
            self.push.access_token = Some(token);
        }
        if let Some(addr) = util::get_addr() {
            self.api.bind_addr = IpAddr::V4(addr);
        }
        if let Some(port) = util::get_port() {
            self.api.port = port;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.mqtt.qos <= 2, "mqtt.qos must be 0, 1 or 2");
        anyhow::ensure!(
            self.alerts.realert_interval_secs > 0,
            "alerts.realert_interval_secs must be positive"
        );
        anyhow::ensure!(
            self.alerts.realert_interval_secs <= MAX_REALERT_INTERVAL_SECS,
            "alerts.realert_interval_secs must be at most {MAX_REALERT_INTERVAL_SECS}"
        );
        if let Some(StorageConfig::Sqlite { retention_days, .. }) = &self.storage {
            anyhow::ensure!(
                *retention_days <= MAX_RETENTION_DAYS,
                "storage.retention_days must be at most {MAX_RETENTION_DAYS}"
            );
        }
        if let Some(thresholds) = &self.alerts.thresholds {
            thresholds
                .validate()
                .context("invalid alerts.thresholds")?;
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let config: Config =
        serde_json::from_str(content).context("Invalid configuration file provided!")?;
    config.validate()?;
    Ok(config)
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    parse_config(&file_content).inspect(|config| trace!("loaded config: {config:?}"))
}

/// Load the config file if one was given, fall back to defaults otherwise,
/// then apply environment overrides.
pub fn load(path: Option<&str>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            debug!("no config file given, using defaults");
            Config::default()
        }
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}
