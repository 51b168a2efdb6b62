//! TOML configuration, layered `base.toml` -> `${app_env}.toml` ->
//! `TSDB_`-prefixed environment variables, following a layering idiom
//! common across this workspace's services, generalized from a single
//! Postgres/builds-root section to the sections this config covers.

use serde::Deserialize;
use std::convert::TryFrom;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub initialization: InitializationSettings,
    #[serde(default)]
    pub authentication: AuthenticationSettings,
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub cluster: ClusterSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub api: ApiSettings,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct InitializationSettings {
    #[serde(rename = "join-urls")]
    pub join_urls: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthenticationSettings {
    pub enabled: bool,
}

impl Default for AuthenticationSettings {
    fn default() -> Self {
        Self { enabled: false }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrokerSettings {
    pub dir: PathBuf,
    pub port: u16,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/broker"),
            port: 8088,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataSettings {
    pub dir: PathBuf,
    pub port: u16,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/data"),
            port: 8086,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClusterSettings {
    pub dir: PathBuf,
    #[serde(rename = "worker-permits")]
    pub worker_permits: usize,
    #[serde(rename = "write-ack-w")]
    pub write_ack_w: usize,
    #[serde(rename = "shard-group-duration", with = "humantime_serde")]
    pub shard_group_duration: std::time::Duration,
    #[serde(rename = "future-write-skew", with = "humantime_serde")]
    pub future_write_skew: std::time::Duration,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/cluster"),
            worker_permits: 64,
            write_ack_w: 1,
            shard_group_duration: std::time::Duration::from_secs(168 * 3600),
            future_write_skew: std::time::Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub file: String,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: String::new(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdminSettings {
    pub port: u16,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self { port: 8083 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiSettings {
    #[serde(rename = "ssl-port")]
    pub ssl_port: u16,
    #[serde(rename = "ssl-cert")]
    pub ssl_cert: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            ssl_port: 0,
            ssl_cert: String::new(),
        }
    }
}

/// Mirrors `crates/control`'s `APP_ENV` convention: selects which of
/// `development.toml`/`production.toml`/`test.toml` layers over `base.toml`.
#[derive(Debug)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
            AppEnv::Test => "test",
        }
    }

    pub fn from_env() -> Self {
        std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".into())
            .try_into()
            .expect("APP_ENV must be one of development|production|test")
    }
}

impl TryFrom<String> for AppEnv {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(format!("{other} is not a known environment")),
        }
    }
}

/// Loads settings from `<config_dir>/base.toml`, then `<config_dir>/${APP_ENV}.toml`
/// (both optional, since every section has defaults), then `TSDB_`-prefixed
/// environment variables (e.g. `TSDB_DATA__PORT=9000`).
pub fn load_settings(config_dir: &std::path::Path) -> Result<Settings, config::ConfigError> {
    let app_env = AppEnv::from_env();

    let settings = config::Config::builder()
        .add_source(config::File::from(config_dir.join("base")).required(false))
        .add_source(config::File::from(config_dir.join(app_env.as_str())).required(false))
        .add_source(
            config::Environment::with_prefix("TSDB")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
