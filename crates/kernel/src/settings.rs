use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Deserializer};

use crate::secret::Secret;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "MONGOSEED_ENV";
const CONFIG_DIR_ENV: &str = "MONGOSEED_CONFIG_DIR";
const ENV_PREFIX: &str = "MONGOSEED";

/// Deployment environment the bootstrap is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub mongo: MongoSettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `MONGOSEED_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = match environment.as_str() {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoSettings {
    #[serde(default = "MongoSettings::default_uri")]
    pub uri: String,
    #[serde(default = "MongoSettings::default_app_name")]
    pub app_name: String,
    #[serde(default = "MongoSettings::default_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "MongoSettings::default_timeout_ms")]
    pub server_selection_timeout_ms: u64,
}

impl MongoSettings {
    fn default_uri() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_app_name() -> String {
        "mongoseed".to_string()
    }

    fn default_timeout_ms() -> u64 {
        10000
    }
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            app_name: Self::default_app_name(),
            connect_timeout_ms: Self::default_timeout_ms(),
            server_selection_timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// What the bootstrap procedure provisions.
///
/// The password has no built-in default; it comes from `password` (usually
/// `MONGOSEED_BOOTSTRAP__PASSWORD`) or from `password_file`.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapSettings {
    #[serde(default = "BootstrapSettings::default_database")]
    pub database: String,
    #[serde(default = "BootstrapSettings::default_username")]
    pub username: String,
    #[serde(default)]
    pub password: Option<Secret>,
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(default = "BootstrapSettings::default_role")]
    pub role: String,
    #[serde(default, deserialize_with = "list_or_comma_separated")]
    pub extra_collections: Vec<String>,
    #[serde(default)]
    pub idempotent: bool,
}

impl BootstrapSettings {
    fn default_database() -> String {
        "demo".to_string()
    }

    fn default_username() -> String {
        "demo_user".to_string()
    }

    fn default_role() -> String {
        "readWrite".to_string()
    }
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            database: Self::default_database(),
            username: Self::default_username(),
            password: None,
            password_file: None,
            role: Self::default_role(),
            extra_collections: Vec::new(),
            idempotent: false,
        }
    }
}

/// Accept a TOML array or a `a,b,c` string as an environment variable gives it.
fn list_or_comma_separated<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(items) => items,
        Raw::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,mongodb=warn".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
