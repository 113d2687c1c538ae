use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "ALICIA_ENV";
const CONFIG_DIR_ENV: &str = "ALICIA_CONFIG_DIR";
const API_KEY_FALLBACK_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(name: &str) -> anyhow::Result<Self> {
        match name {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub genai: GenAiSettings,
    #[serde(default)]
    pub loyalty: LoyaltySettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        let mut settings = Self::load_from(&config_dir, &environment)?;

        if settings.genai.api_key.is_none() {
            settings.genai.api_key = API_KEY_FALLBACK_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok())
                .filter(|key| !key.trim().is_empty());
        }

        Ok(settings)
    }

    /// Load `base.toml` and `{environment}.toml` from `config_dir`, then
    /// `ALICIA_*` variables (`ALICIA_SERVER__PORT=9000`).
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_env = Environment::parse(environment)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("ALICIA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = parsed_env;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        60000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// JSON snapshot loaded at startup and written on shutdown.
    #[serde(default)]
    pub snapshot_path: Option<String>,
    #[serde(default = "DatabaseSettings::default_transaction_attempts")]
    pub transaction_attempts: u32,
}

impl DatabaseSettings {
    fn default_transaction_attempts() -> u32 {
        5
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            transaction_attempts: Self::default_transaction_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "StorageSettings::default_root")]
    pub root: String,
    #[serde(default = "StorageSettings::default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "StorageSettings::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl StorageSettings {
    fn default_root() -> String {
        "data/media".to_string()
    }

    fn default_public_base_url() -> String {
        "http://localhost:8080/media".to_string()
    }

    fn default_max_upload_bytes() -> usize {
        25 * 1024 * 1024
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            public_base_url: Self::default_public_base_url(),
            max_upload_bytes: Self::default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenAiSettings {
    /// Flows answer 503 while this is unset.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "GenAiSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "GenAiSettings::default_text_model")]
    pub text_model: String,
    #[serde(default = "GenAiSettings::default_image_model")]
    pub image_model: String,
    #[serde(default = "GenAiSettings::default_speech_model")]
    pub speech_model: String,
    #[serde(default = "GenAiSettings::default_voice")]
    pub default_voice: String,
    #[serde(default = "GenAiSettings::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GenAiSettings {
    fn default_base_url() -> String {
        "https://generativelanguage.googleapis.com/v1beta".to_string()
    }

    fn default_text_model() -> String {
        "gemini-2.0-flash".to_string()
    }

    fn default_image_model() -> String {
        "gemini-2.0-flash-preview-image-generation".to_string()
    }

    fn default_speech_model() -> String {
        "gemini-2.5-flash-preview-tts".to_string()
    }

    fn default_voice() -> String {
        "Algenib".to_string()
    }

    fn default_timeout_secs() -> u64 {
        45
    }
}

impl Default for GenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            text_model: Self::default_text_model(),
            image_model: Self::default_image_model(),
            speech_model: Self::default_speech_model(),
            default_voice: Self::default_voice(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// Conversion rates of the points ledger.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoyaltySettings {
    /// Points earned per whole currency unit paid.
    #[serde(default = "LoyaltySettings::default_points_per_currency_unit")]
    pub points_per_currency_unit: i64,
    /// Discount, in cents, of one redeemed point at checkout.
    #[serde(default = "LoyaltySettings::default_point_value_cents")]
    pub point_value_cents: i64,
    /// Share of the discounted subtotal that points may cover.
    #[serde(default = "LoyaltySettings::default_max_points_discount_percent")]
    pub max_points_discount_percent: i64,
}

impl LoyaltySettings {
    fn default_points_per_currency_unit() -> i64 {
        1
    }

    fn default_point_value_cents() -> i64 {
        5
    }

    fn default_max_points_discount_percent() -> i64 {
        50
    }
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        Self {
            points_per_currency_unit: Self::default_points_per_currency_unit(),
            point_value_cents: Self::default_point_value_cents(),
            max_points_discount_percent: Self::default_max_points_discount_percent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_level")]
    pub level: String,
}

impl TelemetrySettings {
    fn default_level() -> String {
        "info,tower_http=info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSettings {
    /// Header carrying the authenticated user id, set by the identity proxy.
    #[serde(default = "AuthSettings::default_user_header")]
    pub user_header: String,
    /// Accounts signing up with one of these emails become admins.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl AuthSettings {
    fn default_user_header() -> String {
        "x-user-id".to_string()
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            user_header: Self::default_user_header(),
            admin_emails: Vec::new(),
        }
    }
}
