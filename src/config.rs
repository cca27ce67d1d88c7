use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_ARTIFACT_DIR: &str = "artifacts";
const DEFAULT_PROCESSOR_TIMEOUT_SECS: u64 = 60;
const DEFAULT_ARTIFACT_TIMEOUT_SECS: u64 = 20;
const MAX_INSTALLMENTS_CEILING: u32 = 21;

/// Remote payment-processor credentials and endpoints
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProcessorConfig {
    /// API key for the remote processor
    #[validate(length(min = 1))]
    pub api_key: String,

    /// true => live environment, false => sandbox
    #[serde(default)]
    pub live_mode: bool,

    /// Override for the processor base URL (tests, self-hosted sandboxes)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Timeout for customer/invoice/charge calls, in seconds
    #[serde(default = "default_processor_timeout")]
    pub timeout_secs: u64,
}

/// Per-method checkout enablement
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodsConfig {
    #[serde(default = "default_true")]
    pub pix: bool,
    #[serde(default = "default_true")]
    pub bank_slip: bool,
    #[serde(default = "default_true")]
    pub credit_card: bool,
}

impl Default for MethodsConfig {
    fn default() -> Self {
        Self {
            pix: true,
            bank_slip: true,
            credit_card: true,
        }
    }
}

/// Application configuration with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Remote processor credentials
    #[validate]
    pub processor: ProcessorConfig,

    /// Which payment methods accept checkout submissions
    #[serde(default)]
    pub methods: MethodsConfig,

    /// Store name used in invoice descriptions and as the card soft descriptor
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Maximum credit-card installment count offered at checkout
    #[serde(default = "default_max_installments")]
    pub max_installments: u32,

    /// Shared secret for webhook signature verification. When unset,
    /// notifications are accepted unverified (sandbox convenience).
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Signature timestamp tolerance in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: u64,

    /// Directory where re-hosted QR images and boleto PDFs are written
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    /// Public base URL under which `artifact_dir` is served, without scheme
    /// (e.g. "shop.example.com/artifacts"); the scheme follows the request.
    #[serde(default)]
    pub artifact_base_url: Option<String>,

    /// Timeout for fetching remote boleto PDFs, in seconds
    #[serde(default = "default_artifact_timeout")]
    pub artifact_timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_store_name() -> String {
    "Storefront".to_string()
}
fn default_max_installments() -> u32 {
    1
}
fn default_webhook_tolerance() -> u64 {
    300
}
fn default_artifact_dir() -> String {
    DEFAULT_ARTIFACT_DIR.to_string()
}
fn default_processor_timeout() -> u64 {
    DEFAULT_PROCESSOR_TIMEOUT_SECS
}
fn default_artifact_timeout() -> u64 {
    DEFAULT_ARTIFACT_TIMEOUT_SECS
}
fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Installment count offered at checkout, bounded to the processor's
    /// supported range of 1..=21.
    pub fn max_installments(&self) -> u32 {
        self.max_installments.clamp(1, MAX_INSTALLMENTS_CEILING)
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://paygate.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("PAYGATE").separator("__"))
        .build()?;

    // Clear error up front rather than a serde miss deep in deserialization
    if config.get_string("processor.api_key").is_err() {
        error!(
            "Processor API key is not configured. Set PAYGATE__PROCESSOR__API_KEY or processor.api_key in config/."
        );
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "processor.api_key is required but not configured".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    if app_config.webhook_secret.is_none() {
        warn!("webhook_secret is not configured; notification signatures will NOT be verified");
    }
    if app_config.is_production() && !app_config.processor.live_mode {
        warn!("Running in production environment against the processor sandbox");
    }

    Ok(app_config)
}

pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("paygate_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
