use std::path::PathBuf;

use anyhow::{anyhow, Context};
use redact::Secret;
use serde::Deserialize;
use url::Url;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "HOTELPRESS_ENV";
const CONFIG_DIR_ENV: &str = "HOTELPRESS_CONFIG_DIR";
const ENV_PREFIX: &str = "HOTELPRESS";

/// Deployment environment the application is running in.
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
    pub server: ServerSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub affiliate: AffiliateSettings,
    #[serde(default)]
    pub publisher: PublisherSettings,
    #[serde(default)]
    pub content: ContentSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay and
    /// `HOTELPRESS_<SECTION>__<KEY>` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
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

    /// Names (as environment variables) of every setting the publishing pipeline
    /// needs but that is missing or unusable.
    pub fn missing_publishing_settings(&self) -> Vec<String> {
        let checks = [
            ("auth", "api_key", is_set_secret(&self.auth.api_key)),
            ("affiliate", "site_id", is_set(&self.affiliate.site_id)),
            ("affiliate", "api_key", is_set_secret(&self.affiliate.api_key)),
            ("publisher", "base_url", is_http_url(&self.publisher.base_url)),
            ("publisher", "username", is_set(&self.publisher.username)),
            (
                "publisher",
                "app_password",
                is_set_secret(&self.publisher.app_password),
            ),
        ];

        checks
            .into_iter()
            .filter(|(_, _, present)| !present)
            .map(|(section, key, _)| env_var_name(section, key))
            .collect()
    }
}

/// Environment variable that overrides `section.key`.
pub fn env_var_name(section: &str, key: &str) -> String {
    format!(
        "{}_{}__{}",
        ENV_PREFIX,
        section.to_ascii_uppercase(),
        key.to_ascii_uppercase()
    )
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn is_http_url(value: &Option<String>) -> bool {
    value
        .as_deref()
        .and_then(|v| Url::parse(v.trim()).ok())
        .is_some_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

fn is_set_secret(value: &Option<Secret<String>>) -> bool {
    value
        .as_ref()
        .is_some_and(|v| !v.expose_secret().trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
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
        30000
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

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
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

/// Shared-secret header check for inbound requests.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "AuthSettings::default_header_name")]
    pub header_name: String,
    #[serde(default)]
    pub api_key: Option<Secret<String>>,
}

impl AuthSettings {
    fn default_header_name() -> String {
        "x-api-key".to_string()
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            header_name: Self::default_header_name(),
            api_key: None,
        }
    }
}

/// Affiliate hotel-search API.
#[derive(Debug, Clone, Deserialize)]
pub struct AffiliateSettings {
    #[serde(default = "AffiliateSettings::default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<Secret<String>>,
    #[serde(default = "AffiliateSettings::default_currency")]
    pub currency: String,
    #[serde(default = "AffiliateSettings::default_language")]
    pub language: String,
    #[serde(default = "AffiliateSettings::default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    /// Check-in date used when a request carries none: today plus this many days.
    #[serde(default = "AffiliateSettings::default_check_in_offset_days")]
    pub check_in_offset_days: u32,
    #[serde(default = "AffiliateSettings::default_nights")]
    pub nights: u32,
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
}

impl AffiliateSettings {
    fn default_endpoint() -> String {
        "https://affiliateapi7643.agoda.com/affiliateservice/lt_v1".to_string()
    }

    fn default_currency() -> String {
        "USD".to_string()
    }

    fn default_language() -> String {
        "en-us".to_string()
    }

    fn default_adults() -> u32 {
        2
    }

    fn default_check_in_offset_days() -> u32 {
        30
    }

    fn default_nights() -> u32 {
        1
    }
}

impl Default for AffiliateSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            site_id: None,
            api_key: None,
            currency: Self::default_currency(),
            language: Self::default_language(),
            adults: Self::default_adults(),
            children: 0,
            check_in_offset_days: Self::default_check_in_offset_days(),
            nights: Self::default_nights(),
            timeout_ms: default_upstream_timeout_ms(),
        }
    }
}

/// WordPress-compatible publish target.
#[derive(Debug, Clone, Deserialize)]
pub struct PublisherSettings {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub app_password: Option<Secret<String>>,
    #[serde(default = "PublisherSettings::default_category")]
    pub default_category: u64,
    /// Hour of day used for scheduled posts without an explicit date.
    #[serde(default = "PublisherSettings::default_schedule_hour")]
    pub schedule_hour: u8,
    /// Offset from UTC of the site's timezone, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
}

impl PublisherSettings {
    fn default_category() -> u64 {
        1
    }

    fn default_schedule_hour() -> u8 {
        9
    }
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            app_password: None,
            default_category: Self::default_category(),
            schedule_hour: Self::default_schedule_hour(),
            utc_offset_minutes: 0,
            timeout_ms: default_upstream_timeout_ms(),
        }
    }
}

/// Article generation defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentSettings {
    /// Template version used when a request names none or an unknown one.
    #[serde(default = "ContentSettings::default_version")]
    pub default_version: String,
    /// Seeds the per-request RNG; unset means fresh entropy per request.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl ContentSettings {
    fn default_version() -> String {
        "long".to_string()
    }
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            default_version: Self::default_version(),
            random_seed: None,
        }
    }
}

fn default_upstream_timeout_ms() -> u64 {
    10000
}
