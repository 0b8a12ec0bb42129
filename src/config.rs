use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub session: SessionSettings,
    pub email: EmailSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub reset: ResetSettings,
    #[serde(default)]
    pub recommendation: RecommendationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Postgres connection settings. Without a URL the service keeps all
/// records in process memory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Redis URL; sessions live in a local cache when absent
    pub redis_url: Option<String>,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            cookie_name: default_cookie_name(),
            ttl_secs: default_session_ttl(),
            memory_capacity: default_memory_capacity(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

fn default_cookie_name() -> String { "sessionid".to_string() }
fn default_session_ttl() -> u64 { 14 * 24 * 60 * 60 }
fn default_memory_capacity() -> u64 { 10_000 }
fn default_command_timeout() -> u64 { 2 }

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(default)]
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    #[serde(default = "default_email_timeout")]
    pub timeout_secs: u64,
}

fn default_email_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
}

fn default_token_ttl() -> i64 { 3600 }

#[derive(Debug, Clone, Deserialize)]
pub struct ResetSettings {
    #[serde(default = "default_code_ttl_minutes")]
    pub code_ttl_minutes: i64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default = "default_true")]
    pub supersede_prior_codes: bool,
    #[serde(default)]
    pub uniform_response: bool,
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            code_ttl_minutes: default_code_ttl_minutes(),
            min_password_length: default_min_password_length(),
            supersede_prior_codes: true,
            uniform_response: false,
            purge_interval_secs: default_purge_interval(),
        }
    }
}

fn default_code_ttl_minutes() -> i64 { 10 }
fn default_min_password_length() -> usize { 6 }
fn default_purge_interval() -> u64 { 600 }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationSettings {
    /// Persist one audit row per recommended posting
    #[serde(default)]
    pub audit: bool,
    #[serde(default = "default_base_score")]
    pub base_score: u8,
    #[serde(default = "default_per_skill")]
    pub per_skill: u8,
    #[serde(default = "default_max_score")]
    pub max_score: u8,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            audit: false,
            base_score: default_base_score(),
            per_skill: default_per_skill(),
            max_score: default_max_score(),
        }
    }
}

fn default_base_score() -> u8 { 50 }
fn default_per_skill() -> u8 { 10 }
fn default_max_score() -> u8 { 100 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with ACCESSJOBS__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ACCESSJOBS__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("ACCESSJOBS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_well_known_env(settings)?;

        settings.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("ACCESSJOBS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize::<Self>()?.validated()
    }

    /// Reject values that would break scoring or reset invariants
    fn validated(self) -> Result<Self, ConfigError> {
        let rec = &self.recommendation;
        if rec.max_score > 100 {
            return Err(ConfigError::Message(format!(
                "recommendation.max_score must be at most 100, got {}",
                rec.max_score
            )));
        }
        if rec.base_score > rec.max_score {
            return Err(ConfigError::Message(format!(
                "recommendation.base_score ({}) exceeds max_score ({})",
                rec.base_score, rec.max_score
            )));
        }
        if self.reset.code_ttl_minutes <= 0 {
            return Err(ConfigError::Message("reset.code_ttl_minutes must be positive".to_string()));
        }
        Ok(self)
    }
}

/// Apply the conventional unprefixed variables (DATABASE_URL, REDIS_URL,
/// JWT_SECRET) on top of the layered sources.
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }
    if let Ok(url) = env::var("REDIS_URL") {
        builder = builder.set_override("session.redis_url", url)?;
    }
    if let Ok(secret) = env::var("JWT_SECRET") {
        builder = builder.set_override("auth.jwt_secret", secret)?;
    }

    builder.build()
}
