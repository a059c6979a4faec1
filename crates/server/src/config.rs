use crate::notify::dispatch::delay_for_rate;
use config::Map;
use lettre::Address;
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    /// Display name used in the `From` mailbox.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Use STARTTLS on a plain connection instead of implicit TLS.
    #[serde(default)]
    pub starttls: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on outgoing messages per second within one dispatch run.
    /// `0` disables pacing entirely.
    #[serde(default = "default_messages_per_second")]
    pub messages_per_second: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            messages_per_second: default_messages_per_second(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    /// Request bodies may carry inline photos, hence the generous default.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub smtp: SmtpConfig,
    /// Addresses allowed to broadcast and approve users. Admins also receive
    /// every alert and broadcast. Accepts a list or a comma-separated string.
    #[serde(default, deserialize_with = "address_list")]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl AppConfig {
    /// Checks the invariants the server relies on at startup. Mail credentials
    /// are mandatory: the server refuses to start without them rather than
    /// failing every dispatch later on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Validation("database_url must be set".into()));
        }
        if self.smtp.server.trim().is_empty() {
            return Err(ConfigError::Validation("smtp.server must be set".into()));
        }
        if self.smtp.username.is_empty() || self.smtp.password.is_empty() {
            return Err(ConfigError::Validation(
                "smtp.username and smtp.password must be set".into(),
            ));
        }
        if self.smtp.port == 0 {
            return Err(ConfigError::Validation("smtp.port must be > 0".into()));
        }
        if self.smtp.from.parse::<Address>().is_err() {
            return Err(ConfigError::Validation(format!(
                "smtp.from is not a valid address: {}",
                self.smtp.from
            )));
        }
        let rate = self.dispatch.messages_per_second;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::Validation(
                "dispatch.messages_per_second must be a finite, non-negative number".into(),
            ));
        }
        if rate > 0.0 && delay_for_rate(rate).is_none() {
            return Err(ConfigError::Validation(format!(
                "dispatch.messages_per_second is too small: {rate}"
            )));
        }
        Ok(())
    }
}

fn address_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Addresses {
        List(Vec<String>),
        Joined(String),
    }

    let addresses = match Addresses::deserialize(deserializer)? {
        Addresses::List(list) => list,
        Addresses::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(addresses
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect())
}

fn default_from_name() -> String {
    "GuardianshipApp".to_string()
}

fn default_messages_per_second() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_body_limit_bytes() -> usize {
    50 * 1024 * 1024
}

/// Load application configuration from `config.yaml` (optional) + environment
/// overrides.
///
/// Environment variables override file values using double underscores as the
/// key path separator (e.g. `SMTP__PORT`). Values are kept as strings until
/// deserialization, so secrets such as `SMTP__PASSWORD=0123` stay intact.
/// `ADMIN_EMAILS` is a comma-separated list.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from("config")
}

/// Like [`load_config`], reading the given file stem instead of `config`.
pub fn load_config_from(file: &str) -> Result<AppConfig, ConfigError> {
    load_config_with_env(file, None)
}

/// Like [`load_config_from`], taking environment variables from `vars`
/// instead of the process environment when given.
pub fn load_config_with_env(
    file: &str,
    vars: Option<Map<String, String>>,
) -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name(file).required(false))
        .add_source(Environment::default().separator("__").source(vars))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
