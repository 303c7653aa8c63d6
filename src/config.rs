//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::outbound::BatchLimits;

/// Default outbound platform API base URL.
pub const DEFAULT_API_URL: &str = "https://api.kik.com/v1";

/// Relay configuration, built once at start-up and shared through `AppContext`.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// User id of the admin (receives notifications, runs admin commands).
    pub admin_id: String,
    /// User id of the content recipient. May equal `admin_id` for testing.
    pub recipient_id: String,
    /// Bot username used to authenticate against the platform API.
    pub bot_username: String,
    /// Bot API key.
    pub bot_api_key: SecretString,
    /// Platform API base URL.
    pub api_url: String,
    /// Webhook URL registered with the platform at start-up, if any.
    pub webhook_url: Option<String>,
    /// Basic-auth user for the trigger routes.
    pub webhook_user: String,
    /// Basic-auth password for the trigger routes.
    pub webhook_pass: SecretString,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// Platform rate limits applied when flushing the queue.
    pub limits: BatchLimits,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let admin_id = required("RELAY_ADMIN_ID")?;
        let recipient_id = required("RELAY_RECIPIENT_ID")?;
        let bot_username = required("RELAY_BOT_USERNAME")?;
        let bot_api_key = SecretString::from(required("RELAY_BOT_API_KEY")?);
        let webhook_user = required("RELAY_WEBHOOK_USER")?;
        let webhook_pass = SecretString::from(required("RELAY_WEBHOOK_PASS")?);

        let api_url = lookup("RELAY_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let webhook_url = lookup("RELAY_WEBHOOK_URL").filter(|s| !s.trim().is_empty());

        let db_path = lookup("RELAY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/feels-relay.db"));

        let port: u16 = parse_or(&lookup, "RELAY_PORT", 8080)?;
        let max_per_recipient: usize = parse_or(&lookup, "RELAY_MAX_PER_RECIPIENT", 5)?;
        let max_per_batch: usize = parse_or(&lookup, "RELAY_MAX_PER_BATCH", 25)?;

        if max_per_recipient == 0 || max_per_batch == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_MAX_PER_BATCH".into(),
                message: "batch limits must be at least 1".into(),
            });
        }
        if max_per_recipient > max_per_batch {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_MAX_PER_RECIPIENT".into(),
                message: format!(
                    "per-recipient limit {max_per_recipient} exceeds batch limit {max_per_batch}"
                ),
            });
        }

        Ok(Self {
            admin_id,
            recipient_id,
            bot_username,
            bot_api_key,
            api_url,
            webhook_url,
            webhook_user,
            webhook_pass,
            db_path,
            port,
            limits: BatchLimits {
                per_recipient: max_per_recipient,
                per_batch: max_per_batch,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
