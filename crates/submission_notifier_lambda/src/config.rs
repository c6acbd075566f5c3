use std::time::Duration;

use lambda_runtime::tracing;
use serde::Deserialize;
use submission_notifier_core::contract::{
    DEFAULT_ARTIFACT_BUCKET, DEFAULT_SENDER_EMAIL, DEFAULT_STATUS_TABLE,
};

pub const BUCKET_ENV: &str = "SUBMISSION_BUCKET";
pub const STATUS_TABLE_ENV: &str = "SUBMISSION_STATUS_TABLE";
pub const SENDER_EMAIL_ENV: &str = "SUBMISSION_SENDER_EMAIL";
pub const STORE_CREDENTIALS_ENV: &str = "ARTIFACT_STORE_CREDENTIALS";
pub const FETCH_TIMEOUT_ENV: &str = "ARTIFACT_FETCH_TIMEOUT_SECS";

/// S3-interoperable endpoint of Google Cloud Storage.
pub const DEFAULT_STORE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_STORE_REGION: &str = "auto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    pub bucket: String,
    pub status_table: String,
    pub sender_email: String,
    /// Raw JSON key material; parsed when an upload needs it.
    pub store_credentials: Option<String>,
    pub fetch_timeout: Option<Duration>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_ARTIFACT_BUCKET.to_string(),
            status_table: DEFAULT_STATUS_TABLE.to_string(),
            sender_email: DEFAULT_SENDER_EMAIL.to_string(),
            store_credentials: None,
            fetch_timeout: None,
        }
    }
}

impl HandlerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Never fails: a malformed value is logged and replaced by its default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let fetch_timeout = value(FETCH_TIMEOUT_ENV).and_then(|raw| match parse_timeout(&raw) {
            Ok(timeout) => Some(timeout),
            Err(error) => {
                tracing::warn!(error = %error, "ignoring download timeout");
                None
            }
        });

        Self {
            bucket: value(BUCKET_ENV).unwrap_or(defaults.bucket),
            status_table: value(STATUS_TABLE_ENV).unwrap_or(defaults.status_table),
            sender_email: value(SENDER_EMAIL_ENV).unwrap_or(defaults.sender_email),
            store_credentials: value(STORE_CREDENTIALS_ENV),
            fetch_timeout,
        }
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse()
        .map(Duration::from_secs)
        .map_err(|error| ConfigError::invalid(FETCH_TIMEOUT_ENV, error))
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct StoreCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl StoreCredentials {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let credentials: Self = serde_json::from_str(raw)
            .map_err(|error| ConfigError::Credentials(error.to_string()))?;
        if credentials.access_key_id.trim().is_empty()
            || credentials.secret_access_key.trim().is_empty()
        {
            return Err(ConfigError::Credentials(
                "access_key_id and secret_access_key cannot be empty".to_string(),
            ));
        }
        Ok(credentials)
    }

    pub fn endpoint_url(&self) -> &str {
        self.endpoint_url.as_deref().unwrap_or(DEFAULT_STORE_ENDPOINT)
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_STORE_REGION)
    }
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url())
            .field("region", &self.region())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { name: &'static str, reason: String },
    Credentials(String),
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidValue {
            name,
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, reason } => write!(f, "Invalid {name}: {reason}"),
            Self::Credentials(reason) => write!(f, "Invalid object store credentials: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
