//! Environment-backed runtime configuration for `wrenchat-cli`.

use std::{
    env,
    error::Error,
    fmt,
    path::PathBuf,
};

use client_runtime::ClientRuntimeConfig;

const DEFAULT_SERVER_URL: &str = "https://faerytea.name:8008/";
const DEFAULT_DB_PATH: &str = "./.wrenchat-store/wrenchat.sqlite";
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_PAGINATION_PIVOT: usize = 20;
const DEFAULT_CHAT: &str = "test@channel";

/// Runtime configuration used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Base URL of the messenger server.
    pub server_url: String,
    /// Location of the sqlite cache file.
    pub db_path: PathBuf,
    /// Page size used for history requests.
    pub page_size: u32,
    /// Distance from the oldest loaded message at which scrolling triggers
    /// the next older page.
    pub pagination_pivot: usize,
    /// Chat opened by the scripted session.
    pub chat: String,
    /// Optional credentials; without them the session stays read-only.
    pub user: Option<String>,
    /// Password paired with `user`.
    pub password: Option<String>,
    /// Optional text to send after login.
    pub send_text: Option<String>,
}

impl CliConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let server_url = optional_trimmed_env("WRENCHAT_SERVER_URL", &mut lookup)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_owned());
        let db_path = optional_trimmed_env("WRENCHAT_DB_PATH", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let page_size =
            parse_optional_u32("WRENCHAT_PAGE_SIZE", DEFAULT_PAGE_SIZE, &mut lookup)?;
        let pagination_pivot = parse_optional_usize(
            "WRENCHAT_PAGINATION_PIVOT",
            DEFAULT_PAGINATION_PIVOT,
            &mut lookup,
        )?;

        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WRENCHAT_PAGE_SIZE",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let chat = optional_trimmed_env("WRENCHAT_CHAT", &mut lookup)
            .unwrap_or_else(|| DEFAULT_CHAT.to_owned());
        let user = optional_trimmed_env("WRENCHAT_USER", &mut lookup);
        let password = optional_trimmed_env("WRENCHAT_PASSWORD", &mut lookup);
        let send_text = optional_trimmed_env("WRENCHAT_SEND_TEXT", &mut lookup);

        Ok(Self {
            server_url,
            db_path,
            page_size,
            pagination_pivot,
            chat,
            user,
            password,
            send_text,
        })
    }

    /// Runtime construction parameters derived from this configuration.
    pub fn runtime_config(&self) -> ClientRuntimeConfig {
        let mut config = ClientRuntimeConfig::new(self.server_url.clone(), self.db_path.clone());
        config.page_size = self.page_size;
        config.pagination_pivot = self.pagination_pivot;
        config
    }

    /// Whether both credentials are present.
    pub fn has_credentials(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional_u32<F>(key: &'static str, default: u32, lookup: &mut F) -> Result<u32, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    value
        .parse::<u32>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

fn parse_optional_usize<F>(
    key: &'static str,
    default: usize,
    lookup: &mut F,
) -> Result<usize, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    value
        .parse::<usize>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}
