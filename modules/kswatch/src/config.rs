use std::path::Path;

use ini::Ini;
use pushover::PushoverOptions;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "kswatch.conf";

const PLACEHOLDER_USER_KEY: &str = "USER_KEY_HERE";
const PLACEHOLDER_APP_TOKEN: &str = "APP_TOKEN_HERE";
const DEFAULT_PRIORITY: i8 = 1;

/// On-disk credentials file. TOML:
///
/// ```toml
/// [pushover]
/// user_key = "..."
/// app_token = "..."
/// priority = 1
/// ```
///
/// or the same section as plain INI with unquoted values.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub pushover: PushoverSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushoverSection {
    pub user_key: String,
    pub app_token: String,
    #[serde(default)]
    pub priority: Option<i8>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("not TOML ({toml}) and not INI ({ini})")]
    Syntax { toml: String, ini: String },

    #[error("missing [pushover] section")]
    MissingSection,

    #[error("missing key {0} in [pushover]")]
    MissingKey(&'static str),

    #[error("invalid priority: {0}")]
    InvalidPriority(String),
}

/// Resolved notification credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub user_key: String,
    pub app_token: String,
    pub priority: i8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_key: PLACEHOLDER_USER_KEY.to_string(),
            app_token: PLACEHOLDER_APP_TOKEN.to_string(),
            priority: DEFAULT_PRIORITY,
        }
    }
}

impl Config {
    /// Load credentials from `path`, then apply `PUSHOVER_USER_KEY` /
    /// `PUSHOVER_APP_TOKEN` overrides. Never fails: anything missing or
    /// malformed keeps the placeholder values.
    pub fn load(path: &Path) -> Self {
        let mut config = Self::from_file(path);
        if let Ok(user_key) = std::env::var("PUSHOVER_USER_KEY") {
            config.user_key = user_key;
        }
        if let Ok(app_token) = std::env::var("PUSHOVER_APP_TOKEN") {
            config.app_token = app_token;
        }
        config
    }

    /// Credentials from the file alone.
    pub fn from_file(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Config file not readable, using placeholders");
                return Self::default();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            debug!(path = %path.display(), error = %e, "Config file malformed, using placeholders");
            Self::default()
        })
    }

    /// TOML first; anything TOML rejects is read again as INI.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        match toml::from_str::<FileConfig>(content) {
            Ok(file) => Ok(Self {
                user_key: file.pushover.user_key,
                app_token: file.pushover.app_token,
                priority: file.pushover.priority.unwrap_or(DEFAULT_PRIORITY),
            }),
            Err(toml_err) => Self::parse_ini(content).map_err(|e| match e {
                ConfigError::Syntax { ini, .. } => ConfigError::Syntax {
                    toml: toml_err.message().to_string(),
                    ini,
                },
                other => other,
            }),
        }
    }

    fn parse_ini(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Syntax {
            toml: String::new(),
            ini: e.to_string(),
        })?;
        let section = ini
            .section(Some("pushover"))
            .ok_or(ConfigError::MissingSection)?;

        let value = |key: &'static str| {
            section
                .get(key)
                .map(str::to_string)
                .ok_or(ConfigError::MissingKey(key))
        };
        let priority = match section.get("priority") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPriority(raw.to_string()))?,
            None => DEFAULT_PRIORITY,
        };

        Ok(Self {
            user_key: value("user_key")?,
            app_token: value("app_token")?,
            priority,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.user_key == PLACEHOLDER_USER_KEY || self.app_token == PLACEHOLDER_APP_TOKEN
    }

    pub fn log_redacted(&self) {
        info!(
            user_key = %redact(&self.user_key),
            app_token = %redact(&self.app_token),
            priority = self.priority,
            "Notification config loaded"
        );
        if self.has_placeholders() {
            warn!("Pushover credentials are placeholders; notifications will be rejected");
        }
    }

    pub fn pushover_options(&self) -> PushoverOptions {
        PushoverOptions {
            user_key: self.user_key.clone(),
            app_token: self.app_token.clone(),
            priority: self.priority,
        }
    }
}

fn redact(secret: &str) -> String {
    match secret.get(..4) {
        Some(prefix) if secret.len() > 8 => format!("{prefix}…"),
        _ => "***".to_string(),
    }
}
