use serde::{de::Deserializer, Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};

use crate::ConfigError;

/// Client settings persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom directory for the local JSON backend.
    pub data_dir: Option<PathBuf>,
    #[serde(default = "Config::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "Config::default_currency")]
    pub currency: String,
    #[serde(default = "Config::default_locale")]
    pub locale: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_base_url(),
            backend: BackendKind::default(),
            data_dir: None,
            request_timeout_secs: Self::default_request_timeout_secs(),
            currency: Self::default_currency(),
            locale: Self::default_locale(),
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 6] = [
        "api_base_url",
        "backend",
        "data_dir",
        "request_timeout_secs",
        "currency",
        "locale",
    ];

    pub fn default_api_base_url() -> String {
        "http://localhost:3000".into()
    }

    pub fn default_request_timeout_secs() -> u64 {
        30
    }

    pub fn default_currency() -> String {
        "USD".into()
    }

    pub fn default_locale() -> String {
        "en-US".into()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Decimal separator for amounts printed under `locale`.
    pub fn decimal_separator(&self) -> char {
        let language = self
            .locale
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "cs" | "da" | "de" | "es" | "fi" | "fr" | "it" | "nb" | "nl" | "pl" | "pt" | "ru"
            | "sv" | "tr" => ',',
            _ => '.',
        }
    }

    /// Formats `amount` with two decimals, the locale's separator and the currency code.
    pub fn format_money(&self, amount: f64) -> String {
        let mut text = format!("{amount:.2}");
        let separator = self.decimal_separator();
        if separator != '.' {
            text = text.replace('.', &separator.to_string());
        }
        format!("{text} {}", self.currency)
    }

    /// Directory holding the local backend's collection files.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(path) = &self.data_dir {
            return path.clone();
        }

        dirs::data_dir()
            .map(|base| base.join("fintrack"))
            .or_else(|| dirs::home_dir().map(|home| home.join(".fintrack")))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Updates one setting from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "api_base_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid(key, "expected an http:// or https:// URL"));
                }
                self.api_base_url = value.trim_end_matches('/').to_string();
            }
            "backend" => {
                self.backend = BackendKind::parse(value)
                    .ok_or_else(|| invalid(key, "expected `http` or `local`"))?;
            }
            "data_dir" => {
                self.data_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "request_timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| invalid(key, "expected a whole number of seconds"))?;
                if secs == 0 {
                    return Err(invalid(key, "must be at least 1"));
                }
                self.request_timeout_secs = secs;
            }
            "currency" => {
                if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(invalid(key, "expected a three-letter ISO 4217 code"));
                }
                self.currency = value.to_ascii_uppercase();
            }
            "locale" => {
                if value.is_empty() {
                    return Err(invalid(key, "must not be empty"));
                }
                self.locale = value.to_string();
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    key: other.to_string(),
                    message: format!("unknown setting (expected one of {})", Self::KEYS.join(", ")),
                })
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Which persistence backend the stores talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The REST API at `api_base_url`.
    #[default]
    Http,
    /// JSON files under the data directory.
    Local,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" | "remote" => Some(BackendKind::Http),
            "local" | "json" => Some(BackendKind::Local),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendKind::Http => "http",
            BackendKind::Local => "local",
        };
        f.write_str(label)
    }
}

// Unknown or missing values fall back to the default backend.
impl<'de> Deserialize<'de> for BackendKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value
            .as_deref()
            .and_then(BackendKind::parse)
            .unwrap_or_default())
    }
}
