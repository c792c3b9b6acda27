use std::{env, path::PathBuf, sync::Once};

use fintrack_config::ConfigManager;

static TRACING_INIT: Once = Once::new();

/// Overrides the base directory holding config, session and local data.
pub const HOME_ENV: &str = "FINTRACK_HOME";
/// Overrides the configured API base URL for this process.
pub const API_URL_ENV: &str = "FINTRACK_API_URL";
/// Supplies a bearer token for this process without persisting it.
pub const TOKEN_ENV: &str = "FINTRACK_TOKEN";

const DEFAULT_DIRECTIVE: &str = "fintrack=info";

/// Initializes the global tracing subscriber with sensible defaults.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}

/// Returns the application base directory, defaulting to `~/.fintrack`.
pub fn app_base_dir() -> PathBuf {
    match env::var_os(HOME_ENV) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => ConfigManager::default_base_dir(),
    }
}

/// Reads a non-empty environment variable.
pub fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
