use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Local development address of the analysis backend
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

const DEFAULT_API_PREFIX: &str = "/api";

/// Placeholder title for sessions created without one
pub const DEFAULT_SESSION_TITLE: &str = "New chat";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Base URL of the analysis backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix every REST route is mounted under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Timeout for non-streaming REST calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_session_title")]
    pub default_session_title: String,

    /// Characters of the first message used as title when a turn creates its own session
    #[serde(default = "default_implicit_title_chars")]
    pub implicit_title_chars: usize,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub debug: bool,
}

fn default_working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.into()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_session_title() -> String {
    DEFAULT_SESSION_TITLE.into()
}

fn default_implicit_title_chars() -> usize {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            request_timeout_secs: default_request_timeout(),
            default_session_title: default_session_title(),
            implicit_title_chars: default_implicit_title_chars(),
            stream: StreamConfig::default(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Longest wait for the next streamed event before the turn is aborted; 0 waits forever
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_idle_timeout() -> u64 {
    120
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl StreamConfig {
    pub fn idle_timeout(&self) -> Option<std::time::Duration> {
        (self.idle_timeout_secs > 0).then(|| std::time::Duration::from_secs(self.idle_timeout_secs))
    }
}

pub fn load_config(working_dir: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let wd = working_dir.unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let mut config = AppConfig::default();
    config.working_dir = wd.clone();

    // Global config first, the project-local file overrides it
    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("data-analyst").join("config.json");
        if global_path.exists() {
            merge_config(&mut config, read_config_file(&global_path)?);
        }
    }

    let local_path = wd.join("analyst.json");
    if local_path.exists() {
        merge_config(&mut config, read_config_file(&local_path)?);
    }

    apply_env_overrides(&mut config)?;
    config.validate()?;

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))
}

fn merge_config(base: &mut AppConfig, overlay: AppConfig) {
    if overlay.base_url != default_base_url() {
        base.base_url = overlay.base_url;
    }
    if overlay.api_prefix != default_api_prefix() {
        base.api_prefix = overlay.api_prefix;
    }
    if overlay.request_timeout_secs != default_request_timeout() {
        base.request_timeout_secs = overlay.request_timeout_secs;
    }
    if overlay.default_session_title != default_session_title() {
        base.default_session_title = overlay.default_session_title;
    }
    if overlay.implicit_title_chars != default_implicit_title_chars() {
        base.implicit_title_chars = overlay.implicit_title_chars;
    }
    if overlay.stream.idle_timeout_secs != default_idle_timeout() {
        base.stream.idle_timeout_secs = overlay.stream.idle_timeout_secs;
    }
    if overlay.debug {
        base.debug = true;
    }
}

fn apply_env_overrides(config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Ok(url) = std::env::var("ANALYST_API_URL") {
        if !url.is_empty() {
            config.base_url = url;
        }
    }

    if let Ok(secs) = std::env::var("ANALYST_STREAM_TIMEOUT_SECS") {
        if !secs.is_empty() {
            config.stream.idle_timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("ANALYST_STREAM_TIMEOUT_SECS is not a number: {secs}"))
            })?;
        }
    }

    Ok(())
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("base_url".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL: {}",
                self.base_url
            )));
        }
        if self.default_session_title.trim().is_empty() {
            return Err(ConfigError::MissingField("default_session_title".into()));
        }
        Ok(())
    }

    /// Base URL joined with the API prefix, without a trailing slash
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{prefix}")
        }
    }

    /// Per-request REST timeout; `0` means no limit.
    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        (self.request_timeout_secs > 0).then(|| std::time::Duration::from_secs(self.request_timeout_secs))
    }
}
