use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

/// Absolute per-call duration ceiling of the expression model.
pub const MODEL_HARD_LIMIT_MS: u64 = 5_000;
/// Planner window size, kept under the hard limit as a safety margin.
pub const DEFAULT_MAX_WINDOW_MS: u64 = 4_500;

pub const DEFAULT_BUCKET_SECONDS: u64 = 5;
pub const MIN_BUCKET_SECONDS: u64 = 5;
pub const MAX_BUCKET_SECONDS: u64 = 10;

pub const DEFAULT_AUDIO_DIR: &str = "audio_files";
pub const DEFAULT_CLEANUP_AGE_SECS: u64 = 300;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_SUMMARY_INTERVAL_SECS: u64 = 3_600;

pub const ENV_HUME_API_KEY: &str = "HUME_API_KEY";
pub const ENV_OMI_APP_ID: &str = "OMI_APP_ID";
pub const ENV_OMI_API_KEY: &str = "OMI_API_KEY";
pub const ENV_ALERT_POLICY: &str = "EMOTION_NOTIFICATION_CONFIG";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// The model hard limit plus the smaller window the planner actually uses.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkLimits {
    hard_limit_ms: u64,
    max_window_ms: u64,
}

impl ChunkLimits {
    pub fn new(hard_limit_ms: u64, max_window_ms: u64) -> Result<Self, ConfigError> {
        if max_window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if max_window_ms > hard_limit_ms {
            return Err(ConfigError::WindowAboveHardLimit {
                max_window_ms,
                hard_limit_ms,
            });
        }
        Ok(Self {
            hard_limit_ms,
            max_window_ms,
        })
    }

    pub fn hard_limit_ms(&self) -> u64 {
        self.hard_limit_ms
    }

    pub fn max_window_ms(&self) -> u64 {
        self.max_window_ms
    }
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            hard_limit_ms: MODEL_HARD_LIMIT_MS,
            max_window_ms: DEFAULT_MAX_WINDOW_MS,
        }
    }
}

/// Timeline bucket width in whole seconds, bounded to 5..=10.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketDuration(u64);

impl BucketDuration {
    pub fn new(seconds: u64) -> Result<Self, ConfigError> {
        if !(MIN_BUCKET_SECONDS..=MAX_BUCKET_SECONDS).contains(&seconds) {
            return Err(ConfigError::BucketOutOfRange(seconds));
        }
        Ok(Self(seconds))
    }

    pub fn seconds(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0 * 1_000
    }
}

impl Default for BucketDuration {
    fn default() -> Self {
        Self(DEFAULT_BUCKET_SECONDS)
    }
}

/// When to push an alert and which emotions participate. Empty thresholds
/// mean alert on anything detected.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AlertPolicy {
    pub notification_enabled: bool,
    #[serde(default)]
    pub emotion_thresholds: HashMap<String, f64>,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            notification_enabled: true,
            emotion_thresholds: HashMap::new(),
        }
    }
}

impl AlertPolicy {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidAlertPolicy(e.to_string()))
    }

    /// Load from the policy file, falling back to the environment variable
    /// and then to the default. Parse failures are logged and fall through
    /// rather than aborting startup.
    pub fn load(path: &Path, env: &impl Env) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match Self::from_json(&raw) {
                Ok(policy) => return policy,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not parse alert policy file");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read alert policy file");
            }
        }

        if let Some(raw) = env.var(ENV_ALERT_POLICY) {
            match Self::from_json(&raw) {
                Ok(policy) => return policy,
                Err(e) => {
                    tracing::warn!(error = %e, "could not parse alert policy environment override");
                }
            }
        }

        Self::default()
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::PolicyWrite(e.to_string()))?;
        std::fs::write(path, raw).map_err(|e| ConfigError::PolicyWrite(e.to_string()))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OmiConfig {
    pub app_id: Option<String>,
    pub api_key: Option<ApiKey>,
}

impl OmiConfig {
    pub fn is_configured(&self) -> bool {
        self.app_id.is_some() && self.api_key.is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub hume_api_key: ApiKey,
    pub omi: OmiConfig,
    pub chunk: ChunkLimits,
    pub audio_dir: PathBuf,
    pub alert: AlertPolicy,
    pub cleanup_age: Duration,
    pub cleanup_interval: Duration,
    pub summary_interval: Duration,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,

    #[error("expression model api key is required")]
    MissingModelKey,

    #[error("chunk window must be > 0 ms")]
    ZeroWindow,

    #[error("chunk window {max_window_ms}ms exceeds model hard limit {hard_limit_ms}ms")]
    WindowAboveHardLimit {
        max_window_ms: u64,
        hard_limit_ms: u64,
    },

    #[error("bucket duration must be between 5 and 10 seconds, got {0}")]
    BucketOutOfRange(u64),

    #[error("invalid alert policy: {0}")]
    InvalidAlertPolicy(String),

    #[error("could not persist alert policy: {0}")]
    PolicyWrite(String),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}
