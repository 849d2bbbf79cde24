use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub typewriter: TypewriterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_stream_idle_timeout_secs")]
    pub stream_idle_timeout_secs: u64,

    /// Send an explicit `turn_id` with both the upload and the stream subscription.
    #[serde(default = "default_true")]
    pub correlate_turns: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
            correlate_turns: default_true(),
        }
    }
}

impl BackendConfig {
    /// Full URL of the turn endpoint, tolerant of stray slashes.
    pub fn turn_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStrategy {
    Recording,
    #[default]
    Transcription,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default)]
    pub strategy: CaptureStrategy,

    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,

    /// Wait after stopping live transcription so trailing results can land.
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,

    #[serde(default = "default_max_recording_secs")]
    pub max_recording_secs: u32,

    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            strategy: CaptureStrategy::default(),
            device_name: default_device_name(),
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            drain_ms: default_drain_ms(),
            max_recording_secs: default_max_recording_secs(),
            recognizer: RecognizerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecognizerConfig {
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Engine-specific settings, handed to the recognizer verbatim.
    #[serde(flatten)]
    pub extra: toml::Value,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            extra: toml::Value::Table(Default::default()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlaybackConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default)]
    pub typing_sound: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            volume: default_volume(),
            typing_sound: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TypewriterConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_endpoint() -> String {
    "/transcribe".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_stream_idle_timeout_secs() -> u64 {
    120
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_buffer_size() -> u32 {
    1024
}

fn default_drain_ms() -> u64 {
    2000
}

fn default_max_recording_secs() -> u32 {
    120
}

fn default_engine() -> String {
    "remote".to_string()
}

fn default_true() -> bool {
    true
}

fn default_volume() -> f32 {
    1.0
}

fn default_tick_ms() -> u64 {
    200
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let mut result = input.to_string();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => result = result.replace(&cap[0], &val),
            Err(_) => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
        }
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.base_url is empty".to_string()));
        }
        if self.typewriter.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "typewriter.tick_ms must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.playback.volume) {
            return Err(ConfigError::Invalid(format!(
                "playback.volume {} outside 0.0..=2.0",
                self.playback.volume
            )));
        }
        if self.capture.sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "capture.sample_rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
