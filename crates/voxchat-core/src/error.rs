use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("failed to encode audio: {0}")]
    Encode(String),
}

/// Microphone or recognizer could not be brought up; no turn starts.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio capture failed: {0}")]
    Audio(#[from] AudioError),

    #[error("capture already active")]
    AlreadyActive,

    #[error("recognizer failed: {0}")]
    Recognizer(#[from] RecognizerError),
}

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("recognizer initialization failed: {0}")]
    InitializationFailed(String),

    #[error("recognition failed: {0}")]
    ProcessingFailed(String),

    #[error("recognizer not found: {0}")]
    EngineNotFound(String),
}

/// POST or event-stream failure. The turn is abandoned, never retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("stream closed before end of turn")]
    StreamClosed,

    #[error("no stream event within {0}s")]
    IdleTimeout(u64),

    #[error("malformed backend payload: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 audio payload: {0}")]
    Base64(String),

    #[error("undecodable audio: {0}")]
    Audio(String),

    #[error("empty audio payload")]
    Empty,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("output device unavailable: {0}")]
    Device(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
