pub mod config;
pub mod config_diff;
pub mod error;
pub mod transcript;
pub mod tui_types;
pub mod types;

pub use config::{AppConfig, CaptureStrategy};
pub use config_diff::ConfigDiff;
pub use error::{
    AudioError, CaptureError, ConfigError, DecodeError, PlaybackError, RecognizerError,
    TransportError,
};
pub use transcript::TranscriptStore;
pub use tui_types::{CaptureStatus, ChatState, UiCommand};
pub use types::{
    strip_control_prefix, AudioBlob, AudioChunk, ChatEntry, EntryKind, RecognitionResult,
    StreamChunk, TurnId, TurnStatus, Utterance, CONTROL_PREFIX,
};
