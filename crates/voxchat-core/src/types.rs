use std::fmt;

/// Marks backend-internal text that must never reach the display.
pub const CONTROL_PREFIX: &str = "[write]:";

/// Remove the first occurrence of [`CONTROL_PREFIX`].
pub fn strip_control_prefix(text: &str) -> String {
    text.replacen(CONTROL_PREFIX, "", 1)
}

#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// One recognizer hypothesis. Interim results replace each other until a
/// final one commits the segment.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub text: String,
    pub timestamp: f64,
    pub is_final: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Pending,
    Streaming,
    Ended,
    Cancelled,
}

impl TurnStatus {
    pub fn is_live(self) -> bool {
        matches!(self, TurnStatus::Pending | TurnStatus::Streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    UserUtterance,
    AssistantText,
    AssistantAudioMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub kind: EntryKind,
    pub text: String,
    pub turn: TurnId,
}

/// Encoded recording ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Utterance {
    Transcript(String),
    Recording(AudioBlob),
}

/// One decoded server-sent event of a reply stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Text(String),
    /// Base64-encoded MPEG audio.
    Audio(String),
    End,
}
