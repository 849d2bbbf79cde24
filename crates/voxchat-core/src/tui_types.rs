use crate::types::{ChatEntry, TurnId, TurnStatus};

/// What the capture side is doing, for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureStatus {
    #[default]
    Idle,
    Listening,
    /// Stopped, waiting for trailing recognition results or encoding.
    Finalizing,
}

/// Snapshot broadcast to the TUI via watch channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub entries: Vec<ChatEntry>,
    pub turn: Option<(TurnId, TurnStatus)>,
    /// Force every typewriter to reveal its full text.
    pub stop_typing: bool,
    pub capture: CaptureStatus,
    /// Interim transcript while listening.
    pub live_transcript: String,
    pub notice: Option<String>,
    pub warnings: Vec<String>,
}

impl ChatState {
    pub fn is_turn_live(&self) -> bool {
        matches!(self.turn, Some((_, status)) if status.is_live())
    }
}

/// Commands sent from TUI → main via mpsc channel.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    BeginCapture,
    EndCapture,
    /// Silence the assistant without starting a turn.
    Interrupt,
    Quit,
}
