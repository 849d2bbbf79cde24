use crate::types::{strip_control_prefix, ChatEntry, EntryKind, TurnId};

/// Shown for a recorded utterance until the backend returns its transcription.
pub const VOICE_PLACEHOLDER: &str = "(voice message)";

/// Ordered chat log. Entries are only ever appended, except that assistant
/// text fragments of the open turn merge into the last entry.
#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    entries: Vec<ChatEntry>,
    open_turn: Option<TurnId>,
    pending_voice: Option<(TurnId, usize)>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append the user's side of a turn and open the turn for merging.
    pub fn append_user(&mut self, turn: TurnId, text: &str) {
        self.open_turn = Some(turn);
        self.pending_voice = None;
        self.push(EntryKind::UserUtterance, strip_control_prefix(text).trim(), turn);
    }

    /// Append a placeholder for a recording whose text is not known yet.
    pub fn append_voice_placeholder(&mut self, turn: TurnId) {
        self.open_turn = Some(turn);
        self.push(EntryKind::UserUtterance, VOICE_PLACEHOLDER, turn);
        self.pending_voice = Some((turn, self.entries.len() - 1));
    }

    /// Replace a voice placeholder with the server-side transcription.
    /// Returns `false` when there is no placeholder for `turn`.
    pub fn resolve_user_text(&mut self, turn: TurnId, text: &str) -> bool {
        let cleaned = strip_control_prefix(text);
        let cleaned = cleaned.trim();
        match self.pending_voice {
            Some((t, idx)) if t == turn && !cleaned.is_empty() => {
                self.entries[idx].text = cleaned.to_string();
                self.pending_voice = None;
                true
            }
            _ => false,
        }
    }

    /// Merge or append an assistant text fragment. Fragments that are empty
    /// once the control prefix is removed are dropped, and `false` is returned.
    pub fn append_assistant_text(&mut self, turn: TurnId, fragment: &str) -> bool {
        let fragment = strip_control_prefix(fragment);
        if fragment.is_empty() {
            return false;
        }

        if self.open_turn == Some(turn) {
            if let Some(last) = self.entries.last_mut() {
                if last.kind == EntryKind::AssistantText && last.turn == turn {
                    let glue = fragment.starts_with(char::is_whitespace)
                        || last.text.ends_with(char::is_whitespace);
                    if !glue {
                        last.text.push('\n');
                    }
                    last.text.push_str(&fragment);
                    return true;
                }
            }
        }

        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.push(EntryKind::AssistantText, trimmed, turn);
        true
    }

    pub fn append_audio_marker(&mut self, turn: TurnId) {
        self.push(EntryKind::AssistantAudioMarker, "", turn);
    }

    /// Close a turn so later fragments can no longer merge into it.
    pub fn close_turn(&mut self, turn: TurnId) {
        if self.open_turn == Some(turn) {
            self.open_turn = None;
        }
        if matches!(self.pending_voice, Some((t, _)) if t == turn) {
            self.pending_voice = None;
        }
    }

    pub fn count_for_turn(&self, turn: TurnId) -> usize {
        self.entries.iter().filter(|e| e.turn == turn).count()
    }

    fn push(&mut self, kind: EntryKind, text: &str, turn: TurnId) {
        self.entries.push(ChatEntry {
            kind,
            text: text.to_string(),
            turn,
        });
    }
}
