use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use crossterm::event::{KeyCode, KeyEvent};
use voxchat_core::{CaptureStatus, ChatState, EntryKind, UiCommand};

use crate::typewriter::{Signals, Typewriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Chat,
    Logs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    None,
    Quit,
    Command(UiCommand),
}

pub struct App {
    pub tab: Tab,
    pub state: ChatState,
    /// One animation per assistant text entry, keyed by entry index.
    pub typewriters: BTreeMap<usize, Typewriter>,
    /// Entries whose reveal has started and not yet ended.
    typing: BTreeSet<usize>,
    /// Push-to-talk is held down (between the two Space presses).
    pub talking: bool,
    pub should_quit: bool,
    pub chat_scroll: usize,
    pub logs: Arc<Mutex<VecDeque<String>>>,
    pub log_scroll: usize,
    pub log_auto_scroll: bool,
}

impl App {
    pub fn new(logs: Arc<Mutex<VecDeque<String>>>) -> Self {
        Self {
            tab: Tab::Chat,
            state: ChatState::default(),
            typewriters: BTreeMap::new(),
            typing: BTreeSet::new(),
            talking: false,
            should_quit: false,
            chat_scroll: 0,
            logs,
            log_scroll: 0,
            log_auto_scroll: true,
        }
    }

    pub fn update_state(&mut self, new_state: ChatState) {
        // Capture dropped back to idle on its own: release or failed start.
        if new_state.capture == CaptureStatus::Idle
            && (self.state.capture != CaptureStatus::Idle
                || (new_state.notice.is_some() && new_state.notice != self.state.notice))
        {
            self.talking = false;
        }

        // Anything left over from an earlier turn is finished off, even if
        // the stop flag was overwritten before this snapshot arrived.
        let current = new_state.turn.map(|(id, _)| id);
        for (idx, entry) in new_state.entries.iter().enumerate() {
            if entry.kind != EntryKind::AssistantText {
                continue;
            }
            let tw = self
                .typewriters
                .entry(idx)
                .or_insert_with(|| Typewriter::new(entry.text.clone()));
            let mut signals = tw.set_text(&entry.text);
            let stale = matches!(current, Some(turn) if turn != entry.turn);
            if new_state.stop_typing || stale {
                signals = signals.merge(tw.preempt());
            }
            record(&mut self.typing, idx, signals);
        }
        let len = new_state.entries.len();
        self.typewriters.retain(|idx, _| *idx < len);
        self.typing.retain(|idx| *idx < len);

        if new_state.entries.len() != self.state.entries.len() {
            self.chat_scroll = 0;
        }
        self.state = new_state;
    }

    /// Advance every animation by one character.
    pub fn tick(&mut self) {
        for (idx, tw) in self.typewriters.iter_mut() {
            record(&mut self.typing, *idx, tw.tick());
        }
    }

    pub fn is_typing(&self) -> bool {
        !self.typing.is_empty()
    }

    /// Text to show for entry `idx`.
    pub fn display_text(&self, idx: usize) -> &str {
        match self.typewriters.get(&idx) {
            Some(tw) => tw.visible(),
            None => self
                .state
                .entries
                .get(idx)
                .map(|e| e.text.as_str())
                .unwrap_or(""),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        // Global keys
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return AppAction::Quit;
            }
            KeyCode::Char(' ') => return self.toggle_talk(),
            KeyCode::Char('s') => return AppAction::Command(UiCommand::Interrupt),
            KeyCode::Char('1') => {
                self.tab = Tab::Chat;
                return AppAction::None;
            }
            KeyCode::Char('2') => {
                self.tab = Tab::Logs;
                return AppAction::None;
            }
            KeyCode::Tab => {
                self.tab = match self.tab {
                    Tab::Chat => Tab::Logs,
                    Tab::Logs => Tab::Chat,
                };
                return AppAction::None;
            }
            _ => {}
        }

        match self.tab {
            Tab::Chat => self.handle_chat_key(key),
            Tab::Logs => self.handle_logs_key(key),
        }
    }

    fn toggle_talk(&mut self) -> AppAction {
        if self.talking {
            self.talking = false;
            return AppAction::Command(UiCommand::EndCapture);
        }
        if self.state.capture == CaptureStatus::Finalizing {
            return AppAction::None;
        }
        self.talking = true;
        AppAction::Command(UiCommand::BeginCapture)
    }

    fn handle_chat_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Up => self.chat_scroll = self.chat_scroll.saturating_add(1),
            KeyCode::Down => self.chat_scroll = self.chat_scroll.saturating_sub(1),
            KeyCode::Char('G') => self.chat_scroll = 0,
            _ => {}
        }
        AppAction::None
    }

    fn handle_logs_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Up => {
                self.log_scroll = self.log_scroll.saturating_add(1);
                self.log_auto_scroll = false;
            }
            KeyCode::Down => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
            }
            KeyCode::Char('G') => {
                self.log_scroll = 0;
                self.log_auto_scroll = true;
            }
            _ => {}
        }
        AppAction::None
    }
}

fn record(typing: &mut BTreeSet<usize>, idx: usize, signals: Signals) {
    if signals.started {
        typing.insert(idx);
    }
    if signals.ended {
        typing.remove(&idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typewriter::Phase;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use voxchat_core::{ChatEntry, TurnId, TurnStatus};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn make_app() -> App {
        App::new(Arc::new(Mutex::new(VecDeque::new())))
    }

    fn entry(kind: EntryKind, text: &str) -> ChatEntry {
        ChatEntry {
            kind,
            text: text.to_string(),
            turn: TurnId(1),
        }
    }

    fn chat(entries: Vec<ChatEntry>, stop_typing: bool) -> ChatState {
        ChatState {
            entries,
            stop_typing,
            ..Default::default()
        }
    }

    #[test]
    fn test_app_initial_state() {
        let app = make_app();
        assert_eq!(app.tab, Tab::Chat);
        assert!(!app.talking);
        assert!(!app.should_quit);
        assert!(app.typewriters.is_empty());
        assert!(app.log_auto_scroll);
    }

    #[test]
    fn test_app_tab_switching() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Char('2')));
        assert_eq!(app.tab, Tab::Logs);
        app.handle_key(key(KeyCode::Char('1')));
        assert_eq!(app.tab, Tab::Chat);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.tab, Tab::Logs);
    }

    #[test]
    fn test_space_toggles_push_to_talk() {
        let mut app = make_app();
        assert_eq!(
            app.handle_key(key(KeyCode::Char(' '))),
            AppAction::Command(UiCommand::BeginCapture)
        );
        assert!(app.talking);
        assert_eq!(
            app.handle_key(key(KeyCode::Char(' '))),
            AppAction::Command(UiCommand::EndCapture)
        );
        assert!(!app.talking);
    }

    #[test]
    fn test_space_ignored_while_finalizing() {
        let mut app = make_app();
        app.update_state(ChatState {
            capture: CaptureStatus::Finalizing,
            ..Default::default()
        });
        assert_eq!(app.handle_key(key(KeyCode::Char(' '))), AppAction::None);
    }

    #[test]
    fn test_failed_start_releases_talk_toggle() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Char(' ')));
        app.update_state(ChatState {
            notice: Some("input device not found".to_string()),
            ..Default::default()
        });
        assert!(!app.talking);
    }

    #[test]
    fn test_stale_idle_state_keeps_talk_toggle() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Char(' ')));
        app.update_state(ChatState::default());
        assert!(app.talking);
        app.update_state(ChatState {
            capture: CaptureStatus::Listening,
            ..Default::default()
        });
        assert!(app.talking);
    }

    #[test]
    fn test_s_interrupts() {
        let mut app = make_app();
        assert_eq!(
            app.handle_key(key(KeyCode::Char('s'))),
            AppAction::Command(UiCommand::Interrupt)
        );
    }

    #[test]
    fn test_app_quit() {
        let mut app = make_app();
        let action = app.handle_key(key(KeyCode::Char('q')));
        assert_eq!(action, AppAction::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn test_assistant_entries_get_typewriters() {
        let mut app = make_app();
        app.update_state(chat(
            vec![
                entry(EntryKind::UserUtterance, "What is the weather"),
                entry(EntryKind::AssistantAudioMarker, ""),
                entry(EntryKind::AssistantText, "It's sunny"),
            ],
            false,
        ));
        assert_eq!(app.typewriters.len(), 1);
        assert!(app.typewriters.contains_key(&2));
        assert_eq!(app.display_text(0), "What is the weather");
        assert_eq!(app.display_text(2), "");

        assert!(!app.is_typing());
        app.tick();
        assert_eq!(app.display_text(2), "I");
        assert!(app.is_typing());
    }

    #[test]
    fn test_merged_text_keeps_typing() {
        let mut app = make_app();
        app.update_state(chat(vec![entry(EntryKind::AssistantText, "Hello")], false));
        for _ in 0..5 {
            app.tick();
        }
        assert!(!app.is_typing());

        app.update_state(chat(vec![entry(EntryKind::AssistantText, "Hello world")], false));
        assert_eq!(app.display_text(0), "Hello");
        assert!(app.is_typing());
        app.tick();
        assert_eq!(app.display_text(0), "Hello ");
        for _ in 0..5 {
            app.tick();
        }
        assert!(!app.is_typing());
    }

    #[test]
    fn test_stop_typing_completes_everything() {
        let mut app = make_app();
        app.update_state(chat(
            vec![
                entry(EntryKind::AssistantText, "first answer"),
                entry(EntryKind::AssistantText, "second answer"),
            ],
            false,
        ));
        app.tick();
        app.update_state(chat(
            vec![
                entry(EntryKind::AssistantText, "first answer"),
                entry(EntryKind::AssistantText, "second answer"),
            ],
            true,
        ));
        assert_eq!(app.display_text(0), "first answer");
        assert_eq!(app.display_text(1), "second answer");
        assert!(app
            .typewriters
            .values()
            .all(|tw| tw.phase() == Phase::Preempted));
        assert!(!app.is_typing());
    }

    #[test]
    fn test_new_turn_finishes_previous_reply_without_stop_flag() {
        let mut app = make_app();
        let old = ChatEntry {
            kind: EntryKind::AssistantText,
            text: "long answer".to_string(),
            turn: TurnId(1),
        };
        app.update_state(ChatState {
            entries: vec![old.clone()],
            turn: Some((TurnId(1), TurnStatus::Streaming)),
            ..Default::default()
        });
        app.tick();
        assert!(app.is_typing());

        // Turn 2 already has text and the stop flag has been cleared again.
        app.update_state(ChatState {
            entries: vec![
                old,
                ChatEntry {
                    kind: EntryKind::UserUtterance,
                    text: "never mind".to_string(),
                    turn: TurnId(2),
                },
                ChatEntry {
                    kind: EntryKind::AssistantText,
                    text: "Okay".to_string(),
                    turn: TurnId(2),
                },
            ],
            turn: Some((TurnId(2), TurnStatus::Streaming)),
            stop_typing: false,
            ..Default::default()
        });
        assert_eq!(app.typewriters[&0].phase(), Phase::Preempted);
        assert_eq!(app.display_text(0), "long answer");
        assert_eq!(app.typewriters[&2].phase(), Phase::Idle);
        assert!(!app.is_typing());

        app.tick();
        assert!(app.is_typing());
        assert_eq!(app.display_text(2), "O");
    }

    #[test]
    fn test_dropped_entry_stops_typing_indicator() {
        let mut app = make_app();
        app.update_state(chat(vec![entry(EntryKind::AssistantText, "Hello")], false));
        app.tick();
        assert!(app.is_typing());
        app.update_state(chat(Vec::new(), false));
        assert!(!app.is_typing());
    }

    #[test]
    fn test_finished_animation_not_restarted_by_rerender() {
        let mut app = make_app();
        let state = chat(vec![entry(EntryKind::AssistantText, "Hi")], false);
        app.update_state(state.clone());
        app.tick();
        app.tick();
        app.update_state(state);
        assert_eq!(app.typewriters[&0].phase(), Phase::Done);
        assert_eq!(app.display_text(0), "Hi");
    }

    #[test]
    fn test_app_log_scroll() {
        let logs = Arc::new(Mutex::new(VecDeque::new()));
        {
            let mut buf = logs.lock().unwrap();
            for i in 0..20 {
                buf.push_back(format!("log line {}", i));
            }
        }
        let mut app = App::new(logs);
        app.tab = Tab::Logs;

        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.log_scroll, 1);
        assert!(!app.log_auto_scroll);

        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.log_scroll, 0);

        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.log_scroll, 2);
        app.handle_key(key(KeyCode::Char('G')));
        assert_eq!(app.log_scroll, 0);
        assert!(app.log_auto_scroll);
    }

    #[test]
    fn test_chat_scroll_resets_on_new_entry() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.chat_scroll, 2);
        app.update_state(chat(vec![entry(EntryKind::UserUtterance, "hi")], false));
        assert_eq!(app.chat_scroll, 0);
    }
}
