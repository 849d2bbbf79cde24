use crate::backend::{ChatBackend, SubmitReply};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use voxchat_audio::{PlaybackController, TypingCue};
use voxchat_core::{
    CaptureStatus, ChatState, DecodeError, StreamChunk, TranscriptStore, TransportError, TurnId,
    TurnStatus, Utterance,
};

const MAX_WARNINGS: usize = 5;

/// Requests to the session actor.
#[derive(Debug)]
pub enum SessionCommand {
    Submit(Utterance),
    /// Stop audio and typing and abandon the live turn.
    Interrupt,
    Capture(CaptureStatus),
    LiveTranscript(String),
    /// A capture failure to show on the status line.
    Notice(String),
    /// Something the user should know that is not tied to a turn.
    Warn(String),
    SetVolume(f32),
    Shutdown,
}

/// A report from a turn's network task.
#[derive(Debug)]
pub struct TurnMessage {
    pub turn: TurnId,
    pub event: TurnEvent,
}

#[derive(Debug)]
pub enum TurnEvent {
    Replied(SubmitReply),
    Chunk(StreamChunk),
    Failed(TransportError),
}

struct ActiveTurn {
    id: TurnId,
    status: TurnStatus,
    task: JoinHandle<()>,
}

/// Owns everything a turn touches: the transcript, the playback handle, the
/// typing cue and the turn's network task. Runs as a single task; network
/// tasks only report back through the inbox.
pub struct SessionController {
    backend: Arc<dyn ChatBackend>,
    playback: PlaybackController,
    cue: Box<dyn TypingCue>,
    cue_playing: bool,
    transcript: TranscriptStore,
    turn: Option<ActiveTurn>,
    next_turn: u64,
    stop_typing: bool,
    capture: CaptureStatus,
    live_transcript: String,
    notice: Option<String>,
    warnings: Vec<String>,
    inbox_tx: mpsc::UnboundedSender<TurnMessage>,
    inbox_rx: Option<mpsc::UnboundedReceiver<TurnMessage>>,
    state_tx: watch::Sender<ChatState>,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        playback: PlaybackController,
        cue: Box<dyn TypingCue>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ChatState::default());
        Self {
            backend,
            playback,
            cue,
            cue_playing: false,
            transcript: TranscriptStore::new(),
            turn: None,
            next_turn: 1,
            stop_typing: false,
            capture: CaptureStatus::Idle,
            live_transcript: String::new(),
            notice: None,
            warnings: Vec::new(),
            inbox_tx,
            inbox_rx: Some(inbox_rx),
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state_tx.subscribe()
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn current_turn(&self) -> Option<(TurnId, TurnStatus)> {
        self.turn.as_ref().map(|t| (t.id, t.status))
    }

    pub fn is_turn_live(&self) -> bool {
        self.turn.as_ref().is_some_and(|t| t.status.is_live())
    }

    pub fn stop_typing(&self) -> bool {
        self.stop_typing
    }

    /// Start a new turn for `utterance`, cancelling whatever came before.
    pub fn submit_utterance(&mut self, utterance: Utterance) -> TurnId {
        self.cancel_turn("superseded by a new turn");
        self.silence();

        let id = TurnId(self.next_turn);
        self.next_turn += 1;

        match utterance {
            Utterance::Transcript(ref text) => self.transcript.append_user(id, text),
            Utterance::Recording(_) => self.transcript.append_voice_placeholder(id),
        }
        self.notice = None;

        let backend = Arc::clone(&self.backend);
        let inbox = self.inbox_tx.clone();
        let task = tokio::spawn(run_turn(backend, id, utterance, inbox));
        self.turn = Some(ActiveTurn {
            id,
            status: TurnStatus::Pending,
            task,
        });
        tracing::info!(turn = %id, "turn started");
        self.publish();
        id
    }

    /// Stop audio and typing and abandon the live turn, if any.
    pub fn interrupt(&mut self) {
        self.cancel_turn("interrupted");
        self.silence();
        self.publish();
    }

    /// Apply one report from a turn task. Reports for any turn other than
    /// the current live one are dropped.
    pub fn handle(&mut self, msg: TurnMessage) {
        let Some(turn) = self.turn.as_mut() else {
            tracing::debug!(turn = %msg.turn, "discarding report with no active turn");
            return;
        };
        if turn.id != msg.turn || !turn.status.is_live() {
            tracing::debug!(turn = %msg.turn, current = %turn.id, "discarding stale report");
            return;
        }
        let id = turn.id;

        match msg.event {
            TurnEvent::Replied(reply) => {
                turn.status = TurnStatus::Streaming;
                if let Some(text) = reply.text.as_deref() {
                    if self.transcript.resolve_user_text(id, text) {
                        tracing::debug!(turn = %id, "voice message transcribed");
                    }
                }
                if let Some(audio) = reply.audio.as_deref() {
                    self.play_encoded(id, audio);
                }
            }
            TurnEvent::Chunk(StreamChunk::Text(fragment)) => {
                turn.status = TurnStatus::Streaming;
                if self.transcript.append_assistant_text(id, &fragment) {
                    self.stop_typing = false;
                    self.start_cue();
                }
            }
            TurnEvent::Chunk(StreamChunk::Audio(payload)) => {
                turn.status = TurnStatus::Streaming;
                self.play_encoded(id, &payload);
            }
            TurnEvent::Chunk(StreamChunk::End) => {
                turn.status = TurnStatus::Ended;
                self.transcript.close_turn(id);
                self.stop_cue();
                tracing::info!(
                    turn = %id,
                    entries = self.transcript.count_for_turn(id),
                    "turn ended"
                );
            }
            TurnEvent::Failed(e) => {
                turn.status = TurnStatus::Cancelled;
                self.transcript.close_turn(id);
                self.stop_cue();
                tracing::warn!(turn = %id, "turn abandoned: {e}");
            }
        }
        self.publish();
    }

    pub fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Submit(utterance) => {
                self.submit_utterance(utterance);
            }
            SessionCommand::Interrupt => self.interrupt(),
            SessionCommand::Capture(status) => {
                self.capture = status;
                if status == CaptureStatus::Listening {
                    self.notice = None;
                }
                if status == CaptureStatus::Idle {
                    self.live_transcript.clear();
                }
                self.publish();
            }
            SessionCommand::LiveTranscript(text) => {
                self.live_transcript = text;
                self.publish();
            }
            SessionCommand::Notice(note) => {
                self.notice = Some(note);
                self.publish();
            }
            SessionCommand::Warn(warning) => {
                if self.warnings.len() == MAX_WARNINGS {
                    self.warnings.remove(0);
                }
                self.warnings.push(warning);
                self.publish();
            }
            SessionCommand::SetVolume(volume) => self.playback.set_volume(volume),
            SessionCommand::Shutdown => self.shutdown(),
        }
    }

    /// Process commands and turn reports until `Shutdown` or until every
    /// command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let Some(mut inbox) = self.inbox_rx.take() else {
            tracing::error!("session controller already running");
            return;
        };
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        None | Some(SessionCommand::Shutdown) => break,
                        Some(command) => self.apply(command),
                    }
                }
                Some(msg) = inbox.recv() => self.handle(msg),
            }
        }
        self.shutdown();
        tracing::debug!("session controller stopped");
    }

    /// Handle reports until the current turn is no longer live.
    pub async fn settle(&mut self) {
        let Some(mut inbox) = self.inbox_rx.take() else {
            return;
        };
        while self.is_turn_live() {
            match inbox.recv().await {
                Some(msg) => self.handle(msg),
                None => break,
            }
        }
        self.inbox_rx = Some(inbox);
    }

    pub fn shutdown(&mut self) {
        self.cancel_turn("session closing");
        self.silence();
        self.publish();
    }

    fn cancel_turn(&mut self, reason: &str) {
        if let Some(turn) = self.turn.as_mut() {
            turn.task.abort();
            if turn.status.is_live() {
                turn.status = TurnStatus::Cancelled;
                self.transcript.close_turn(turn.id);
                tracing::info!(turn = %turn.id, "turn cancelled: {reason}");
            }
        }
    }

    /// Stop audio, force typewriters to finish and stop the cue.
    fn silence(&mut self) {
        self.playback.stop();
        self.stop_typing = true;
        self.stop_cue();
    }

    fn start_cue(&mut self) {
        if !self.cue_playing {
            self.cue.start();
            self.cue_playing = true;
        }
    }

    fn stop_cue(&mut self) {
        if self.cue_playing {
            self.cue.stop();
            self.cue_playing = false;
        }
    }

    fn play_encoded(&mut self, turn: TurnId, payload: &str) {
        match decode_audio(payload) {
            Ok(bytes) => {
                if self.playback.play(bytes).is_some() {
                    self.transcript.append_audio_marker(turn);
                }
            }
            Err(e) => tracing::warn!(turn = %turn, "dropping audio chunk: {e}"),
        }
    }

    fn publish(&self) {
        let turn = self.current_turn();
        self.state_tx.send_replace(ChatState {
            entries: self.transcript.entries().to_vec(),
            turn,
            stop_typing: self.stop_typing,
            capture: self.capture,
            live_transcript: self.live_transcript.clone(),
            notice: self.notice.clone(),
            warnings: self.warnings.clone(),
        });
    }
}

pub fn decode_audio(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(bytes)
}

/// The network side of one turn: upload, then forward the reply stream.
async fn run_turn(
    backend: Arc<dyn ChatBackend>,
    turn: TurnId,
    utterance: Utterance,
    inbox: mpsc::UnboundedSender<TurnMessage>,
) {
    let report = |event: TurnEvent| inbox.send(TurnMessage { turn, event }).is_ok();

    match backend.submit(turn, &utterance).await {
        Ok(reply) => {
            if !report(TurnEvent::Replied(reply)) {
                return;
            }
        }
        Err(e) => {
            report(TurnEvent::Failed(e));
            return;
        }
    }

    let mut stream = match backend.open_stream(turn).await {
        Ok(stream) => stream,
        Err(e) => {
            report(TurnEvent::Failed(e));
            return;
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                let end = chunk == StreamChunk::End;
                if !report(TurnEvent::Chunk(chunk)) || end {
                    return;
                }
            }
            Err(e) => {
                report(TurnEvent::Failed(e));
                return;
            }
        }
    }
    report(TurnEvent::Failed(TransportError::StreamClosed));
}
