use crate::host::RecognizerHost;
use crate::microphone::{MicStream, Microphone};
use crate::source::{close_mic, open_mic, CaptureSource};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use voxchat_audio::CaptureSink;
use voxchat_core::{CaptureError, CaptureStrategy, Utterance};

struct ActiveTranscription {
    stream: Box<dyn MicStream>,
    task: JoinHandle<String>,
}

/// Transcribes while the user speaks; the utterance is the text settled
/// within the drain window after release.
pub struct TranscriptionCapture {
    mic: Arc<dyn Microphone>,
    host: RecognizerHost,
    drain: Duration,
    live_tx: watch::Sender<String>,
    active: Option<ActiveTranscription>,
}

impl TranscriptionCapture {
    pub fn new(mic: Arc<dyn Microphone>, host: RecognizerHost, drain: Duration) -> Self {
        let (live_tx, _) = watch::channel(String::new());
        Self {
            mic,
            host,
            drain,
            live_tx,
            active: None,
        }
    }
}

#[async_trait]
impl CaptureSource for TranscriptionCapture {
    fn strategy(&self) -> CaptureStrategy {
        CaptureStrategy::Transcription
    }

    async fn begin(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyActive);
        }
        self.live_tx.send_replace(String::new());

        let run = self.host.start(self.live_tx.clone()).await?;
        let stream = match open_mic(&self.mic, CaptureSink::Tap(run.tap)).await {
            Ok(stream) => stream,
            Err(e) => {
                run.task.abort();
                return Err(e);
            }
        };
        self.active = Some(ActiveTranscription {
            stream,
            task: run.task,
        });
        tracing::debug!(recognizer = %self.host.engine(), "transcription started");
        Ok(())
    }

    async fn end(&mut self) -> Result<Option<Utterance>, CaptureError> {
        let Some(ActiveTranscription { stream, mut task }) = self.active.take() else {
            return Ok(None);
        };
        close_mic(stream).await;

        let settled = match tokio::time::timeout(self.drain, &mut task).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::error!("recognizer task failed: {e}");
                self.live_tx.borrow().clone()
            }
            Err(_) => {
                tracing::debug!(
                    drain_ms = self.drain.as_millis() as u64,
                    "recognizer still busy after drain window, using latest text"
                );
                task.abort();
                self.live_tx.borrow().clone()
            }
        };
        self.live_tx.send_replace(String::new());

        let text = settled.trim();
        if text.is_empty() {
            tracing::info!("nothing recognized, no utterance");
            return Ok(None);
        }
        Ok(Some(Utterance::Transcript(text.to_string())))
    }

    fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn live_text(&self) -> Option<watch::Receiver<String>> {
        Some(self.live_tx.subscribe())
    }

    fn set_drain(&mut self, drain: Duration) {
        tracing::debug!(drain_ms = drain.as_millis() as u64, "drain window updated");
        self.drain = drain;
    }
}
