use crate::recognizer::Recognizer;
use crate::registry::RecognizerRegistry;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use voxchat_core::{AudioChunk, RecognitionResult, RecognizerError};

/// Final segments plus the latest interim tail.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LiveTranscript {
    finals: Vec<String>,
    interim: String,
}

impl LiveTranscript {
    pub fn apply(&mut self, result: RecognitionResult) {
        if result.is_final {
            self.interim.clear();
            let text = result.text.trim();
            if !text.is_empty() {
                self.finals.push(text.to_string());
            }
        } else {
            self.interim = result.text.trim().to_string();
        }
    }

    pub fn text(&self) -> String {
        let mut parts: Vec<&str> = self.finals.iter().map(String::as_str).collect();
        if !self.interim.is_empty() {
            parts.push(&self.interim);
        }
        parts.join(" ")
    }
}

/// A recognizer running for one utterance. Dropping `tap` (or every clone
/// of it) ends the audio; the task then flushes the recognizer and resolves
/// to the settled transcript.
pub struct RecognizerRun {
    pub tap: mpsc::UnboundedSender<AudioChunk>,
    pub task: JoinHandle<String>,
}

/// Builds a fresh recognizer per utterance from the configured engine.
pub struct RecognizerHost {
    registry: RecognizerRegistry,
    engine: String,
    config: toml::Value,
}

impl RecognizerHost {
    pub fn new(registry: RecognizerRegistry, engine: &str, config: toml::Value) -> Self {
        Self {
            registry,
            engine: engine.to_string(),
            config,
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Instantiate and initialize the recognizer, then spawn the task that
    /// feeds it. Every transcript change is published on `live`.
    pub async fn start(&self, live: watch::Sender<String>) -> Result<RecognizerRun, RecognizerError> {
        let mut recognizer = self.registry.create(&self.engine)?;

        let (result_tx, result_rx) = mpsc::unbounded_channel();
        recognizer.set_result_sender(result_tx);
        recognizer.initialize(self.config.clone()).await?;

        let (tap, tap_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(recognizer, tap_rx, result_rx, live));
        Ok(RecognizerRun { tap, task })
    }
}

async fn drive(
    recognizer: Box<dyn Recognizer>,
    mut tap_rx: mpsc::UnboundedReceiver<AudioChunk>,
    mut result_rx: mpsc::UnboundedReceiver<RecognitionResult>,
    live: watch::Sender<String>,
) -> String {
    let name = recognizer.name().to_string();
    let mut transcript = LiveTranscript::default();
    let mut results_open = true;

    loop {
        tokio::select! {
            chunk = tap_rx.recv() => {
                match chunk {
                    Some(audio) => {
                        if let Err(e) = recognizer.feed_audio(audio).await {
                            tracing::error!(recognizer = %name, "recognizer feed error: {e}");
                        }
                    }
                    None => {
                        tracing::debug!(recognizer = %name, "audio tap closed, flushing");
                        break;
                    }
                }
            }
            result = result_rx.recv(), if results_open => {
                match result {
                    Some(r) => {
                        transcript.apply(r);
                        live.send_replace(transcript.text());
                    }
                    None => results_open = false,
                }
            }
        }
    }

    if let Err(e) = recognizer.shutdown().await {
        tracing::warn!(recognizer = %name, "recognizer shutdown failed: {e}");
    }
    drop(recognizer);

    while let Some(r) = result_rx.recv().await {
        transcript.apply(r);
        live.send_replace(transcript.text());
    }
    transcript.text()
}
