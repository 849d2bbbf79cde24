use crate::recognizer::Recognizer;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use voxchat_core::{AudioChunk, RecognitionResult, RecognizerError};

/// Swallows audio and never recognizes anything.
pub struct NullRecognizer {
    feed_count: AtomicUsize,
    result_sender: Mutex<Option<mpsc::UnboundedSender<RecognitionResult>>>,
}

impl NullRecognizer {
    pub fn new() -> Self {
        Self {
            feed_count: AtomicUsize::new(0),
            result_sender: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn feed_count(&self) -> usize {
        self.feed_count.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn has_sender(&self) -> bool {
        self.result_sender
            .lock()
            .map(|sender| sender.is_some())
            .unwrap_or(false)
    }
}

impl Default for NullRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for NullRecognizer {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, _config: toml::Value) -> Result<(), RecognizerError> {
        Ok(())
    }

    async fn feed_audio(&self, chunk: AudioChunk) -> Result<(), RecognizerError> {
        let count = self.feed_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("NullRecognizer fed chunk #{count}, {} samples", chunk.samples.len());
        Ok(())
    }

    fn set_result_sender(&mut self, sender: mpsc::UnboundedSender<RecognitionResult>) {
        if let Ok(mut slot) = self.result_sender.lock() {
            *slot = Some(sender);
        }
    }

    async fn shutdown(&self) -> Result<(), RecognizerError> {
        // Dropping the sender closes the result channel.
        if let Ok(mut slot) = self.result_sender.lock() {
            slot.take();
        }
        Ok(())
    }
}
