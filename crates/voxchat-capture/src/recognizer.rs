use async_trait::async_trait;
use tokio::sync::mpsc;
use voxchat_core::{AudioChunk, RecognitionResult, RecognizerError};

/// A speech recognizer fed with live microphone audio. Results are pushed to
/// the sender installed with [`set_result_sender`](Recognizer::set_result_sender);
/// interim results replace each other until a final one arrives.
#[async_trait]
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;
    async fn initialize(&mut self, config: toml::Value) -> Result<(), RecognizerError>;
    async fn feed_audio(&self, chunk: AudioChunk) -> Result<(), RecognizerError>;
    fn set_result_sender(&mut self, sender: mpsc::UnboundedSender<RecognitionResult>);
    /// Flush anything still pending as a final result.
    async fn shutdown(&self) -> Result<(), RecognizerError>;
}
