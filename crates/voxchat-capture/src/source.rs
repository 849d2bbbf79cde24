use crate::host::RecognizerHost;
use crate::microphone::{CpalMicrophone, MicStream, Microphone};
use crate::recording::RecordingCapture;
use crate::registry::RecognizerRegistry;
use crate::transcription::TranscriptionCapture;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use voxchat_audio::CaptureSink;
use voxchat_core::config::CaptureConfig;
use voxchat_core::{AudioError, CaptureError, CaptureStrategy, Utterance};

/// Push-to-talk input. `begin` starts listening, `end` stops and resolves
/// to the finished utterance, or `None` when nothing usable was heard.
#[async_trait]
pub trait CaptureSource: Send {
    fn strategy(&self) -> CaptureStrategy;
    async fn begin(&mut self) -> Result<(), CaptureError>;
    async fn end(&mut self) -> Result<Option<Utterance>, CaptureError>;
    fn is_active(&self) -> bool;
    /// Text recognized so far, for strategies that transcribe while listening.
    fn live_text(&self) -> Option<watch::Receiver<String>> {
        None
    }
    /// Adjust how long `end` waits for trailing results. Ignored by
    /// strategies that do not wait.
    fn set_drain(&mut self, _drain: Duration) {}
}

/// Build the strategy selected in the capture config on the configured mic.
pub fn build_source(config: &CaptureConfig) -> Box<dyn CaptureSource> {
    let mic: Arc<dyn Microphone> = Arc::new(CpalMicrophone::new(
        &config.device_name,
        config.sample_rate,
        config.buffer_size,
    ));
    build_source_with(config, mic, RecognizerRegistry::new())
}

pub fn build_source_with(
    config: &CaptureConfig,
    mic: Arc<dyn Microphone>,
    registry: RecognizerRegistry,
) -> Box<dyn CaptureSource> {
    match config.strategy {
        CaptureStrategy::Recording => {
            let capacity = config.sample_rate as usize * config.max_recording_secs as usize;
            Box::new(RecordingCapture::new(mic, config.sample_rate, capacity))
        }
        CaptureStrategy::Transcription => {
            let host = RecognizerHost::new(
                registry,
                &config.recognizer.engine,
                config.recognizer.extra.clone(),
            );
            Box::new(TranscriptionCapture::new(
                mic,
                host,
                Duration::from_millis(config.drain_ms),
            ))
        }
    }
}

/// Open the mic off the async runtime; device startup blocks.
pub(crate) async fn open_mic(
    mic: &Arc<dyn Microphone>,
    sink: CaptureSink,
) -> Result<Box<dyn MicStream>, CaptureError> {
    let mic = Arc::clone(mic);
    tokio::task::spawn_blocking(move || mic.open(sink))
        .await
        .map_err(|e| CaptureError::Audio(AudioError::StreamBuild(e.to_string())))?
}

/// Close the mic off the async runtime; joining the capture thread blocks.
pub(crate) async fn close_mic(stream: Box<dyn MicStream>) {
    if let Err(e) = tokio::task::spawn_blocking(move || stream.close()).await {
        tracing::error!("failed to close microphone: {e}");
    }
}
