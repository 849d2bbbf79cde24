use crate::recognizer::Recognizer;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use voxchat_core::{AudioChunk, RecognitionResult, RecognizerError};

const DEFAULT_URL: &str = "http://localhost:8080/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-1";
const DEFAULT_INTERIM_MS: u64 = 1500;

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub url: String,
    pub model: String,
    pub language: Option<String>,
    pub api_key: Option<String>,
    /// Zero disables interim results; only the final post is made.
    pub interim_interval: Duration,
}

impl RemoteSettings {
    fn from_toml(config: &toml::Value) -> Result<Self, RecognizerError> {
        let text = |key: &str| {
            config
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let url = text("url").unwrap_or_else(|| DEFAULT_URL.to_string());
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(RecognizerError::InitializationFailed(format!(
                "'url' must be an http(s) URL, got '{url}'"
            )));
        }

        let interim_ms = match config.get("interim_interval_ms") {
            None => DEFAULT_INTERIM_MS,
            Some(v) => v
                .as_integer()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| {
                    RecognizerError::InitializationFailed(
                        "'interim_interval_ms' must be a non-negative integer".to_string(),
                    )
                })?,
        };

        Ok(Self {
            url,
            model: text("model").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language: text("language").filter(|l| l != "auto"),
            api_key: text("api_key"),
            interim_interval: Duration::from_millis(interim_ms),
        })
    }
}

/// Streams nothing itself: it keeps the audio heard so far and periodically
/// posts all of it to an OpenAI-compatible transcription endpoint. Each
/// interim result covers the whole utterance, and shutdown posts once more
/// for the final text.
pub struct RemoteRecognizer {
    client: reqwest::Client,
    settings: Option<RemoteSettings>,
    samples: Mutex<Vec<f32>>,
    sample_rate: AtomicU32,
    last_post: Mutex<Option<Instant>>,
    result_sender: Mutex<Option<mpsc::UnboundedSender<RecognitionResult>>>,
}

impl RemoteRecognizer {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            settings: None,
            samples: Mutex::new(Vec::new()),
            sample_rate: AtomicU32::new(16000),
            last_post: Mutex::new(None),
            result_sender: Mutex::new(None),
        }
    }

    fn snapshot(&self) -> Vec<f32> {
        self.samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }

    fn emit(&self, text: String, is_final: bool, sample_count: usize) {
        let rate = self.sample_rate.load(Ordering::Relaxed).max(1);
        let result = RecognitionResult {
            text,
            timestamp: sample_count as f64 / rate as f64,
            is_final,
        };
        if let Ok(sender) = self.result_sender.lock() {
            if let Some(tx) = sender.as_ref() {
                let _ = tx.send(result);
            }
        }
    }

    /// True when the interim cadence says it is time to post again.
    fn interim_due(&self, interval: Duration) -> bool {
        if interval.is_zero() {
            return false;
        }
        let Ok(mut last) = self.last_post.lock() else {
            return false;
        };
        let now = Instant::now();
        match *last {
            None => {
                // The first chunk starts the clock.
                *last = Some(now);
                false
            }
            Some(at) if now.duration_since(at) >= interval => {
                *last = Some(now);
                true
            }
            Some(_) => false,
        }
    }

    async fn transcribe(
        &self,
        settings: &RemoteSettings,
        samples: &[f32],
    ) -> Result<String, RecognizerError> {
        let rate = self.sample_rate.load(Ordering::Relaxed);
        let wav = voxchat_audio::encode_wav(samples, rate, 1)
            .map_err(|e| RecognizerError::ProcessingFailed(e.to_string()))?;

        let file_part = Part::bytes(wav)
            .file_name("speech.wav")
            .mime_str("audio/wav")
            .map_err(|e| RecognizerError::ProcessingFailed(e.to_string()))?;
        let mut form = Form::new()
            .part("file", file_part)
            .text("model", settings.model.clone())
            .text("response_format", "json".to_string());
        if let Some(ref language) = settings.language {
            form = form.text("language", language.clone());
        }

        let mut request = self.client.post(&settings.url).multipart(form);
        if let Some(ref key) = settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RecognizerError::ProcessingFailed(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognizerError::ProcessingFailed(format!(
                "status {status}: {body}"
            )));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| RecognizerError::ProcessingFailed(format!("bad response: {e}")))?;
        Ok(body.text.trim().to_string())
    }
}

impl Default for RemoteRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Average interleaved frames down to one channel.
fn downmix(chunk: &AudioChunk) -> Vec<f32> {
    let channels = usize::from(chunk.channels.max(1));
    if channels == 1 {
        return chunk.samples.clone();
    }
    chunk
        .samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[async_trait]
impl Recognizer for RemoteRecognizer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), RecognizerError> {
        let settings = RemoteSettings::from_toml(&config)?;
        tracing::info!(
            url = %settings.url,
            model = %settings.model,
            language = ?settings.language,
            "RemoteRecognizer initialized"
        );
        self.settings = Some(settings);
        Ok(())
    }

    async fn feed_audio(&self, chunk: AudioChunk) -> Result<(), RecognizerError> {
        let Some(settings) = self.settings.as_ref() else {
            return Err(RecognizerError::ProcessingFailed(
                "recognizer not initialized".to_string(),
            ));
        };

        self.sample_rate.store(chunk.sample_rate, Ordering::Relaxed);
        let mono = downmix(&chunk);
        if let Ok(mut samples) = self.samples.lock() {
            samples.extend_from_slice(&mono);
        }

        if self.interim_due(settings.interim_interval) {
            let samples = self.snapshot();
            let text = self.transcribe(settings, &samples).await?;
            tracing::trace!(samples = samples.len(), "interim transcript: {text}");
            self.emit(text, false, samples.len());
        }
        Ok(())
    }

    fn set_result_sender(&mut self, sender: mpsc::UnboundedSender<RecognitionResult>) {
        if let Ok(mut slot) = self.result_sender.lock() {
            *slot = Some(sender);
        }
    }

    async fn shutdown(&self) -> Result<(), RecognizerError> {
        let samples = self.snapshot();
        let outcome = match self.settings.as_ref() {
            Some(settings) if !samples.is_empty() => {
                match self.transcribe(settings, &samples).await {
                    Ok(text) => {
                        self.emit(text, true, samples.len());
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            _ => Ok(()),
        };

        if let Ok(mut slot) = self.result_sender.lock() {
            slot.take();
        }
        outcome
    }
}
