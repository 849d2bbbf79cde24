use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::timeout;
use voxchat_core::config::BackendConfig;
use voxchat_core::{StreamChunk, TransportError, TurnId, Utterance};

/// What the upload returns: an optional transcription of a recording and an
/// optional base64 audio reply to play immediately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmitReply {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
}

/// Reply chunks of one turn, in arrival order. Ends after `End` or an error.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, TransportError>> + Send>>;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn submit(&self, turn: TurnId, utterance: &Utterance) -> Result<SubmitReply, TransportError>;
    async fn open_stream(&self, turn: TurnId) -> Result<ChunkStream, TransportError>;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireChunk {
    Text {
        #[serde(default)]
        text: String,
    },
    Audio {
        #[serde(default)]
        text: String,
    },
    End,
}

/// Decode one event's `data` field. Blank data (keep-alives) yields `None`.
pub fn parse_event_data(data: &str) -> Result<Option<StreamChunk>, TransportError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    let wire: WireChunk = serde_json::from_str(data)
        .map_err(|e| TransportError::Payload(format!("{e}: {data}")))?;
    Ok(Some(match wire {
        WireChunk::Text { text } => StreamChunk::Text(text),
        WireChunk::Audio { text } => StreamChunk::Audio(text),
        WireChunk::End => StreamChunk::End,
    }))
}

fn parse_reply(body: &str) -> Result<SubmitReply, TransportError> {
    if body.trim().is_empty() {
        return Ok(SubmitReply::default());
    }
    serde_json::from_str(body).map_err(|e| TransportError::Payload(format!("{e}: {body}")))
}

// ── HttpBackend ───────────────────────────────────────────────

/// The chat backend over HTTP: a multipart POST per turn and a server-sent
/// event stream for the reply.
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
    correlate_turns: bool,
    request_timeout: Duration,
    idle_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: config.turn_url(),
            correlate_turns: config.correlate_turns,
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            idle_timeout: Duration::from_secs(config.stream_idle_timeout_secs.max(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn form(&self, turn: TurnId, utterance: &Utterance) -> Result<Form, TransportError> {
        let form = match utterance {
            Utterance::Transcript(text) => Form::new().text("transcript", text.clone()),
            Utterance::Recording(blob) => {
                let part = Part::bytes(blob.bytes.clone())
                    .file_name(blob.file_name.clone())
                    .mime_str(&blob.mime)
                    .map_err(|e| TransportError::Request(e.to_string()))?;
                Form::new().part("audio", part)
            }
        };
        Ok(if self.correlate_turns {
            form.text("turn_id", turn.to_string())
        } else {
            form
        })
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn submit(&self, turn: TurnId, utterance: &Utterance) -> Result<SubmitReply, TransportError> {
        let form = self.form(turn, utterance)?;
        tracing::debug!(turn = %turn, url = %self.url, "uploading utterance");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let response = check_status(response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        parse_reply(&body)
    }

    async fn open_stream(&self, turn: TurnId) -> Result<ChunkStream, TransportError> {
        let mut request = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if self.correlate_turns {
            request = request.query(&[("turn_id", turn.0)]);
        }

        // Only the handshake is bounded by the request timeout; the body is
        // bounded by the idle timeout between events.
        let response = timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| TransportError::Request("stream handshake timed out".to_string()))?
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let response = check_status(response).await?;
        tracing::debug!(turn = %turn, "reply stream opened");

        Ok(sse_chunks(response, self.idle_timeout, turn))
    }
}

/// Adapt an event-stream response into reply chunks. Events that cannot be
/// parsed are logged and skipped; the stream stops after `End` or on the
/// first transport failure.
fn sse_chunks(response: reqwest::Response, idle: Duration, turn: TurnId) -> ChunkStream {
    let events = Box::pin(response.bytes_stream().eventsource());
    let chunks = futures::stream::unfold(Some(events), move |state| async move {
        let mut events = state?;
        loop {
            let event = match timeout(idle, events.next()).await {
                Ok(Some(Ok(event))) => event,
                Ok(Some(Err(e))) => {
                    return Some((Err(TransportError::Stream(e.to_string())), None));
                }
                Ok(None) => return Some((Err(TransportError::StreamClosed), None)),
                Err(_) => return Some((Err(TransportError::IdleTimeout(idle.as_secs())), None)),
            };

            tracing::trace!(turn = %turn, "SSE: {:?}", event.data);
            match parse_event_data(&event.data) {
                Ok(Some(StreamChunk::End)) => return Some((Ok(StreamChunk::End), None)),
                Ok(Some(chunk)) => return Some((Ok(chunk), Some(events))),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(turn = %turn, "skipping stream event: {e}");
                    continue;
                }
            }
        }
    });
    Box::pin(chunks)
}
