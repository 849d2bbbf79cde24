use crate::microphone::{MicStream, Microphone};
use crate::source::{close_mic, open_mic, CaptureSource};
use async_trait::async_trait;
use ringbuf::traits::{Consumer, Observer};
use ringbuf::HeapCons;
use std::sync::Arc;
use voxchat_audio::{create_ring_buffer, encode_wav, CaptureSink};
use voxchat_core::{AudioBlob, CaptureError, CaptureStrategy, Utterance};

pub const RECORDING_MIME: &str = "audio/wav";
pub const RECORDING_FILE_NAME: &str = "utterance.wav";

struct ActiveRecording {
    stream: Box<dyn MicStream>,
    samples: HeapCons<f32>,
}

/// Records raw microphone audio and hands it over as one WAV blob.
pub struct RecordingCapture {
    mic: Arc<dyn Microphone>,
    sample_rate: u32,
    /// Samples kept per utterance; anything beyond is dropped.
    capacity: usize,
    active: Option<ActiveRecording>,
}

impl RecordingCapture {
    pub fn new(mic: Arc<dyn Microphone>, sample_rate: u32, capacity: usize) -> Self {
        Self {
            mic,
            sample_rate,
            capacity: capacity.max(1),
            active: None,
        }
    }
}

#[async_trait]
impl CaptureSource for RecordingCapture {
    fn strategy(&self) -> CaptureStrategy {
        CaptureStrategy::Recording
    }

    async fn begin(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyActive);
        }
        let (prod, cons) = create_ring_buffer(self.capacity);
        let stream = open_mic(&self.mic, CaptureSink::Ring(prod)).await?;
        self.active = Some(ActiveRecording {
            stream,
            samples: cons,
        });
        tracing::debug!("recording started");
        Ok(())
    }

    async fn end(&mut self) -> Result<Option<Utterance>, CaptureError> {
        let Some(ActiveRecording {
            stream,
            mut samples,
        }) = self.active.take()
        else {
            return Ok(None);
        };
        close_mic(stream).await;

        if samples.is_full() {
            tracing::warn!(
                seconds = self.capacity as u32 / self.sample_rate.max(1),
                "recording hit the length limit and was cut short"
            );
        }
        let recorded: Vec<f32> = samples.pop_iter().collect();
        if recorded.is_empty() {
            tracing::info!("recording captured no audio");
            return Ok(None);
        }

        let bytes = encode_wav(&recorded, self.sample_rate, 1)?;
        tracing::debug!(samples = recorded.len(), bytes = bytes.len(), "recording encoded");
        Ok(Some(Utterance::Recording(AudioBlob {
            bytes,
            mime: RECORDING_MIME.to_string(),
            file_name: RECORDING_FILE_NAME.to_string(),
        })))
    }

    fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedMicrophone;
    use std::io::Cursor;
    use std::sync::atomic::Ordering;
    use voxchat_core::{AudioError, CaptureError};

    fn capture(mic: ScriptedMicrophone, capacity: usize) -> RecordingCapture {
        RecordingCapture::new(Arc::new(mic), 16000, capacity)
    }

    #[tokio::test]
    async fn test_recording_yields_wav_blob() {
        let mic = ScriptedMicrophone::new(vec![vec![0.25; 800], vec![-0.25; 800]]);
        let closed = Arc::clone(&mic.closed);
        let mut source = capture(mic, 16000);

        source.begin().await.unwrap();
        assert!(source.is_active());
        let utterance = source.end().await.unwrap().expect("utterance");
        assert!(!source.is_active());
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        let Utterance::Recording(blob) = utterance else {
            panic!("expected a recording");
        };
        assert_eq!(blob.mime, "audio/wav");
        assert_eq!(blob.file_name, "utterance.wav");
        let reader = hound::WavReader::new(Cursor::new(blob.bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 1600);
    }

    #[tokio::test]
    async fn test_silent_recording_yields_nothing() {
        let mut source = capture(ScriptedMicrophone::new(Vec::new()), 16000);
        source.begin().await.unwrap();
        assert!(source.end().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recording_is_capped_at_capacity() {
        let mut source = capture(ScriptedMicrophone::new(vec![vec![0.1; 5000]]), 1000);
        source.begin().await.unwrap();
        let Some(Utterance::Recording(blob)) = source.end().await.unwrap() else {
            panic!("expected a recording");
        };
        let reader = hound::WavReader::new(Cursor::new(blob.bytes)).unwrap();
        assert_eq!(reader.len(), 1000);
    }

    #[tokio::test]
    async fn test_begin_twice_is_rejected() {
        let mut source = capture(ScriptedMicrophone::new(Vec::new()), 16000);
        source.begin().await.unwrap();
        assert!(matches!(source.begin().await, Err(CaptureError::AlreadyActive)));
    }

    #[tokio::test]
    async fn test_unavailable_device_aborts_capture() {
        let mut source = capture(ScriptedMicrophone::failing(), 16000);
        match source.begin().await {
            Err(CaptureError::Audio(AudioError::DeviceNotFound(_))) => {}
            other => panic!("expected DeviceNotFound, got {other:?}"),
        }
        assert!(!source.is_active());
        assert!(source.end().await.unwrap().is_none());
    }
}
