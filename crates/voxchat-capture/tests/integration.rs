use ringbuf::traits::Producer;
use std::sync::Arc;
use voxchat_audio::CaptureSink;
use voxchat_capture::{build_source_with, MicStream, Microphone, RecognizerRegistry};
use voxchat_core::config::CaptureConfig;
use voxchat_core::{AudioChunk, CaptureError, CaptureStrategy, Utterance};

/// Plays one second of a quiet tone into the sink, then holds it open.
struct ToneMic;

struct Held<T: Send>(#[allow(dead_code)] T);

impl<T: Send> MicStream for Held<T> {
    fn close(self: Box<Self>) {}
}

impl Microphone for ToneMic {
    fn open(&self, sink: CaptureSink) -> Result<Box<dyn MicStream>, CaptureError> {
        let tone: Vec<f32> = (0..16000).map(|i| (i as f32 * 0.05).sin() * 0.2).collect();
        match sink {
            CaptureSink::Ring(mut prod) => {
                prod.push_slice(&tone);
                Ok(Box::new(Held(prod)))
            }
            CaptureSink::Tap(tx) => {
                for part in tone.chunks(1600) {
                    let _ = tx.send(AudioChunk {
                        samples: part.to_vec(),
                        sample_rate: 16000,
                        channels: 1,
                    });
                }
                Ok(Box::new(Held(tx)))
            }
        }
    }
}

fn config(strategy: CaptureStrategy, engine: &str) -> CaptureConfig {
    let mut config = CaptureConfig {
        strategy,
        drain_ms: 500,
        ..CaptureConfig::default()
    };
    config.recognizer.engine = engine.to_string();
    config
}

#[tokio::test]
async fn test_recording_strategy_end_to_end() {
    let mut source = build_source_with(
        &config(CaptureStrategy::Recording, "null"),
        Arc::new(ToneMic),
        RecognizerRegistry::new(),
    );
    assert_eq!(source.strategy(), CaptureStrategy::Recording);
    assert!(source.live_text().is_none());

    source.begin().await.unwrap();
    match source.end().await.unwrap() {
        Some(Utterance::Recording(blob)) => {
            assert_eq!(&blob.bytes[0..4], b"RIFF");
            assert_eq!(blob.bytes.len(), 44 + 16000 * 2);
        }
        other => panic!("expected a recording, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transcription_strategy_with_null_recognizer_emits_nothing() {
    let mut source = build_source_with(
        &config(CaptureStrategy::Transcription, "null"),
        Arc::new(ToneMic),
        RecognizerRegistry::new(),
    );
    assert_eq!(source.strategy(), CaptureStrategy::Transcription);
    assert!(source.live_text().is_some());

    source.begin().await.unwrap();
    assert!(source.is_active());
    assert_eq!(source.end().await.unwrap(), None);
    assert!(!source.is_active());
}

#[tokio::test]
async fn test_transcription_strategy_repeats_cleanly() {
    let mut source = build_source_with(
        &config(CaptureStrategy::Transcription, "null"),
        Arc::new(ToneMic),
        RecognizerRegistry::new(),
    );
    for _ in 0..3 {
        source.begin().await.unwrap();
        assert_eq!(source.end().await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_end_without_begin_is_harmless() {
    let mut source = build_source_with(
        &config(CaptureStrategy::Recording, "null"),
        Arc::new(ToneMic),
        RecognizerRegistry::new(),
    );
    assert_eq!(source.end().await.unwrap(), None);
}
