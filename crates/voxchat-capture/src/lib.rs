pub mod host;
pub mod microphone;
pub mod null_recognizer;
pub mod recognizer;
pub mod recording;
pub mod registry;
pub mod remote;
pub mod source;
pub mod transcription;

pub use host::{LiveTranscript, RecognizerHost, RecognizerRun};
pub use microphone::{CpalMicrophone, MicStream, Microphone};
pub use null_recognizer::NullRecognizer;
pub use recognizer::Recognizer;
pub use recording::RecordingCapture;
pub use registry::RecognizerRegistry;
pub use remote::RemoteRecognizer;
pub use source::{build_source, build_source_with, CaptureSource};
pub use transcription::TranscriptionCapture;

#[cfg(test)]
pub(crate) mod testing {
    use crate::microphone::{MicStream, Microphone};
    use ringbuf::traits::Producer;
    use ringbuf::HeapProd;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use voxchat_audio::CaptureSink;
    use voxchat_core::{AudioChunk, AudioError, CaptureError};

    /// Replays fixed audio into whatever sink it is opened with.
    pub struct ScriptedMicrophone {
        pub chunks: Vec<Vec<f32>>,
        pub fail: bool,
        pub opened: Arc<AtomicUsize>,
        pub closed: Arc<AtomicUsize>,
    }

    impl ScriptedMicrophone {
        pub fn new(chunks: Vec<Vec<f32>>) -> Self {
            Self {
                chunks,
                fail: false,
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }
    }

    struct ScriptedStream {
        _tap: Option<mpsc::UnboundedSender<AudioChunk>>,
        _ring: Option<HeapProd<f32>>,
        closed: Arc<AtomicUsize>,
    }

    impl MicStream for ScriptedStream {
        fn close(self: Box<Self>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Microphone for ScriptedMicrophone {
        fn open(&self, sink: CaptureSink) -> Result<Box<dyn MicStream>, CaptureError> {
            if self.fail {
                return Err(AudioError::DeviceNotFound("scripted mic unplugged".to_string()).into());
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            let (tap, ring) = match sink {
                CaptureSink::Ring(mut prod) => {
                    for chunk in &self.chunks {
                        prod.push_slice(chunk);
                    }
                    (None, Some(prod))
                }
                CaptureSink::Tap(tx) => {
                    for chunk in &self.chunks {
                        let _ = tx.send(AudioChunk {
                            samples: chunk.clone(),
                            sample_rate: 16000,
                            channels: 1,
                        });
                    }
                    (Some(tx), None)
                }
            };
            Ok(Box::new(ScriptedStream {
                _tap: tap,
                _ring: ring,
                closed: Arc::clone(&self.closed),
            }))
        }
    }
}
