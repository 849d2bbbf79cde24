use rodio::{Decoder, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use voxchat_core::{DecodeError, PlaybackError};

/// The looping sound played while assistant text is being revealed.
/// Both calls must be safe to repeat.
pub trait TypingCue: Send {
    fn start(&mut self);
    fn stop(&mut self);
}

/// Used when no cue file is configured or the output device is missing.
#[derive(Debug, Default)]
pub struct SilentCue;

impl TypingCue for SilentCue {
    fn start(&mut self) {}
    fn stop(&mut self) {}
}

/// Loops a sound file on its own sink, independent of reply playback.
pub struct LoopingCue {
    stream_handle: OutputStreamHandle,
    sound: Arc<[u8]>,
    volume: f32,
    sink: Option<Sink>,
}

impl LoopingCue {
    pub fn from_file(
        stream_handle: OutputStreamHandle,
        path: &Path,
        volume: f32,
    ) -> Result<Self, PlaybackError> {
        let bytes = std::fs::read(path)
            .map_err(|e| DecodeError::Audio(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(stream_handle, bytes, volume)
    }

    pub fn from_bytes(
        stream_handle: OutputStreamHandle,
        bytes: Vec<u8>,
        volume: f32,
    ) -> Result<Self, PlaybackError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty.into());
        }
        let sound: Arc<[u8]> = Arc::from(bytes);
        // Decode once up front so a bad file is reported at startup.
        Decoder::new(Cursor::new(Arc::clone(&sound)))
            .map_err(|e| DecodeError::Audio(e.to_string()))?;
        Ok(Self {
            stream_handle,
            sound,
            volume,
            sink: None,
        })
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.sink.is_some()
    }

    fn open_loop(&self) -> Result<Sink, PlaybackError> {
        let source = Decoder::new(Cursor::new(Arc::clone(&self.sound)))
            .map_err(|e| DecodeError::Audio(e.to_string()))?;
        let sink =
            Sink::try_new(&self.stream_handle).map_err(|e| PlaybackError::Device(e.to_string()))?;
        sink.set_volume(self.volume);
        sink.append(source.repeat_infinite());
        Ok(sink)
    }
}

impl TypingCue for LoopingCue {
    fn start(&mut self) {
        if self.sink.is_some() {
            return;
        }
        match self.open_loop() {
            Ok(sink) => {
                tracing::debug!("typing cue started");
                self.sink = Some(sink);
            }
            Err(e) => tracing::warn!("typing cue unavailable: {e}"),
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            tracing::debug!("typing cue stopped");
        }
    }
}

impl Drop for LoopingCue {
    fn drop(&mut self) {
        self.stop();
    }
}
