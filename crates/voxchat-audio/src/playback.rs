use crate::device::{is_default_name, DeviceKind, DeviceManager};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::Arc;
use voxchat_core::{DecodeError, PlaybackError};

/// A playable audio resource and the handle number it was issued under.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub handle: u64,
    pub bytes: Arc<[u8]>,
}

/// The device side of playback. Implementations hold at most one source.
pub trait PlaybackBackend: Send {
    fn start(&mut self, clip: &AudioClip) -> Result<(), PlaybackError>;
    /// Stop and discard the current source. Must tolerate being idle.
    fn halt(&mut self);
    fn set_volume(&mut self, volume: f32);
}

// ── PlaybackController ────────────────────────────────────────

/// Owns the single active audio handle: a new clip always replaces the
/// previous one, and failures are logged rather than returned.
pub struct PlaybackController {
    backend: Box<dyn PlaybackBackend>,
    active: Option<AudioClip>,
    next_handle: u64,
}

impl PlaybackController {
    pub fn new(backend: Box<dyn PlaybackBackend>) -> Self {
        Self {
            backend,
            active: None,
            next_handle: 1,
        }
    }

    /// Release whatever is playing and start `bytes`. Returns the new handle,
    /// or `None` if the clip could not be started.
    pub fn play(&mut self, bytes: Vec<u8>) -> Option<u64> {
        self.stop();

        if bytes.is_empty() {
            tracing::warn!("playback skipped: {}", DecodeError::Empty);
            return None;
        }

        let clip = AudioClip {
            handle: self.next_handle,
            bytes: Arc::from(bytes),
        };
        self.next_handle += 1;

        match self.backend.start(&clip) {
            Ok(()) => {
                tracing::debug!(handle = clip.handle, bytes = clip.bytes.len(), "playback started");
                let handle = clip.handle;
                self.active = Some(clip);
                Some(handle)
            }
            Err(e) => {
                tracing::error!(handle = clip.handle, "failed to play audio: {e}");
                None
            }
        }
    }

    /// Stop and release the current clip. No-op when idle.
    pub fn stop(&mut self) {
        if let Some(clip) = self.active.take() {
            self.backend.halt();
            tracing::debug!(handle = clip.handle, "playback released");
        }
    }

    pub fn active_handle(&self) -> Option<u64> {
        self.active.as_ref().map(|clip| clip.handle)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.backend.set_volume(volume);
    }
}

// ── RodioBackend ──────────────────────────────────────────────

/// Open the named output device. The returned `OutputStream` must be kept
/// alive for as long as anything plays through its handle.
pub fn open_output(device_name: &str) -> Result<(OutputStream, OutputStreamHandle), PlaybackError> {
    if is_default_name(device_name) {
        return OutputStream::try_default().map_err(|e| PlaybackError::Device(e.to_string()));
    }
    let device = DeviceManager::new()
        .find(DeviceKind::Output, device_name)
        .map_err(|e| PlaybackError::Device(e.to_string()))?;
    OutputStream::try_from_device(&device).map_err(|e| PlaybackError::Device(e.to_string()))
}

pub struct RodioBackend {
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    volume: f32,
}

impl RodioBackend {
    pub fn new(stream_handle: OutputStreamHandle, volume: f32) -> Self {
        Self {
            stream_handle,
            sink: None,
            volume,
        }
    }
}

impl PlaybackBackend for RodioBackend {
    fn start(&mut self, clip: &AudioClip) -> Result<(), PlaybackError> {
        self.halt();

        let source = Decoder::new(Cursor::new(Arc::clone(&clip.bytes)))
            .map_err(|e| DecodeError::Audio(e.to_string()))?;
        let sink =
            Sink::try_new(&self.stream_handle).map_err(|e| PlaybackError::Device(e.to_string()))?;
        sink.set_volume(self.volume);
        sink.append(source);
        self.sink = Some(sink);
        Ok(())
    }

    fn halt(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(ref sink) = self.sink {
            sink.set_volume(volume);
        }
    }
}
