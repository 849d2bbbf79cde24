use crate::device::{DeviceKind, DeviceManager};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use ringbuf::traits::Producer;
use ringbuf::HeapProd;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use voxchat_core::{AudioChunk, AudioError};

const STATUS_OK: u8 = 0;
const STATUS_ERROR: u8 = 1;

/// Where captured samples go.
pub enum CaptureSink {
    /// Bounded buffer; samples beyond capacity are dropped.
    Ring(HeapProd<f32>),
    /// Every callback buffer is forwarded as a chunk.
    Tap(mpsc::UnboundedSender<AudioChunk>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_size: u32,
}

// ── CaptureHandle ─────────────────────────────────────────────

#[derive(Clone)]
pub struct CaptureHandle {
    enabled: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
}

impl CaptureHandle {
    fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            status: Arc::new(AtomicU8::new(STATUS_OK)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Gate the callback without tearing down the stream.
    pub fn set_enabled(&self, v: bool) {
        self.enabled.store(v, Ordering::Relaxed);
    }

    pub fn has_failed(&self) -> bool {
        self.status.load(Ordering::Relaxed) == STATUS_ERROR
    }
}

// ── CaptureNode ───────────────────────────────────────────────

/// A live microphone stream. cpal streams are not `Send`, so the stream is
/// built and owned by a dedicated thread that lives until [`stop`](Self::stop).
pub struct CaptureNode {
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    handle: CaptureHandle,
}

impl CaptureNode {
    /// Open `device_name` and start streaming into `sink`. Blocks until the
    /// stream is running or has failed to start.
    pub fn spawn(
        device_name: &str,
        settings: CaptureSettings,
        sink: CaptureSink,
    ) -> Result<Self, AudioError> {
        let handle = CaptureHandle::new();
        let thread_handle = handle.clone();
        let device_name = device_name.to_string();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), AudioError>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("voxchat-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(&device_name, settings, sink, thread_handle) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Parks until stop() sends or the node is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!(device = %device_name, "capture stream closed");
            })
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        let started = ready_rx
            .recv()
            .map_err(|_| AudioError::StreamBuild("capture thread exited early".to_string()))?;

        let mut node = Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            handle,
        };
        if let Err(e) = started {
            node.shutdown();
            return Err(e);
        }
        Ok(node)
    }

    pub fn handle(&self) -> CaptureHandle {
        self.handle.clone()
    }

    /// Close the stream and wait for the capture thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureNode {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn open_stream(
    device_name: &str,
    settings: CaptureSettings,
    sink: CaptureSink,
    handle: CaptureHandle,
) -> Result<Stream, AudioError> {
    let device = DeviceManager::new().find(DeviceKind::Input, device_name)?;
    let config = StreamConfig {
        channels: settings.channels,
        sample_rate: SampleRate(settings.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(settings.buffer_size),
    };

    let status_flag = Arc::clone(&handle.status);
    let err_callback = move |err: cpal::StreamError| {
        tracing::error!("capture stream error: {}", err);
        status_flag.store(STATUS_ERROR, Ordering::Relaxed);
    };

    let enabled_flag = Arc::clone(&handle.enabled);
    let mut sink = sink;
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !enabled_flag.load(Ordering::Relaxed) {
                    return;
                }
                match sink {
                    CaptureSink::Ring(ref mut prod) => {
                        prod.push_slice(data);
                    }
                    CaptureSink::Tap(ref tap) => {
                        let _ = tap.send(AudioChunk {
                            samples: data.to_vec(),
                            sample_rate: settings.sample_rate,
                            channels: settings.channels,
                        });
                    }
                }
            },
            err_callback,
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_handle_default_enabled() {
        let handle = CaptureHandle::new();
        assert!(handle.is_enabled());
        assert!(!handle.has_failed());
    }

    #[test]
    fn test_capture_handle_clone_shares_state() {
        let h1 = CaptureHandle::new();
        let h2 = h1.clone();
        h1.set_enabled(false);
        assert!(!h2.is_enabled());
        h1.status.store(STATUS_ERROR, Ordering::Relaxed);
        assert!(h2.has_failed());
    }

    #[test]
    fn test_tap_dropped_receiver_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel::<AudioChunk>();
        drop(rx);
        let _ = tx.send(AudioChunk {
            samples: vec![0.0; 480],
            sample_rate: 16000,
            channels: 1,
        });
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_spawn_default_device_and_stop() {
        let (tx, _rx) = mpsc::unbounded_channel::<AudioChunk>();
        let settings = CaptureSettings {
            sample_rate: 16000,
            channels: 1,
            buffer_size: 1024,
        };
        let node = CaptureNode::spawn("default", settings, CaptureSink::Tap(tx)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));
        node.stop();
    }
}
