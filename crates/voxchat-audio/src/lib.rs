pub mod capture;
pub mod cue;
pub mod device;
pub mod playback;
pub mod wav;

pub use capture::{CaptureHandle, CaptureNode, CaptureSettings, CaptureSink};
pub use cue::{LoopingCue, SilentCue, TypingCue};
pub use device::{is_default_name, DeviceKind, DeviceManager};
pub use playback::{open_output, AudioClip, PlaybackBackend, PlaybackController, RodioBackend};
pub use wav::encode_wav;

use ringbuf::traits::Split;
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Create a ring buffer split into producer and consumer halves.
pub fn create_ring_buffer(capacity: usize) -> (HeapProd<f32>, HeapCons<f32>) {
    HeapRb::<f32>::new(capacity).split()
}
