use ringbuf::traits::{Consumer, Producer};
use std::io::Cursor;

#[test]
fn test_ring_buffer_to_wav_pipeline() {
    let (mut prod, mut cons) = voxchat_audio::create_ring_buffer(16000);

    // 100ms of a 440Hz tone at 16kHz
    let signal: Vec<f32> = (0..1600)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 16000.0).sin() * 0.5)
        .collect();
    assert_eq!(prod.push_slice(&signal), signal.len());

    let mut drained = Vec::new();
    let mut scratch = [0.0f32; 256];
    loop {
        let n = cons.pop_slice(&mut scratch);
        if n == 0 {
            break;
        }
        drained.extend_from_slice(&scratch[..n]);
    }
    assert_eq!(drained, signal);

    let bytes = voxchat_audio::encode_wav(&drained, 16000, 1).unwrap();
    let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.len() as usize, signal.len());
}

#[test]
fn test_controller_with_threaded_backend_calls() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use voxchat_audio::{AudioClip, PlaybackBackend, PlaybackController};
    use voxchat_core::PlaybackError;

    struct CountingBackend {
        live: Arc<AtomicUsize>,
    }

    impl PlaybackBackend for CountingBackend {
        fn start(&mut self, _clip: &AudioClip) -> Result<(), PlaybackError> {
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn halt(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        fn set_volume(&mut self, _volume: f32) {}
    }

    let live = Arc::new(AtomicUsize::new(0));
    let mut playback = PlaybackController::new(Box::new(CountingBackend {
        live: Arc::clone(&live),
    }));

    // The controller can move to another thread and never holds two clips.
    let worker = std::thread::spawn(move || {
        for i in 0..20u8 {
            playback.play(vec![i; 8]);
            assert_eq!(live.load(Ordering::SeqCst), 1);
        }
        playback.stop();
        live.load(Ordering::SeqCst)
    });
    assert_eq!(worker.join().unwrap(), 0);
}

#[test]
#[ignore] // Requires audio hardware
fn test_capture_tap_receives_chunks() {
    use tokio::sync::mpsc;
    use voxchat_audio::{CaptureNode, CaptureSettings, CaptureSink};

    let (tx, mut rx) = mpsc::unbounded_channel();
    let settings = CaptureSettings {
        sample_rate: 16000,
        channels: 1,
        buffer_size: 1024,
    };
    let node = CaptureNode::spawn("default", settings, CaptureSink::Tap(tx)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(300));
    node.stop();

    let mut total = 0;
    while let Ok(chunk) = rx.try_recv() {
        assert_eq!(chunk.sample_rate, 16000);
        total += chunk.samples.len();
    }
    assert!(total > 0, "expected captured samples");
}
