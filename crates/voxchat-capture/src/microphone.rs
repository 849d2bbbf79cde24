use voxchat_audio::{CaptureNode, CaptureSettings, CaptureSink};
use voxchat_core::CaptureError;

/// An open microphone stream. Closing it guarantees no more samples reach
/// the sink it was opened with.
pub trait MicStream: Send {
    fn close(self: Box<Self>);
}

/// Opens microphone streams. `open` may block while the device starts.
pub trait Microphone: Send + Sync {
    fn open(&self, sink: CaptureSink) -> Result<Box<dyn MicStream>, CaptureError>;
}

/// The configured cpal input device.
pub struct CpalMicrophone {
    device_name: String,
    settings: CaptureSettings,
}

impl CpalMicrophone {
    pub fn new(device_name: &str, sample_rate: u32, buffer_size: u32) -> Self {
        Self {
            device_name: device_name.to_string(),
            settings: CaptureSettings {
                sample_rate,
                channels: 1,
                buffer_size,
            },
        }
    }

    #[cfg(test)]
    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }
}

impl Microphone for CpalMicrophone {
    fn open(&self, sink: CaptureSink) -> Result<Box<dyn MicStream>, CaptureError> {
        let node = CaptureNode::spawn(&self.device_name, self.settings, sink)?;
        tracing::info!(device = %self.device_name, "microphone opened");
        Ok(Box::new(node))
    }
}

impl MicStream for CaptureNode {
    fn close(self: Box<Self>) {
        if self.handle().has_failed() {
            tracing::warn!("microphone stream reported errors while open");
        }
        (*self).stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpal_microphone_is_mono() {
        let mic = CpalMicrophone::new("default", 16000, 1024);
        let settings = mic.settings();
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.sample_rate, 16000);
        assert_eq!(settings.buffer_size, 1024);
    }

    #[test]
    fn test_microphone_is_object_safe() {
        let mic: Box<dyn Microphone> = Box::new(CpalMicrophone::new("default", 16000, 512));
        drop(mic);
    }
}
