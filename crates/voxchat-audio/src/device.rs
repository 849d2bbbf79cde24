use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use voxchat_core::AudioError;

/// Direction of a device lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Input,
    Output,
}

impl DeviceKind {
    fn label(self) -> &'static str {
        match self {
            DeviceKind::Input => "input",
            DeviceKind::Output => "output",
        }
    }
}

/// `"default"` (or an empty name) selects the host's default device.
pub fn is_default_name(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.eq_ignore_ascii_case("default")
}

pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn list(&self, kind: DeviceKind) -> Result<Vec<(String, Device)>, AudioError> {
        let devices = match kind {
            DeviceKind::Input => self.host.input_devices(),
            DeviceKind::Output => self.host.output_devices(),
        }
        .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;

        Ok(devices
            .map(|device| {
                let name = device.name().unwrap_or_else(|_| "unknown".to_string());
                (name, device)
            })
            .collect())
    }

    pub fn find(&self, kind: DeviceKind, name: &str) -> Result<Device, AudioError> {
        if is_default_name(name) {
            let device = match kind {
                DeviceKind::Input => self.host.default_input_device(),
                DeviceKind::Output => self.host.default_output_device(),
            };
            return device.ok_or_else(|| {
                AudioError::DeviceNotFound(format!("no default {} device", kind.label()))
            });
        }

        self.list(kind)?
            .into_iter()
            .find(|(dev_name, _)| dev_name == name)
            .map(|(_, device)| device)
            .ok_or_else(|| {
                AudioError::DeviceNotFound(format!("{} device not found: {}", kind.label(), name))
            })
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
