use std::fmt::Display;

use crate::config::AppConfig;

/// Describes runtime-safe changes between two configs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDiff {
    pub volume_change: Option<f32>,
    pub tick_change: Option<u64>,
    pub drain_change: Option<u64>,
    pub non_reloadable: Vec<String>,
}

impl ConfigDiff {
    /// Compare two configs and return the diff.
    /// Reloadable: playback volume, typewriter tick, drain window.
    /// Everything that owns a device or a connection needs a restart.
    pub fn diff(old: &AppConfig, new: &AppConfig) -> Self {
        let mut result = Self::default();

        if (old.playback.volume - new.playback.volume).abs() > f32::EPSILON {
            result.volume_change = Some(new.playback.volume);
        }
        if old.typewriter.tick_ms != new.typewriter.tick_ms {
            result.tick_change = Some(new.typewriter.tick_ms);
        }
        if old.capture.drain_ms != new.capture.drain_ms {
            result.drain_change = Some(new.capture.drain_ms);
        }

        if old.backend.turn_url() != new.backend.turn_url() {
            result.non_reloadable.push(format!(
                "backend URL changed ('{}' → '{}'), requires restart",
                old.backend.turn_url(),
                new.backend.turn_url()
            ));
        }
        if old.capture.strategy != new.capture.strategy {
            result.non_reloadable.push(format!(
                "capture strategy changed ({:?} → {:?}), requires restart",
                old.capture.strategy, new.capture.strategy
            ));
        }
        if old.backend.correlate_turns != new.backend.correlate_turns {
            restart(&mut result, "backend.correlate_turns", old.backend.correlate_turns, new.backend.correlate_turns);
        }
        if old.backend.request_timeout_secs != new.backend.request_timeout_secs {
            restart(
                &mut result,
                "backend.request_timeout_secs",
                old.backend.request_timeout_secs,
                new.backend.request_timeout_secs,
            );
        }
        if old.backend.stream_idle_timeout_secs != new.backend.stream_idle_timeout_secs {
            restart(
                &mut result,
                "backend.stream_idle_timeout_secs",
                old.backend.stream_idle_timeout_secs,
                new.backend.stream_idle_timeout_secs,
            );
        }
        if old.capture.device_name != new.capture.device_name {
            result.non_reloadable.push(format!(
                "capture device changed ('{}' → '{}'), requires restart",
                old.capture.device_name, new.capture.device_name
            ));
        }
        if old.capture.sample_rate != new.capture.sample_rate {
            restart(&mut result, "capture.sample_rate", old.capture.sample_rate, new.capture.sample_rate);
        }
        if old.capture.buffer_size != new.capture.buffer_size {
            restart(&mut result, "capture.buffer_size", old.capture.buffer_size, new.capture.buffer_size);
        }
        if old.capture.max_recording_secs != new.capture.max_recording_secs {
            restart(
                &mut result,
                "capture.max_recording_secs",
                old.capture.max_recording_secs,
                new.capture.max_recording_secs,
            );
        }
        if old.capture.recognizer.engine != new.capture.recognizer.engine {
            result.non_reloadable.push(format!(
                "recognizer changed ('{}' → '{}'), requires restart",
                old.capture.recognizer.engine, new.capture.recognizer.engine
            ));
        }
        // Values stay out of the message: the table may hold an api key.
        if old.capture.recognizer.extra != new.capture.recognizer.extra {
            result
                .non_reloadable
                .push("recognizer settings changed, requires restart".to_string());
        }
        if old.playback.device_name != new.playback.device_name {
            result.non_reloadable.push(format!(
                "playback device changed ('{}' → '{}'), requires restart",
                old.playback.device_name, new.playback.device_name
            ));
        }
        if old.playback.typing_sound != new.playback.typing_sound {
            let show = |p: &Option<std::path::PathBuf>| {
                p.as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "none".to_string())
            };
            restart(
                &mut result,
                "playback.typing_sound",
                show(&old.playback.typing_sound),
                show(&new.playback.typing_sound),
            );
        }
        if old.general.log_level != new.general.log_level {
            restart(&mut result, "general.log_level", &old.general.log_level, &new.general.log_level);
        }

        result
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn restart(diff: &mut ConfigDiff, field: &str, old: impl Display, new: impl Display) {
    diff.non_reloadable
        .push(format!("{field} changed ({old} → {new}), requires restart"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::from_toml_str(
            r#"
[backend]
base_url = "http://localhost:3001"

[playback]
volume = 0.8

[typewriter]
tick_ms = 200
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_config_diff_no_change() {
        let diff = ConfigDiff::diff(&base_config(), &base_config());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_config_diff_volume_and_tick() {
        let new = AppConfig::from_toml_str(
            r#"
[backend]
base_url = "http://localhost:3001"

[playback]
volume = 0.5

[typewriter]
tick_ms = 80
"#,
        )
        .unwrap();
        let diff = ConfigDiff::diff(&base_config(), &new);
        assert_eq!(diff.volume_change, Some(0.5));
        assert_eq!(diff.tick_change, Some(80));
        assert!(diff.drain_change.is_none());
        assert!(diff.non_reloadable.is_empty());
    }

    #[test]
    fn test_config_diff_backend_change_needs_restart() {
        let new = AppConfig::from_toml_str(
            r#"
[backend]
base_url = "https://other.example"

[playback]
volume = 0.8
"#,
        )
        .unwrap();
        let diff = ConfigDiff::diff(&base_config(), &new);
        assert_eq!(diff.non_reloadable.len(), 1);
        assert!(diff.non_reloadable[0].contains("backend URL changed"));
    }

    #[test]
    fn test_config_diff_strategy_change_needs_restart() {
        let new = AppConfig::from_toml_str(
            r#"
[capture]
strategy = "recording"

[playback]
volume = 0.8
"#,
        )
        .unwrap();
        let diff = ConfigDiff::diff(&base_config(), &new);
        assert!(diff
            .non_reloadable
            .iter()
            .any(|w| w.contains("capture strategy changed")));
    }

    #[test]
    fn test_config_diff_every_restart_only_field_warns() {
        let new = AppConfig::from_toml_str(
            r#"
[general]
log_level = "debug"

[backend]
base_url = "http://localhost:3001"
correlate_turns = false
request_timeout_secs = 5
stream_idle_timeout_secs = 10

[capture]
sample_rate = 48000
buffer_size = 512
max_recording_secs = 30

[capture.recognizer]
url = "http://asr.local/v1/audio/transcriptions"

[playback]
volume = 0.8
typing_sound = "typing.mp3"

[typewriter]
tick_ms = 200
"#,
        )
        .unwrap();
        let diff = ConfigDiff::diff(&base_config(), &new);

        assert!(diff.volume_change.is_none());
        assert!(diff.tick_change.is_none());
        for field in [
            "general.log_level",
            "backend.correlate_turns",
            "backend.request_timeout_secs",
            "backend.stream_idle_timeout_secs",
            "capture.sample_rate",
            "capture.buffer_size",
            "capture.max_recording_secs",
            "recognizer settings",
            "playback.typing_sound",
        ] {
            assert!(
                diff.non_reloadable.iter().any(|w| w.starts_with(field)),
                "no warning for {field}: {:?}",
                diff.non_reloadable
            );
        }
        assert_eq!(diff.non_reloadable.len(), 9);
    }

    #[test]
    fn test_config_diff_recognizer_settings_hide_values() {
        let with_key = |key: &str| {
            AppConfig::from_toml_str(&format!(
                "[capture.recognizer]\nengine = \"remote\"\napi_key = \"{key}\"\n"
            ))
            .unwrap()
        };
        let diff = ConfigDiff::diff(&with_key("sk-old"), &with_key("sk-new"));
        assert_eq!(diff.non_reloadable.len(), 1);
        assert!(!diff.non_reloadable[0].contains("sk-"));
    }
}
