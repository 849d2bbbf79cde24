use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use voxchat_core::{AppConfig, CaptureStrategy, ConfigDiff};
use voxchat_session::{CaptureCommand, SessionCommand};

/// Editors tend to write a file in several steps.
const SETTLE: Duration = Duration::from_millis(200);

/// Command-line values that take precedence over the file, on every load.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub strategy: Option<CaptureStrategy>,
}

impl Overrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.backend_url {
            config.backend.base_url = url.clone();
        }
        if let Some(strategy) = self.strategy {
            config.capture.strategy = strategy;
        }
    }
}

/// Where live-tunable settings are delivered.
pub struct ReloadTargets {
    pub session: mpsc::UnboundedSender<SessionCommand>,
    pub capture: mpsc::UnboundedSender<CaptureCommand>,
    pub tick: watch::Sender<Duration>,
}

impl ReloadTargets {
    /// Push the reloadable part of `diff` to the running tasks and surface
    /// everything else as a warning.
    pub fn apply(&self, diff: ConfigDiff) {
        if let Some(volume) = diff.volume_change {
            tracing::info!(volume, "playback volume reloaded");
            let _ = self.session.send(SessionCommand::SetVolume(volume));
        }
        if let Some(tick_ms) = diff.tick_change {
            tracing::info!(tick_ms, "typewriter tick reloaded");
            self.tick.send_replace(Duration::from_millis(tick_ms));
        }
        if let Some(drain_ms) = diff.drain_change {
            tracing::info!(drain_ms, "drain window reloaded");
            let _ = self
                .capture
                .send(CaptureCommand::SetDrain(Duration::from_millis(drain_ms)));
        }
        for warning in diff.non_reloadable {
            tracing::warn!("{warning}");
            let _ = self.session.send(SessionCommand::Warn(warning));
        }
    }
}

/// Watch the directory holding `path` and signal whenever the file itself
/// is written or replaced.
pub fn watch_config(path: &Path) -> notify::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let target = path.file_name().map(|name| name.to_owned());

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }
            if event
                .paths
                .iter()
                .any(|p| p.file_name() == target.as_deref())
            {
                let _ = tx.send(());
            }
        }
        Err(e) => tracing::warn!("config watcher error: {e}"),
    })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok((watcher, rx))
}

/// Reload the config on every change signal until the watcher goes away.
pub async fn reload_loop(
    path: PathBuf,
    mut current: AppConfig,
    overrides: Overrides,
    mut changes: mpsc::UnboundedReceiver<()>,
    targets: ReloadTargets,
) {
    while changes.recv().await.is_some() {
        tokio::time::sleep(SETTLE).await;
        while changes.try_recv().is_ok() {}

        let mut next = match AppConfig::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("config reload failed: {e}");
                let _ = targets
                    .session
                    .send(SessionCommand::Warn(format!("config reload failed: {e}")));
                continue;
            }
        };
        overrides.apply(&mut next);

        let diff = ConfigDiff::diff(&current, &next);
        if diff.is_empty() {
            tracing::debug!("config file touched, nothing changed");
            continue;
        }
        targets.apply(diff);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> (
        ReloadTargets,
        mpsc::UnboundedReceiver<SessionCommand>,
        mpsc::UnboundedReceiver<CaptureCommand>,
        watch::Receiver<Duration>,
    ) {
        let (session, session_rx) = mpsc::unbounded_channel();
        let (capture, capture_rx) = mpsc::unbounded_channel();
        let (tick, tick_rx) = watch::channel(Duration::from_millis(200));
        (
            ReloadTargets {
                session,
                capture,
                tick,
            },
            session_rx,
            capture_rx,
            tick_rx,
        )
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = AppConfig::default();
        Overrides {
            backend_url: Some("http://10.0.0.2:3001".to_string()),
            strategy: Some(CaptureStrategy::Recording),
        }
        .apply(&mut config);
        assert_eq!(config.backend.base_url, "http://10.0.0.2:3001");
        assert_eq!(config.capture.strategy, CaptureStrategy::Recording);

        let mut untouched = AppConfig::default();
        Overrides::default().apply(&mut untouched);
        assert_eq!(untouched.backend.base_url, AppConfig::default().backend.base_url);
    }

    #[test]
    fn test_reloadable_changes_are_delivered() {
        let (targets, mut session_rx, mut capture_rx, tick_rx) = targets();
        targets.apply(ConfigDiff {
            volume_change: Some(0.5),
            tick_change: Some(50),
            drain_change: Some(800),
            non_reloadable: Vec::new(),
        });

        assert!(matches!(
            session_rx.try_recv(),
            Ok(SessionCommand::SetVolume(v)) if (v - 0.5).abs() < f32::EPSILON
        ));
        assert_eq!(*tick_rx.borrow(), Duration::from_millis(50));
        assert_eq!(
            capture_rx.try_recv().unwrap(),
            CaptureCommand::SetDrain(Duration::from_millis(800))
        );
    }

    #[test]
    fn test_non_reloadable_changes_become_warnings() {
        let (targets, mut session_rx, _capture_rx, _tick_rx) = targets();
        let mut old = AppConfig::default();
        old.capture.strategy = CaptureStrategy::Transcription;
        let mut new = old.clone();
        new.capture.strategy = CaptureStrategy::Recording;

        targets.apply(ConfigDiff::diff(&old, &new));
        match session_rx.try_recv() {
            Ok(SessionCommand::Warn(w)) => assert!(w.contains("requires restart"), "got {w}"),
            other => panic!("expected a warning, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reload_loop_applies_file_changes() {
        let dir = std::env::temp_dir().join(format!("voxchat_reload_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[playback]\nvolume = 0.25\n").unwrap();

        let (targets, mut session_rx, _capture_rx, _tick_rx) = targets();
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(reload_loop(
            path.clone(),
            AppConfig::default(),
            Overrides::default(),
            change_rx,
            targets,
        ));

        change_tx.send(()).unwrap();
        let command = tokio::time::timeout(Duration::from_secs(2), session_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            command,
            SessionCommand::SetVolume(v) if (v - 0.25).abs() < f32::EPSILON
        ));

        drop(change_tx);
        task.await.unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_reload_loop_warns_on_restart_only_edit() {
        let dir = std::env::temp_dir().join(format!("voxchat_reload_warn_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[backend]\nrequest_timeout_secs = 5\n").unwrap();

        let (targets, mut session_rx, _capture_rx, _tick_rx) = targets();
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(reload_loop(
            path.clone(),
            AppConfig::default(),
            Overrides::default(),
            change_rx,
            targets,
        ));

        change_tx.send(()).unwrap();
        let command = tokio::time::timeout(Duration::from_secs(2), session_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match command {
            SessionCommand::Warn(w) => assert!(w.contains("backend.request_timeout_secs"), "got {w}"),
            other => panic!("expected a warning, got {other:?}"),
        }

        drop(change_tx);
        task.await.unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
