use crate::controller::SessionCommand;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use voxchat_capture::CaptureSource;
use voxchat_core::{CaptureStatus, UiCommand};

/// Push-to-talk edges for the capture task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    Begin,
    End,
    SetDrain(Duration),
}

/// Split UI commands between the capture task and the session. Returns when
/// the UI asks to quit or goes away.
pub async fn route_ui_commands(
    mut ui_rx: mpsc::UnboundedReceiver<UiCommand>,
    capture_tx: mpsc::UnboundedSender<CaptureCommand>,
    session_tx: mpsc::UnboundedSender<SessionCommand>,
) {
    while let Some(command) = ui_rx.recv().await {
        let delivered = match command {
            UiCommand::BeginCapture => capture_tx.send(CaptureCommand::Begin).is_ok(),
            UiCommand::EndCapture => capture_tx.send(CaptureCommand::End).is_ok(),
            UiCommand::Interrupt => session_tx.send(SessionCommand::Interrupt).is_ok(),
            UiCommand::Quit => break,
        };
        if !delivered {
            tracing::warn!(?command, "command dropped, receiver is gone");
        }
    }
    let _ = session_tx.send(SessionCommand::Shutdown);
}

/// Drive a capture source from push-to-talk edges. Pressing talk silences
/// the assistant; releasing it submits whatever was heard.
pub async fn run_capture_loop(
    mut source: Box<dyn CaptureSource>,
    mut commands: mpsc::UnboundedReceiver<CaptureCommand>,
    session: mpsc::UnboundedSender<SessionCommand>,
) {
    let mut live: Option<watch::Receiver<String>> = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    None => break,
                    Some(CaptureCommand::SetDrain(drain)) => source.set_drain(drain),
                    Some(CaptureCommand::Begin) => {
                        if source.is_active() {
                            continue;
                        }
                        let _ = session.send(SessionCommand::Interrupt);
                        match source.begin().await {
                            Ok(()) => {
                                live = source.live_text();
                                let _ = session.send(SessionCommand::Capture(CaptureStatus::Listening));
                            }
                            Err(e) => {
                                tracing::warn!("capture failed to start: {e}");
                                let _ = session.send(SessionCommand::Notice(e.to_string()));
                                let _ = session.send(SessionCommand::Capture(CaptureStatus::Idle));
                            }
                        }
                    }
                    Some(CaptureCommand::End) => {
                        if !source.is_active() {
                            continue;
                        }
                        live = None;
                        let _ = session.send(SessionCommand::Capture(CaptureStatus::Finalizing));
                        match source.end().await {
                            Ok(Some(utterance)) => {
                                let _ = session.send(SessionCommand::Submit(utterance));
                            }
                            Ok(None) => tracing::debug!("capture ended with nothing to send"),
                            Err(e) => {
                                tracing::warn!("capture failed: {e}");
                                let _ = session.send(SessionCommand::Notice(e.to_string()));
                            }
                        }
                        let _ = session.send(SessionCommand::Capture(CaptureStatus::Idle));
                    }
                }
            }
            text = next_live(&mut live) => {
                match text {
                    Some(text) => {
                        let _ = session.send(SessionCommand::LiveTranscript(text));
                    }
                    None => live = None,
                }
            }
        }
    }

    if source.is_active() {
        // Release the microphone; whatever was heard is discarded.
        let _ = source.end().await;
    }
    tracing::debug!("capture loop stopped");
}

async fn next_live(live: &mut Option<watch::Receiver<String>>) -> Option<String> {
    match live {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
