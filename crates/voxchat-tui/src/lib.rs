pub mod app;
pub mod log_layer;
pub mod typewriter;
pub mod ui;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use tokio::sync::{mpsc, watch};
use voxchat_core::{ChatState, UiCommand};

pub use app::App;
pub use log_layer::{LogBuffer, TuiLogLayer};
pub use typewriter::{Phase, Signals, Typewriter};

/// Run the TUI event loop. Blocks until the user quits.
pub async fn run(
    mut state_rx: watch::Receiver<ChatState>,
    cmd_tx: mpsc::UnboundedSender<UiCommand>,
    log_buffer: LogBuffer,
    tick_rx: watch::Receiver<Duration>,
) -> std::io::Result<()> {
    let mut terminal = ratatui::init();
    let result = run_loop(&mut terminal, &mut state_rx, &cmd_tx, &log_buffer, &tick_rx).await;
    ratatui::restore();
    result
}

async fn run_loop(
    terminal: &mut DefaultTerminal,
    state_rx: &mut watch::Receiver<ChatState>,
    cmd_tx: &mpsc::UnboundedSender<UiCommand>,
    log_buffer: &LogBuffer,
    tick_rx: &watch::Receiver<Duration>,
) -> std::io::Result<()> {
    let mut app = App::new(Arc::clone(log_buffer));
    let mut last_tick = Instant::now();

    loop {
        let tick = (*tick_rx.borrow()).max(Duration::from_millis(1));

        if state_rx.has_changed().unwrap_or(false) {
            app.update_state(state_rx.borrow_and_update().clone());
        }

        if last_tick.elapsed() >= tick {
            app.tick();
            last_tick = Instant::now();
        }

        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Short poll so state changes and typewriter ticks render promptly
        let wait = tick
            .saturating_sub(last_tick.elapsed())
            .min(Duration::from_millis(33));
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.handle_key(key) {
                        app::AppAction::Quit => {
                            let _ = cmd_tx.send(UiCommand::Quit);
                            break;
                        }
                        app::AppAction::Command(cmd) => {
                            let _ = cmd_tx.send(cmd);
                        }
                        app::AppAction::None => {}
                    }
                }
            }
        }
    }

    Ok(())
}
