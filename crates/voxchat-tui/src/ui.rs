use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Tabs};
use ratatui::Frame;
use voxchat_core::{CaptureStatus, EntryKind, TurnStatus};

use crate::app::{App, Tab};

pub fn draw(frame: &mut Frame, app: &App) {
    let [tabs_area, main_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Fill(1)]).areas(frame.area());

    draw_tabs(frame, app, tabs_area);

    match app.tab {
        Tab::Chat => draw_chat(frame, app, main_area),
        Tab::Logs => draw_logs(frame, app, main_area),
    }
}

fn draw_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles = vec!["1:Chat", "2:Logs"];
    let selected = match app.tab {
        Tab::Chat => 0,
        Tab::Logs => 1,
    };
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("voxchat"))
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

fn draw_chat(frame: &mut Frame, app: &App, area: Rect) {
    let [transcript_area, status_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(4)]).areas(area);

    let width = transcript_area.width.saturating_sub(2) as usize;
    let lines = transcript_lines(app, width);

    let visible_height = transcript_area.height.saturating_sub(2) as usize;
    let total = lines.len();
    let scroll = app.chat_scroll.min(total.saturating_sub(visible_height));
    let end = total.saturating_sub(scroll);
    let start = end.saturating_sub(visible_height);
    let visible: Vec<Line> = lines.into_iter().skip(start).take(end - start).collect();

    let title = if app.chat_scroll == 0 {
        "Transcript".to_string()
    } else {
        format!("Transcript (scrolled {}, G=bottom)", app.chat_scroll)
    };
    let transcript = Paragraph::new(visible).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(transcript, transcript_area);

    draw_status(frame, app, status_area);
}

fn transcript_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if app.state.entries.is_empty() {
        lines.push(Line::styled(
            "Press Space to talk.",
            Style::default().fg(Color::DarkGray),
        ));
        return lines;
    }

    for (idx, entry) in app.state.entries.iter().enumerate() {
        let (label, label_style) = match entry.kind {
            EntryKind::UserUtterance => ("you> ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            EntryKind::AssistantText => ("bot> ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            EntryKind::AssistantAudioMarker => {
                lines.push(Line::styled(
                    "bot> [audio reply]",
                    Style::default().fg(Color::DarkGray),
                ));
                continue;
            }
        };

        let text = app.display_text(idx);
        let body_width = width.saturating_sub(label.len()).max(1);
        let mut first = true;
        for row in text.split('\n').flat_map(|l| wrap(l, body_width)) {
            let prefix = if first { label } else { "     " };
            first = false;
            lines.push(Line::from(vec![
                Span::styled(prefix, label_style),
                Span::raw(row),
            ]));
        }
        if first {
            // Nothing revealed yet.
            lines.push(Line::from(Span::styled(label, label_style)));
        }
    }
    lines
}

/// Split `text` into rows of at most `width` characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let state = &app.state;
    let capture = match state.capture {
        CaptureStatus::Idle => Span::styled("idle", Style::default().fg(Color::DarkGray)),
        CaptureStatus::Listening => Span::styled(
            "● listening",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        CaptureStatus::Finalizing => Span::styled("finalizing…", Style::default().fg(Color::Yellow)),
    };
    let turn = match state.turn {
        Some((id, TurnStatus::Pending)) => format!("turn {id}: sending"),
        Some((id, TurnStatus::Streaming)) => format!("turn {id}: replying"),
        Some((id, TurnStatus::Ended)) => format!("turn {id}: done"),
        Some((id, TurnStatus::Cancelled)) => format!("turn {id}: cancelled"),
        None => String::new(),
    };
    let typing = if app.is_typing() { "  typing…" } else { "" };

    let mut lines = vec![Line::from(vec![
        capture,
        Span::raw("  "),
        Span::raw(turn),
        Span::styled(typing, Style::default().fg(Color::Green)),
    ])];

    if state.capture != CaptureStatus::Idle && !state.live_transcript.is_empty() {
        lines.push(Line::styled(
            format!("heard: {}", state.live_transcript),
            Style::default().add_modifier(Modifier::ITALIC),
        ));
    } else if let Some(notice) = &state.notice {
        lines.push(Line::styled(notice.clone(), Style::default().fg(Color::Yellow)));
    } else if let Some(warning) = state.warnings.last() {
        lines.push(Line::styled(warning.clone(), Style::default().fg(Color::Red)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Space=talk  s=stop  q=quit");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let Ok(logs) = app.logs.lock() else {
        return;
    };
    let total = logs.len();

    let visible_height = area.height.saturating_sub(2) as usize; // account for borders
    let scroll = app.log_scroll.min(total.saturating_sub(visible_height));
    let end = total.saturating_sub(scroll);
    let start = end.saturating_sub(visible_height);

    let items: Vec<ListItem> = logs
        .iter()
        .skip(start)
        .take(end - start)
        .map(|s| ListItem::new(s.as_str()))
        .collect();

    let title = if app.log_auto_scroll {
        "Logs (auto-scroll)"
    } else {
        "Logs (Up/Down=scroll, G=bottom)"
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}
