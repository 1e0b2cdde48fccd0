//! Reusable TUI widgets.

use hirepipe_core::StageStatus;
use hirepipe_core::report::Tone;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Bottom status bar.
pub(crate) fn status_bar(msg: &str) -> Paragraph<'_> {
    Paragraph::new(format!(" {msg}")).style(Style::default().bg(Color::DarkGray).fg(Color::White))
}

/// Foreground colour for a recommendation tone.
pub(crate) fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Success => Color::Green,
        Tone::Warning => Color::Yellow,
        Tone::Error => Color::Red,
    }
}

/// Border style of an input field: yellow while editing, cyan when focused.
pub(crate) fn field_style(focused: bool, editing: bool) -> Style {
    match (focused, editing) {
        (true, true) => Style::default().fg(Color::Yellow),
        (true, false) => Style::default().fg(Color::Cyan),
        _ => Style::default(),
    }
}

/// Bordered, wrapping text input.
pub(crate) fn input_field<'a>(title: &'a str, value: &'a str, style: Style) -> Paragraph<'a> {
    Paragraph::new(value)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {title} "))
                .border_style(style),
        )
}

/// One line describing a stage's run state.
pub(crate) fn run_state_line(status: &StageStatus, loading: &'static str) -> Line<'static> {
    match status {
        StageStatus::Idle => Line::from("Ready · Ctrl-R to run").style(Style::default().fg(Color::DarkGray)),
        StageStatus::Loading => Line::from(format!("{loading}…")).style(Style::default().fg(Color::Cyan)),
        StageStatus::Success => Line::from("Done").style(Style::default().fg(Color::Green)),
        StageStatus::Error(message) => {
            Line::from(message.clone()).style(Style::default().fg(Color::Red))
        }
    }
}

/// Dimmed, centred key hint.
pub(crate) fn hint(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
}
