//! "Interview" screen: stored score banner and the invitation form.

use crossterm::event::{KeyCode, KeyModifiers};
use hirepipe_core::report::{REVIEW_WARNING, Recommendation, format_percent};
use hirepipe_core::stages::InterviewStage;
use hirepipe_core::{Stage, StageStatus};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::widgets::{field_style, hint, input_field, tone_color};

/// Which input field is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Email,
}

pub(crate) struct InterviewScreen {
    focused: Field,
    editing: bool,
}

impl InterviewScreen {
    pub(crate) fn new() -> Self {
        Self {
            focused: Field::Name,
            editing: false,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, stage: &InterviewStage) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(4), // Score banner
                Constraint::Length(3), // Name
                Constraint::Length(3), // Email
                Constraint::Length(1), // Hint
                Constraint::Min(3),    // Status / warning
            ])
            .split(area);

        let score = stage.stored_score();
        let banner = match Recommendation::for_stored_score(score) {
            Some(tier) => {
                let style = Style::default()
                    .fg(tone_color(tier.tone()))
                    .add_modifier(Modifier::BOLD);
                vec![
                    Line::from(format!("{}  {tier}", format_percent(score))).style(style),
                    Line::from(tier.verdict()),
                ]
            }
            None => vec![
                Line::from("No match score yet. Run Candidate Match first.")
                    .style(Style::default().fg(Color::DarkGray)),
            ],
        };
        f.render_widget(
            Paragraph::new(banner)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" Candidate score ")),
            chunks[0],
        );

        f.render_widget(
            input_field(
                "Candidate name",
                stage.name(),
                field_style(self.focused == Field::Name, self.editing),
            ),
            chunks[1],
        );
        f.render_widget(
            input_field(
                "Candidate email",
                stage.email(),
                field_style(self.focused == Field::Email, self.editing),
            ),
            chunks[2],
        );

        let hint_text = if self.editing {
            "Type to edit · Esc to stop editing · Tab to next field"
        } else {
            "Enter to edit · Tab to next field · Ctrl-R to send invitation"
        };
        f.render_widget(hint(hint_text), chunks[3]);

        let mut lines = vec![match stage.status() {
            StageStatus::Idle => Line::from(""),
            StageStatus::Loading => {
                Line::from("Sending invitation…").style(Style::default().fg(Color::Cyan))
            }
            StageStatus::Success => Line::from(
                stage
                    .outcome()
                    .map(|o| o.receipt.message.clone())
                    .unwrap_or_default(),
            )
            .style(Style::default().fg(Color::Green)),
            StageStatus::Error(message) => {
                Line::from(message.clone()).style(Style::default().fg(Color::Red))
            }
        }];
        if stage.review_warning() {
            lines.push(Line::from(""));
            lines.push(Line::from(REVIEW_WARNING).style(Style::default().fg(Color::Yellow)));
        }
        f.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" Invitation ")),
            chunks[4],
        );
    }

    /// Handle a key; returns a status message for the bottom bar, if any.
    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        stage: &mut InterviewStage,
    ) -> Option<String> {
        if self.editing {
            match code {
                KeyCode::Esc | KeyCode::Enter => self.editing = false,
                KeyCode::Tab => self.next_field(),
                KeyCode::Backspace => self.edit(stage, |v| {
                    v.pop();
                }),
                KeyCode::Char(c) => self.edit(stage, |v| v.push(c)),
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Enter => self.editing = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => self.next_field(),
            _ => {}
        }
        None
    }

    fn edit(&self, stage: &mut InterviewStage, edit: impl FnOnce(&mut String)) {
        match self.focused {
            Field::Name => {
                let mut value = stage.name().to_string();
                edit(&mut value);
                stage.set_name(value);
            }
            Field::Email => {
                let mut value = stage.email().to_string();
                edit(&mut value);
                stage.set_email(value);
            }
        }
    }

    fn next_field(&mut self) {
        self.focused = match self.focused {
            Field::Name => Field::Email,
            Field::Email => Field::Name,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(screen: &mut InterviewScreen, stage: &mut InterviewStage, s: &str) {
        for c in s.chars() {
            screen.handle_key(KeyCode::Char(c), KeyModifiers::NONE, stage);
        }
    }

    #[test]
    fn form_fills_name_then_email() {
        let mut screen = InterviewScreen::new();
        let mut stage = InterviewStage::new();

        screen.handle_key(KeyCode::Enter, KeyModifiers::NONE, &mut stage);
        type_str(&mut screen, &mut stage, "Jane Doe");
        screen.handle_key(KeyCode::Tab, KeyModifiers::NONE, &mut stage);
        type_str(&mut screen, &mut stage, "jane@example.com");
        screen.handle_key(KeyCode::Esc, KeyModifiers::NONE, &mut stage);

        assert_eq!(stage.name(), "Jane Doe");
        assert_eq!(stage.email(), "jane@example.com");
        assert!(stage.inputs_valid());
    }
}
