//! "Job Summary" screen: JD file path or pasted text, and the summary.

use std::path::Path;

use crossterm::event::{KeyCode, KeyModifiers};
use hirepipe_core::Stage;
use hirepipe_core::stages::JobSummaryStage;
use hirepipe_shared::{UploadKind, UploadedFile};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::widgets::{field_style, hint, input_field, run_state_line};

/// Which input field is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    File,
    Text,
}

pub(crate) struct JobSummaryScreen {
    path: String,
    focused: Field,
    editing: bool,
}

impl JobSummaryScreen {
    pub(crate) fn new() -> Self {
        Self {
            path: String::new(),
            focused: Field::File,
            editing: false,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, stage: &JobSummaryStage) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),      // File path
                Constraint::Percentage(30), // Pasted text or preview
                Constraint::Length(1),      // Hint
                Constraint::Min(3),         // Summary / status
            ])
            .split(area);

        let file_label = match stage.file() {
            Some(selected) if !self.editing => selected.file.file_name.as_str(),
            _ => self.path.as_str(),
        };
        f.render_widget(
            input_field(
                "JD file (pdf, txt, md, doc, docx)",
                file_label,
                field_style(self.focused == Field::File, self.editing),
            ),
            chunks[0],
        );

        let (title, body) = match stage.file() {
            Some(selected) => ("Preview", selected.preview()),
            None => ("Or paste the job description", stage.text()),
        };
        f.render_widget(
            input_field(
                title,
                body,
                field_style(self.focused == Field::Text, self.editing),
            ),
            chunks[1],
        );

        let hint_text = if self.editing {
            "Type to edit · Enter to load file / new line · Esc to stop editing"
        } else {
            "Enter to edit · Tab to next field · Del to clear file · Ctrl-R to summarize"
        };
        f.render_widget(hint(hint_text), chunks[2]);

        let mut lines = vec![run_state_line(stage.status(), "Summarizing"), Line::from("")];
        if let Some(summary) = stage.summary() {
            lines.extend(summary.text.lines().map(|l| Line::from(l.to_string())));
        }
        let summary = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" Summary "));
        f.render_widget(summary, chunks[3]);
    }

    /// Handle a key; returns a status message for the bottom bar, if any.
    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        stage: &mut JobSummaryStage,
    ) -> Option<String> {
        if self.editing {
            match (self.focused, code) {
                (_, KeyCode::Esc) => self.editing = false,
                (Field::File, KeyCode::Enter) => {
                    self.editing = false;
                    return Some(self.load_file(stage));
                }
                (Field::File, KeyCode::Backspace) => {
                    self.path.pop();
                }
                (Field::File, KeyCode::Char(c)) => self.path.push(c),
                (Field::Text, KeyCode::Enter) => edit_text(stage, |t| t.push('\n')),
                (Field::Text, KeyCode::Backspace) => edit_text(stage, |t| {
                    t.pop();
                }),
                (Field::Text, KeyCode::Char(c)) => edit_text(stage, |t| t.push(c)),
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Enter => self.editing = true,
            KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => self.next_field(),
            KeyCode::Delete => {
                stage.clear_file();
                return Some("File cleared".to_string());
            }
            _ => {}
        }
        None
    }

    fn load_file(&mut self, stage: &mut JobSummaryStage) -> String {
        let path = self.path.trim();
        if path.is_empty() {
            return "Enter a file path first".to_string();
        }
        match UploadedFile::read(UploadKind::JobDescription, Path::new(path)) {
            Ok(file) => {
                let name = file.file_name.clone();
                stage.select_file(file);
                format!("Loaded {name}")
            }
            Err(e) => e.user_message(&format!("Could not read {path}")),
        }
    }

    fn next_field(&mut self) {
        self.focused = match self.focused {
            Field::File => Field::Text,
            Field::Text => Field::File,
        };
    }
}

/// Apply an edit to the stage's pasted text.
fn edit_text(stage: &mut JobSummaryStage, edit: impl FnOnce(&mut String)) {
    let mut text = stage.text().to_string();
    edit(&mut text);
    stage.set_text(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(screen: &mut JobSummaryScreen, stage: &mut JobSummaryStage, code: KeyCode) {
        screen.handle_key(code, KeyModifiers::NONE, stage);
    }

    #[test]
    fn typing_in_text_field_updates_the_stage() {
        let mut screen = JobSummaryScreen::new();
        let mut stage = JobSummaryStage::new();

        press(&mut screen, &mut stage, KeyCode::Tab);
        press(&mut screen, &mut stage, KeyCode::Enter);
        for c in "Go dev".chars() {
            press(&mut screen, &mut stage, KeyCode::Char(c));
        }
        press(&mut screen, &mut stage, KeyCode::Backspace);
        press(&mut screen, &mut stage, KeyCode::Esc);

        assert_eq!(stage.text(), "Go de");
        assert!(!screen.is_editing());
        assert!(stage.inputs_valid());
    }

    #[test]
    fn missing_file_reports_an_error() {
        let mut screen = JobSummaryScreen::new();
        let mut stage = JobSummaryStage::new();

        press(&mut screen, &mut stage, KeyCode::Enter);
        for c in "/nonexistent/role.pdf".chars() {
            press(&mut screen, &mut stage, KeyCode::Char(c));
        }
        let status = screen.handle_key(KeyCode::Enter, KeyModifiers::NONE, &mut stage);

        assert_eq!(status.as_deref(), Some("Could not read /nonexistent/role.pdf"));
        assert!(stage.file().is_none());
    }
}
