//! "Candidate Match" screen: CV path, the summary in use, and the match report.

use std::path::Path;

use crossterm::event::{KeyCode, KeyModifiers};
use hirepipe_core::Stage;
use hirepipe_core::report::MatchReport;
use hirepipe_core::stages::CandidateMatchStage;
use hirepipe_shared::{UploadKind, UploadedFile};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::widgets::{field_style, hint, input_field, run_state_line, tone_color};

pub(crate) struct CandidateMatchScreen {
    path: String,
    editing: bool,
}

impl CandidateMatchScreen {
    pub(crate) fn new() -> Self {
        Self {
            path: String::new(),
            editing: false,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, stage: &CandidateMatchStage) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(4), // Summary in use
                Constraint::Length(3), // CV path
                Constraint::Length(1), // Hint
                Constraint::Min(3),    // Report
            ])
            .split(area);

        let summary = stage.stored_summary();
        let summary_line = if summary.is_empty() {
            Line::from(hirepipe_core::stages::NO_SUMMARY).style(Style::default().fg(Color::Yellow))
        } else {
            Line::from(summary.text.clone())
        };
        f.render_widget(
            Paragraph::new(summary_line)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" Matching against ")),
            chunks[0],
        );

        let cv_label = match stage.cv() {
            Some(selected) if !self.editing => selected.preview(),
            _ => self.path.as_str(),
        };
        f.render_widget(
            input_field(
                "CV file (pdf, doc, docx, txt)",
                cv_label,
                field_style(true, self.editing),
            ),
            chunks[1],
        );

        let hint_text = if self.editing {
            "Type a path · Enter to load · Esc to cancel"
        } else {
            "Enter to pick a CV · Ctrl-R to match · c to continue to Interview"
        };
        f.render_widget(hint(hint_text), chunks[2]);

        let mut lines = vec![run_state_line(stage.status(), "Parsing and matching CV")];
        if let Some(result) = stage.result() {
            lines.push(Line::from(""));
            lines.extend(report_lines(&MatchReport::from(result)));
        }
        f.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(Block::default().borders(Borders::ALL).title(" Match ")),
            chunks[3],
        );
    }

    /// Handle a key; returns a status message for the bottom bar, if any.
    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        stage: &mut CandidateMatchStage,
    ) -> Option<String> {
        if self.editing {
            match code {
                KeyCode::Esc => self.editing = false,
                KeyCode::Enter => {
                    self.editing = false;
                    return Some(self.load_cv(stage));
                }
                KeyCode::Backspace => {
                    self.path.pop();
                }
                KeyCode::Char(c) => self.path.push(c),
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Enter => self.editing = true,
            KeyCode::Delete => {
                stage.clear_cv();
                return Some("CV cleared".to_string());
            }
            _ => {}
        }
        None
    }

    fn load_cv(&mut self, stage: &mut CandidateMatchStage) -> String {
        let path = self.path.trim();
        if path.is_empty() {
            return "Enter a file path first".to_string();
        }
        match UploadedFile::read(UploadKind::Cv, Path::new(path)) {
            Ok(file) => {
                let name = file.file_name.clone();
                stage.select_cv(file);
                format!("Loaded {name}")
            }
            Err(e) => e.user_message(&format!("Could not read {path}")),
        }
    }
}

fn report_lines(report: &MatchReport) -> Vec<Line<'static>> {
    let tier_style = Style::default()
        .fg(tone_color(report.recommendation.tone()))
        .add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{}  ", report.score_label), tier_style),
            Span::styled(report.recommendation.label(), tier_style),
        ]),
        Line::from(report.verdict),
        Line::from(""),
        Line::from(format!("Skills       {}", report.skills_label)),
        Line::from(format!("Experience   {}", report.experience_label)),
        Line::from(format!("Education    {}", report.education_label)),
        Line::from(format!("Keywords     {}", report.keywords_label)),
        Line::from(""),
    ];

    match report.breakdown_notice {
        Some(notice) => lines.push(Line::from(notice).style(Style::default().fg(Color::DarkGray))),
        None => {
            for row in &report.skills {
                let (mark, color) = if row.found {
                    ("✓", Color::Green)
                } else {
                    ("✗", Color::Red)
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{mark} "), Style::default().fg(color)),
                    Span::raw(format!("{:<24} {:>4}", row.skill, row.label)),
                ]));
            }
        }
    }

    if let Some(analysis) = &report.analysis {
        lines.push(Line::from(""));
        lines.extend(analysis.lines().map(|l| Line::from(l.to_string())));
    }
    lines
}
