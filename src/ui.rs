pub mod screen;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use setwise::{
    session::{ActiveExercise, ActiveSet, RestPhase, SessionPhase},
    util::{format_clock, format_weight},
};

use crate::{App, AppState, SaveStatus};

const HORIZONTAL_MARGIN: u16 = 2;

fn set_row<'a>(idx: usize, set: &ActiveSet, is_current: bool, unit: &str) -> Row<'a> {
    let status = if set.completed {
        "done"
    } else if is_current {
        "now"
    } else {
        ""
    };
    let style = if set.completed {
        Style::default().fg(Color::Green)
    } else if is_current {
        Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };

    Row::new(vec![
        Cell::from(format!("{}", idx + 1)),
        Cell::from(set.reps.map_or("-".to_string(), |r| r.to_string())),
        Cell::from(format!("{} {unit}", format_weight(set.weight))),
        Cell::from(set.duration_secs.map_or("-".to_string(), |d| format_clock(d.into()))),
        Cell::from(format_clock(set.rest_secs.into())),
        Cell::from(status),
    ])
    .style(style)
}

fn exercise_line<'a>(idx: usize, exercise: &ActiveExercise, selected: bool) -> Line<'a> {
    let marker = if selected { "> " } else { "  " };
    let style = match (exercise.is_done(), selected) {
        (true, _) => Style::default().fg(Color::Green),
        (false, true) => Style::default().add_modifier(Modifier::BOLD),
        (false, false) => Style::default(),
    };
    Line::from(vec![
        Span::raw(marker),
        Span::styled(
            format!(
                "{}. {} ({}/{})",
                idx + 1,
                exercise.name,
                exercise.completed_sets(),
                exercise.sets.len()
            ),
            style,
        ),
    ])
}

/// Centered single-paragraph box drawn over the workout screen
fn render_dialog(message: &str, hint: &str, area: Rect, buf: &mut Buffer) {
    let width = (message.width().max(hint.width()) as u16 + 6).min(area.width);
    let height = 5.min(area.height);
    let rect = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    Clear.render(rect, buf);
    Paragraph::new(vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            hint.to_string(),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL))
    .render(rect, buf);
}

impl App {
    fn render_workout(&self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let unit = self.config.weight_unit.to_string();
        let resting = matches!(session.rest_phase(), RestPhase::Resting { .. });

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(if resting { 3 } else { 0 }),
                Constraint::Min(6),
                Constraint::Length(3),
                Constraint::Length(2),
            ])
            .split(area);

        let phase = match session.phase() {
            SessionPhase::NotStarted => ("not started", Color::Yellow),
            SessionPhase::Running => ("running", Color::Green),
            SessionPhase::Paused => ("paused", Color::Yellow),
            SessionPhase::Finished => ("finished", Color::Blue),
        };
        Paragraph::new(Line::from(vec![
            Span::styled(
                session.template_name().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(
                format_clock(session.elapsed_secs()),
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(phase.0, Style::default().fg(phase.1)),
        ]))
        .block(Block::default().borders(Borders::BOTTOM))
        .render(chunks[0], buf);

        if let RestPhase::Resting { remaining_secs } = session.rest_phase() {
            Paragraph::new(Line::from(Span::styled(
                format!("REST {}", format_clock(remaining_secs.into())),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .render(chunks[1], buf);
        }

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(chunks[2]);

        let exercise_lines = session
            .exercises()
            .iter()
            .enumerate()
            .map(|(i, ex)| exercise_line(i, ex, i == session.exercise_cursor()))
            .collect_vec();
        Paragraph::new(exercise_lines)
            .block(Block::default().borders(Borders::ALL).title("Exercises"))
            .wrap(Wrap { trim: true })
            .render(body[0], buf);

        let current = session.current_exercise();
        let rows = current
            .sets
            .iter()
            .enumerate()
            .map(|(i, set)| set_row(i, set, i == current.current_set_index && !set.completed, &unit))
            .collect_vec();
        let mut title = current.name.clone();
        if !current.note.is_empty() {
            title = format!("{title} ({})", current.note);
        }
        Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Length(6),
                Constraint::Length(10),
                Constraint::Length(8),
                Constraint::Length(6),
                Constraint::Length(6),
            ],
        )
        .header(
            Row::new(vec!["set", "reps", "weight", "time", "rest", ""])
                .style(Style::default().add_modifier(Modifier::UNDERLINED)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .render(body[1], buf);

        let progress = session.progress();
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Green))
            .label(format!(
                "{}/{} sets",
                progress.completed_sets, progress.total_sets
            ))
            .ratio(progress.ratio().clamp(0.0, 1.0))
            .render(chunks[3], buf);

        let footer = match &self.status {
            Some(status) => Line::from(Span::styled(
                status.clone(),
                Style::default().fg(Color::Yellow),
            )),
            None => Line::from(Span::styled(
                "space start/pause  enter done  ↑/↓ reps  +/- weight  s skip rest  ←/→ exercise  n notes  f finish  esc quit",
                Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
            )),
        };
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[4], buf);

        match self.state {
            AppState::ConfirmFinish => {
                render_dialog("Finish with open sets?", "(y)es / (n)o", area, buf)
            }
            AppState::ConfirmAbandon => render_dialog(
                "Abandon this workout? Nothing will be saved.",
                "(y)es / (n)o",
                area,
                buf,
            ),
            AppState::EditNotes => render_dialog(
                &format!("Notes: {}_", self.notes_input),
                "enter save / esc cancel",
                area,
                buf,
            ),
            _ => {}
        }
    }

    fn render_summary(&self, area: Rect, buf: &mut Buffer) {
        let Some(record) = &self.record else {
            return;
        };
        let unit = self.config.weight_unit.to_string();
        let bold = Style::default().add_modifier(Modifier::BOLD);

        let (saved_line, saved_style) = match &self.save_status {
            Some(SaveStatus::Saved(id)) => (format!("Session saved (#{id})"), Style::default().fg(Color::Green)),
            Some(SaveStatus::Failed(e)) => (
                format!("Session not saved: {e}  (r to retry)"),
                Style::default().fg(Color::Red),
            ),
            None => (String::new(), Style::default()),
        };

        let mut lines = vec![
            Line::from(Span::styled(record.template_name.clone(), bold)),
            Line::from(""),
            Line::from(format!(
                "{}  {}/{} sets  {} {unit}",
                format_clock(record.elapsed_secs),
                record.completed_sets(),
                record.total_sets(),
                format_weight(Some(record.total_volume())),
            )),
            Line::from(if record.completed {
                Span::styled("completed", Style::default().fg(Color::Green))
            } else {
                Span::styled("finished early", Style::default().fg(Color::Yellow))
            }),
            Line::from(""),
        ];
        if !record.notes.is_empty() {
            lines.push(Line::from(Span::styled(
                record.notes.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            )));
            lines.push(Line::from(""));
        }
        for exercise in &record.exercises {
            let done = exercise.sets.iter().filter(|s| s.completed).collect_vec();
            let detail = done
                .iter()
                .map(|s| match (s.reps, s.duration_secs) {
                    (Some(reps), _) => format!("{reps}x{}", format_weight(s.weight)),
                    (None, Some(d)) => format_clock(d.into()),
                    (None, None) => "✓".to_string(),
                })
                .join(", ");
            lines.push(Line::from(format!(
                "{}: {}/{}  {detail}",
                exercise.name,
                done.len(),
                exercise.sets.len()
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(saved_line, saved_style)));
        lines.push(Line::from(Span::styled(
            "(esc)ape to quit",
            Style::default().add_modifier(Modifier::ITALIC),
        )));

        let height = lines.len() as u16;
        let top = area.height.saturating_sub(height) / 2;
        let rect = Rect {
            x: area.x,
            y: area.y + top,
            width: area.width,
            height: height.min(area.height),
        };
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(rect, buf);
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Summary => self.render_summary(area, buf),
            _ => self.render_workout(area, buf),
        }
    }
}
