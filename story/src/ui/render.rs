//! Render orchestration for the story TUI

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use story_core::{Affordance, StoryView};

use crate::app::App;
use crate::ui::widgets::{BlinkWidget, ChoicesWidget, StoryTextWidget};

/// Overlay types
#[derive(Debug, Clone)]
pub enum Overlay {
    Help,
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let view = app.view();
    let choices = app.choices();

    let choices_height = (choices.len().max(1) as u16 + 2).min(area.height / 2);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(choices_height),
            Constraint::Length(1),
        ])
        .split(area);

    render_title_bar(frame, &view, chunks[0]);

    let audio = app.audio_url();
    let picture = app.picture_url();
    let story = StoryTextWidget::new(view.text(), &app.theme)
        .title(story_title(&view))
        .audio(audio.as_deref())
        .picture(picture.as_deref())
        .final_slide(view.is_final_flow)
        .scroll(app.text_scroll);
    frame.render_widget(story, chunks[1]);

    if view.is_transitioning {
        frame.render_widget(BlinkWidget::new(app.blink_frame, &app.theme), chunks[1]);
    }

    let list = ChoicesWidget::new(&choices, &app.theme)
        .selected(app.selected)
        .enabled(view.accepts_input())
        .title(choices_title(&view));
    frame.render_widget(list, chunks[2]);

    render_status_bar(frame, app, &view, chunks[3]);

    if let Some(overlay) = app.overlay() {
        render_overlay(frame, overlay, area);
    }
}

fn story_title(view: &StoryView) -> String {
    match view.final_index {
        Some(index) if view.is_final_flow => format!(" Finale {} ", index + 1),
        _ => " Story ".to_string(),
    }
}

fn choices_title(view: &StoryView) -> &'static str {
    match view.affordance() {
        Affordance::VersionPicker => " Choose a version ",
        Affordance::TerminalButtons => " The end ",
        Affordance::FinalFlow { .. } | Affordance::Continue => " Next ",
        Affordance::Choices | Affordance::Empty => " Choose ",
    }
}

/// Render the title bar
fn render_title_bar(frame: &mut Frame, view: &StoryView, area: Rect) {
    let position = match (&view.current_question, view.final_index) {
        (_, Some(index)) => format!("final slide {}", index + 1),
        (Some(q), None) => format!("question {}", q.id),
        (None, None) => "no story loaded".to_string(),
    };

    let line = Line::from(Span::styled(
        format!(" Story | {position} "),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, view: &StoryView, area: Rect) {
    let text = match app.status_message() {
        Some(message) => message.to_string(),
        None if view.is_transitioning => "...".to_string(),
        None => "1-9/Enter choose  j/k move  ? help  q quit".to_string(),
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(text, app.theme.system_style()))),
        area,
    );
}

fn render_overlay(frame: &mut Frame, overlay: &Overlay, area: Rect) {
    match overlay {
        Overlay::Help => {
            let popup = centered_rect(50, 12, area);
            frame.render_widget(Clear, popup);

            let lines = vec![
                Line::from("1-9         choose directly"),
                Line::from("j/k, ↑/↓    move selection"),
                Line::from("Enter/Space activate selection"),
                Line::from("PgUp/PgDn   scroll story text"),
                Line::from("?           toggle this help"),
                Line::from("q, Ctrl-C   quit"),
            ];
            let block = Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan));
            frame.render_widget(
                Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
                popup,
            );
        }
    }
}

/// A rectangle of at most `width` x `height`, centered in `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
