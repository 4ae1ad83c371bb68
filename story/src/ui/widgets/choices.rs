//! Choice list widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::app::ChoiceItem;
use crate::ui::theme::StoryTheme;

/// Numbered list of what the user can do next
pub struct ChoicesWidget<'a> {
    items: &'a [ChoiceItem],
    selected: usize,
    enabled: bool,
    title: &'a str,
    theme: &'a StoryTheme,
}

impl<'a> ChoicesWidget<'a> {
    pub fn new(items: &'a [ChoiceItem], theme: &'a StoryTheme) -> Self {
        Self {
            items,
            selected: 0,
            enabled: true,
            title: " Choose ",
            theme,
        }
    }

    pub fn selected(mut self, selected: usize) -> Self {
        self.selected = selected;
        self
    }

    /// Disabled lists are dimmed; input is dropped anyway.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = title;
        self
    }
}

impl Widget for ChoicesWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.enabled));

        let inner = block.inner(area);
        block.render(area, buf);

        if self.items.is_empty() {
            let line = Line::from(Span::styled("Nothing to choose", self.theme.system_style()));
            Paragraph::new(line).render(inner, buf);
            return;
        }

        let lines: Vec<Line> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let is_selected = i == self.selected;
                let marker = if is_selected { "▶ " } else { "  " };
                let style = self.theme.choice_style(is_selected, self.enabled);

                let mut spans = vec![Span::styled(
                    format!("{marker}{}. {}", i + 1, item.label),
                    style,
                )];
                if let Some(detail) = &item.detail {
                    spans.push(Span::styled(format!("  {detail}"), self.theme.link_style()));
                }
                Line::from(spans)
            })
            .collect();

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
