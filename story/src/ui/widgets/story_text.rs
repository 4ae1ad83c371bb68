//! Story body widget: text plus media references

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols::scrollbar,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
        StatefulWidget, Widget, Wrap,
    },
};

use crate::ui::theme::StoryTheme;

/// Widget for the current question or final slide
pub struct StoryTextWidget<'a> {
    title: String,
    text: &'a str,
    audio: Option<&'a str>,
    picture: Option<&'a str>,
    is_final_slide: bool,
    scroll: usize,
    theme: &'a StoryTheme,
}

impl<'a> StoryTextWidget<'a> {
    pub fn new(text: &'a str, theme: &'a StoryTheme) -> Self {
        Self {
            title: " Story ".to_string(),
            text,
            audio: None,
            picture: None,
            is_final_slide: false,
            scroll: 0,
            theme,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn audio(mut self, url: Option<&'a str>) -> Self {
        self.audio = url;
        self
    }

    pub fn picture(mut self, url: Option<&'a str>) -> Self {
        self.picture = url;
        self
    }

    pub fn final_slide(mut self, is_final_slide: bool) -> Self {
        self.is_final_slide = is_final_slide;
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for StoryTextWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title.as_str())
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.is_final_slide));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line> = Vec::new();

        if let Some(picture) = self.picture {
            lines.push(Line::from(vec![
                Span::styled("[image] ", self.theme.system_style()),
                Span::styled(picture.to_string(), self.theme.media_style()),
            ]));
        }
        if let Some(audio) = self.audio {
            lines.push(Line::from(vec![
                Span::styled("[audio] ", self.theme.system_style()),
                Span::styled(audio.to_string(), self.theme.media_style()),
            ]));
        }
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }

        let style = self.theme.text_style(self.is_final_slide);
        for line in self.text.lines() {
            lines.push(Line::from(Span::styled(line.to_string(), style)));
        }

        let visible_height = inner.height as usize;
        let total_lines = lines.len();
        let max_scroll = total_lines.saturating_sub(visible_height);
        let scroll = self.scroll.min(max_scroll);

        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .render(inner, buf);

        if total_lines > visible_height {
            let scrollbar_area = Rect {
                x: inner.x + inner.width.saturating_sub(1),
                y: inner.y,
                width: 1,
                height: inner.height,
            };

            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .thumb_style(Style::default().fg(Color::DarkGray))
                .track_style(Style::default().fg(Color::Black))
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"));

            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(scroll);
            scrollbar.render(scrollbar_area, buf, &mut scrollbar_state);
        }
    }
}
