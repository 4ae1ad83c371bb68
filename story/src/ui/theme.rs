//! Color theme and styling for the story TUI

use ratatui::style::{Color, Modifier, Style};

/// Story UI color theme
#[derive(Debug, Clone)]
pub struct StoryTheme {
    pub border: Color,
    pub border_active: Color,

    pub story_text: Color,
    pub final_text: Color,
    pub media_text: Color,
    pub system_text: Color,

    pub choice: Color,
    pub choice_selected: Color,
    pub link: Color,

    pub eyelid: Color,
}

impl Default for StoryTheme {
    fn default() -> Self {
        Self {
            border: Color::DarkGray,
            border_active: Color::Cyan,

            story_text: Color::White,
            final_text: Color::LightYellow,
            media_text: Color::LightBlue,
            system_text: Color::DarkGray,

            choice: Color::Gray,
            choice_selected: Color::Yellow,
            link: Color::LightBlue,

            eyelid: Color::Black,
        }
    }
}

impl StoryTheme {
    /// Style for the body text; final slides stand out.
    pub fn text_style(&self, is_final_slide: bool) -> Style {
        if is_final_slide {
            Style::default()
                .fg(self.final_text)
                .add_modifier(Modifier::ITALIC)
        } else {
            Style::default().fg(self.story_text)
        }
    }

    pub fn media_style(&self) -> Style {
        Style::default()
            .fg(self.media_text)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn system_style(&self) -> Style {
        Style::default()
            .fg(self.system_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn choice_style(&self, selected: bool, enabled: bool) -> Style {
        let style = if selected {
            Style::default()
                .fg(self.choice_selected)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.choice)
        };

        if enabled {
            style
        } else {
            style.add_modifier(Modifier::DIM)
        }
    }

    pub fn link_style(&self) -> Style {
        Style::default().fg(self.link)
    }

    pub fn border_style(&self, active: bool) -> Style {
        Style::default().fg(if active {
            self.border_active
        } else {
            self.border
        })
    }

    pub fn eyelid_style(&self) -> Style {
        Style::default().bg(self.eyelid).fg(self.eyelid)
    }
}
