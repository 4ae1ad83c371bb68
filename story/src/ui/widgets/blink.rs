//! Eyelid "blink" drawn over the story while a step settles

use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use crate::ui::theme::StoryTheme;

/// Two lids closing from the top and bottom edges of the area.
pub struct BlinkWidget<'a> {
    frame: u8,
    /// Frames until the lids meet.
    frames_to_close: u8,
    theme: &'a StoryTheme,
}

impl<'a> BlinkWidget<'a> {
    pub fn new(frame: u8, theme: &'a StoryTheme) -> Self {
        Self {
            frame,
            frames_to_close: 7,
            theme,
        }
    }

    /// Rows covered by each lid.
    fn lid_height(&self, height: u16) -> u16 {
        let half = height.div_ceil(2);
        let progress = self.frame.min(self.frames_to_close) as u32;
        (half as u32 * progress / self.frames_to_close as u32) as u16
    }
}

impl Widget for BlinkWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lid = self.lid_height(area.height);
        if lid == 0 {
            return;
        }

        let style = self.theme.eyelid_style();
        for row in 0..lid {
            let top = area.y + row;
            let bottom = area.y + area.height - 1 - row;
            for x in area.x..area.x + area.width {
                buf[(x, top)].set_char(' ').set_style(style);
                buf[(x, bottom)].set_char(' ').set_style(style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lids_close_over_time() {
        let theme = StoryTheme::default();
        assert_eq!(BlinkWidget::new(0, &theme).lid_height(10), 0);
        assert_eq!(BlinkWidget::new(7, &theme).lid_height(10), 5);
        assert_eq!(BlinkWidget::new(200, &theme).lid_height(10), 5);
        assert!(BlinkWidget::new(3, &theme).lid_height(10) < 5);
    }
}
