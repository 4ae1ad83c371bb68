//! TUI widgets for the story player

pub mod blink;
pub mod choices;
pub mod story_text;

pub use blink::BlinkWidget;
pub use choices::ChoicesWidget;
pub use story_text::StoryTextWidget;
