//! Main application state and logic

use story_core::{
    Affordance, ButtonAction, NavError, PositionStore, Settled, StorySession, StoryView,
};
use storybot::{resolve_media, NodeId};

use crate::ui::theme::StoryTheme;
use crate::ui::Overlay;

/// The story session type the front-end drives.
pub type Session = StorySession<Box<dyn PositionStore>>;

/// What activating a choice does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceAction {
    Answer(NodeId),
    Continue,
    Button(NodeId),
    AdvanceFinal,
}

/// One selectable row of the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceItem {
    pub label: String,
    /// Logo or link shown next to the label.
    pub detail: Option<String>,
    pub action: ChoiceAction,
}

/// Result of performing a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A step was accepted and waits for the settle delay.
    Pending,
    /// The final sequence moved on.
    Settled(Settled),
    /// An external destination to show the user.
    OpenUrl(String),
}

/// Build the selectable rows for a snapshot.
pub fn choices(view: &StoryView, base_url: &str) -> Vec<ChoiceItem> {
    match view.affordance() {
        Affordance::Empty => Vec::new(),
        Affordance::FinalFlow { .. } => vec![ChoiceItem {
            label: view.final_button_label().to_string(),
            detail: None,
            action: ChoiceAction::AdvanceFinal,
        }],
        Affordance::VersionPicker => view
            .current_answers
            .iter()
            .map(|answer| ChoiceItem {
                label: answer.text.clone(),
                detail: resolve_media(base_url, answer.logo.as_deref()),
                action: ChoiceAction::Answer(answer.id.clone()),
            })
            .collect(),
        Affordance::TerminalButtons => view
            .terminal_buttons
            .iter()
            .map(|button| ChoiceItem {
                label: button.text.clone(),
                detail: button.external_url().map(str::to_string),
                action: ChoiceAction::Button(button.id.clone()),
            })
            .collect(),
        Affordance::Continue => vec![ChoiceItem {
            label: view
                .continue_answer
                .as_ref()
                .map(|a| a.text.clone())
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Continue".to_string()),
            detail: None,
            action: ChoiceAction::Continue,
        }],
        Affordance::Choices => view
            .current_answers
            .iter()
            .map(|answer| ChoiceItem {
                label: answer.text.clone(),
                detail: None,
                action: ChoiceAction::Answer(answer.id.clone()),
            })
            .collect(),
    }
}

/// Hand a choice to the session.
pub fn perform(session: &mut Session, action: &ChoiceAction) -> Result<Outcome, NavError> {
    match action {
        ChoiceAction::Answer(id) => session.select_answer(id).map(|()| Outcome::Pending),
        ChoiceAction::Continue => session.select_continue().map(|()| Outcome::Pending),
        ChoiceAction::Button(id) => match session.activate_button(id)? {
            ButtonAction::OpenUrl(url) => Ok(Outcome::OpenUrl(url)),
            ButtonAction::Restart => Ok(Outcome::Pending),
        },
        ChoiceAction::AdvanceFinal => session.advance_final().map(Outcome::Settled),
    }
}

/// Main application state
pub struct App {
    pub session: Session,
    pub base_url: String,
    pub theme: StoryTheme,
    overlay: Option<Overlay>,

    /// Highlighted row in the choice list.
    pub selected: usize,
    pub text_scroll: usize,

    status_message: Option<String>,
    pub should_quit: bool,

    /// Frames since the current transition started.
    pub blink_frame: u8,
    pub animation_frame: u8,
}

impl App {
    pub fn new(session: Session, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into(),
            theme: StoryTheme::default(),
            overlay: None,
            selected: 0,
            text_scroll: 0,
            status_message: None,
            should_quit: false,
            blink_frame: 0,
            animation_frame: 0,
        }
    }

    pub fn view(&self) -> StoryView {
        self.session.view()
    }

    pub fn choices(&self) -> Vec<ChoiceItem> {
        choices(&self.view(), &self.base_url)
    }

    pub fn select_next(&mut self) {
        let count = self.choices().len();
        if count > 0 {
            self.selected = (self.selected + 1) % count;
        }
    }

    pub fn select_prev(&mut self) {
        let count = self.choices().len();
        if count > 0 {
            self.selected = (self.selected + count - 1) % count;
        }
    }

    /// Activate the highlighted row.
    pub fn activate_selected(&mut self) {
        self.activate(self.selected);
    }

    /// Activate a row by index. Ignored while a transition is running.
    pub fn activate(&mut self, index: usize) {
        if self.session.is_transitioning() {
            return;
        }
        let Some(choice) = self.choices().into_iter().nth(index) else {
            return;
        };

        self.selected = index;
        match perform(&mut self.session, &choice.action) {
            Ok(Outcome::Pending) => {
                self.blink_frame = 0;
                self.clear_status();
            }
            Ok(Outcome::Settled(settled)) => self.after_settle(&settled),
            Ok(Outcome::OpenUrl(url)) => self.set_status(format!("Open: {url}")),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    /// Tick for animations and the settle timer
    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);

        if self.session.is_transitioning() {
            self.blink_frame = self.blink_frame.saturating_add(1);
        }
        if let Some(settled) = self.session.tick() {
            self.after_settle(&settled);
        }
    }

    fn after_settle(&mut self, settled: &Settled) {
        self.selected = 0;
        self.text_scroll = 0;
        self.blink_frame = 0;

        match settled {
            Settled::BrokenEdge { .. } | Settled::Unreachable | Settled::NoStart => {
                self.set_status("This path is not available yet");
            }
            _ => self.clear_status(),
        }
    }

    /// Resolved audio link of whatever is showing.
    pub fn audio_url(&self) -> Option<String> {
        resolve_media(&self.base_url, self.view().audio())
    }

    /// Resolved picture link of whatever is showing.
    pub fn picture_url(&self) -> Option<String> {
        resolve_media(&self.base_url, self.view().picture())
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.text_scroll = self.text_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.text_scroll = self.text_scroll.saturating_add(lines);
    }

    pub fn toggle_help(&mut self) {
        if matches!(self.overlay, Some(Overlay::Help)) {
            self.overlay = None;
        } else {
            self.overlay = Some(Overlay::Help);
        }
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Set status message (always overwrites)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
