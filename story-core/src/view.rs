//! Read-only presentation snapshot.

use crate::navigation::NavigationEngine;
use crate::position::PositionStore;
use storybot::{Answer, FinalVariant, Question, QuestionButton};

/// Label of the final-flow button while more slides follow.
pub const FINAL_NEXT_LABEL: &str = "Continue";

/// Label of the final-flow button on the last slide.
pub const FINAL_DONE_LABEL: &str = "To versions";

/// The primary interaction a consumer should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// Nothing is loaded yet, or the graph is empty.
    Empty,
    /// A final slide with a single advance button.
    FinalFlow { has_next: bool },
    /// The result node: answers rendered as a grid of logo buttons.
    VersionPicker,
    /// A terminal question's action buttons.
    TerminalButtons,
    /// A single answer bound to one "continue" button.
    Continue,
    /// The generic choice list.
    Choices,
}

/// Snapshot of everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryView {
    pub current_question: Option<Question>,
    pub current_answers: Vec<Answer>,
    pub is_transitioning: bool,
    pub is_final_flow: bool,
    pub current_final_slide: Option<FinalVariant>,
    pub final_index: Option<usize>,
    pub final_has_next: bool,
    pub is_at_final_question: bool,
    pub is_version_select: bool,
    pub terminal_buttons: Vec<QuestionButton>,
    pub continue_answer: Option<Answer>,
}

impl StoryView {
    /// Project the engine's current state.
    pub fn from_engine<P: PositionStore>(engine: &NavigationEngine<P>) -> Self {
        let current_answers = engine.current_answers().to_vec();
        let continue_answer = match current_answers.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };

        Self {
            current_question: engine.current_question().cloned(),
            current_answers,
            is_transitioning: engine.is_transitioning(),
            is_final_flow: engine.is_final_flow(),
            current_final_slide: engine.current_final_slide().cloned(),
            final_index: engine.final_index(),
            final_has_next: engine.final_has_next(),
            is_at_final_question: engine.is_at_final_question(),
            is_version_select: engine.is_version_select(),
            terminal_buttons: engine.terminal_buttons().to_vec(),
            continue_answer,
        }
    }

    pub fn affordance(&self) -> Affordance {
        if self.is_final_flow {
            return Affordance::FinalFlow {
                has_next: self.final_has_next,
            };
        }
        if self.current_question.is_none() {
            return Affordance::Empty;
        }
        if self.is_version_select {
            Affordance::VersionPicker
        } else if self.is_at_final_question && !self.terminal_buttons.is_empty() {
            Affordance::TerminalButtons
        } else if self.continue_answer.is_some() {
            Affordance::Continue
        } else {
            Affordance::Choices
        }
    }

    /// Body text: the final slide while in the final sequence, else the question.
    pub fn text(&self) -> &str {
        match (&self.current_final_slide, &self.current_question) {
            (Some(slide), _) if self.is_final_flow => &slide.text,
            (_, Some(question)) => &question.text,
            _ => "",
        }
    }

    /// Raw audio reference of whatever is showing.
    pub fn audio(&self) -> Option<&str> {
        if self.is_final_flow {
            return self.current_final_slide.as_ref()?.audio.as_deref();
        }
        self.current_question.as_ref()?.audio.as_deref()
    }

    /// Raw picture reference of whatever is showing.
    ///
    /// The version picker shows answer logos instead of a picture.
    pub fn picture(&self) -> Option<&str> {
        if self.is_final_flow {
            return self.current_final_slide.as_ref()?.picture.as_deref();
        }
        if self.is_version_select {
            return None;
        }
        self.current_question.as_ref()?.picture.as_deref()
    }

    /// Label for the single final-flow button.
    pub fn final_button_label(&self) -> &'static str {
        if self.final_has_next {
            FINAL_NEXT_LABEL
        } else {
            FINAL_DONE_LABEL
        }
    }

    /// True if input should be accepted.
    pub fn accepts_input(&self) -> bool {
        !self.is_transitioning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RESULT_NODE_ORDER;
    use crate::position::MemoryPositionStore;
    use crate::testing::GraphBuilder;
    use storybot::NodeId;

    fn engine_for(builder: GraphBuilder) -> NavigationEngine<MemoryPositionStore> {
        let mut engine = NavigationEngine::new(MemoryPositionStore::new());
        engine.install(builder.build(), None);
        engine
    }

    #[test]
    fn test_empty_view() {
        let engine = NavigationEngine::new(MemoryPositionStore::new());
        let view = engine.view();
        assert_eq!(view.affordance(), Affordance::Empty);
        assert_eq!(view.text(), "");
        assert!(view.accepts_input());
    }

    #[test]
    fn test_choices_and_continue() {
        let engine = engine_for(
            GraphBuilder::new()
                .question_with_text(1, Some(1), "Pick")
                .question(2, Some(2))
                .answer(10, 1, Some(2))
                .answer(11, 1, Some(2))
                .answer(20, 2, None),
        );
        let view = engine.view();
        assert_eq!(view.affordance(), Affordance::Choices);
        assert_eq!(view.text(), "Pick");
        assert!(view.continue_answer.is_none());

        let mut engine = engine;
        engine.select_answer(&NodeId::Number(10)).unwrap();
        assert!(!engine.view().accepts_input());
        engine.settle();

        let view = engine.view();
        assert_eq!(view.affordance(), Affordance::Continue);
        assert_eq!(view.continue_answer.map(|a| a.id), Some(NodeId::Number(20)));
    }

    #[test]
    fn test_version_picker_hides_picture() {
        let mut engine = engine_for(
            GraphBuilder::new()
                .question(1, Some(1))
                .question(99, Some(RESULT_NODE_ORDER))
                .picture(99, "/img/versions.png")
                .answer(10, 1, Some(99))
                .answer(990, 99, Some(1)),
        );

        engine.select_answer(&NodeId::Number(10)).unwrap();
        engine.settle();

        let view = engine.view();
        assert!(view.is_version_select);
        assert_eq!(view.affordance(), Affordance::VersionPicker);
        assert_eq!(view.picture(), None);
    }

    #[test]
    fn test_final_flow_labels() {
        let mut engine = engine_for(
            GraphBuilder::new()
                .question(1, Some(1))
                .answer(10, 1, None)
                .final_variant(100, Some(1), "A")
                .final_variant(101, Some(2), "B"),
        );
        engine.select_answer(&NodeId::Number(10)).unwrap();
        engine.settle();

        let view = engine.view();
        assert_eq!(view.affordance(), Affordance::FinalFlow { has_next: true });
        assert_eq!(view.text(), "A");
        assert_eq!(view.final_button_label(), FINAL_NEXT_LABEL);

        engine.advance_final().unwrap();
        let view = engine.view();
        assert_eq!(view.text(), "B");
        assert_eq!(view.final_index, Some(1));
        assert_eq!(view.final_button_label(), FINAL_DONE_LABEL);
    }

    #[test]
    fn test_terminal_buttons_affordance() {
        let engine = engine_for(
            GraphBuilder::new()
                .final_question(50, Some(1))
                .button(50, 1, "Again", None),
        );
        let view = engine.view();
        assert!(view.is_at_final_question);
        assert_eq!(view.affordance(), Affordance::TerminalButtons);
        assert_eq!(view.terminal_buttons.len(), 1);
    }
}
