//! Navigation engine: the single traversal cursor over a story graph.
//!
//! The engine is a synchronous state machine. Every user action that
//! changes the visible node first enters [`Phase::Transitioning`]; the
//! step is committed later by [`NavigationEngine::settle`], once the
//! presentation layer has played its exit animation. The timer that
//! drives `settle` lives in [`crate::session::StorySession`].
//!
//! Lookup failures are soft: they are logged, reported as a [`Settled`]
//! value and leave the cursor where it was. Only caller mistakes
//! (re-entrant or mismatched requests) come back as [`NavError`].

use crate::graph::{GraphStore, RESULT_NODE_ORDER};
use crate::position::PositionStore;
use crate::view::StoryView;
use storybot::{Answer, FinalVariant, GraphPayload, NodeId, Question, QuestionButton};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Caller errors from navigation requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("A transition is already in progress")]
    Busy,

    #[error("Not at a question")]
    NotAtQuestion,

    #[error("No question is current")]
    NoCurrentQuestion,

    #[error("Answer {0} does not belong to the current question")]
    UnknownAnswer(NodeId),

    #[error("The current question has no single continue answer")]
    NoContinueAnswer,

    #[error("Button {0} does not belong to the current question")]
    UnknownButton(NodeId),

    #[error("Not in the final sequence")]
    NotInFinalFlow,
}

/// A step waiting for the settle delay to elapse.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingStep {
    /// Follow this answer's edge.
    Answer(Answer),
    /// Return to the start node.
    Restart,
}

/// Where the engine currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Normal traversal; the cursor question is shown.
    AtQuestion,
    /// An accepted step waits to be committed.
    Transitioning {
        step: PendingStep,
        /// Final slide on screen, restored if the step is cancelled.
        from_final: Option<usize>,
    },
    /// Walking the sorted final variants.
    FinalFlow { index: usize },
}

/// Result of committing a step. Soft failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// The cursor moved to this question.
    Moved(NodeId),
    /// The terminal edge was taken and the first final slide is showing.
    EnteredFinalFlow,
    /// The final sequence moved to this slide index.
    FinalSlide(usize),
    /// The cursor landed on the result node.
    ReachedResult(NodeId),
    /// The cursor was reset to the start node.
    Restarted(NodeId),
    /// The answer points at a question that is not loaded.
    BrokenEdge { answer: NodeId, target: NodeId },
    /// Neither final variants nor a result node exist.
    Unreachable,
    /// Restart was requested on an empty graph.
    NoStart,
    /// Nothing was pending.
    Idle,
}

/// What activating a terminal button did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Open this external destination; the engine state is unchanged.
    OpenUrl(String),
    /// A restart transition has started.
    Restart,
}

/// Owner of the session cursor and the final-flow cursor.
pub struct NavigationEngine<P: PositionStore> {
    graph: GraphStore,
    positions: P,
    current: Option<Question>,
    current_answers: Vec<Answer>,
    phase: Phase,
}

impl<P: PositionStore> NavigationEngine<P> {
    /// Create an engine over an empty graph.
    pub fn new(positions: P) -> Self {
        Self {
            graph: GraphStore::new(),
            positions,
            current: None,
            current_answers: Vec::new(),
            phase: Phase::AtQuestion,
        }
    }

    /// Install a freshly fetched graph and place the cursor.
    ///
    /// The start node is the question matching `resume` if there is one,
    /// otherwise the lowest-ordered question. Returns the start id, or
    /// `None` when the graph has no questions.
    pub fn install(&mut self, payload: GraphPayload, resume: Option<&str>) -> Option<NodeId> {
        self.graph.load_payload(payload);
        self.phase = Phase::AtQuestion;
        self.current = None;
        self.current_answers.clear();

        let resumed = resume.and_then(|raw| self.graph.find_question_by_str(raw));
        if resumed.is_none() {
            if let Some(raw) = resume {
                debug!(position = raw, "persisted position not in graph, using start node");
            }
        }

        let Some(start) = resumed.or_else(|| self.graph.start_question()).cloned() else {
            warn!("story graph has no questions");
            return None;
        };

        info!(
            start = %start.id,
            resumed = resumed_flag(resume, &start),
            questions = self.graph.question_count(),
            answers = self.graph.answer_count(),
            finals = self.graph.final_variants_sorted().len(),
            "story graph installed"
        );

        let id = start.id.clone();
        self.move_to(start);
        Some(id)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Accept an answer of the current question and start the transition.
    pub fn select_answer(&mut self, answer_id: &NodeId) -> Result<(), NavError> {
        match self.phase {
            Phase::Transitioning { .. } => {
                debug!(answer = %answer_id, "ignoring selection during transition");
                return Err(NavError::Busy);
            }
            Phase::FinalFlow { .. } => return Err(NavError::NotAtQuestion),
            Phase::AtQuestion => {}
        }

        if self.current.is_none() {
            return Err(NavError::NoCurrentQuestion);
        }

        let answer = self
            .current_answers
            .iter()
            .find(|a| &a.id == answer_id)
            .cloned()
            .ok_or_else(|| NavError::UnknownAnswer(answer_id.clone()))?;

        debug!(answer = %answer.id, "answer selected");
        self.phase = Phase::Transitioning {
            step: PendingStep::Answer(answer),
            from_final: None,
        };
        Ok(())
    }

    /// Select the only answer of a single-answer question.
    pub fn select_continue(&mut self) -> Result<(), NavError> {
        let id = match self.current_answers.as_slice() {
            [only] => only.id.clone(),
            _ => return Err(NavError::NoContinueAnswer),
        };
        self.select_answer(&id)
    }

    /// Start a transition back to the start node.
    pub fn restart(&mut self) -> Result<(), NavError> {
        let from_final = match self.phase {
            Phase::Transitioning { .. } => return Err(NavError::Busy),
            Phase::FinalFlow { index } => Some(index),
            Phase::AtQuestion => None,
        };

        debug!("restart requested");
        self.phase = Phase::Transitioning {
            step: PendingStep::Restart,
            from_final,
        };
        Ok(())
    }

    /// Activate one of the current question's terminal buttons.
    pub fn activate_button(&mut self, button_id: &NodeId) -> Result<ButtonAction, NavError> {
        if self.is_transitioning() {
            return Err(NavError::Busy);
        }

        let button = self
            .terminal_buttons()
            .iter()
            .find(|b| &b.id == button_id)
            .ok_or_else(|| NavError::UnknownButton(button_id.clone()))?;

        if let Some(url) = button.external_url() {
            debug!(button = %button.id, url, "external button");
            return Ok(ButtonAction::OpenUrl(url.to_string()));
        }

        self.restart()?;
        Ok(ButtonAction::Restart)
    }

    /// Move to the next final slide, or leave the sequence for the result node.
    pub fn advance_final(&mut self) -> Result<Settled, NavError> {
        let index = match self.phase {
            Phase::FinalFlow { index } => index,
            Phase::Transitioning { .. } => return Err(NavError::Busy),
            Phase::AtQuestion => return Err(NavError::NotInFinalFlow),
        };

        let next = index + 1;
        if next < self.graph.final_variants_sorted().len() {
            self.phase = Phase::FinalFlow { index: next };
            return Ok(Settled::FinalSlide(next));
        }

        match self.graph.result_question().cloned() {
            Some(result) => {
                let id = result.id.clone();
                self.phase = Phase::AtQuestion;
                self.move_to(result);
                Ok(Settled::ReachedResult(id))
            }
            None => {
                warn!(
                    order = RESULT_NODE_ORDER,
                    "final sequence ended but no result node exists"
                );
                Ok(Settled::Unreachable)
            }
        }
    }

    /// Abandon a pending step and restore the state it interrupted.
    ///
    /// Returns false if nothing was pending.
    pub fn cancel_transition(&mut self) -> bool {
        match self.phase {
            Phase::Transitioning { from_final, .. } => {
                self.phase = resume_phase(from_final);
                debug!("transition cancelled");
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Commit the pending step, if any.
    pub fn settle(&mut self) -> Settled {
        let (step, from_final) = match &self.phase {
            Phase::Transitioning { step, from_final } => (step.clone(), *from_final),
            _ => return Settled::Idle,
        };

        match step {
            PendingStep::Answer(answer) => self.follow(answer),
            PendingStep::Restart => match self.graph.start_question().cloned() {
                Some(start) => {
                    let id = start.id.clone();
                    self.phase = Phase::AtQuestion;
                    self.move_to(start);
                    Settled::Restarted(id)
                }
                None => {
                    warn!("restart requested but the graph has no start node");
                    self.phase = resume_phase(from_final);
                    Settled::NoStart
                }
            },
        }
    }

    fn follow(&mut self, answer: Answer) -> Settled {
        self.phase = Phase::AtQuestion;

        let Some(target) = answer.next_question_id else {
            return self.enter_final_sequence();
        };

        match self.graph.find_question(&target).cloned() {
            Some(next) => {
                let id = next.id.clone();
                self.move_to(next);
                Settled::Moved(id)
            }
            None => {
                warn!(answer = %answer.id, target = %target, "answer points at a missing question");
                Settled::BrokenEdge {
                    answer: answer.id,
                    target,
                }
            }
        }
    }

    fn enter_final_sequence(&mut self) -> Settled {
        if !self.graph.final_variants_sorted().is_empty() {
            debug!("entering final sequence");
            self.phase = Phase::FinalFlow { index: 0 };
            return Settled::EnteredFinalFlow;
        }

        match self.graph.result_question().cloned() {
            Some(result) => {
                let id = result.id.clone();
                self.move_to(result);
                Settled::ReachedResult(id)
            }
            None => {
                warn!(
                    order = RESULT_NODE_ORDER,
                    "terminal edge taken but there are no final variants and no result node"
                );
                Settled::Unreachable
            }
        }
    }

    fn move_to(&mut self, question: Question) {
        self.current_answers = self.graph.answers_for(&question.id).cloned().collect();
        debug!(
            question = %question.id,
            answers = self.current_answers.len(),
            "cursor moved"
        );

        if let Err(e) = self.positions.save(&question.id) {
            warn!(question = %question.id, error = %e, "failed to persist position");
        }
        self.current = Some(question);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The loaded graph.
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// The position store the cursor is written through to.
    pub fn position_store(&self) -> &P {
        &self.positions
    }

    /// Current phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The cursor question.
    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    /// Id of the cursor question.
    pub fn current_question_id(&self) -> Option<&NodeId> {
        self.current.as_ref().map(|q| &q.id)
    }

    /// Answers owned by the cursor question, in source order.
    pub fn current_answers(&self) -> &[Answer] {
        &self.current_answers
    }

    /// True while a step waits to be committed.
    pub fn is_transitioning(&self) -> bool {
        matches!(self.phase, Phase::Transitioning { .. })
    }

    /// True while the final sequence is showing.
    ///
    /// Stays true while a restart begun on a slide is pending.
    pub fn is_final_flow(&self) -> bool {
        self.final_index().is_some()
    }

    /// Index of the final slide on screen.
    pub fn final_index(&self) -> Option<usize> {
        match self.phase {
            Phase::FinalFlow { index }
            | Phase::Transitioning {
                from_final: Some(index),
                ..
            } => Some(index),
            _ => None,
        }
    }

    /// The final slide currently showing.
    pub fn current_final_slide(&self) -> Option<&FinalVariant> {
        self.final_index()
            .and_then(|index| self.graph.final_variants_sorted().get(index))
    }

    /// True if another final slide follows the current one.
    pub fn final_has_next(&self) -> bool {
        self.final_index()
            .is_some_and(|index| index + 1 < self.graph.final_variants_sorted().len())
    }

    /// True if the cursor sits on a question flagged `final`.
    pub fn is_at_final_question(&self) -> bool {
        !self.is_final_flow() && self.current.as_ref().is_some_and(|q| q.is_final)
    }

    /// True if the cursor sits on the result/version-select node.
    pub fn is_version_select(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|q| q.order == Some(RESULT_NODE_ORDER))
    }

    /// Action buttons of a terminal question; empty elsewhere.
    pub fn terminal_buttons(&self) -> &[QuestionButton] {
        match &self.current {
            Some(q) if q.is_final => q.buttons.as_slice(),
            _ => &[],
        }
    }

    /// Read-only snapshot for the presentation layer.
    pub fn view(&self) -> StoryView {
        StoryView::from_engine(self)
    }
}

fn resume_phase(from_final: Option<usize>) -> Phase {
    match from_final {
        Some(index) => Phase::FinalFlow { index },
        None => Phase::AtQuestion,
    }
}

fn resumed_flag(resume: Option<&str>, start: &Question) -> bool {
    resume.is_some_and(|raw| start.id.matches_str(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::MemoryPositionStore;
    use crate::testing::GraphBuilder;

    fn engine(payload: GraphPayload) -> NavigationEngine<MemoryPositionStore> {
        let mut engine = NavigationEngine::new(MemoryPositionStore::new());
        engine.install(payload, None);
        engine
    }

    fn two_step_graph() -> GraphPayload {
        GraphBuilder::new()
            .question(1, Some(1))
            .question(2, Some(2))
            .answer(10, 1, Some(2))
            .answer(11, 1, Some(2))
            .answer(20, 2, None)
            .build()
    }

    #[test]
    fn test_install_picks_lowest_order() {
        let engine = engine(two_step_graph());
        assert_eq!(engine.current_question_id(), Some(&NodeId::Number(1)));
        assert_eq!(engine.current_answers().len(), 2);
        assert_eq!(engine.position_store().load().as_deref(), Some("1"));
    }

    #[test]
    fn test_install_empty_graph() {
        let mut engine = NavigationEngine::new(MemoryPositionStore::new());
        assert_eq!(engine.install(GraphPayload::default(), None), None);
        assert!(engine.current_question().is_none());
        assert_eq!(engine.select_answer(&NodeId::Number(1)), Err(NavError::NoCurrentQuestion));
        assert_eq!(engine.position_store().load(), None);
    }

    #[test]
    fn test_select_enters_transitioning() {
        let mut engine = engine(two_step_graph());
        engine.select_answer(&NodeId::Number(10)).unwrap();
        assert!(engine.is_transitioning());
        assert_eq!(engine.current_question_id(), Some(&NodeId::Number(1)));
    }

    #[test]
    fn test_reentrant_selection_is_rejected() {
        let mut engine = engine(two_step_graph());
        engine.select_answer(&NodeId::Number(10)).unwrap();
        assert_eq!(engine.select_answer(&NodeId::Number(11)), Err(NavError::Busy));
        assert_eq!(engine.restart(), Err(NavError::Busy));

        assert_eq!(engine.settle(), Settled::Moved(NodeId::Number(2)));
        assert_eq!(engine.settle(), Settled::Idle);
    }

    #[test]
    fn test_foreign_answer_is_rejected() {
        let mut engine = engine(two_step_graph());
        assert_eq!(
            engine.select_answer(&NodeId::Number(20)),
            Err(NavError::UnknownAnswer(NodeId::Number(20)))
        );
        assert!(!engine.is_transitioning());
    }

    #[test]
    fn test_select_continue_needs_single_answer() {
        let mut engine = engine(two_step_graph());
        assert_eq!(engine.select_continue(), Err(NavError::NoContinueAnswer));

        engine.select_answer(&NodeId::Number(10)).unwrap();
        engine.settle();
        engine.select_continue().unwrap();
        assert!(engine.is_transitioning());
    }

    #[test]
    fn test_cancel_restores_state() {
        let mut engine = engine(two_step_graph());
        assert!(!engine.cancel_transition());

        engine.select_answer(&NodeId::Number(10)).unwrap();
        assert!(engine.cancel_transition());
        assert_eq!(engine.phase(), &Phase::AtQuestion);
        assert_eq!(engine.settle(), Settled::Idle);
        assert_eq!(engine.current_question_id(), Some(&NodeId::Number(1)));
    }

    #[test]
    fn test_terminal_edge_without_finals_or_result_stalls() {
        let payload = GraphBuilder::new()
            .question(1, Some(1))
            .answer(10, 1, None)
            .build();
        let mut engine = engine(payload);

        engine.select_answer(&NodeId::Number(10)).unwrap();
        assert_eq!(engine.settle(), Settled::Unreachable);
        assert_eq!(engine.phase(), &Phase::AtQuestion);
        assert_eq!(engine.current_question_id(), Some(&NodeId::Number(1)));
    }

    #[test]
    fn test_terminal_edge_without_finals_jumps_to_result() {
        let payload = GraphBuilder::new()
            .question(1, Some(1))
            .question(99, Some(RESULT_NODE_ORDER))
            .answer(10, 1, None)
            .answer(990, 99, Some(1))
            .build();
        let mut engine = engine(payload);

        engine.select_answer(&NodeId::Number(10)).unwrap();
        assert_eq!(engine.settle(), Settled::ReachedResult(NodeId::Number(99)));
        assert!(engine.is_version_select());
        assert_eq!(engine.current_answers().len(), 1);
    }

    #[test]
    fn test_advance_final_requires_final_flow() {
        let mut engine = engine(two_step_graph());
        assert_eq!(engine.advance_final(), Err(NavError::NotInFinalFlow));
    }

    #[test]
    fn test_final_flow_without_result_stalls_on_last_slide() {
        let payload = GraphBuilder::new()
            .question(1, Some(1))
            .answer(10, 1, None)
            .final_variant(100, Some(1), "only")
            .build();
        let mut engine = engine(payload);

        engine.select_answer(&NodeId::Number(10)).unwrap();
        assert_eq!(engine.settle(), Settled::EnteredFinalFlow);
        assert!(!engine.final_has_next());
        assert_eq!(engine.advance_final(), Ok(Settled::Unreachable));
        assert_eq!(engine.final_index(), Some(0));
        assert_eq!(engine.current_question_id(), Some(&NodeId::Number(1)));
    }

    #[test]
    fn test_restart_from_final_flow_cancelled_resumes_slide() {
        let payload = GraphBuilder::new()
            .question(1, Some(1))
            .answer(10, 1, None)
            .final_variant(100, Some(1), "A")
            .final_variant(101, Some(2), "B")
            .build();
        let mut engine = engine(payload);

        engine.select_answer(&NodeId::Number(10)).unwrap();
        engine.settle();
        engine.advance_final().unwrap();
        engine.restart().unwrap();
        assert!(engine.is_transitioning());
        assert_eq!(engine.final_index(), Some(1));
        assert_eq!(engine.view().text(), "B");
        engine.cancel_transition();
        assert_eq!(engine.final_index(), Some(1));
        assert!(!engine.is_transitioning());

        engine.restart().unwrap();
        assert_eq!(engine.settle(), Settled::Restarted(NodeId::Number(1)));
        assert!(!engine.is_final_flow());
    }

    #[test]
    fn test_terminal_buttons() {
        let payload = GraphBuilder::new()
            .question(1, Some(1))
            .final_question(50, Some(20))
            .button(50, 1, "Again", None)
            .button(50, 2, "Site", Some("https://example.test"))
            .answer(10, 1, Some(50))
            .build();
        let mut engine = engine(payload);

        assert!(engine.terminal_buttons().is_empty());
        engine.select_answer(&NodeId::Number(10)).unwrap();
        engine.settle();
        assert!(engine.is_at_final_question());
        assert_eq!(engine.terminal_buttons().len(), 2);

        assert_eq!(
            engine.activate_button(&NodeId::Number(2)),
            Ok(ButtonAction::OpenUrl("https://example.test".into()))
        );
        assert!(!engine.is_transitioning());

        assert_eq!(
            engine.activate_button(&NodeId::Number(7)),
            Err(NavError::UnknownButton(NodeId::Number(7)))
        );

        assert_eq!(engine.activate_button(&NodeId::Number(1)), Ok(ButtonAction::Restart));
        assert_eq!(engine.settle(), Settled::Restarted(NodeId::Number(1)));
    }

    #[test]
    fn test_restart_on_empty_graph() {
        let mut engine = NavigationEngine::new(MemoryPositionStore::new());
        engine.restart().unwrap();
        assert_eq!(engine.settle(), Settled::NoStart);
        assert!(!engine.is_transitioning());
    }
}
