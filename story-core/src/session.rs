//! StorySession - the timed driver around the navigation engine.
//!
//! Every accepted request puts the engine into its transitioning phase and
//! records a settle deadline. The owner commits the step either by polling
//! [`StorySession::tick`] from its event loop or by awaiting
//! [`StorySession::wait_settled`]. Cancelling clears the deadline; nothing
//! runs in the background, so requests need no runtime and a dropped session
//! leaves nothing behind.

use crate::identity::UserId;
use crate::loader::{GraphSource, LoadError, Loader};
use crate::navigation::{ButtonAction, NavError, NavigationEngine, Settled};
use crate::position::PositionStore;
use crate::view::StoryView;
use std::time::Duration;
use storybot::NodeId;
use tokio::time::Instant;
use tracing::debug;

/// Exit-animation length before a step is committed.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(700);

/// A navigation engine plus at most one pending settle deadline.
pub struct StorySession<P: PositionStore> {
    engine: NavigationEngine<P>,
    settle_delay: Duration,
    /// `None` while transitioning means the step is due at once.
    deadline: Option<Instant>,
}

impl<P: PositionStore> StorySession<P> {
    /// Create a session over an empty graph.
    pub fn new(positions: P, settle_delay: Duration) -> Self {
        Self::with_engine(NavigationEngine::new(positions), settle_delay)
    }

    /// Wrap an existing engine.
    pub fn with_engine(engine: NavigationEngine<P>, settle_delay: Duration) -> Self {
        Self {
            engine,
            settle_delay,
            deadline: None,
        }
    }

    /// Load the graph through `loader` and place the cursor.
    pub async fn bootstrap<S: GraphSource>(
        &mut self,
        loader: &mut Loader<S>,
        user_id: Option<&UserId>,
    ) -> Result<Option<NodeId>, LoadError> {
        self.deadline = None;
        loader.bootstrap(user_id, &mut self.engine).await
    }

    pub fn engine(&self) -> &NavigationEngine<P> {
        &self.engine
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Presentation snapshot.
    pub fn view(&self) -> StoryView {
        self.engine.view()
    }

    pub fn is_transitioning(&self) -> bool {
        self.engine.is_transitioning()
    }

    /// When the pending step becomes due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.is_transitioning()
            .then(|| self.deadline.unwrap_or_else(Instant::now))
    }

    // ========================================================================
    // Requests
    // ========================================================================

    pub fn select_answer(&mut self, answer_id: &NodeId) -> Result<(), NavError> {
        self.engine.select_answer(answer_id)?;
        self.arm();
        Ok(())
    }

    /// Take the current question's single answer.
    pub fn select_continue(&mut self) -> Result<(), NavError> {
        self.engine.select_continue()?;
        self.arm();
        Ok(())
    }

    pub fn restart(&mut self) -> Result<(), NavError> {
        self.engine.restart()?;
        self.arm();
        Ok(())
    }

    pub fn activate_button(&mut self, button_id: &NodeId) -> Result<ButtonAction, NavError> {
        let action = self.engine.activate_button(button_id)?;
        if action == ButtonAction::Restart {
            self.arm();
        }
        Ok(action)
    }

    /// Final-sequence steps commit immediately.
    pub fn advance_final(&mut self) -> Result<Settled, NavError> {
        self.engine.advance_final()
    }

    /// Abort the pending step and restore the state it interrupted.
    pub fn cancel(&mut self) -> bool {
        self.deadline = None;
        self.engine.cancel_transition()
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Commit the pending step if its deadline has passed. Never blocks.
    pub fn tick(&mut self) -> Option<Settled> {
        let due = self.deadline().is_some_and(|at| Instant::now() >= at);
        due.then(|| self.commit())
    }

    /// Wait out the settle delay and commit. `Idle` if nothing is pending.
    pub async fn wait_settled(&mut self) -> Settled {
        let Some(deadline) = self.deadline() else {
            return Settled::Idle;
        };
        tokio::time::sleep_until(deadline).await;
        self.commit()
    }

    fn commit(&mut self) -> Settled {
        self.deadline = None;
        let settled = self.engine.settle();
        debug!(?settled, "step committed");
        settled
    }

    fn arm(&mut self) {
        self.deadline = (!self.settle_delay.is_zero()).then(|| Instant::now() + self.settle_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::MemoryPositionStore;
    use crate::testing::GraphBuilder;

    fn session(delay: Duration) -> StorySession<MemoryPositionStore> {
        let mut engine = NavigationEngine::new(MemoryPositionStore::new());
        engine.install(
            GraphBuilder::new()
                .question(1, Some(1))
                .question(2, Some(2))
                .answer(10, 1, Some(2))
                .answer(20, 2, Some(1))
                .build(),
            None,
        );
        StorySession::with_engine(engine, delay)
    }

    #[tokio::test]
    async fn test_zero_delay_commits_on_tick() {
        let mut session = session(Duration::ZERO);
        assert_eq!(session.tick(), None);

        session.select_continue().unwrap();
        assert!(session.is_transitioning());
        assert_eq!(session.tick(), Some(Settled::Moved(NodeId::Number(2))));
        assert_eq!(session.tick(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_settled_takes_the_delay() {
        let mut session = session(DEFAULT_SETTLE_DELAY);
        let started = Instant::now();

        session.select_answer(&NodeId::Number(10)).unwrap();
        assert_eq!(session.select_continue(), Err(NavError::Busy));
        assert_eq!(session.wait_settled().await, Settled::Moved(NodeId::Number(2)));
        assert!(started.elapsed() >= DEFAULT_SETTLE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_settled_idle() {
        let mut session = session(DEFAULT_SETTLE_DELAY);
        assert_eq!(session.wait_settled().await, Settled::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_cursor() {
        let mut session = session(DEFAULT_SETTLE_DELAY);
        session.select_continue().unwrap();
        assert!(session.cancel());

        tokio::time::advance(DEFAULT_SETTLE_DELAY * 2).await;
        assert_eq!(session.tick(), None);
        assert_eq!(
            session.engine().current_question_id(),
            Some(&NodeId::Number(1))
        );
        assert!(!session.cancel());
    }

    #[test]
    fn test_requests_need_no_runtime() {
        let mut session = session(DEFAULT_SETTLE_DELAY);
        session.select_answer(&NodeId::Number(10)).unwrap();

        assert!(session.is_transitioning());
        assert_eq!(session.tick(), None);
        assert!(session.cancel());
        assert_eq!(
            session.engine().current_question_id(),
            Some(&NodeId::Number(1))
        );
    }

    #[test]
    fn test_deadline_only_while_transitioning() {
        let mut session = session(DEFAULT_SETTLE_DELAY);
        assert_eq!(session.deadline(), None);

        let before = Instant::now();
        session.select_continue().unwrap();
        let deadline = session.deadline().unwrap();
        assert!(deadline >= before + DEFAULT_SETTLE_DELAY);

        session.cancel();
        assert_eq!(session.deadline(), None);
    }
}
