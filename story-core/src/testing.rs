//! Testing utilities for the story engine.
//!
//! This module provides tools for integration testing:
//! - Node constructors and `GraphBuilder` for compact scripted graphs
//! - `MockSource` for deterministic loading without network calls
//! - `TestHarness` for stepping through scenarios without timers
//! - Assertion helpers for verifying navigation state

use crate::identity::UserId;
use crate::loader::GraphSource;
use crate::navigation::{NavError, NavigationEngine, Settled};
use crate::position::{MemoryPositionStore, PositionStore};
use async_trait::async_trait;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use storybot::{Answer, FinalVariant, GraphPayload, NodeId, Question, QuestionButton};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TEST_LOGGING: Once = Once::new();

/// Install a test log subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `debug` for this crate.
pub fn init_test_logging() {
    TEST_LOGGING.call_once(|| {
        let filter = env::var("RUST_LOG")
            .ok()
            .and_then(|spec| EnvFilter::try_new(spec).ok())
            .unwrap_or_else(|| EnvFilter::new("story_core=debug"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_filter(filter),
        );

        if tracing::dispatcher::has_been_set() {
            return;
        }
        if let Err(e) = subscriber.try_init() {
            eprintln!("Failed to set up test logging: {e}");
        }
    });
}

// ============================================================================
// Node constructors
// ============================================================================

/// A plain question with numeric id.
pub fn question(id: i64, order: Option<i64>) -> Question {
    Question {
        id: NodeId::Number(id),
        text: format!("Question {id}"),
        audio: None,
        picture: None,
        order,
        is_final: false,
        buttons: Vec::new(),
    }
}

/// An answer of `question_id`; `next == None` is the terminal edge.
pub fn answer(id: i64, question_id: i64, next: Option<i64>) -> Answer {
    Answer {
        id: NodeId::Number(id),
        question_id: NodeId::Number(question_id),
        text: format!("Answer {id}"),
        next_question_id: next.map(NodeId::Number),
        logo: None,
        send_variants: None,
    }
}

pub fn final_variant(id: i64, order: Option<i64>, text: &str) -> FinalVariant {
    FinalVariant {
        id: NodeId::Number(id),
        text: text.to_string(),
        audio: None,
        picture: None,
        order,
    }
}

/// Fluent builder for scripted graph payloads.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    payload: GraphPayload,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn question(mut self, id: i64, order: Option<i64>) -> Self {
        self.payload.questions.push(question(id, order));
        self
    }

    pub fn question_with_text(mut self, id: i64, order: Option<i64>, text: &str) -> Self {
        let mut q = question(id, order);
        q.text = text.to_string();
        self.payload.questions.push(q);
        self
    }

    /// A question flagged `final`, i.e. a terminal screen.
    pub fn final_question(mut self, id: i64, order: Option<i64>) -> Self {
        let mut q = question(id, order);
        q.is_final = true;
        self.payload.questions.push(q);
        self
    }

    /// Add an action button to an already added question.
    pub fn button(mut self, question_id: i64, id: i64, text: &str, url: Option<&str>) -> Self {
        if let Some(q) = self.find_mut(question_id) {
            q.buttons.push(QuestionButton {
                id: NodeId::Number(id),
                text: text.to_string(),
                url: url.map(str::to_string),
                logo: None,
            });
        }
        self
    }

    /// Set the picture of an already added question.
    pub fn picture(mut self, question_id: i64, path: &str) -> Self {
        if let Some(q) = self.find_mut(question_id) {
            q.picture = Some(path.to_string());
        }
        self
    }

    pub fn answer(mut self, id: i64, question_id: i64, next: Option<i64>) -> Self {
        self.payload.answers.push(answer(id, question_id, next));
        self
    }

    pub fn final_variant(mut self, id: i64, order: Option<i64>, text: &str) -> Self {
        self.payload
            .final_variants
            .push(final_variant(id, order, text));
        self
    }

    pub fn build(self) -> GraphPayload {
        self.payload
    }

    fn find_mut(&mut self, question_id: i64) -> Option<&mut Question> {
        let id = NodeId::Number(question_id);
        self.payload.questions.iter_mut().find(|q| q.id == id)
    }
}

/// One question whose only answer is the terminal edge, two final slides
/// listed out of order, and the result node.
pub fn final_flow_graph() -> GraphPayload {
    GraphBuilder::new()
        .question(1, Some(1))
        .question(99, Some(crate::graph::RESULT_NODE_ORDER))
        .answer(10, 1, None)
        .answer(990, 99, Some(1))
        .final_variant(101, Some(2), "B")
        .final_variant(100, Some(1), "A")
        .build()
}

// ============================================================================
// Mock graph source
// ============================================================================

#[derive(Debug, Clone)]
enum MockReply {
    Graph(GraphPayload),
    Fail(String),
}

/// A graph source that returns a scripted reply.
#[derive(Debug, Clone)]
pub struct MockSource {
    reply: MockReply,
    delay: Option<Duration>,
    fetches: Arc<AtomicUsize>,
}

impl MockSource {
    /// Always return this graph.
    pub fn new(payload: GraphPayload) -> Self {
        Self {
            reply: MockReply::Graph(payload),
            delay: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always fail with a network error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: MockReply::Fail(message.into()),
            delay: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep before replying, so a test can act while the fetch is in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches made so far, shared across clones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphSource for MockSource {
    async fn fetch(&self, _user_id: &UserId) -> Result<GraphPayload, storybot::Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            MockReply::Graph(payload) => Ok(payload.clone()),
            MockReply::Fail(message) => Err(storybot::Error::Network(message.clone())),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Synchronous scenario driver: every request settles immediately.
pub struct TestHarness {
    pub engine: NavigationEngine<MemoryPositionStore>,
}

impl TestHarness {
    /// Install `payload` with no persisted position.
    pub fn new(payload: GraphPayload) -> Self {
        Self::with_store(payload, MemoryPositionStore::new())
    }

    /// Install `payload` as if the page had been reloaded at `position`.
    pub fn resumed(payload: GraphPayload, position: impl ToString) -> Self {
        Self::with_store(payload, MemoryPositionStore::with_position(position))
    }

    fn with_store(payload: GraphPayload, store: MemoryPositionStore) -> Self {
        let mut engine = NavigationEngine::new(store);
        let resume = engine.position_store().load();
        engine.install(payload, resume.as_deref());
        Self { engine }
    }

    /// Select an answer by numeric id and settle.
    pub fn choose(&mut self, answer_id: i64) -> Result<Settled, NavError> {
        self.engine.select_answer(&NodeId::Number(answer_id))?;
        Ok(self.engine.settle())
    }

    /// Take the single "continue" answer and settle.
    pub fn continue_on(&mut self) -> Result<Settled, NavError> {
        self.engine.select_continue()?;
        Ok(self.engine.settle())
    }

    pub fn restart(&mut self) -> Result<Settled, NavError> {
        self.engine.restart()?;
        Ok(self.engine.settle())
    }

    pub fn advance(&mut self) -> Result<Settled, NavError> {
        self.engine.advance_final()
    }

    pub fn current_id(&self) -> Option<NodeId> {
        self.engine.current_question_id().cloned()
    }

    /// The persisted position, as a reload would read it.
    pub fn persisted(&self) -> Option<String> {
        self.engine.position_store().load()
    }

    pub fn final_text(&self) -> Option<&str> {
        self.engine.current_final_slide().map(|v| v.text.as_str())
    }

    pub fn answer_ids(&self) -> Vec<NodeId> {
        self.engine
            .current_answers()
            .iter()
            .map(|a| a.id.clone())
            .collect()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the cursor is at the given question and not in the final sequence.
#[track_caller]
pub fn assert_at(harness: &TestHarness, question_id: i64) {
    assert!(
        !harness.engine.is_final_flow(),
        "Expected to be at question {question_id}, but in the final sequence"
    );
    assert_eq!(
        harness.current_id(),
        Some(NodeId::Number(question_id)),
        "Expected cursor at question {question_id}"
    );
}

/// Assert the final sequence is showing the slide with this text.
#[track_caller]
pub fn assert_final_slide(harness: &TestHarness, text: &str) {
    assert_eq!(
        harness.final_text(),
        Some(text),
        "Expected final slide '{text}'"
    );
}

/// Assert the persisted position.
#[track_caller]
pub fn assert_persisted(harness: &TestHarness, question_id: i64) {
    assert_eq!(
        harness.persisted(),
        Some(question_id.to_string()),
        "Expected position {question_id} to be persisted"
    );
}
