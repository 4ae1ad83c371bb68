//! Data loader: one fetch of the story graph per session.
//!
//! Failures here never block the story view. A missing identity or a
//! failed fetch leaves the engine with an empty graph and the caller is
//! expected to carry on regardless.

use crate::identity::UserId;
use crate::navigation::NavigationEngine;
use crate::position::PositionStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storybot::{GraphPayload, NodeId, Storybot};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from bootstrapping a session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No user identity available")]
    NoIdentity,

    #[error("Failed to fetch story graph: {0}")]
    Fetch(#[from] storybot::Error),

    #[error("Load cancelled")]
    Cancelled,
}

/// Anything that can produce a user's story graph.
#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn fetch(&self, user_id: &UserId) -> Result<GraphPayload, storybot::Error>;
}

#[async_trait]
impl GraphSource for Storybot {
    async fn fetch(&self, user_id: &UserId) -> Result<GraphPayload, storybot::Error> {
        self.fetch_graph(user_id.as_str()).await
    }
}

/// Shared cancellation flag for an in-flight bootstrap.
#[derive(Debug, Clone, Default)]
pub struct LoadHandle {
    cancelled: Arc<AtomicBool>,
}

impl LoadHandle {
    /// Stop acting on any response that has not been applied yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Fetches the graph and places the engine's cursor.
pub struct Loader<S> {
    source: S,
    handle: LoadHandle,
    loaded: bool,
}

impl<S: GraphSource> Loader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            handle: LoadHandle::default(),
            loaded: false,
        }
    }

    /// A handle that can cancel this loader from elsewhere.
    pub fn handle(&self) -> LoadHandle {
        self.handle.clone()
    }

    /// True once a graph has been installed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the graph for `user_id` and install it into `engine`.
    ///
    /// The start node is the persisted position if it names a loaded
    /// question, otherwise the lowest-ordered question. Returns the start
    /// id, or `None` for an empty graph. Once a graph is installed, later
    /// calls return the current cursor without fetching again.
    pub async fn bootstrap<P: PositionStore>(
        &mut self,
        user_id: Option<&UserId>,
        engine: &mut NavigationEngine<P>,
    ) -> Result<Option<NodeId>, LoadError> {
        if self.handle.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        if self.loaded {
            debug!("story graph already loaded");
            return Ok(engine.current_question_id().cloned());
        }

        let Some(user_id) = user_id else {
            warn!("no user identity, continuing with an empty story");
            return Err(LoadError::NoIdentity);
        };

        info!(%user_id, "loading story graph");
        let payload = match self.source.fetch(user_id).await {
            Ok(payload) => payload,
            Err(e) => {
                if self.handle.is_cancelled() {
                    return Err(LoadError::Cancelled);
                }
                warn!(%user_id, error = %e, "failed to load story graph");
                return Err(LoadError::Fetch(e));
            }
        };

        if self.handle.is_cancelled() {
            debug!("dropping story graph that arrived after cancellation");
            return Err(LoadError::Cancelled);
        }

        let resume = engine.position_store().load();
        let start = engine.install(payload, resume.as_deref());
        self.loaded = true;
        Ok(start)
    }
}
