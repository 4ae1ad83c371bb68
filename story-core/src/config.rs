//! Session configuration.

use crate::identity::UserId;
use crate::position::{FilePositionStore, MemoryPositionStore, PositionStore};
use crate::session::DEFAULT_SETTLE_DELAY;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use storybot::DEFAULT_BASE_URL;
use tracing::warn;

/// Configuration for creating a story session.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Backend host, also the base for relative media paths.
    pub base_url: String,

    /// Explicit user id, bypassing the host's init data.
    pub user_id: Option<String>,

    /// Raw mini-app init-data query string.
    pub init_data: Option<String>,

    /// Launch URL query string; its `user_id` parameter is an identity source.
    pub query: Option<String>,

    /// Delay between accepting a step and committing it.
    pub settle_delay: Duration,

    /// Position file; `None` keeps the position in memory only.
    pub position_path: Option<PathBuf>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: None,
            init_data: None,
            query: None,
            settle_delay: DEFAULT_SETTLE_DELAY,
            position_path: None,
        }
    }
}

impl StoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `.env` and the `STORY*` environment variables over the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Some(url) = non_empty_var("STORYBOT_BASE_URL") {
            config.base_url = url;
        }
        config.user_id = non_empty_var("STORY_USER_ID");
        config.init_data = non_empty_var("STORY_INIT_DATA");
        config.query = non_empty_var("STORY_QUERY");
        config.position_path = non_empty_var("STORY_POSITION_FILE").map(PathBuf::from);

        if let Some(raw) = non_empty_var("STORY_SETTLE_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.settle_delay = Duration::from_millis(ms),
                Err(_) => warn!(value = %raw, "ignoring invalid STORY_SETTLE_MS"),
            }
        }

        config
    }

    /// Set the backend host.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set an explicit user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the mini-app init data.
    pub fn with_init_data(mut self, init_data: impl Into<String>) -> Self {
        self.init_data = Some(init_data.into());
        self
    }

    /// Set the launch URL query string.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Persist the position to a file.
    pub fn with_position_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.position_path = Some(path.into());
        self
    }

    /// The effective user: init data, then the launch query, then the explicit id.
    pub fn identity(&self) -> Option<UserId> {
        UserId::resolve(self.init_data.as_deref(), self.query.as_deref())
            .or_else(|| self.user_id.as_deref().and_then(UserId::parse))
    }

    /// The position store this configuration asks for.
    pub fn position_store(&self) -> Box<dyn PositionStore> {
        match &self.position_path {
            Some(path) => Box::new(FilePositionStore::new(path)),
            None => Box::new(MemoryPositionStore::new()),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
