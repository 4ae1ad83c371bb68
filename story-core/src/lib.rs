//! Branching story engine.
//!
//! This crate provides:
//! - An immutable graph store over questions, answers and final slides
//! - A navigation state machine with a timed transitioning phase
//! - Session position persistence so a reload resumes where it left off
//! - A one-shot loader that fetches the graph for a user
//!
//! # Quick Start
//!
//! ```ignore
//! use story_core::{Loader, StoryConfig, StorySession};
//! use storybot::Storybot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoryConfig::from_env();
//!     let mut loader = Loader::new(Storybot::new(&config.base_url)?);
//!     let mut session = StorySession::new(config.position_store(), config.settle_delay);
//!
//!     session.bootstrap(&mut loader, config.identity().as_ref()).await?;
//!     println!("{}", session.view().text());
//!
//!     session.select_continue()?;
//!     session.wait_settled().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod graph;
pub mod identity;
pub mod loader;
pub mod navigation;
pub mod position;
pub mod session;
pub mod testing;
pub mod view;

// Primary public API
pub use config::StoryConfig;
pub use graph::{GraphStore, RESULT_NODE_ORDER};
pub use identity::UserId;
pub use loader::{GraphSource, LoadError, LoadHandle, Loader};
pub use navigation::{ButtonAction, NavError, NavigationEngine, Phase, Settled};
pub use position::{FilePositionStore, MemoryPositionStore, PersistError, PositionStore};
pub use session::{StorySession, DEFAULT_SETTLE_DELAY};
pub use testing::{GraphBuilder, MockSource, TestHarness};
pub use view::{Affordance, StoryView};
