//! Session position persistence.
//!
//! The current question id is written through on every cursor change and
//! read back once at startup, so a reload resumes at the same node.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use storybot::NodeId;
use thiserror::Error;
use tracing::{debug, warn};

/// The single key the current question id is stored under.
pub const POSITION_KEY: &str = "story.currentQuestionId";

/// Current position file version.
const POSITION_VERSION: u32 = 1;

/// Errors from position persistence.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Keyed, last-write-wins storage for the session cursor.
pub trait PositionStore: Send {
    /// Persist the current question id.
    fn save(&mut self, question_id: &NodeId) -> Result<(), PersistError>;

    /// The persisted id in its string-coerced form, if any.
    fn load(&self) -> Option<String>;

    /// Forget the persisted position.
    fn clear(&mut self) -> Result<(), PersistError>;
}

impl<P: PositionStore + ?Sized> PositionStore for Box<P> {
    fn save(&mut self, question_id: &NodeId) -> Result<(), PersistError> {
        (**self).save(question_id)
    }

    fn load(&self) -> Option<String> {
        (**self).load()
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        (**self).clear()
    }
}

/// Position store that lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPositionStore {
    entries: HashMap<String, String>,
}

impl MemoryPositionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a position, as after a reload.
    pub fn with_position(question_id: impl ToString) -> Self {
        let mut entries = HashMap::new();
        entries.insert(POSITION_KEY.to_string(), question_id.to_string());
        Self { entries }
    }
}

impl PositionStore for MemoryPositionStore {
    fn save(&mut self, question_id: &NodeId) -> Result<(), PersistError> {
        self.entries
            .insert(POSITION_KEY.to_string(), question_id.to_string());
        Ok(())
    }

    fn load(&self) -> Option<String> {
        self.entries.get(POSITION_KEY).cloned()
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        self.entries.remove(POSITION_KEY);
        Ok(())
    }
}

/// On-disk layout of the position file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PositionFile {
    version: u32,
    saved_at: String,
    entries: BTreeMap<String, String>,
}

/// Position store backed by a small JSON file.
#[derive(Debug, Clone)]
pub struct FilePositionStore {
    path: PathBuf,
}

impl FilePositionStore {
    /// Create a store at the given path. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted position, surfacing every failure.
    pub fn read_position(&self) -> Result<Option<String>, PersistError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: PositionFile = serde_json::from_str(&content)?;
        if file.version != POSITION_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: POSITION_VERSION,
                found: file.version,
            });
        }

        Ok(file.entries.get(POSITION_KEY).cloned())
    }

    fn write(&self, entries: BTreeMap<String, String>) -> Result<(), PersistError> {
        let file = PositionFile {
            version: POSITION_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            entries,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Readers never observe a half-written file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&file)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PositionStore for FilePositionStore {
    fn save(&mut self, question_id: &NodeId) -> Result<(), PersistError> {
        let mut entries = BTreeMap::new();
        entries.insert(POSITION_KEY.to_string(), question_id.to_string());
        self.write(entries)?;
        debug!(path = %self.path.display(), %question_id, "position saved");
        Ok(())
    }

    fn load(&self) -> Option<String> {
        match self.read_position() {
            Ok(position) => position,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable position file");
                None
            }
        }
    }

    fn clear(&mut self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
