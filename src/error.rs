//! Error types for the game core.
//!
//! Nothing here is fatal to a running session: the frame loop never
//! returns these, and interaction paths log and swallow them.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    /// Balance table failed to parse or validate
    InvalidTuning(String),
    /// Content JSON failed to parse or validate
    InvalidContent(String),
    /// A chain was requested while a higher-priority flow owns the screen
    ModalBusy,
    /// Close requested with nothing on screen
    NoActiveModal,
    /// An answer was submitted while no philosophy question is showing
    NotAwaitingAnswer,
    /// The session reached its terminal state; no further progression
    SessionCompleted,
    /// Answer option index out of range for the question
    UnknownOption { question_id: u32, index: usize },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::InvalidTuning(msg) => write!(f, "invalid tuning: {}", msg),
            GameError::InvalidContent(msg) => write!(f, "invalid content: {}", msg),
            GameError::ModalBusy => write!(f, "another modal flow is active"),
            GameError::NoActiveModal => write!(f, "no modal is open"),
            GameError::NotAwaitingAnswer => write!(f, "no philosophy question is open"),
            GameError::SessionCompleted => write!(f, "session is over"),
            GameError::UnknownOption { question_id, index } => write!(
                f,
                "question {} has no option at index {}",
                question_id, index
            ),
        }
    }
}

impl std::error::Error for GameError {}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::InvalidContent(err.to_string())
    }
}
