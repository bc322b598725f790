//! Engine error types.
//!
//! These are the failures callers are expected to branch on. Collaborator
//! errors (content source, persistence) arrive as `anyhow::Error` and are
//! wrapped here when the engine needs to classify them.

use thiserror::Error;

/// Errors surfaced by the node engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The content source failed to produce flashcards, questions or nodes.
    /// Nothing was committed; the node is back in its idle state.
    #[error("content generation failed: {0:#}")]
    Generation(anyhow::Error),

    /// No path with this id has been stored.
    #[error("unknown path: {0}")]
    UnknownPath(String),

    /// The node id does not exist in the path.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// The node has not been unlocked yet.
    #[error("node is locked: {0}")]
    NodeLocked(String),

    /// The exam was requested before the mastery threshold was reached.
    #[error("exam for node {node_id} is locked ({mastered}/{threshold} cards mastered)")]
    ExamLocked {
        node_id: String,
        mastered: u32,
        threshold: u32,
    },

    /// The node has nothing to study or examine.
    #[error("node {0} has no content")]
    EmptyContent(String),

    /// An outcome was recorded after the study queue emptied.
    #[error("study session for node {0} is already finished")]
    SessionFinished(String),

    /// Extension was requested while the path's last node has not passed.
    #[error("path {0} cannot be extended until its last node has passed")]
    ExtensionNotDue(String),

    /// A manually supplied score fell outside 0..=100.
    #[error("score out of range: {0} (expected 0-100)")]
    ScoreOutOfRange(i64),

    /// Loading state from the persistence collaborator failed.
    #[error("persistence error: {0:#}")]
    Persistence(anyhow::Error),

    #[error(transparent)]
    Exam(#[from] ExamError),
}

/// Errors raised by an exam attempt's state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExamError {
    /// The action is not valid in the attempt's current phase.
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    /// The attempt was started for a different node.
    #[error("exam attempt belongs to node {attempt_node}, not {node_id}")]
    WrongNode {
        attempt_node: String,
        node_id: String,
    },

    /// An attempt needs at least one question.
    #[error("exam has no questions")]
    NoQuestions,
}

impl EngineError {
    /// Returns `true` if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Generation(_) | EngineError::Persistence(_))
    }
}
