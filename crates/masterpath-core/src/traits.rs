//! Collaborator trait definitions.
//!
//! `ContentSource` is implemented by the `masterpath-providers` crate;
//! `Persistence` by the stores in [`crate::store`] or by the embedding
//! application.

use async_trait::async_trait;

use crate::model::{
    ExamQuestion, FlashcardDraft, LearningNode, LearningPath, NodeState, NodeStatePatch,
};

// ---------------------------------------------------------------------------
// Content source
// ---------------------------------------------------------------------------

/// Produces flashcards, exam questions and path extensions.
///
/// This is the engine's only asynchronous boundary. The engine applies no
/// timeout or retry; callers that want either wrap the engine call.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Human-readable source name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Flashcards covering a node.
    async fn generate_flashcards(
        &self,
        node_title: &str,
        node_description: &str,
        count: usize,
    ) -> anyhow::Result<Vec<FlashcardDraft>>;

    /// An exam of mixed question types for a node.
    async fn generate_exam(&self, node_title: &str, count: usize)
        -> anyhow::Result<Vec<ExamQuestion>>;

    /// New node stubs continuing a path past its last node.
    async fn generate_path_extension(
        &self,
        path_topic: &str,
        last_node_title: &str,
    ) -> anyhow::Result<Vec<LearningNode>>;
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Durable storage for paths and per-node state.
///
/// Saves are fire-and-forget from the engine's point of view: a failed save
/// is logged and not retried.
pub trait Persistence: Send + Sync {
    /// State of one node. A node never saved before yields `NodeState::default()`.
    fn load_node_state(&self, path_id: &str, node_id: &str) -> anyhow::Result<NodeState>;

    /// Replace every field populated in `patch`.
    fn save_node_state(
        &self,
        path_id: &str,
        node_id: &str,
        patch: NodeStatePatch,
    ) -> anyhow::Result<()>;

    fn load_path(&self, path_id: &str) -> anyhow::Result<Option<LearningPath>>;

    fn save_path(&self, path: &LearningPath) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Markdown JSON extraction
// ---------------------------------------------------------------------------

/// Extract a JSON payload from a markdown-formatted model response.
///
/// Handles:
/// - A ```json block (the first one wins)
/// - A generic ``` block if no json-tagged block exists
/// - A truncated, unclosed block
/// - Raw JSON with no fences (returned trimmed)
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_block: Option<String> = None;
    let mut generic_block: Option<String> = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block && json_block.is_none() {
                json_block = Some(current_block.clone());
            } else if is_generic_block && generic_block.is_none() {
                generic_block = Some(current_block.clone());
            }
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    if in_block && !current_block.is_empty() {
        if is_json_block && json_block.is_none() {
            json_block = Some(current_block);
        } else if is_generic_block && generic_block.is_none() {
            generic_block = Some(current_block);
        }
    }

    json_block
        .or(generic_block)
        .unwrap_or_else(|| response.trim().to_string())
}
