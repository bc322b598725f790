//! `ContentSource` implementations backed by a chat model.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use masterpath_core::model::{
    ExamQuestion, FlashcardDraft, LearningNode, NodeKind, QuestionKind,
};
use masterpath_core::traits::{extract_json_from_markdown, ContentSource};

use crate::client::LlmClient;
use crate::error::ProviderError;

const SYSTEM_PROMPT: &str = "You are a patient tutor who writes study material for a single learner. Respond ONLY with JSON. Do not add explanations or prose outside the JSON.";

/// Generates study content by prompting a chat model for JSON.
pub struct LlmContentSource {
    client: Box<dyn LlmClient>,
}

impl LlmContentSource {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }
}

fn flashcards_prompt(title: &str, description: &str, count: usize) -> String {
    format!(
        "Write {count} flashcards for the lesson \"{title}\".\n\
         Lesson description: {description}\n\n\
         Return a JSON array of objects with string fields \"front_text\" \
         (the prompt side) and \"back_text\" (the answer side)."
    )
}

fn exam_prompt(title: &str, count: usize) -> String {
    format!(
        "Write an exam of {count} questions for the lesson \"{title}\", mixing these types:\n\
         - \"multiple_choice\": \"options\" is a list of choices, \"correct_answer\" is the \
         zero-based index of the right option as a string (e.g. \"2\").\n\
         - \"fill_gap\": \"prompt\" contains a gap, \"correct_answer\" is the single missing \
         word, \"options\" is a word bank containing it.\n\
         - \"arrange_words\": \"correct_answer\" is the full sentence, \"options\" are its \
         words plus a few distractors.\n\
         - \"short_answer\": \"correct_answer\" is a short free-text answer.\n\n\
         Return a JSON array of objects with fields \"type\", \"prompt\", \"options\" (where \
         applicable), \"correct_answer\" and an optional \"explanation\"."
    )
}

fn extension_prompt(topic: &str, last_title: &str) -> String {
    format!(
        "A learner studying \"{topic}\" has just completed the lesson \"{last_title}\".\n\
         Propose the next 3 lessons, from easiest to hardest.\n\n\
         Return a JSON array of objects with fields \"title\", \"description\" and \"kind\" \
         (one of \"theory\", \"practice\", \"challenge\")."
    )
}

/// Pull the list of items out of a model response.
///
/// Accepts a bare array or an object wrapping one (e.g. `{"flashcards": [...]}`).
fn json_items(text: &str) -> Result<Vec<Value>, ProviderError> {
    let json = extract_json_from_markdown(text);
    let value: Value = serde_json::from_str(&json)
        .map_err(|e| ProviderError::MalformedContent(format!("response is not JSON: {e}")))?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .ok_or_else(|| ProviderError::MalformedContent("no JSON array in response".into())),
        _ => Err(ProviderError::MalformedContent(
            "expected a JSON array".into(),
        )),
    }
}

/// Deserialize every item that fits `T`, skipping the rest.
fn parse_items<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("skipping {what} #{i}: {e}");
                None
            }
        })
        .collect()
}

/// Parse generated flashcards, dropping cards with an empty side.
pub fn parse_flashcards(text: &str) -> Result<Vec<FlashcardDraft>, ProviderError> {
    let drafts: Vec<FlashcardDraft> = parse_items(json_items(text)?, "flashcard");
    Ok(drafts
        .into_iter()
        .filter(|d| !d.front_text.trim().is_empty() && !d.back_text.trim().is_empty())
        .collect())
}

#[derive(Deserialize)]
struct GeneratedQuestion {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "question")]
    prompt: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(flatten)]
    kind: QuestionKind,
}

/// Parse generated exam questions.
///
/// Numeric answers are accepted as strings. Questions without an id get a
/// fresh one; multiple choice questions whose answer is not a valid option
/// index are dropped.
pub fn parse_questions(text: &str) -> Result<Vec<ExamQuestion>, ProviderError> {
    let items = json_items(text)?
        .into_iter()
        .map(|mut item| {
            if let Some(Value::Number(n)) = item.get("correct_answer") {
                let answer = n.to_string();
                item["correct_answer"] = Value::String(answer);
            }
            item
        })
        .collect();

    let questions: Vec<GeneratedQuestion> = parse_items(items, "question");
    Ok(questions
        .into_iter()
        .filter(|q| !q.prompt.trim().is_empty() && !q.kind.correct_answer().trim().is_empty())
        .filter(|q| match &q.kind {
            QuestionKind::MultipleChoice {
                options,
                correct_answer,
            } => correct_answer
                .parse::<usize>()
                .is_ok_and(|index| index < options.len()),
            _ => true,
        })
        .map(|q| ExamQuestion {
            id: q
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            prompt: q.prompt,
            explanation: q.explanation,
            kind: q.kind,
        })
        .collect())
}

#[derive(Deserialize)]
struct GeneratedNode {
    #[serde(default)]
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    kind: Option<String>,
}

/// Parse generated node stubs. Unknown kinds fall back to theory.
pub fn parse_nodes(text: &str) -> Result<Vec<LearningNode>, ProviderError> {
    let nodes: Vec<GeneratedNode> = parse_items(json_items(text)?, "node");
    Ok(nodes
        .into_iter()
        .filter(|n| !n.title.trim().is_empty())
        .map(|n| {
            let kind = n
                .kind
                .and_then(|k| k.parse::<NodeKind>().ok())
                .unwrap_or_default();
            let mut node = LearningNode::new(n.id, n.title, kind);
            node.description = n.description;
            node
        })
        .collect())
}

#[async_trait]
impl ContentSource for LlmContentSource {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn generate_flashcards(
        &self,
        node_title: &str,
        node_description: &str,
        count: usize,
    ) -> anyhow::Result<Vec<FlashcardDraft>> {
        let prompt = flashcards_prompt(node_title, node_description, count);
        let completion = self.client.complete(SYSTEM_PROMPT, &prompt).await?;
        let mut drafts = parse_flashcards(&completion.text)?;
        if drafts.is_empty() {
            return Err(ProviderError::MalformedContent("no usable flashcards".into()).into());
        }
        drafts.truncate(count);
        tracing::info!(node = node_title, cards = drafts.len(), "flashcards generated");
        Ok(drafts)
    }

    async fn generate_exam(
        &self,
        node_title: &str,
        count: usize,
    ) -> anyhow::Result<Vec<ExamQuestion>> {
        let completion = self
            .client
            .complete(SYSTEM_PROMPT, &exam_prompt(node_title, count))
            .await?;
        let mut questions = parse_questions(&completion.text)?;
        if questions.is_empty() {
            return Err(ProviderError::MalformedContent("no usable questions".into()).into());
        }
        questions.truncate(count);
        tracing::info!(node = node_title, questions = questions.len(), "exam generated");
        Ok(questions)
    }

    async fn generate_path_extension(
        &self,
        path_topic: &str,
        last_node_title: &str,
    ) -> anyhow::Result<Vec<LearningNode>> {
        let completion = self
            .client
            .complete(SYSTEM_PROMPT, &extension_prompt(path_topic, last_node_title))
            .await?;
        let nodes = parse_nodes(&completion.text)?;
        if nodes.is_empty() {
            return Err(ProviderError::MalformedContent("no usable nodes".into()).into());
        }
        Ok(nodes)
    }
}

/// Stands in when no provider is configured. Every generation request fails
/// with the configuration problem, while already generated content stays usable.
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ContentSource for UnavailableSource {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn generate_flashcards(
        &self,
        _: &str,
        _: &str,
        _: usize,
    ) -> anyhow::Result<Vec<FlashcardDraft>> {
        anyhow::bail!("no content source available: {}", self.reason)
    }

    async fn generate_exam(&self, _: &str, _: usize) -> anyhow::Result<Vec<ExamQuestion>> {
        anyhow::bail!("no content source available: {}", self.reason)
    }

    async fn generate_path_extension(
        &self,
        _: &str,
        _: &str,
    ) -> anyhow::Result<Vec<LearningNode>> {
        anyhow::bail!("no content source available: {}", self.reason)
    }
}
