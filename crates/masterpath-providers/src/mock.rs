//! Mocks for testing without real API calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use masterpath_core::model::{
    ExamQuestion, FlashcardDraft, LearningNode, NodeKind, QuestionKind,
};
use masterpath_core::traits::ContentSource;

use crate::client::{Completion, LlmClient};

/// A scripted chat client.
///
/// Returns configurable responses based on prompt content matching.
pub struct MockClient {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    default_response: String,
    call_count: AtomicU32,
    last_prompt: Mutex<Option<String>>,
}

impl MockClient {
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: "[]".to_string(),
            call_count: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// A mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl LlmClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _system: &str, prompt: &str) -> anyhow::Result<Completion> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        let text = self
            .responses
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(Completion {
            output_tokens: (text.len() / 4) as u32,
            input_tokens: (prompt.len() / 4) as u32,
            text,
            model: "mock-model".into(),
        })
    }
}

/// A deterministic content source for engine tests.
///
/// Flashcards and questions are derived from the node title, so a test can
/// predict every correct answer. Extensions return three practice nodes unless
/// replaced with [`MockContentSource::with_extension`].
pub struct MockContentSource {
    extension: Vec<LearningNode>,
    failing: AtomicBool,
    flashcard_calls: AtomicU32,
    exam_calls: AtomicU32,
    extension_calls: AtomicU32,
    last_title: Mutex<Option<String>>,
}

impl Default for MockContentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentSource {
    pub fn new() -> Self {
        let extension = (1..=3)
            .map(|i| {
                LearningNode::new(
                    format!("ext-{i}"),
                    format!("Extension {i}"),
                    NodeKind::Practice,
                )
            })
            .collect();
        Self {
            extension,
            failing: AtomicBool::new(false),
            flashcard_calls: AtomicU32::new(0),
            exam_calls: AtomicU32::new(0),
            extension_calls: AtomicU32::new(0),
            last_title: Mutex::new(None),
        }
    }

    pub fn with_extension(mut self, nodes: Vec<LearningNode>) -> Self {
        self.extension = nodes;
        self
    }

    /// Make every following request fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn flashcard_calls(&self) -> u32 {
        self.flashcard_calls.load(Ordering::Relaxed)
    }

    pub fn exam_calls(&self) -> u32 {
        self.exam_calls.load(Ordering::Relaxed)
    }

    pub fn extension_calls(&self) -> u32 {
        self.extension_calls.load(Ordering::Relaxed)
    }

    /// Title passed to the most recent request.
    pub fn last_title(&self) -> Option<String> {
        self.last_title.lock().ok().and_then(|t| t.clone())
    }

    fn begin(&self, counter: &AtomicU32, title: &str) -> anyhow::Result<()> {
        counter.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_title.lock() {
            *last = Some(title.to_string());
        }
        anyhow::ensure!(
            !self.failing.load(Ordering::Relaxed),
            "mock content source is failing"
        );
        Ok(())
    }
}

/// The question generated at `index` for a node titled `title`.
///
/// Types rotate through multiple choice, fill gap, arrange words and short
/// answer.
pub fn mock_question(title: &str, index: usize) -> ExamQuestion {
    let kind = match index % 4 {
        0 => QuestionKind::MultipleChoice {
            options: vec!["wrong".into(), format!("{title} {index}"), "also wrong".into()],
            correct_answer: "1".into(),
        },
        1 => QuestionKind::FillGap {
            options: vec![format!("word{index}"), "the".into(), "of".into()],
            correct_answer: format!("word{index}"),
        },
        2 => QuestionKind::ArrangeWords {
            options: vec![],
            correct_answer: format!("sentence number {index}"),
        },
        _ => QuestionKind::ShortAnswer {
            correct_answer: format!("answer {index}"),
        },
    };
    ExamQuestion {
        id: format!("q{index}"),
        prompt: format!("{title}: question {index}"),
        explanation: Some(format!("explanation {index}")),
        kind,
    }
}

#[async_trait]
impl ContentSource for MockContentSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_flashcards(
        &self,
        node_title: &str,
        _node_description: &str,
        count: usize,
    ) -> anyhow::Result<Vec<FlashcardDraft>> {
        self.begin(&self.flashcard_calls, node_title)?;
        Ok((0..count)
            .map(|i| FlashcardDraft {
                front_text: format!("{node_title} front {i}"),
                back_text: format!("{node_title} back {i}"),
            })
            .collect())
    }

    async fn generate_exam(
        &self,
        node_title: &str,
        count: usize,
    ) -> anyhow::Result<Vec<ExamQuestion>> {
        self.begin(&self.exam_calls, node_title)?;
        Ok((0..count).map(|i| mock_question(node_title, i)).collect())
    }

    async fn generate_path_extension(
        &self,
        _path_topic: &str,
        last_node_title: &str,
    ) -> anyhow::Result<Vec<LearningNode>> {
        self.begin(&self.extension_calls, last_node_title)?;
        Ok(self.extension.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use masterpath_core::evaluator::evaluate;

    #[tokio::test]
    async fn fixed_response() {
        let client = MockClient::with_fixed_response("[1]");
        let completion = client.complete("system", "anything").await.unwrap();
        assert_eq!(completion.text, "[1]");
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.last_prompt().as_deref(), Some("anything"));
    }

    #[tokio::test]
    async fn prompt_matching() {
        let mut responses = HashMap::new();
        responses.insert("flashcards".to_string(), "cards".to_string());
        responses.insert("exam".to_string(), "questions".to_string());
        let client = MockClient::new(responses);

        let resp = client.complete("s", "Write 30 flashcards").await.unwrap();
        assert_eq!(resp.text, "cards");
        let resp = client.complete("s", "Write an exam").await.unwrap();
        assert_eq!(resp.text, "questions");
        let resp = client.complete("s", "Something else").await.unwrap();
        assert_eq!(resp.text, "[]");
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn mock_questions_accept_their_own_answers() {
        let source = MockContentSource::new();
        let questions = source.generate_exam("Numbers", 8).await.unwrap();
        assert_eq!(questions.len(), 8);
        for q in &questions {
            assert!(evaluate(q, Some(q.kind.correct_answer())));
        }
        assert_eq!(source.exam_calls(), 1);
        assert_eq!(source.last_title().as_deref(), Some("Numbers"));
    }

    #[tokio::test]
    async fn failing_source_counts_calls() {
        let source = MockContentSource::new();
        source.set_failing(true);
        assert!(source.generate_flashcards("t", "d", 3).await.is_err());
        assert_eq!(source.flashcard_calls(), 1);

        source.set_failing(false);
        assert_eq!(source.generate_flashcards("t", "d", 3).await.unwrap().len(), 3);
    }
}
