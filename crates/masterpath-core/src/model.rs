//! Core data model types for masterpath.
//!
//! These are the fundamental types the whole engine works with: flashcards
//! and their decks, exam questions, learning nodes and the paths that
//! order them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single flashcard with its Leitner scheduling fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Unique identifier, assigned by the engine on receipt.
    pub id: Uuid,
    /// Prompt side of the card.
    pub front_text: String,
    /// Answer side of the card.
    pub back_text: String,
    /// Mastery box. 0 means not yet mastered.
    #[serde(rename = "box", default)]
    pub box_level: u32,
    /// Next review time in epoch milliseconds. Only meaningful when `box_level > 0`.
    #[serde(default)]
    pub next_review_at: i64,
    /// Last time the card was reviewed, in epoch milliseconds.
    #[serde(default)]
    pub last_reviewed_at: Option<i64>,
}

impl Flashcard {
    /// Whether this card currently counts towards node mastery.
    pub fn is_mastered(&self) -> bool {
        self.box_level > 0
    }
}

/// A flashcard as produced by a content source, before scheduling fields exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardDraft {
    pub front_text: String,
    pub back_text: String,
}

/// Recall outcome reported by the learner for one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Hard,
    Medium,
    Easy,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Easy => write!(f, "easy"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hard" | "h" | "1" => Ok(Difficulty::Hard),
            "medium" | "m" | "2" => Ok(Difficulty::Medium),
            "easy" | "e" | "3" => Ok(Difficulty::Easy),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// The persisted deck of a node: an arena of cards keyed by id.
///
/// Card order is preserved so that a full-replacement save writes the deck
/// back exactly as it was generated. Study sessions only ever hold ids into
/// this arena.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<Flashcard>,
    index: HashMap<Uuid, usize>,
}

impl Deck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        let index = cards
            .iter()
            .enumerate()
            .map(|(pos, card)| (card.id, pos))
            .collect();
        Self { cards, index }
    }

    pub fn get(&self, id: &Uuid) -> Option<&Flashcard> {
        self.index.get(id).map(|&pos| &self.cards[pos])
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Flashcard> {
        match self.index.get(id) {
            Some(&pos) => self.cards.get_mut(pos),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flashcard> {
        self.cards.iter()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.cards.iter().map(|c| c.id).collect()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Snapshot of the cards, in deck order, for a full-replacement save.
    pub fn to_vec(&self) -> Vec<Flashcard> {
        self.cards.clone()
    }
}

/// A single exam question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Question type, carrying only the fields that type needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// `correct_answer` is the index of the right option, as a string.
    MultipleChoice {
        options: Vec<String>,
        correct_answer: String,
    },
    /// `correct_answer` is a single token; `options` is the word bank.
    FillGap {
        #[serde(default)]
        options: Vec<String>,
        correct_answer: String,
    },
    /// `correct_answer` is the full sentence; `options` is the word bank.
    ArrangeWords {
        #[serde(default)]
        options: Vec<String>,
        correct_answer: String,
    },
    ShortAnswer { correct_answer: String },
}

impl QuestionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::FillGap { .. } => "fill_gap",
            QuestionKind::ArrangeWords { .. } => "arrange_words",
            QuestionKind::ShortAnswer { .. } => "short_answer",
        }
    }

    pub fn correct_answer(&self) -> &str {
        match self {
            QuestionKind::MultipleChoice { correct_answer, .. }
            | QuestionKind::FillGap { correct_answer, .. }
            | QuestionKind::ArrangeWords { correct_answer, .. }
            | QuestionKind::ShortAnswer { correct_answer } => correct_answer,
        }
    }
}

/// Kind of curriculum unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Theory,
    Practice,
    Challenge,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Theory => write!(f, "theory"),
            NodeKind::Practice => write!(f, "practice"),
            NodeKind::Challenge => write!(f, "challenge"),
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "theory" => Ok(NodeKind::Theory),
            "practice" => Ok(NodeKind::Practice),
            "challenge" => Ok(NodeKind::Challenge),
            other => Err(format!("unknown node kind: {other}")),
        }
    }
}

/// Derived progression state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Locked,
    Unlocked,
    Passed,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Locked => write!(f, "locked"),
            NodeStatus::Unlocked => write!(f, "unlocked"),
            NodeStatus::Passed => write!(f, "passed"),
        }
    }
}

/// An atomic curriculum unit within a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: NodeKind,
    /// Number of mastered cards needed before the exam unlocks.
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: u32,
    /// Snapshot of the last mastery recomputation.
    #[serde(default)]
    pub mastered_count: u32,
    #[serde(default)]
    pub exam_unlocked: bool,
    /// Percentage of the latest finalized exam attempt.
    #[serde(default)]
    pub exam_score: Option<u8>,
    #[serde(default = "default_true")]
    pub locked: bool,
    /// Set the first time an attempt reaches the pass percentage. Never cleared.
    #[serde(default)]
    pub passed: bool,
    /// Set once the post-study harvest step has been offered. Never cleared.
    #[serde(default)]
    pub harvest_offered: bool,
}

pub(crate) fn default_mastery_threshold() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl LearningNode {
    /// A fresh, locked node.
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            kind,
            mastery_threshold: default_mastery_threshold(),
            mastered_count: 0,
            exam_unlocked: false,
            exam_score: None,
            locked: true,
            passed: false,
            harvest_offered: false,
        }
    }

    pub fn status(&self) -> NodeStatus {
        if self.passed {
            NodeStatus::Passed
        } else if self.locked {
            NodeStatus::Locked
        } else {
            NodeStatus::Unlocked
        }
    }
}

/// An ordered curriculum of nodes around one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub nodes: Vec<LearningNode>,
}

impl LearningPath {
    pub fn position(&self, node_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&LearningNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut LearningNode> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    pub fn is_last(&self, node_id: &str) -> bool {
        self.nodes.last().is_some_and(|n| n.id == node_id)
    }

    /// The unlocked-but-not-passed node, if any.
    pub fn frontier(&self) -> Option<&LearningNode> {
        self.nodes
            .iter()
            .find(|n| n.status() == NodeStatus::Unlocked)
    }

    /// Per-node progress overview.
    pub fn summary(&self) -> Vec<NodeSummary> {
        self.nodes
            .iter()
            .map(|n| NodeSummary {
                id: n.id.clone(),
                title: n.title.clone(),
                kind: n.kind,
                status: n.status(),
                mastered_count: n.mastered_count,
                mastery_threshold: n.mastery_threshold,
                exam_unlocked: n.exam_unlocked,
                exam_score: n.exam_score,
            })
            .collect()
    }
}

/// One row of a path progress overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: String,
    pub title: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub mastered_count: u32,
    pub mastery_threshold: u32,
    pub exam_unlocked: bool,
    pub exam_score: Option<u8>,
}

/// Everything persisted for a single node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub exam_questions: Vec<ExamQuestion>,
    #[serde(default)]
    pub mastered_count: u32,
    #[serde(default)]
    pub exam_unlocked: bool,
    #[serde(default)]
    pub exam_score: Option<u8>,
}

/// A save request for node state. Every populated field replaces the stored
/// value in full.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStatePatch {
    pub flashcards: Option<Vec<Flashcard>>,
    pub exam_questions: Option<Vec<ExamQuestion>>,
    pub mastered_count: Option<u32>,
    pub exam_unlocked: Option<bool>,
    pub exam_score: Option<u8>,
}

impl NodeStatePatch {
    pub fn apply_to(self, state: &mut NodeState) {
        if let Some(flashcards) = self.flashcards {
            state.flashcards = flashcards;
        }
        if let Some(questions) = self.exam_questions {
            state.exam_questions = questions;
        }
        if let Some(count) = self.mastered_count {
            state.mastered_count = count;
        }
        if let Some(unlocked) = self.exam_unlocked {
            state.exam_unlocked = unlocked;
        }
        if let Some(score) = self.exam_score {
            state.exam_score = Some(score);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Easy.to_string(), "easy");
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(" M ".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!("3".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("trivial".parse::<Difficulty>().is_err());
    }

    #[test]
    fn flashcard_serde_roundtrip() {
        let card = Flashcard {
            id: Uuid::new_v4(),
            front_text: "xin chào".into(),
            back_text: "hello".into(),
            box_level: 3,
            next_review_at: 1_700_000_000_123,
            last_reviewed_at: Some(1_699_999_000_000),
        };
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"box\":3"));
        let back: Flashcard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn question_kind_is_tagged() {
        let json = r#"{"id":"q1","prompt":"Pick one","type":"multiple_choice","options":["a","b"],"correct_answer":"1"}"#;
        let q: ExamQuestion = serde_json::from_str(json).unwrap();
        assert_eq!(q.kind.type_name(), "multiple_choice");
        assert_eq!(q.kind.correct_answer(), "1");
        assert!(q.explanation.is_none());

        let json = r#"{"id":"q2","prompt":"Fill","type":"fill_gap","correct_answer":"chào"}"#;
        let q: ExamQuestion = serde_json::from_str(json).unwrap();
        assert!(matches!(q.kind, QuestionKind::FillGap { ref options, .. } if options.is_empty()));
    }

    #[test]
    fn deck_lookup_preserves_order() {
        let cards: Vec<Flashcard> = (0..3)
            .map(|i| Flashcard {
                id: Uuid::new_v4(),
                front_text: format!("f{i}"),
                back_text: format!("b{i}"),
                box_level: 0,
                next_review_at: 0,
                last_reviewed_at: None,
            })
            .collect();
        let ids: Vec<Uuid> = cards.iter().map(|c| c.id).collect();
        let mut deck = Deck::new(cards);

        deck.get_mut(&ids[1]).unwrap().box_level = 2;
        assert_eq!(deck.get(&ids[1]).unwrap().box_level, 2);
        assert_eq!(deck.ids(), ids);
        assert!(deck.get(&Uuid::nil()).is_none());
    }

    #[test]
    fn node_status_prefers_passed() {
        let mut node = LearningNode::new("a", "A", NodeKind::Theory);
        assert_eq!(node.status(), NodeStatus::Locked);
        node.locked = false;
        assert_eq!(node.status(), NodeStatus::Unlocked);
        node.passed = true;
        assert_eq!(node.status(), NodeStatus::Passed);
    }

    #[test]
    fn patch_replaces_only_populated_fields() {
        let mut state = NodeState {
            mastered_count: 4,
            ..Default::default()
        };
        NodeStatePatch {
            exam_unlocked: Some(true),
            ..Default::default()
        }
        .apply_to(&mut state);
        assert_eq!(state.mastered_count, 4);
        assert!(state.exam_unlocked);
    }
}
