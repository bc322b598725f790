//! Central node engine orchestrator.
//!
//! Wires the scheduler, study queue, mastery tracker, exam attempt and
//! progression rules to the content source, the persistence store and the
//! progress observer.

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, ExamError};
use crate::events::ProgressObserver;
use crate::exam::{ExamAttempt, ExamSummary};
use crate::mastery;
use crate::model::{
    Deck, Difficulty, ExamQuestion, Flashcard, LearningPath, NodeState, NodeStatePatch,
    NodeStatus,
};
use crate::progression::{ExamProgress, ProgressionStateMachine, Score, ScoreOverride};
use crate::scheduler;
use crate::session::{select_candidates, StudyMode, StudySession};
use crate::traits::{ContentSource, Persistence};

/// A study session bound to one node's deck.
#[derive(Debug, Clone)]
pub struct NodeStudy {
    node_id: String,
    deck: Deck,
    session: StudySession,
}

impl NodeStudy {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn session(&self) -> &StudySession {
        &self.session
    }

    /// Flip the current card.
    pub fn reveal(&mut self) {
        self.session.reveal();
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        self.session.current().and_then(|id| self.deck.get(&id))
    }

    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }
}

/// What one recorded outcome did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeReport {
    pub box_level: u32,
    pub next_review_at: i64,
    pub mastered: u32,
    /// The exam unlocked with this outcome.
    pub exam_unlocked: bool,
    pub xp_awarded: u32,
    /// The queue is now empty.
    pub finished: bool,
    /// The harvest step should be offered.
    pub harvest: bool,
}

/// What a finalized exam (or score override) did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResult {
    pub percentage: u8,
    pub progress: ExamProgress,
    /// Ids of nodes appended by a path extension.
    pub extended: Vec<String>,
    /// Set when the extension request failed; the score was still recorded.
    pub extension_error: Option<String>,
}

/// The mastery/progression engine.
pub struct NodeEngine {
    content: Arc<dyn ContentSource>,
    store: Arc<dyn Persistence>,
    observer: Arc<dyn ProgressObserver>,
    config: EngineConfig,
    progression: ProgressionStateMachine,
}

impl NodeEngine {
    pub fn new(
        content: Arc<dyn ContentSource>,
        store: Arc<dyn Persistence>,
        observer: Arc<dyn ProgressObserver>,
        config: EngineConfig,
    ) -> Self {
        let progression = ProgressionStateMachine::new(config.pass_percentage);
        Self {
            content,
            store,
            observer,
            config,
            progression,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    /// Store a new path with its first node unlocked.
    pub fn import_path(&self, mut path: LearningPath) -> Result<LearningPath, EngineError> {
        self.progression.initialize(&mut path);
        self.store
            .save_path(&path)
            .map_err(EngineError::Persistence)?;
        tracing::info!(path = %path.id, nodes = path.nodes.len(), "path imported");
        Ok(path)
    }

    pub fn load_path(&self, path_id: &str) -> Result<LearningPath, EngineError> {
        self.store
            .load_path(path_id)
            .map_err(EngineError::Persistence)?
            .ok_or_else(|| EngineError::UnknownPath(path_id.to_string()))
    }

    /// Load a node's state and copy its persisted snapshot fields into the path.
    pub fn sync_node(
        &self,
        path: &mut LearningPath,
        node_id: &str,
    ) -> Result<NodeState, EngineError> {
        let state = self
            .store
            .load_node_state(&path.id, node_id)
            .map_err(EngineError::Persistence)?;
        let node = path
            .node_mut(node_id)
            .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
        node.mastered_count = state.mastered_count;
        node.exam_unlocked = node.exam_unlocked || state.exam_unlocked;
        if state.exam_score.is_some() {
            node.exam_score = state.exam_score;
        }
        Ok(state)
    }

    fn ensure_open(&self, path: &LearningPath, node_id: &str) -> Result<(), EngineError> {
        let node = path
            .node(node_id)
            .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
        if node.status() == NodeStatus::Locked {
            return Err(EngineError::NodeLocked(node_id.to_string()));
        }
        Ok(())
    }

    fn persist(&self, what: &str, result: anyhow::Result<()>) {
        if let Err(e) = result {
            tracing::warn!("failed to save {what}: {e:#}");
        }
    }

    // -----------------------------------------------------------------------
    // Flashcards
    // -----------------------------------------------------------------------

    /// Load the node's deck, generating it first if the node has none.
    ///
    /// Nothing is saved unless generation succeeds, so a failed or cancelled
    /// request leaves the node as it was.
    pub async fn prepare_flashcards(
        &self,
        path: &mut LearningPath,
        node_id: &str,
    ) -> Result<Deck, EngineError> {
        self.ensure_open(path, node_id)?;
        let state = self.sync_node(path, node_id)?;
        if !state.flashcards.is_empty() {
            return Ok(Deck::new(state.flashcards));
        }

        let (title, description) = match path.node(node_id) {
            Some(node) => (node.title.clone(), node.description.clone()),
            None => return Err(EngineError::UnknownNode(node_id.to_string())),
        };
        tracing::info!(node = %node_id, source = self.content.name(), "generating flashcards");
        let mut drafts = self
            .content
            .generate_flashcards(&title, &description, self.config.flashcard_target)
            .await
            .map_err(EngineError::Generation)?;
        if drafts.is_empty() {
            return Err(EngineError::Generation(anyhow::anyhow!(
                "content source returned no flashcards"
            )));
        }
        drafts.truncate(self.config.flashcard_target);

        let cards: Vec<Flashcard> = drafts.into_iter().map(scheduler::new_card).collect();
        self.persist(
            "flashcards",
            self.store.save_node_state(
                &path.id,
                node_id,
                NodeStatePatch {
                    flashcards: Some(cards.clone()),
                    mastered_count: Some(0),
                    ..Default::default()
                },
            ),
        );
        Ok(Deck::new(cards))
    }

    /// Open a study session over `deck`.
    pub fn start_study<R: Rng + ?Sized>(
        &self,
        path: &LearningPath,
        node_id: &str,
        deck: Deck,
        mode: StudyMode,
        now_ms: i64,
        rng: &mut R,
    ) -> Result<NodeStudy, EngineError> {
        self.ensure_open(path, node_id)?;
        if deck.is_empty() {
            return Err(EngineError::EmptyContent(node_id.to_string()));
        }
        let candidates =
            select_candidates(&deck, mode, now_ms, self.config.fallback_sample_size, rng);
        tracing::info!(node = %node_id, %mode, cards = candidates.len(), "study session started");
        Ok(NodeStudy {
            node_id: node_id.to_string(),
            deck,
            session: StudySession::new(candidates, mode),
        })
    }

    /// Apply the learner's outcome to the current card.
    ///
    /// The card and the node's mastery snapshot are saved immediately, so
    /// abandoning the session afterwards loses only the queue order.
    pub fn record_outcome(
        &self,
        path: &mut LearningPath,
        study: &mut NodeStudy,
        difficulty: Difficulty,
        now_ms: i64,
    ) -> Result<OutcomeReport, EngineError> {
        let card_id = study
            .session
            .current()
            .ok_or_else(|| EngineError::SessionFinished(study.node_id.clone()))?;
        let card = study
            .deck
            .get_mut(&card_id)
            .ok_or_else(|| EngineError::EmptyContent(study.node_id.clone()))?;
        let outcome = scheduler::apply(card, difficulty, now_ms);

        self.persist(
            "flashcards",
            self.store.save_node_state(
                &path.id,
                &study.node_id,
                NodeStatePatch {
                    flashcards: Some(study.deck.to_vec()),
                    ..Default::default()
                },
            ),
        );

        let node = path
            .node_mut(&study.node_id)
            .ok_or_else(|| EngineError::UnknownNode(study.node_id.clone()))?;
        let crossed = mastery::observe(node, &study.deck);
        let mastered = node.mastered_count;
        let exam_unlocked = node.exam_unlocked;
        if let Some(event) = &crossed {
            self.observer
                .on_mastery_threshold_crossed(&event.node_id, event.mastered);
        }

        let xp_awarded = match difficulty {
            Difficulty::Easy => self.config.study_easy_xp,
            Difficulty::Medium | Difficulty::Hard => 0,
        };
        if xp_awarded > 0 {
            study.session.add_xp(xp_awarded);
            self.observer.on_xp_awarded(xp_awarded);
        }

        study.session.record_outcome(difficulty);
        let finished = study.session.is_finished();
        let harvest = finished && self.progression.complete_study(node, study.session.mode());
        if harvest {
            self.observer.on_harvest_ready(&study.node_id);
        }
        if finished {
            tracing::info!(
                node = %study.node_id,
                reviewed = study.session.reviewed(),
                xp = study.session.xp(),
                "study session finished"
            );
        }

        self.persist(
            "node mastery",
            self.store.save_node_state(
                &path.id,
                &study.node_id,
                NodeStatePatch {
                    mastered_count: Some(mastered),
                    exam_unlocked: Some(exam_unlocked),
                    ..Default::default()
                },
            ),
        );
        self.persist("path", self.store.save_path(path));

        Ok(OutcomeReport {
            box_level: outcome.box_level,
            next_review_at: outcome.next_review_at,
            mastered,
            exam_unlocked: crossed.is_some(),
            xp_awarded,
            finished,
            harvest,
        })
    }

    // -----------------------------------------------------------------------
    // Exams
    // -----------------------------------------------------------------------

    fn ensure_exam_open(&self, path: &LearningPath, node_id: &str) -> Result<(), EngineError> {
        self.ensure_open(path, node_id)?;
        match path.node(node_id) {
            Some(node) if node.exam_unlocked => Ok(()),
            Some(node) => Err(EngineError::ExamLocked {
                node_id: node_id.to_string(),
                mastered: node.mastered_count,
                threshold: node.mastery_threshold,
            }),
            None => Err(EngineError::UnknownNode(node_id.to_string())),
        }
    }

    /// Load the node's exam questions, generating them first if needed.
    pub async fn prepare_exam(
        &self,
        path: &mut LearningPath,
        node_id: &str,
    ) -> Result<Vec<ExamQuestion>, EngineError> {
        let state = self.sync_node(path, node_id)?;
        self.ensure_exam_open(path, node_id)?;
        if !state.exam_questions.is_empty() {
            return Ok(state.exam_questions);
        }
        self.generate_exam(path, node_id).await
    }

    /// Replace the node's questions with a freshly generated set.
    pub async fn regenerate_exam(
        &self,
        path: &mut LearningPath,
        node_id: &str,
    ) -> Result<Vec<ExamQuestion>, EngineError> {
        self.sync_node(path, node_id)?;
        self.ensure_exam_open(path, node_id)?;
        self.generate_exam(path, node_id).await
    }

    async fn generate_exam(
        &self,
        path: &LearningPath,
        node_id: &str,
    ) -> Result<Vec<ExamQuestion>, EngineError> {
        let title = path
            .node(node_id)
            .map(|n| n.title.clone())
            .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
        tracing::info!(node = %node_id, source = self.content.name(), "generating exam");
        let mut questions = self
            .content
            .generate_exam(&title, self.config.exam_target)
            .await
            .map_err(EngineError::Generation)?;
        if questions.is_empty() {
            return Err(EngineError::Generation(anyhow::anyhow!(
                "content source returned no questions"
            )));
        }
        questions.truncate(self.config.exam_target);

        self.persist(
            "exam questions",
            self.store.save_node_state(
                &path.id,
                node_id,
                NodeStatePatch {
                    exam_questions: Some(questions.clone()),
                    ..Default::default()
                },
            ),
        );
        Ok(questions)
    }

    /// Open an attempt over `questions`.
    pub fn start_exam(
        &self,
        path: &LearningPath,
        node_id: &str,
        questions: Vec<ExamQuestion>,
    ) -> Result<ExamAttempt, EngineError> {
        self.ensure_exam_open(path, node_id)?;
        Ok(ExamAttempt::new(node_id, questions, &self.config)?)
    }

    /// Persist a finished attempt and apply its score to the path.
    ///
    /// The attempt is consumed, so each attempt is scored at most once, and
    /// only against the node it was started for.
    pub async fn finish_exam(
        &self,
        path: &mut LearningPath,
        node_id: &str,
        attempt: ExamAttempt,
    ) -> Result<ExamResult, EngineError> {
        if attempt.node_id() != node_id {
            return Err(ExamError::WrongNode {
                attempt_node: attempt.node_id().to_string(),
                node_id: node_id.to_string(),
            }
            .into());
        }
        let summary: ExamSummary = attempt.summary().ok_or(ExamError::InvalidTransition {
            action: "finalize",
            phase: "in progress",
        })?;
        if summary.xp > 0 {
            self.observer.on_xp_awarded(summary.xp);
        }
        if summary.perfect {
            self.observer.on_perfect_score(node_id);
        }
        self.apply_score(path, node_id, summary.score()).await
    }

    /// Apply a manually supplied score. Values outside 0..=100 are rejected
    /// before they reach the path.
    pub async fn override_score(
        &self,
        path: &mut LearningPath,
        node_id: &str,
        raw_score: i64,
    ) -> Result<ExamResult, EngineError> {
        let score = ScoreOverride::new(raw_score)?;
        self.apply_score(path, node_id, score.into()).await
    }

    async fn apply_score(
        &self,
        path: &mut LearningPath,
        node_id: &str,
        score: Score,
    ) -> Result<ExamResult, EngineError> {
        let percentage = score.percentage;
        let progress = self.progression.record_exam(path, node_id, score)?;
        self.persist(
            "exam score",
            self.store.save_node_state(
                &path.id,
                node_id,
                NodeStatePatch {
                    exam_score: Some(percentage),
                    ..Default::default()
                },
            ),
        );
        if progress.newly_passed {
            self.observer.on_exam_passed(node_id, percentage);
        }

        let mut result = ExamResult {
            percentage,
            progress,
            extended: Vec::new(),
            extension_error: None,
        };
        if result.progress.needs_extension {
            match self.extend_path(path).await {
                Ok(added) => result.extended = added,
                Err(e) => {
                    tracing::warn!(path = %path.id, "path extension failed: {e}");
                    result.extension_error = Some(e.to_string());
                }
            }
        }
        self.persist("path", self.store.save_path(path));
        Ok(result)
    }

    /// Request and append new nodes after the path's last node, which must
    /// have passed.
    ///
    /// Returns the ids of the appended nodes. On failure the path is unchanged
    /// and the call can be repeated.
    pub async fn extend_path(&self, path: &mut LearningPath) -> Result<Vec<String>, EngineError> {
        if !self.progression.extension_due(path) {
            return Err(EngineError::ExtensionNotDue(path.id.clone()));
        }
        let last_title = path
            .nodes
            .last()
            .map(|n| n.title.clone())
            .unwrap_or_default();
        tracing::info!(path = %path.id, source = self.content.name(), "requesting path extension");
        let mut stubs = self
            .content
            .generate_path_extension(&path.topic, &last_title)
            .await
            .map_err(EngineError::Generation)?;
        if stubs.is_empty() {
            return Err(EngineError::Generation(anyhow::anyhow!(
                "content source returned no nodes"
            )));
        }

        let mut taken: HashSet<String> = path.nodes.iter().map(|n| n.id.clone()).collect();
        for stub in &mut stubs {
            if stub.id.trim().is_empty() || taken.contains(&stub.id) {
                stub.id = Uuid::new_v4().to_string();
            }
            taken.insert(stub.id.clone());
            stub.mastery_threshold = self.config.mastery_threshold;
        }
        let added: Vec<String> = stubs.iter().map(|n| n.id.clone()).collect();

        self.progression.extend(path, stubs);
        self.persist("path", self.store.save_path(path));
        self.observer.on_path_extended(&path.id, added.len());
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EngineEvent, RecordingObserver};
    use crate::model::{FlashcardDraft, LearningNode, NodeKind, QuestionKind};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const NOW: i64 = 1_700_000_000_000;

    struct StubSource {
        fail: bool,
    }

    #[async_trait]
    impl ContentSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate_flashcards(
            &self,
            title: &str,
            _: &str,
            count: usize,
        ) -> anyhow::Result<Vec<FlashcardDraft>> {
            anyhow::ensure!(!self.fail, "source offline");
            Ok((0..count + 5)
                .map(|i| FlashcardDraft {
                    front_text: format!("{title} {i}"),
                    back_text: format!("answer {i}"),
                })
                .collect())
        }

        async fn generate_exam(&self, _: &str, count: usize) -> anyhow::Result<Vec<ExamQuestion>> {
            anyhow::ensure!(!self.fail, "source offline");
            Ok((0..count)
                .map(|i| ExamQuestion {
                    id: format!("q{i}"),
                    prompt: format!("question {i}"),
                    explanation: None,
                    kind: QuestionKind::ShortAnswer {
                        correct_answer: "yes".into(),
                    },
                })
                .collect())
        }

        async fn generate_path_extension(
            &self,
            _: &str,
            _: &str,
        ) -> anyhow::Result<Vec<LearningNode>> {
            anyhow::ensure!(!self.fail, "source offline");
            Ok(vec![LearningNode::new("a", "Again", NodeKind::Practice)])
        }
    }

    fn engine(fail: bool) -> (NodeEngine, Arc<MemoryStore>, Arc<RecordingObserver>) {
        let store = Arc::new(MemoryStore::new());
        let observer = Arc::new(RecordingObserver::new());
        let config = EngineConfig {
            mastery_threshold: 3,
            flashcard_target: 5,
            exam_target: 2,
            ..Default::default()
        };
        let engine = NodeEngine::new(
            Arc::new(StubSource { fail }),
            store.clone(),
            observer.clone(),
            config,
        );
        (engine, store, observer)
    }

    fn path() -> LearningPath {
        let mut node = LearningNode::new("a", "Greetings", NodeKind::Theory);
        node.mastery_threshold = 3;
        LearningPath {
            id: "p".into(),
            topic: "Vietnamese".into(),
            nodes: vec![node],
        }
    }

    #[tokio::test]
    async fn generation_failure_commits_nothing() {
        let (engine, store, _) = engine(true);
        let mut path = engine.import_path(path()).unwrap();
        let err = engine.prepare_flashcards(&mut path, "a").await.unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));
        assert!(store.load_node_state("p", "a").unwrap().flashcards.is_empty());
    }

    #[tokio::test]
    async fn generated_deck_is_truncated_and_persisted() {
        let (engine, store, _) = engine(false);
        let mut path = engine.import_path(path()).unwrap();
        let deck = engine.prepare_flashcards(&mut path, "a").await.unwrap();
        assert_eq!(deck.len(), 5);
        assert!(deck.iter().all(|c| c.box_level == 0 && c.next_review_at == 0));
        assert_eq!(store.load_node_state("p", "a").unwrap().flashcards.len(), 5);

        // Second call reuses the stored deck.
        let again = engine.prepare_flashcards(&mut path, "a").await.unwrap();
        assert_eq!(again.ids(), deck.ids());
    }

    #[tokio::test]
    async fn study_unlocks_exam_and_offers_harvest() {
        let (engine, store, observer) = engine(false);
        let mut path = engine.import_path(path()).unwrap();
        let deck = engine.prepare_flashcards(&mut path, "a").await.unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut study = engine
            .start_study(&path, "a", deck, StudyMode::Due, NOW, &mut rng)
            .unwrap();

        let first = engine
            .record_outcome(&mut path, &mut study, Difficulty::Hard, NOW)
            .unwrap();
        assert_eq!(first.box_level, 0);
        assert!(!first.finished);

        let mut unlocked_at = None;
        let mut last = first;
        let mut steps = 1;
        while !study.is_finished() {
            last = engine
                .record_outcome(&mut path, &mut study, Difficulty::Easy, NOW)
                .unwrap();
            steps += 1;
            if last.exam_unlocked {
                unlocked_at = Some(steps);
            }
        }
        assert_eq!(unlocked_at, Some(4));
        assert!(last.harvest);
        assert_eq!(last.mastered, 5);
        assert_eq!(study.session().xp(), 25);

        let state = store.load_node_state("p", "a").unwrap();
        assert_eq!(state.mastered_count, 5);
        assert!(state.exam_unlocked);
        assert!(state.flashcards.iter().all(|c| c.box_level == 1));

        let events = observer.events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, EngineEvent::MasteryThresholdCrossed { .. }))
                .count(),
            1
        );
        assert!(events.contains(&EngineEvent::HarvestReady {
            node_id: "a".into()
        }));

        assert!(matches!(
            engine.record_outcome(&mut path, &mut study, Difficulty::Easy, NOW),
            Err(EngineError::SessionFinished(_))
        ));
    }

    #[tokio::test]
    async fn exam_requires_unlock() {
        let (engine, _, _) = engine(false);
        let mut path = engine.import_path(path()).unwrap();
        assert!(matches!(
            engine.prepare_exam(&mut path, "a").await,
            Err(EngineError::ExamLocked { .. })
        ));
    }

    #[tokio::test]
    async fn passing_last_node_extends_path() {
        let (engine, store, observer) = engine(false);
        let mut path = engine.import_path(path()).unwrap();
        path.nodes[0].exam_unlocked = true;

        let questions = engine.prepare_exam(&mut path, "a").await.unwrap();
        let mut attempt = engine.start_exam(&path, "a", questions).unwrap();
        while attempt.summary().is_none() {
            attempt.set_answer("yes").unwrap();
            attempt.check_answer().unwrap();
            attempt.advance().unwrap();
        }

        let result = engine.finish_exam(&mut path, "a", attempt).await.unwrap();
        assert_eq!(result.percentage, 100);
        assert!(result.progress.newly_passed);
        assert_eq!(result.extended.len(), 1);
        assert_ne!(result.extended[0], "a");
        assert_eq!(path.nodes.len(), 2);
        assert_eq!(path.nodes[1].status(), NodeStatus::Unlocked);
        assert_eq!(path.nodes[1].mastery_threshold, 3);
        assert_eq!(store.load_path("p").unwrap().unwrap().nodes.len(), 2);

        let events = observer.events();
        assert!(events.contains(&EngineEvent::PerfectScore {
            node_id: "a".into()
        }));
        assert!(events.contains(&EngineEvent::PathExtended {
            path_id: "p".into(),
            added: 1
        }));
    }

    #[tokio::test]
    async fn attempt_is_scored_only_for_its_node() {
        let (engine, _, observer) = engine(false);
        let mut path = engine.import_path(path()).unwrap();
        path.nodes.push(LearningNode::new("b", "Numbers", NodeKind::Practice));
        path.nodes[0].exam_unlocked = true;

        let questions = engine.prepare_exam(&mut path, "a").await.unwrap();
        let mut attempt = engine.start_exam(&path, "a", questions).unwrap();
        assert_eq!(attempt.node_id(), "a");
        while attempt.summary().is_none() {
            attempt.set_answer("yes").unwrap();
            attempt.check_answer().unwrap();
            attempt.advance().unwrap();
        }

        let err = engine
            .finish_exam(&mut path, "b", attempt.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Exam(ExamError::WrongNode { ref attempt_node, ref node_id })
                if attempt_node == "a" && node_id == "b"
        ));
        assert!(observer.events().is_empty());
        assert_eq!(path.nodes[1].exam_score, None);
        assert_eq!(path.nodes[1].status(), NodeStatus::Locked);

        engine.finish_exam(&mut path, "a", attempt).await.unwrap();
        let perfect = observer
            .events()
            .iter()
            .filter(|e| matches!(e, EngineEvent::PerfectScore { .. }))
            .count();
        assert_eq!(perfect, 1);
        assert_eq!(path.nodes[1].status(), NodeStatus::Unlocked);
    }

    #[tokio::test]
    async fn extension_waits_for_the_last_node_to_pass() {
        let (engine, _, observer) = engine(false);
        let mut path = engine.import_path(path()).unwrap();
        assert!(matches!(
            engine.extend_path(&mut path).await,
            Err(EngineError::ExtensionNotDue(_))
        ));
        assert_eq!(path.nodes.len(), 1);

        let result = engine.override_score(&mut path, "a", 80).await.unwrap();
        assert_eq!(result.extended.len(), 1);
        assert_eq!(path.nodes.len(), 2);

        // The appended node has not passed, so a second extension is refused.
        assert!(matches!(
            engine.extend_path(&mut path).await,
            Err(EngineError::ExtensionNotDue(_))
        ));
        assert_eq!(path.nodes.len(), 2);
        let extensions = observer
            .events()
            .iter()
            .filter(|e| matches!(e, EngineEvent::PathExtended { .. }))
            .count();
        assert_eq!(extensions, 1);
    }

    #[tokio::test]
    async fn override_score_is_validated() {
        let (engine, _, _) = engine(false);
        let mut path = engine.import_path(path()).unwrap();
        assert!(matches!(
            engine.override_score(&mut path, "a", 150).await,
            Err(EngineError::ScoreOutOfRange(150))
        ));
        assert_eq!(path.nodes[0].exam_score, None);

        let result = engine.override_score(&mut path, "a", 30).await.unwrap();
        assert!(!result.progress.newly_passed);
        assert_eq!(path.nodes[0].exam_score, Some(30));
    }

    #[tokio::test]
    async fn unfinished_attempt_cannot_be_finalized() {
        let (engine, _, _) = engine(false);
        let mut path = engine.import_path(path()).unwrap();
        path.nodes[0].exam_unlocked = true;
        let questions = engine.prepare_exam(&mut path, "a").await.unwrap();
        let attempt = engine.start_exam(&path, "a", questions).unwrap();
        assert!(matches!(
            engine.finish_exam(&mut path, "a", attempt).await,
            Err(EngineError::Exam(ExamError::InvalidTransition { .. }))
        ));
        assert_eq!(path.nodes[0].exam_score, None);
    }
}
