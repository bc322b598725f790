//! End-to-end engine flows against the mock content source.

use std::sync::Arc;

use masterpath_core::config::EngineConfig;
use masterpath_core::engine::NodeEngine;
use masterpath_core::error::EngineError;
use masterpath_core::events::{EngineEvent, RecordingObserver};
use masterpath_core::exam::Advance;
use masterpath_core::model::{Difficulty, LearningNode, LearningPath, NodeKind, NodeStatus};
use masterpath_core::session::StudyMode;
use masterpath_core::store::{JsonFileStore, MemoryStore};
use masterpath_core::traits::Persistence;
use masterpath_providers::mock::MockContentSource;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000_000;

struct Harness {
    engine: NodeEngine,
    source: Arc<MockContentSource>,
    observer: Arc<RecordingObserver>,
}

fn harness(store: Arc<dyn Persistence>, config: EngineConfig) -> Harness {
    let source = Arc::new(MockContentSource::new());
    let observer = Arc::new(RecordingObserver::new());
    let engine = NodeEngine::new(source.clone(), store, observer.clone(), config);
    Harness {
        engine,
        source,
        observer,
    }
}

fn three_node_path(kind: NodeKind, threshold: u32) -> LearningPath {
    let nodes = ["a", "b", "c"]
        .iter()
        .map(|id| {
            let mut node = LearningNode::new(*id, format!("Node {id}"), kind);
            node.mastery_threshold = threshold;
            node
        })
        .collect();
    LearningPath {
        id: "path".into(),
        topic: "Vietnamese".into(),
        nodes,
    }
}

fn count(events: &[EngineEvent], pred: impl Fn(&EngineEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

/// Study every queued card of `node_id` with the given outcome until the
/// session ends. Returns whether the harvest step was offered.
async fn study_all(
    h: &Harness,
    path: &mut LearningPath,
    node_id: &str,
    mode: StudyMode,
    difficulty: Difficulty,
) -> bool {
    let deck = h.engine.prepare_flashcards(path, node_id).await.unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut study = h
        .engine
        .start_study(path, node_id, deck, mode, NOW, &mut rng)
        .unwrap();
    let mut harvest = false;
    while !study.is_finished() {
        let report = h
            .engine
            .record_outcome(path, &mut study, difficulty, NOW)
            .unwrap();
        harvest |= report.harvest;
    }
    harvest
}

#[tokio::test]
async fn tenth_mastered_card_unlocks_exam_once() {
    let config = EngineConfig {
        mastery_threshold: 10,
        flashcard_target: 30,
        ..Default::default()
    };
    let h = harness(Arc::new(MemoryStore::new()), config);
    let mut path = h
        .engine
        .import_path(three_node_path(NodeKind::Practice, 10))
        .unwrap();

    let deck = h.engine.prepare_flashcards(&mut path, "a").await.unwrap();
    assert_eq!(deck.len(), 30);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut study = h
        .engine
        .start_study(&path, "a", deck, StudyMode::Due, NOW, &mut rng)
        .unwrap();

    let mut unlocked_at = Vec::new();
    let mut step = 0;
    while !study.is_finished() {
        step += 1;
        let report = h
            .engine
            .record_outcome(&mut path, &mut study, Difficulty::Easy, NOW)
            .unwrap();
        if report.exam_unlocked {
            unlocked_at.push(step);
        }
    }
    assert_eq!(unlocked_at, vec![10]);

    // Dropping below the threshold and climbing back does not re-fire.
    let deck = h.engine.prepare_flashcards(&mut path, "a").await.unwrap();
    let mut study = h
        .engine
        .start_study(&path, "a", deck, StudyMode::Review, NOW, &mut rng)
        .unwrap();
    for _ in 0..25 {
        let report = h
            .engine
            .record_outcome(&mut path, &mut study, Difficulty::Hard, NOW)
            .unwrap();
        assert!(!report.exam_unlocked);
    }
    assert_eq!(path.node("a").unwrap().mastered_count, 5);
    while !study.is_finished() {
        let report = h
            .engine
            .record_outcome(&mut path, &mut study, Difficulty::Easy, NOW)
            .unwrap();
        assert!(!report.exam_unlocked);
    }

    let crossings = count(&h.observer.events(), |e| {
        matches!(e, EngineEvent::MasteryThresholdCrossed { .. })
    });
    assert_eq!(crossings, 1);
    assert!(path.node("a").unwrap().exam_unlocked);
}

#[tokio::test]
async fn scores_gate_the_next_node() {
    let h = harness(Arc::new(MemoryStore::new()), EngineConfig::default());
    let mut path = h
        .engine
        .import_path(three_node_path(NodeKind::Practice, 10))
        .unwrap();
    assert_eq!(path.node("a").unwrap().status(), NodeStatus::Unlocked);
    assert_eq!(path.node("b").unwrap().status(), NodeStatus::Locked);

    let result = h.engine.override_score(&mut path, "a", 60).await.unwrap();
    assert!(result.progress.newly_passed);
    assert_eq!(result.progress.unlocked.as_deref(), Some("b"));
    assert_eq!(path.node("b").unwrap().status(), NodeStatus::Unlocked);
    assert_eq!(path.node("c").unwrap().status(), NodeStatus::Locked);

    let result = h.engine.override_score(&mut path, "b", 40).await.unwrap();
    assert!(!result.progress.newly_passed);
    assert_eq!(result.progress.unlocked, None);
    assert_eq!(path.node("b").unwrap().exam_score, Some(40));
    assert_eq!(path.node("c").unwrap().status(), NodeStatus::Locked);

    assert!(matches!(
        h.engine.prepare_flashcards(&mut path, "c").await,
        Err(EngineError::NodeLocked(_))
    ));
    assert_eq!(h.source.extension_calls(), 0);
}

#[tokio::test]
async fn perfect_exam_on_last_node_extends_path_once() {
    let config = EngineConfig {
        mastery_threshold: 4,
        flashcard_target: 3,
        exam_target: 4,
        ..Default::default()
    };
    let h = harness(Arc::new(MemoryStore::new()), config);
    let mut path = h
        .engine
        .import_path(three_node_path(NodeKind::Practice, 2))
        .unwrap();
    h.engine.override_score(&mut path, "a", 80).await.unwrap();
    h.engine.override_score(&mut path, "b", 80).await.unwrap();

    study_all(&h, &mut path, "c", StudyMode::Due, Difficulty::Easy).await;
    assert!(path.node("c").unwrap().exam_unlocked);

    let questions = h.engine.prepare_exam(&mut path, "c").await.unwrap();
    assert_eq!(questions.len(), 4);
    let mut attempt = h.engine.start_exam(&path, "c", questions).unwrap();
    let mut xp = Vec::new();
    loop {
        let answer = attempt
            .current_question()
            .map(|q| q.kind.correct_answer().to_string())
            .unwrap();
        attempt.set_answer(answer).unwrap();
        let outcome = attempt.check_answer().unwrap();
        assert!(outcome.correct);
        xp.push(outcome.xp_awarded);
        if let Advance::Finished(summary) = attempt.advance().unwrap() {
            assert!(summary.perfect);
            break;
        }
    }
    assert_eq!(xp, vec![12, 14, 16, 18]);

    let result = h.engine.finish_exam(&mut path, "c", attempt).await.unwrap();
    assert_eq!(result.percentage, 100);
    assert!(result.progress.newly_passed);
    assert_eq!(result.extended, vec!["ext-1", "ext-2", "ext-3"]);
    assert_eq!(result.extension_error, None);
    assert_eq!(h.source.extension_calls(), 1);

    assert_eq!(path.nodes.len(), 6);
    assert_eq!(path.node("ext-1").unwrap().status(), NodeStatus::Unlocked);
    assert_eq!(path.node("ext-2").unwrap().status(), NodeStatus::Locked);
    assert_eq!(path.node("ext-3").unwrap().status(), NodeStatus::Locked);
    assert!(path.nodes[3..].iter().all(|n| n.mastery_threshold == 4));

    // A later override on an already passed node does not extend again.
    h.engine.override_score(&mut path, "c", 90).await.unwrap();
    assert_eq!(h.source.extension_calls(), 1);

    let events = h.observer.events();
    assert!(events.contains(&EngineEvent::PerfectScore {
        node_id: "c".into()
    }));
    assert!(events.contains(&EngineEvent::XpAwarded { amount: 60 }));
    assert_eq!(
        count(&events, |e| matches!(e, EngineEvent::PathExtended { .. })),
        1
    );
}

#[tokio::test]
async fn failed_extension_keeps_the_score_and_can_be_retried() {
    let h = harness(Arc::new(MemoryStore::new()), EngineConfig::default());
    let mut path = h
        .engine
        .import_path(three_node_path(NodeKind::Practice, 10))
        .unwrap();
    h.engine.override_score(&mut path, "a", 70).await.unwrap();
    h.engine.override_score(&mut path, "b", 70).await.unwrap();

    h.source.set_failing(true);
    let result = h.engine.override_score(&mut path, "c", 70).await.unwrap();
    assert!(result.progress.newly_passed);
    assert!(result.extended.is_empty());
    assert!(result.extension_error.is_some());
    assert_eq!(path.nodes.len(), 3);
    assert_eq!(path.node("c").unwrap().status(), NodeStatus::Passed);

    h.source.set_failing(false);
    let added = h.engine.extend_path(&mut path).await.unwrap();
    assert_eq!(added.len(), 3);
    assert_eq!(path.node("ext-1").unwrap().status(), NodeStatus::Unlocked);
    assert_eq!(h.source.extension_calls(), 2);

    // Once extended, the path refuses to grow until the new tail passes.
    assert!(matches!(
        h.engine.extend_path(&mut path).await,
        Err(EngineError::ExtensionNotDue(_))
    ));
    assert_eq!(path.nodes.len(), 6);
    assert_eq!(h.source.extension_calls(), 2);
}

#[tokio::test]
async fn rescoring_the_stranded_last_node_retries_extension() {
    let h = harness(Arc::new(MemoryStore::new()), EngineConfig::default());
    let mut path = h
        .engine
        .import_path(three_node_path(NodeKind::Practice, 10))
        .unwrap();
    assert!(matches!(
        h.engine.extend_path(&mut path).await,
        Err(EngineError::ExtensionNotDue(_))
    ));
    h.engine.override_score(&mut path, "a", 70).await.unwrap();
    h.engine.override_score(&mut path, "b", 70).await.unwrap();

    h.source.set_failing(true);
    let failed = h.engine.override_score(&mut path, "c", 70).await.unwrap();
    assert!(failed.extension_error.is_some());
    assert_eq!(path.frontier(), None);

    h.source.set_failing(false);
    let retried = h.engine.override_score(&mut path, "c", 100).await.unwrap();
    assert!(!retried.progress.newly_passed);
    assert!(retried.progress.needs_extension);
    assert_eq!(retried.extended, vec!["ext-1", "ext-2", "ext-3"]);
    assert_eq!(retried.extension_error, None);
    assert_eq!(path.nodes.len(), 6);
    assert_eq!(path.frontier().map(|n| n.id.as_str()), Some("ext-1"));
    assert_eq!(h.source.extension_calls(), 2);

    let extensions = count(&h.observer.events(), |e| {
        matches!(e, EngineEvent::PathExtended { .. })
    });
    assert_eq!(extensions, 1);
}

#[tokio::test]
async fn generation_failure_leaves_node_untouched() {
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone(), EngineConfig::default());
    let mut path = h
        .engine
        .import_path(three_node_path(NodeKind::Theory, 10))
        .unwrap();

    h.source.set_failing(true);
    let err = h
        .engine
        .prepare_flashcards(&mut path, "a")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Generation(_)));
    assert!(err.to_string().contains("mock content source is failing"));

    let state = store.load_node_state("path", "a").unwrap();
    assert!(state.flashcards.is_empty());
    assert_eq!(state.mastered_count, 0);

    h.source.set_failing(false);
    let deck = h.engine.prepare_flashcards(&mut path, "a").await.unwrap();
    assert_eq!(deck.len(), 30);
    assert_eq!(h.source.flashcard_calls(), 2);
}

#[tokio::test]
async fn harvest_is_offered_once_per_theory_node() {
    let config = EngineConfig {
        flashcard_target: 4,
        ..Default::default()
    };
    let h = harness(Arc::new(MemoryStore::new()), config);
    let mut path = h
        .engine
        .import_path(three_node_path(NodeKind::Theory, 10))
        .unwrap();

    assert!(!study_all(&h, &mut path, "a", StudyMode::Review, Difficulty::Easy).await);
    assert!(study_all(&h, &mut path, "a", StudyMode::Due, Difficulty::Easy).await);
    assert!(!study_all(&h, &mut path, "a", StudyMode::Due, Difficulty::Easy).await);

    let harvests = count(&h.observer.events(), |e| {
        matches!(e, EngineEvent::HarvestReady { .. })
    });
    assert_eq!(harvests, 1);
}

#[tokio::test]
async fn progress_survives_an_engine_restart() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig {
        flashcard_target: 5,
        ..Default::default()
    };

    let first = harness(Arc::new(JsonFileStore::new(dir.path())), config.clone());
    let mut path = first
        .engine
        .import_path(three_node_path(NodeKind::Practice, 3))
        .unwrap();
    study_all(&first, &mut path, "a", StudyMode::Due, Difficulty::Easy).await;
    first.engine.override_score(&mut path, "a", 55).await.unwrap();
    drop(first);

    let second = harness(Arc::new(JsonFileStore::new(dir.path())), config);
    let mut path = second.engine.load_path("path").unwrap();
    assert_eq!(path.node("a").unwrap().status(), NodeStatus::Passed);
    assert_eq!(path.node("a").unwrap().exam_score, Some(55));
    assert_eq!(path.node("b").unwrap().status(), NodeStatus::Unlocked);

    let state = second.engine.sync_node(&mut path, "a").unwrap();
    assert_eq!(state.mastered_count, 5);
    assert!(state.exam_unlocked);

    let deck = second.engine.prepare_flashcards(&mut path, "a").await.unwrap();
    assert!(deck.iter().all(|card| card.box_level == 1));
    assert!(deck.iter().all(|card| card.next_review_at > NOW));
    assert_eq!(second.source.flashcard_calls(), 0);

    assert!(matches!(
        second.engine.load_path("missing"),
        Err(EngineError::UnknownPath(_))
    ));
}
