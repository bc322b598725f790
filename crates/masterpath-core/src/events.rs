//! Outbound engine notifications.
//!
//! Gamification and UI reactions hang off these hooks so the engine itself
//! stays free of presentation concerns.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Observer trait for engine side effects. Hooks return nothing.
pub trait ProgressObserver: Send + Sync {
    fn on_mastery_threshold_crossed(&self, node_id: &str, mastered: u32);
    fn on_exam_passed(&self, node_id: &str, score: u8);
    fn on_path_extended(&self, path_id: &str, added: usize);
    fn on_harvest_ready(&self, node_id: &str);
    fn on_xp_awarded(&self, amount: u32);
    fn on_perfect_score(&self, node_id: &str);
}

/// No-op observer.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_mastery_threshold_crossed(&self, _: &str, _: u32) {}
    fn on_exam_passed(&self, _: &str, _: u8) {}
    fn on_path_extended(&self, _: &str, _: usize) {}
    fn on_harvest_ready(&self, _: &str) {}
    fn on_xp_awarded(&self, _: u32) {}
    fn on_perfect_score(&self, _: &str) {}
}

/// A notification as a value, for channel- and log-based observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    MasteryThresholdCrossed { node_id: String, mastered: u32 },
    ExamPassed { node_id: String, score: u8 },
    PathExtended { path_id: String, added: usize },
    HarvestReady { node_id: String },
    XpAwarded { amount: u32 },
    PerfectScore { node_id: String },
}

/// Forwards every hook into an unbounded tokio channel.
///
/// A closed receiver is ignored.
pub struct ChannelObserver {
    tx: UnboundedSender<EngineEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_mastery_threshold_crossed(&self, node_id: &str, mastered: u32) {
        self.send(EngineEvent::MasteryThresholdCrossed {
            node_id: node_id.to_string(),
            mastered,
        });
    }

    fn on_exam_passed(&self, node_id: &str, score: u8) {
        self.send(EngineEvent::ExamPassed {
            node_id: node_id.to_string(),
            score,
        });
    }

    fn on_path_extended(&self, path_id: &str, added: usize) {
        self.send(EngineEvent::PathExtended {
            path_id: path_id.to_string(),
            added,
        });
    }

    fn on_harvest_ready(&self, node_id: &str) {
        self.send(EngineEvent::HarvestReady {
            node_id: node_id.to_string(),
        });
    }

    fn on_xp_awarded(&self, amount: u32) {
        self.send(EngineEvent::XpAwarded { amount });
    }

    fn on_perfect_score(&self, node_id: &str) {
        self.send(EngineEvent::PerfectScore {
            node_id: node_id.to_string(),
        });
    }
}

/// Keeps every event in memory. Useful in tests.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn push(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_mastery_threshold_crossed(&self, node_id: &str, mastered: u32) {
        self.push(EngineEvent::MasteryThresholdCrossed {
            node_id: node_id.to_string(),
            mastered,
        });
    }

    fn on_exam_passed(&self, node_id: &str, score: u8) {
        self.push(EngineEvent::ExamPassed {
            node_id: node_id.to_string(),
            score,
        });
    }

    fn on_path_extended(&self, path_id: &str, added: usize) {
        self.push(EngineEvent::PathExtended {
            path_id: path_id.to_string(),
            added,
        });
    }

    fn on_harvest_ready(&self, node_id: &str) {
        self.push(EngineEvent::HarvestReady {
            node_id: node_id.to_string(),
        });
    }

    fn on_xp_awarded(&self, amount: u32) {
        self.push(EngineEvent::XpAwarded { amount });
    }

    fn on_perfect_score(&self, node_id: &str) {
        self.push(EngineEvent::PerfectScore {
            node_id: node_id.to_string(),
        });
    }
}
