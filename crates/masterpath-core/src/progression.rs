//! Node lock/unlock/pass transitions.
//!
//! Nodes unlock strictly in order: the first node on initialization, every
//! later node when its predecessor passes. A node passes the first time an
//! exam attempt reaches the pass percentage and can never fall back.

use crate::error::EngineError;
use crate::model::{LearningNode, LearningPath, NodeKind, NodeStatus};
use crate::session::StudyMode;

/// What a finalized exam score did to the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamProgress {
    /// The score crossed the pass percentage for the first time.
    pub newly_passed: bool,
    /// Id of the node unlocked as a consequence.
    pub unlocked: Option<String>,
    /// The scored node is the path's last one and has passed; new nodes
    /// should be requested. Stays set on re-scores until an extension lands.
    pub needs_extension: bool,
}

/// A finalized score: the rounded percentage shown to the learner and the
/// ratio it was rounded from. Passing is decided on the ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub percentage: u8,
    correct: u32,
    total: u32,
}

impl Score {
    pub fn from_ratio(correct: u32, total: u32) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            ((correct as f64 / total as f64) * 100.0).round() as u8
        };
        Self {
            percentage,
            correct,
            total,
        }
    }

    /// `correct / total >= pass_percentage / 100`, without rounding.
    pub fn passes(&self, pass_percentage: u8) -> bool {
        self.total > 0
            && u64::from(self.correct) * 100 >= u64::from(pass_percentage) * u64::from(self.total)
    }
}

impl From<ScoreOverride> for Score {
    fn from(score: ScoreOverride) -> Self {
        Self::from_ratio(u32::from(score.value()), 100)
    }
}

/// A manually supplied score that has been checked at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOverride(u8);

impl ScoreOverride {
    pub fn new(raw: i64) -> Result<Self, EngineError> {
        match u8::try_from(raw) {
            Ok(score) if score <= 100 => Ok(Self(score)),
            _ => Err(EngineError::ScoreOutOfRange(raw)),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Applies progression rules to a path.
#[derive(Debug, Clone, Copy)]
pub struct ProgressionStateMachine {
    pass_percentage: u8,
}

impl ProgressionStateMachine {
    pub fn new(pass_percentage: u8) -> Self {
        Self { pass_percentage }
    }

    pub fn pass_percentage(&self) -> u8 {
        self.pass_percentage
    }

    /// Unlock the first node of a path that has none unlocked yet.
    pub fn initialize(&self, path: &mut LearningPath) {
        if let Some(first) = path.nodes.first_mut() {
            if first.locked {
                tracing::info!(path = %path.id, node = %first.id, "unlocking first node");
                first.locked = false;
            }
        }
    }

    /// Whether the path may grow: its last node has passed.
    pub fn extension_due(&self, path: &LearningPath) -> bool {
        path.nodes.last().is_some_and(|node| node.passed)
    }

    /// Fold a finalized score into the path.
    pub fn record_exam(
        &self,
        path: &mut LearningPath,
        node_id: &str,
        score: Score,
    ) -> Result<ExamProgress, EngineError> {
        let position = path
            .position(node_id)
            .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
        let is_last = position + 1 == path.nodes.len();
        let node = &mut path.nodes[position];
        if node.status() == NodeStatus::Locked {
            return Err(EngineError::NodeLocked(node_id.to_string()));
        }

        let percentage = score.percentage;
        node.exam_score = Some(percentage);
        if node.passed || !score.passes(self.pass_percentage) {
            return Ok(ExamProgress {
                newly_passed: false,
                unlocked: None,
                needs_extension: is_last && node.passed,
            });
        }

        node.passed = true;
        tracing::info!(path = %path.id, node = %node_id, percentage, "node passed");

        let unlocked = path.nodes.get_mut(position + 1).and_then(|next| {
            if next.locked {
                next.locked = false;
                tracing::info!(node = %next.id, "unlocked by predecessor");
                Some(next.id.clone())
            } else {
                None
            }
        });

        Ok(ExamProgress {
            newly_passed: true,
            unlocked,
            needs_extension: is_last,
        })
    }

    /// Append extension nodes. They arrive locked with no progress; the first
    /// one unlocks if the current last node has already passed.
    ///
    /// Returns the id of the node unlocked, if any.
    pub fn extend(&self, path: &mut LearningPath, nodes: Vec<LearningNode>) -> Option<String> {
        let predecessor_passed = path.nodes.last().map_or(true, |n| n.passed);
        let first_new = path.nodes.len();

        for mut node in nodes {
            node.locked = true;
            node.passed = false;
            node.mastered_count = 0;
            node.exam_unlocked = false;
            node.exam_score = None;
            node.harvest_offered = false;
            path.nodes.push(node);
        }

        match path.nodes.get_mut(first_new) {
            Some(node) if predecessor_passed => {
                node.locked = false;
                tracing::info!(path = %path.id, node = %node.id, "extension node unlocked");
                Some(node.id.clone())
            }
            _ => None,
        }
    }

    /// Whether finishing a study session should offer the harvest step.
    ///
    /// Only theory nodes, only non-review sessions, only once per node.
    pub fn complete_study(&self, node: &mut LearningNode, mode: StudyMode) -> bool {
        if node.kind != NodeKind::Theory || mode == StudyMode::Review || node.harvest_offered {
            return false;
        }
        node.harvest_offered = true;
        true
    }
}
