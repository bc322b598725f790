//! Engine policy configuration.
//!
//! Loaded from the `[engine]` table of `masterpath.toml`; every field has a
//! default so the table may be omitted entirely.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Tunable thresholds and rewards for the mastery/progression engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Mastered cards needed to unlock a node's exam, for nodes created by the engine.
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: u32,
    /// Minimum exam percentage that passes a node.
    #[serde(default = "default_pass_percentage")]
    pub pass_percentage: u8,
    /// Cards drawn at random when nothing is due.
    #[serde(default = "default_fallback_sample_size")]
    pub fallback_sample_size: usize,
    /// Flashcards requested per node.
    #[serde(default = "default_flashcard_target")]
    pub flashcard_target: usize,
    /// Exam questions requested per node.
    #[serde(default = "default_exam_target")]
    pub exam_target: usize,
    /// XP for every correct exam answer.
    #[serde(default = "default_streak_base_xp")]
    pub streak_base_xp: u32,
    /// Extra XP per streak step.
    #[serde(default = "default_streak_bonus_xp")]
    pub streak_bonus_xp: u32,
    /// XP for an "easy" flashcard outcome.
    #[serde(default = "default_study_easy_xp")]
    pub study_easy_xp: u32,
}

fn default_mastery_threshold() -> u32 {
    10
}
fn default_pass_percentage() -> u8 {
    50
}
fn default_fallback_sample_size() -> usize {
    10
}
fn default_flashcard_target() -> usize {
    30
}
fn default_exam_target() -> usize {
    20
}
fn default_streak_base_xp() -> u32 {
    10
}
fn default_streak_bonus_xp() -> u32 {
    2
}
fn default_study_easy_xp() -> u32 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: default_mastery_threshold(),
            pass_percentage: default_pass_percentage(),
            fallback_sample_size: default_fallback_sample_size(),
            flashcard_target: default_flashcard_target(),
            exam_target: default_exam_target(),
            streak_base_xp: default_streak_base_xp(),
            streak_bonus_xp: default_streak_bonus_xp(),
            study_easy_xp: default_study_easy_xp(),
        }
    }
}

impl EngineConfig {
    /// Reject policy values the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.mastery_threshold >= 1,
            "mastery_threshold must be at least 1"
        );
        anyhow::ensure!(
            self.pass_percentage <= 100,
            "pass_percentage must be between 0 and 100"
        );
        anyhow::ensure!(
            self.flashcard_target >= 1 && self.exam_target >= 1,
            "flashcard_target and exam_target must be at least 1"
        );
        Ok(())
    }
}
