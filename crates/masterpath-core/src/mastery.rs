//! Node mastery tracking.
//!
//! Mastery is always recomputed from the full deck rather than counted up,
//! so a card knocked back to box 0 lowers the count again.

use crate::model::{Deck, LearningNode};

/// Emitted the first time a node's mastered count reaches its threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdCrossed {
    pub node_id: String,
    pub mastered: u32,
    pub threshold: u32,
}

/// Number of cards with a box above 0.
pub fn compute_mastered(deck: &Deck) -> u32 {
    deck.iter().filter(|card| card.is_mastered()).count() as u32
}

/// Refresh the node's mastered count and unlock its exam on the first crossing.
///
/// The node's `exam_unlocked` flag guards the event, so later recomputations
/// (including ones that dip below the threshold and come back) never re-fire it.
pub fn observe(node: &mut LearningNode, deck: &Deck) -> Option<ThresholdCrossed> {
    let mastered = compute_mastered(deck);
    node.mastered_count = mastered;

    if node.exam_unlocked || mastered < node.mastery_threshold {
        return None;
    }

    node.exam_unlocked = true;
    tracing::info!(
        node = %node.id,
        mastered,
        threshold = node.mastery_threshold,
        "mastery threshold reached, exam unlocked"
    );
    Some(ThresholdCrossed {
        node_id: node.id.clone(),
        mastered,
        threshold: node.mastery_threshold,
    })
}
