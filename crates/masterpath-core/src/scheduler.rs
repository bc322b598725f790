//! Leitner box scheduling.
//!
//! A recall outcome moves a card between boxes:
//! - hard: back to box 0, due immediately
//! - medium: box unchanged, due immediately
//! - easy: one box up, due after the interval of the new box
//!
//! Intervals per box: 1 → 4h, 2 → 1d, 3 → 3d, 4 → 7d, 5 → 14d, 6+ → 30d.
//! There is no upper bound on the box; past 6 the 30 day interval repeats.

use chrono::Duration;
use uuid::Uuid;

use crate::model::{Difficulty, Flashcard, FlashcardDraft};

/// The new scheduling fields for a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub box_level: u32,
    pub next_review_at: i64,
}

/// Review interval, in milliseconds, for a card that has just entered `box_level`.
pub fn review_interval_ms(box_level: u32) -> i64 {
    let interval = match box_level {
        0 => Duration::zero(),
        1 => Duration::hours(4),
        2 => Duration::days(1),
        3 => Duration::days(3),
        4 => Duration::days(7),
        5 => Duration::days(14),
        _ => Duration::days(30),
    };
    interval.num_milliseconds()
}

/// Compute the next box and review time. Pure: the card is not modified.
pub fn schedule(card: &Flashcard, difficulty: Difficulty, now_ms: i64) -> ScheduleOutcome {
    match difficulty {
        Difficulty::Hard => ScheduleOutcome {
            box_level: 0,
            next_review_at: now_ms,
        },
        Difficulty::Medium => ScheduleOutcome {
            box_level: card.box_level,
            next_review_at: now_ms,
        },
        Difficulty::Easy => {
            let box_level = card.box_level.saturating_add(1);
            ScheduleOutcome {
                box_level,
                next_review_at: now_ms + review_interval_ms(box_level),
            }
        }
    }
}

/// Schedule the card and write the outcome into it.
pub fn apply(card: &mut Flashcard, difficulty: Difficulty, now_ms: i64) -> ScheduleOutcome {
    let outcome = schedule(card, difficulty, now_ms);
    tracing::debug!(
        card = %card.id,
        %difficulty,
        from = card.box_level,
        to = outcome.box_level,
        "scheduled card"
    );
    card.box_level = outcome.box_level;
    card.next_review_at = outcome.next_review_at;
    card.last_reviewed_at = Some(now_ms);
    outcome
}

/// Turn a generated draft into a fresh, unscheduled card.
pub fn new_card(draft: FlashcardDraft) -> Flashcard {
    Flashcard {
        id: Uuid::new_v4(),
        front_text: draft.front_text,
        back_text: draft.back_text,
        box_level: 0,
        next_review_at: 0,
        last_reviewed_at: None,
    }
}

/// Whether a card belongs in a "new/due" study session at `now_ms`.
pub fn is_due(card: &Flashcard, now_ms: i64) -> bool {
    card.box_level == 0 || card.next_review_at <= now_ms
}
