//! In-session study queue.
//!
//! A session holds card ids only; the cards themselves stay in the node's
//! [`Deck`]. Easy answers drop the current card from the queue, medium and
//! hard answers send it to the back. The session is over once the queue is
//! empty.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Deck, Difficulty};
use crate::scheduler::is_due;

/// How a session picks its cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    /// New and due cards, or a random sample when nothing is due.
    #[default]
    Due,
    /// The whole deck, unfiltered.
    Review,
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyMode::Due => write!(f, "due"),
            StudyMode::Review => write!(f, "review"),
        }
    }
}

impl FromStr for StudyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "due" | "new" => Ok(StudyMode::Due),
            "review" | "full" => Ok(StudyMode::Review),
            other => Err(format!("unknown study mode: {other}")),
        }
    }
}

/// Pick the card ids for a new session, in deck order.
///
/// In [`StudyMode::Due`], if no card is new or due, a random sample of
/// `fallback_sample_size` cards is drawn instead so that a non-empty deck
/// always yields a non-empty session.
pub fn select_candidates<R: Rng + ?Sized>(
    deck: &Deck,
    mode: StudyMode,
    now_ms: i64,
    fallback_sample_size: usize,
    rng: &mut R,
) -> Vec<Uuid> {
    match mode {
        StudyMode::Review => deck.ids(),
        StudyMode::Due => {
            let due: Vec<Uuid> = deck
                .iter()
                .filter(|card| is_due(card, now_ms))
                .map(|card| card.id)
                .collect();
            if !due.is_empty() {
                return due;
            }
            let ids = deck.ids();
            let sample: Vec<Uuid> = ids
                .choose_multiple(rng, fallback_sample_size)
                .copied()
                .collect();
            tracing::debug!(
                sampled = sample.len(),
                deck = deck.len(),
                "nothing due, falling back to a random sample"
            );
            sample
        }
    }
}

/// Ordering state for one study session.
#[derive(Debug, Clone)]
pub struct StudySession {
    mode: StudyMode,
    queue: VecDeque<Uuid>,
    revealed: bool,
    xp: u32,
    reviewed: u32,
}

impl StudySession {
    pub fn new(candidates: Vec<Uuid>, mode: StudyMode) -> Self {
        Self {
            mode,
            queue: candidates.into(),
            revealed: false,
            xp: 0,
            reviewed: 0,
        }
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    /// Card at the front of the queue.
    pub fn current(&self) -> Option<Uuid> {
        self.queue.front().copied()
    }

    /// Flip the current card to its back side.
    pub fn reveal(&mut self) {
        self.revealed = true;
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Requeue or retire the current card and move to the next one.
    ///
    /// Returns the new current card, or `None` once the session is finished.
    pub fn record_outcome(&mut self, difficulty: Difficulty) -> Option<Uuid> {
        let card = self.queue.pop_front()?;
        self.reviewed += 1;
        match difficulty {
            Difficulty::Easy => {
                tracing::debug!(%card, remaining = self.queue.len(), "card retired for this session");
            }
            Difficulty::Medium | Difficulty::Hard => {
                self.queue.push_back(card);
            }
        }
        self.revealed = false;
        self.current()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Number of outcomes recorded so far.
    pub fn reviewed(&self) -> u32 {
        self.reviewed
    }

    pub fn add_xp(&mut self, xp: u32) {
        self.xp += xp;
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }
}
