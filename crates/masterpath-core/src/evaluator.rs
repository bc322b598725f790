//! Exam answer evaluation.
//!
//! Multiple choice compares the chosen option index verbatim. Every other
//! question type compares normalized text: lowercase, a fixed punctuation set
//! stripped, whitespace runs collapsed, ends trimmed.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{ExamQuestion, QuestionKind};

/// Characters removed before comparing free-text answers.
const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`', '~',
    '(', ')',
];

/// Filler words mixed into a generated word bank.
pub const FILLER_WORDS: &[&str] = &["the", "a", "is", "and", "of", "to", "in", "it"];

/// How many filler words a generated bank receives.
const FALLBACK_FILLER_COUNT: usize = 4;

/// Normalize a free-text answer for comparison.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();

    // Collapse runs of two or more whitespace characters into one space.
    // A single whitespace character is kept as it is.
    let mut out = String::with_capacity(stripped.len());
    let mut run = String::new();
    for c in stripped.chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        flush_whitespace(&mut out, &mut run);
        out.push(c);
    }
    flush_whitespace(&mut out, &mut run);

    out.trim().to_string()
}

fn flush_whitespace(out: &mut String, run: &mut String) {
    match run.chars().count() {
        0 => {}
        1 => out.push_str(run),
        _ => out.push(' '),
    }
    run.clear();
}

/// Judge one answer. A missing answer is treated as the empty string.
pub fn evaluate(question: &ExamQuestion, user_answer: Option<&str>) -> bool {
    let answer = user_answer.unwrap_or_default();
    match &question.kind {
        QuestionKind::MultipleChoice { correct_answer, .. } => answer == correct_answer,
        QuestionKind::FillGap { correct_answer, .. }
        | QuestionKind::ArrangeWords { correct_answer, .. }
        | QuestionKind::ShortAnswer { correct_answer } => {
            normalize(answer) == normalize(correct_answer)
        }
    }
}

/// Options to present for a question.
///
/// Multiple choice options keep their order since answers are indices into
/// them. When a fill-gap or arrange-words question arrives without a bank,
/// one is built from the answer's tokens plus filler words, then shuffled.
pub fn word_bank<R: Rng + ?Sized>(question: &ExamQuestion, rng: &mut R) -> Vec<String> {
    match &question.kind {
        QuestionKind::MultipleChoice { options, .. } => options.clone(),
        QuestionKind::ShortAnswer { .. } => Vec::new(),
        QuestionKind::FillGap {
            options,
            correct_answer,
        }
        | QuestionKind::ArrangeWords {
            options,
            correct_answer,
        } => {
            if !options.is_empty() {
                return options.clone();
            }
            tracing::debug!(question = %question.id, "no word bank supplied, building one");
            fallback_bank(correct_answer, rng)
        }
    }
}

fn fallback_bank<R: Rng + ?Sized>(correct_answer: &str, rng: &mut R) -> Vec<String> {
    let mut bank: Vec<String> = correct_answer
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let fillers: Vec<String> = FILLER_WORDS
        .iter()
        .filter(|filler| !bank.iter().any(|t| t.eq_ignore_ascii_case(filler)))
        .take(FALLBACK_FILLER_COUNT)
        .map(|filler| filler.to_string())
        .collect();
    bank.extend(fillers);
    bank.shuffle(rng);
    bank
}

/// Tracks which bank tokens the learner has placed into their answer.
///
/// A token can be placed at most as many times as it still appears unused in
/// the bank, so the assembled answer is always constructible from the bank.
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    tokens: Vec<String>,
    picked: Vec<usize>,
}

impl WordBank {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            picked: Vec::new(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// How many more times `token` can be placed.
    pub fn available(&self, token: &str) -> usize {
        let total = self.tokens.iter().filter(|t| *t == token).count();
        let used = self
            .picked
            .iter()
            .filter(|&&i| self.tokens[i] == token)
            .count();
        total - used
    }

    /// Place `token` into the answer. Returns `false` if none is left.
    pub fn pick(&mut self, token: &str) -> bool {
        let slot = self
            .tokens
            .iter()
            .enumerate()
            .find(|(i, t)| *t == token && !self.picked.contains(i))
            .map(|(i, _)| i);
        match slot {
            Some(i) => {
                self.picked.push(i);
                true
            }
            None => false,
        }
    }

    /// Take back the most recently placed token.
    pub fn unpick_last(&mut self) -> Option<&str> {
        self.picked.pop().map(|i| self.tokens[i].as_str())
    }

    pub fn clear(&mut self) {
        self.picked.clear();
    }

    /// The answer assembled so far, tokens joined by single spaces.
    pub fn answer(&self) -> String {
        self.picked
            .iter()
            .map(|&i| self.tokens[i].as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
