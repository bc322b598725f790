//! One exam attempt.
//!
//! The attempt moves through `Presenting(i) → Checked(i) → Presenting(i+1)`
//! until the last question is checked and continued, at which point it is
//! `Finished` and the percentage is fixed. Nothing is persisted until then;
//! dropping an unfinished attempt discards it entirely.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ExamError;
use crate::evaluator::evaluate;
use crate::model::ExamQuestion;
use crate::progression::Score;

/// Where the attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamPhase {
    Presenting(usize),
    Checked(usize),
    Finished,
}

impl ExamPhase {
    fn name(&self) -> &'static str {
        match self {
            ExamPhase::Presenting(_) => "presenting",
            ExamPhase::Checked(_) => "checked",
            ExamPhase::Finished => "finished",
        }
    }
}

/// The learner's answer to one question and whether it was right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub answer: String,
    pub correct: bool,
}

/// Feedback after checking an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub correct: bool,
    pub xp_awarded: u32,
    pub streak: u32,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// Result of continuing past a checked question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Finished(ExamSummary),
}

/// Final numbers of a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSummary {
    pub percentage: u8,
    pub correct: u32,
    pub total: u32,
    pub xp: u32,
    pub perfect: bool,
}

impl ExamSummary {
    /// The score to fold into the path.
    pub fn score(&self) -> Score {
        Score::from_ratio(self.correct, self.total)
    }
}

/// State of one exam attempt.
#[derive(Debug, Clone)]
pub struct ExamAttempt {
    node_id: String,
    questions: Vec<ExamQuestion>,
    pending_answer: Option<String>,
    answers: Vec<AnswerRecord>,
    phase: ExamPhase,
    streak: u32,
    xp: u32,
    base_xp: u32,
    bonus_xp: u32,
    summary: Option<ExamSummary>,
}

impl ExamAttempt {
    pub fn new(
        node_id: impl Into<String>,
        questions: Vec<ExamQuestion>,
        config: &EngineConfig,
    ) -> Result<Self, ExamError> {
        if questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }
        Ok(Self {
            node_id: node_id.into(),
            questions,
            pending_answer: None,
            answers: Vec::new(),
            phase: ExamPhase::Presenting(0),
            streak: 0,
            xp: 0,
            base_xp: config.streak_base_xp,
            bonus_xp: config.streak_bonus_xp,
            summary: None,
        })
    }

    /// The node this attempt examines.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn phase(&self) -> ExamPhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The question being presented or just checked.
    pub fn current_question(&self) -> Option<&ExamQuestion> {
        match self.phase {
            ExamPhase::Presenting(i) | ExamPhase::Checked(i) => self.questions.get(i),
            ExamPhase::Finished => None,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn summary(&self) -> Option<ExamSummary> {
        self.summary
    }

    /// Record the learner's answer for the presented question.
    pub fn set_answer(&mut self, answer: impl Into<String>) -> Result<(), ExamError> {
        match self.phase {
            ExamPhase::Presenting(_) => {
                self.pending_answer = Some(answer.into());
                Ok(())
            }
            other => Err(ExamError::InvalidTransition {
                action: "answer",
                phase: other.name(),
            }),
        }
    }

    /// Evaluate the pending answer and move to `Checked`.
    pub fn check_answer(&mut self) -> Result<CheckOutcome, ExamError> {
        let index = match self.phase {
            ExamPhase::Presenting(i) => i,
            other => {
                return Err(ExamError::InvalidTransition {
                    action: "check an answer",
                    phase: other.name(),
                })
            }
        };
        let question = &self.questions[index];
        let answer = self.pending_answer.take();
        let correct = evaluate(question, answer.as_deref());

        let xp_awarded = if correct {
            self.streak += 1;
            self.base_xp + self.streak * self.bonus_xp
        } else {
            self.streak = 0;
            0
        };
        self.xp += xp_awarded;

        self.answers.push(AnswerRecord {
            question_id: question.id.clone(),
            answer: answer.unwrap_or_default(),
            correct,
        });
        self.phase = ExamPhase::Checked(index);

        Ok(CheckOutcome {
            correct,
            xp_awarded,
            streak: self.streak,
            correct_answer: question.kind.correct_answer().to_string(),
            explanation: question.explanation.clone(),
        })
    }

    /// Continue past a checked question, finishing after the last one.
    pub fn advance(&mut self) -> Result<Advance, ExamError> {
        let index = match self.phase {
            ExamPhase::Checked(i) => i,
            other => {
                return Err(ExamError::InvalidTransition {
                    action: "continue",
                    phase: other.name(),
                })
            }
        };

        if index + 1 < self.questions.len() {
            self.phase = ExamPhase::Presenting(index + 1);
            return Ok(Advance::Next(index + 1));
        }

        let total = self.questions.len() as u32;
        let correct = self.answers.iter().filter(|a| a.correct).count() as u32;
        let percentage = Score::from_ratio(correct, total).percentage;
        let summary = ExamSummary {
            percentage,
            correct,
            total,
            xp: self.xp,
            perfect: percentage == 100,
        };
        self.phase = ExamPhase::Finished;
        self.summary = Some(summary);
        Ok(Advance::Finished(summary))
    }
}
