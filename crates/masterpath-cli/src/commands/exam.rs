//! The `masterpath exam` command.
//!
//! One answer per line. Multiple choice takes the option number. Fill-gap
//! and arrange-words questions accept typed text or bank positions prefixed
//! with `#` (`#2 0 1`). End of input abandons the attempt without saving it.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};

use masterpath_core::evaluator::{word_bank, WordBank};
use masterpath_core::exam::{Advance, ExamSummary};
use masterpath_core::model::{ExamQuestion, QuestionKind};

use super::{open_engine, Env};

/// Turn `#2 0 1` into the bank tokens at those positions.
fn assemble_from_bank(input: &str, bank: &[String]) -> Option<String> {
    let picks = input.strip_prefix('#')?;
    let mut words = WordBank::new(bank.to_vec());
    for pick in picks.split_whitespace() {
        let index: usize = pick.parse().ok()?;
        let token = bank.get(index)?;
        if !words.pick(token) {
            return None;
        }
    }
    Some(words.answer())
}

/// The answer to submit for one input line.
fn resolve_answer(question: &ExamQuestion, line: String, bank: &[String]) -> String {
    match question.kind {
        QuestionKind::FillGap { .. } | QuestionKind::ArrangeWords { .. } => {
            assemble_from_bank(line.trim(), bank).unwrap_or(line)
        }
        QuestionKind::MultipleChoice { .. } | QuestionKind::ShortAnswer { .. } => line,
    }
}

fn present(question: &ExamQuestion, bank: &[String], position: usize, total: usize) {
    println!("\n[{}/{}] {}", position + 1, total, question.prompt);
    match &question.kind {
        QuestionKind::MultipleChoice { options, .. } => {
            for (i, option) in options.iter().enumerate() {
                println!("  {i}) {option}");
            }
        }
        QuestionKind::FillGap { .. } | QuestionKind::ArrangeWords { .. } => {
            let listed: Vec<String> = bank
                .iter()
                .enumerate()
                .map(|(i, t)| format!("{i}:{t}"))
                .collect();
            println!("  words: {}", listed.join("  "));
        }
        QuestionKind::ShortAnswer { .. } => {}
    }
}

pub async fn execute(env: &Env, path_id: &str, node_id: &str) -> Result<()> {
    let engine = open_engine(env)?;
    let mut path = engine.load_path(path_id)?;
    let questions = engine.prepare_exam(&mut path, node_id).await?;
    let mut attempt = engine.start_exam(&path, node_id, questions)?;
    let total = attempt.len();
    println!("Exam for {node_id}: {total} question(s)");

    let mut rng = StdRng::from_entropy();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut position = 0;

    let summary: ExamSummary = loop {
        let Some(question) = attempt.current_question().cloned() else {
            anyhow::bail!("exam has no current question");
        };
        let bank = word_bank(&question, &mut rng);
        present(&question, &bank, position, total);

        let Some(line) = lines.next_line().await? else {
            println!("\nExam abandoned; nothing was saved.");
            return Ok(());
        };
        let answer = resolve_answer(&question, line, &bank);
        attempt.set_answer(answer)?;

        let outcome = attempt.check_answer()?;
        if outcome.correct {
            println!(
                "  Correct! +{} XP (streak {})",
                outcome.xp_awarded, outcome.streak
            );
        } else {
            println!("  Incorrect. Answer: {}", outcome.correct_answer);
        }
        if let Some(explanation) = &outcome.explanation {
            println!("  {explanation}");
        }

        match attempt.advance()? {
            Advance::Next(next) => position = next,
            Advance::Finished(summary) => break summary,
        }
    };

    println!(
        "\nScore: {}% ({}/{} correct), {} XP",
        summary.percentage, summary.correct, summary.total, summary.xp
    );

    let result = engine.finish_exam(&mut path, node_id, attempt).await?;
    let passed = path.node(node_id).is_some_and(|node| node.passed);
    if result.progress.newly_passed {
        println!("Passed!");
    } else if !passed {
        println!(
            "Not passed yet (need {}%).",
            engine.config().pass_percentage
        );
    }
    if let Some(next) = &result.progress.unlocked {
        println!("Unlocked: {next}");
    }
    if !result.extended.is_empty() {
        println!("New nodes: {}", result.extended.join(", "));
    }
    if let Some(error) = &result.extension_error {
        println!("Path extension failed: {error}");
    }

    Ok(())
}
