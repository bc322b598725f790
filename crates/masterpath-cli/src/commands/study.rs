//! The `masterpath study` command.
//!
//! Each card is shown front and back; the learner answers with one line:
//! `easy`, `medium` or `hard` (or `e`/`m`/`h`, `1`/`2`/`3`). An empty line,
//! `q` or end of input stops the session. Outcomes already given are saved.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};

use masterpath_core::model::Difficulty;
use masterpath_core::session::StudyMode;

use super::{now_ms, open_engine, Env};

pub async fn execute(env: &Env, path_id: &str, node_id: &str, review: bool) -> Result<()> {
    let engine = open_engine(env)?;
    let mut path = engine.load_path(path_id)?;
    let deck = engine.prepare_flashcards(&mut path, node_id).await?;

    let mode = if review {
        StudyMode::Review
    } else {
        StudyMode::Due
    };
    let mut rng = StdRng::from_entropy();
    let mut study = engine.start_study(&path, node_id, deck, mode, now_ms(), &mut rng)?;
    println!(
        "Studying {node_id} ({mode}): {} card(s)",
        study.session().remaining()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(card) = study.current_card() {
        println!("\n{}", card.front_text);
        study.reveal();
        if let Some(card) = study.current_card() {
            println!("  -> {}", card.back_text);
        }
        println!("How well did you know it? [easy/medium/hard]");

        let difficulty = loop {
            let Some(line) = lines.next_line().await? else {
                break None;
            };
            let input = line.trim();
            if input.is_empty() || input.eq_ignore_ascii_case("q") {
                break None;
            }
            match input.parse::<Difficulty>() {
                Ok(d) => break Some(d),
                Err(e) => println!("{e}"),
            }
        };
        let Some(difficulty) = difficulty else {
            println!(
                "\nSession stopped: {} reviewed, {} XP",
                study.session().reviewed(),
                study.session().xp()
            );
            return Ok(());
        };

        let report = engine.record_outcome(&mut path, &mut study, difficulty, now_ms())?;
        println!(
            "  box {} | mastered {} | {} left",
            report.box_level,
            report.mastered,
            study.session().remaining()
        );
        if report.exam_unlocked {
            println!("Exam unlocked! Run: masterpath exam --path-id {path_id} --node {node_id}");
        }
        if report.harvest {
            println!("Harvest time: you can now put these words to use.");
        }
    }

    println!(
        "\nSession complete: {} reviewed, {} XP",
        study.session().reviewed(),
        study.session().xp()
    );
    Ok(())
}
