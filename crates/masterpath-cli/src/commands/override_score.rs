//! The `masterpath override-score` command.

use anyhow::Result;

use super::{open_engine, Env};

pub async fn execute(env: &Env, path_id: &str, node_id: &str, score: i64) -> Result<()> {
    let engine = open_engine(env)?;
    let mut path = engine.load_path(path_id)?;
    let result = engine.override_score(&mut path, node_id, score).await?;

    println!("Recorded {}% for {node_id}", result.percentage);
    if result.progress.newly_passed {
        println!("Passed!");
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
