//! The `masterpath regenerate-exam` command.

use anyhow::Result;

use super::{open_engine, Env};

pub async fn execute(env: &Env, path_id: &str, node_id: &str) -> Result<()> {
    let engine = open_engine(env)?;
    let mut path = engine.load_path(path_id)?;
    let questions = engine.regenerate_exam(&mut path, node_id).await?;
    println!(
        "Generated {} new question(s) for {node_id}",
        questions.len()
    );
    Ok(())
}
