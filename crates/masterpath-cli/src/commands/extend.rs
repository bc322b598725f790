//! The `masterpath extend` command.
//!
//! Retries a path extension that failed when the last node passed.

use anyhow::Result;

use super::{open_engine, Env};

pub async fn execute(env: &Env, path_id: &str) -> Result<()> {
    let engine = open_engine(env)?;
    let mut path = engine.load_path(path_id)?;
    let added = engine.extend_path(&mut path).await?;

    println!("Added {} node(s): {}", added.len(), added.join(", "));
    if let Some(first) = added.first() {
        println!("Unlocked: {first}");
    }
    Ok(())
}
