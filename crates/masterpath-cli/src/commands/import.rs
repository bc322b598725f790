//! The `masterpath import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use masterpath_core::error::EngineError;
use masterpath_core::parser::{parse_path, validate_path};

use super::{open_engine, Env};

pub fn execute(env: &Env, path: PathBuf) -> Result<()> {
    let learning_path = parse_path(&path)?;

    let warnings = validate_path(&learning_path);
    for w in &warnings {
        eprintln!("WARNING: {}", w.message);
    }
    anyhow::ensure!(
        warnings.is_empty(),
        "{} has {} validation warning(s); fix them before importing",
        path.display(),
        warnings.len()
    );

    let engine = open_engine(env)?;
    match engine.load_path(&learning_path.id) {
        Ok(_) => anyhow::bail!("path '{}' is already imported", learning_path.id),
        Err(EngineError::UnknownPath(_)) => {}
        Err(e) => return Err(e).context("failed to check existing paths"),
    }

    let imported = engine.import_path(learning_path)?;
    println!(
        "Imported '{}' ({}, {} nodes)",
        imported.id,
        imported.topic,
        imported.nodes.len()
    );
    if let Some(first) = imported.nodes.first() {
        println!("Start with: masterpath study --path-id {} --node {}", imported.id, first.id);
    }

    Ok(())
}
