//! The `masterpath validate` command.

use std::path::PathBuf;

use anyhow::Result;

use masterpath_core::parser::{load_path_directory, parse_path, validate_path};

pub fn execute(path: PathBuf) -> Result<()> {
    let paths = if path.is_dir() {
        load_path_directory(&path)?
    } else {
        vec![parse_path(&path)?]
    };

    let mut total_warnings = 0;

    for learning_path in &paths {
        println!(
            "Path: {} ({} nodes)",
            learning_path.topic,
            learning_path.nodes.len()
        );

        let warnings = validate_path(learning_path);
        for w in &warnings {
            let prefix = w
                .node_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All paths valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
