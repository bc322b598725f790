//! The `masterpath status` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{open_engine, Env};

pub fn execute(env: &Env, path_id: &str) -> Result<()> {
    let engine = open_engine(env)?;
    let mut path = engine.load_path(path_id)?;
    let ids: Vec<String> = path.nodes.iter().map(|n| n.id.clone()).collect();
    for id in &ids {
        engine.sync_node(&mut path, id)?;
    }

    println!("{} ({})", path.topic, path.id);

    let mut table = Table::new();
    table.set_header(vec![
        "Node", "Title", "Kind", "Status", "Mastered", "Exam", "Score",
    ]);

    for row in path.summary() {
        let exam = if row.exam_unlocked { "unlocked" } else { "locked" };
        let score = row
            .exam_score
            .map(|s| format!("{s}%"))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&row.id),
            Cell::new(&row.title),
            Cell::new(row.kind),
            Cell::new(row.status),
            Cell::new(format!("{}/{}", row.mastered_count, row.mastery_threshold)),
            Cell::new(exam),
            Cell::new(score),
        ]);
    }

    println!("{table}");

    Ok(())
}
