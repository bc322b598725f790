//! Subcommand implementations and the setup they share.

pub mod exam;
pub mod extend;
pub mod import;
pub mod init;
pub mod override_score;
pub mod regenerate;
pub mod status;
pub mod study;
pub mod validate;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use masterpath_core::engine::NodeEngine;
use masterpath_core::events::ProgressObserver;
use masterpath_core::store::JsonFileStore;
use masterpath_core::traits::ContentSource;
use masterpath_providers::config::load_config_from;
use masterpath_providers::{create_content_source, UnavailableSource};

/// Global options shared by every subcommand.
pub struct Env {
    pub config_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

/// Console progress observer.
struct ConsoleObserver;

impl ProgressObserver for ConsoleObserver {
    fn on_mastery_threshold_crossed(&self, node_id: &str, mastered: u32) {
        eprintln!("  Exam unlocked for {node_id} ({mastered} cards mastered)");
    }

    fn on_exam_passed(&self, node_id: &str, score: u8) {
        eprintln!("  Passed {node_id} with {score}%");
    }

    fn on_path_extended(&self, path_id: &str, added: usize) {
        eprintln!("  Path {path_id} extended with {added} new node(s)");
    }

    fn on_harvest_ready(&self, node_id: &str) {
        eprintln!("  Harvest ready for {node_id}");
    }

    fn on_xp_awarded(&self, amount: u32) {
        tracing::debug!(amount, "xp awarded");
    }

    fn on_perfect_score(&self, node_id: &str) {
        eprintln!("  Perfect score on {node_id}!");
    }
}

/// Build the engine from config: JSON store under the data directory, the
/// configured content source, console observer.
///
/// A missing provider only fails once something needs generating.
pub fn open_engine(env: &Env) -> Result<NodeEngine> {
    let config = load_config_from(env.config_path.as_deref())?;
    let data_dir = env.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());

    let content: Arc<dyn ContentSource> = match create_content_source(&config) {
        Ok(source) => source,
        Err(e) => {
            tracing::debug!("content generation disabled: {e:#}");
            Arc::new(UnavailableSource::new(format!("{e:#}")))
        }
    };

    Ok(NodeEngine::new(
        content,
        Arc::new(JsonFileStore::new(data_dir)),
        Arc::new(ConsoleObserver),
        config.engine,
    ))
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
