//! masterpath CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "masterpath",
    version,
    about = "Mastery-gated learning paths with flashcards and exams"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides `data_dir` from the config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example path
    Init,

    /// Validate path definition TOML files
    Validate {
        /// Path definition file or directory
        #[arg(long)]
        path: PathBuf,
    },

    /// Import a path definition into the data directory
    Import {
        /// Path definition file
        #[arg(long)]
        path: PathBuf,
    },

    /// Show progress for a path
    Status {
        #[arg(long)]
        path_id: String,
    },

    /// Study a node's flashcards (reads easy/medium/hard from stdin)
    Study {
        #[arg(long)]
        path_id: String,

        #[arg(long)]
        node: String,

        /// Review every card instead of only due ones
        #[arg(long)]
        review: bool,
    },

    /// Take a node's exam (reads one answer per line from stdin)
    Exam {
        #[arg(long)]
        path_id: String,

        #[arg(long)]
        node: String,
    },

    /// Replace a node's exam with a freshly generated one
    RegenerateExam {
        #[arg(long)]
        path_id: String,

        #[arg(long)]
        node: String,
    },

    /// Request new nodes for a path whose last node has passed
    Extend {
        #[arg(long)]
        path_id: String,
    },

    /// Record an exam score manually
    OverrideScore {
        #[arg(long)]
        path_id: String,

        #[arg(long)]
        node: String,

        /// Percentage, 0-100
        #[arg(long, allow_hyphen_values = true)]
        score: i64,
    },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "masterpath=info".parse::<tracing_subscriber::filter::Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let env = commands::Env {
        config_path: cli.config,
        data_dir: cli.data_dir,
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { path } => commands::validate::execute(path),
        Commands::Import { path } => commands::import::execute(&env, path),
        Commands::Status { path_id } => commands::status::execute(&env, &path_id),
        Commands::Study {
            path_id,
            node,
            review,
        } => commands::study::execute(&env, &path_id, &node, review).await,
        Commands::Exam { path_id, node } => commands::exam::execute(&env, &path_id, &node).await,
        Commands::RegenerateExam { path_id, node } => {
            commands::regenerate::execute(&env, &path_id, &node).await
        }
        Commands::Extend { path_id } => commands::extend::execute(&env, &path_id).await,
        Commands::OverrideScore {
            path_id,
            node,
            score,
        } => commands::override_score::execute(&env, &path_id, &node, score).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
