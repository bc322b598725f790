//! The `masterpath init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("masterpath.toml").exists() {
        println!("masterpath.toml already exists, skipping.");
    } else {
        std::fs::write("masterpath.toml", SAMPLE_CONFIG)?;
        println!("Created masterpath.toml");
    }

    std::fs::create_dir_all("paths")?;
    let example_path = std::path::Path::new("paths/example.toml");
    if example_path.exists() {
        println!("paths/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_PATH)?;
        println!("Created paths/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit masterpath.toml with your API keys");
    println!("  2. Run: masterpath import --path paths/example.toml");
    println!("  3. Run: masterpath study --path-id vietnamese-basics --node greetings");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# masterpath configuration

default_provider = "anthropic"
default_model = "claude-sonnet-4-20250514"
temperature = 0.7
data_dir = "./masterpath-data"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[engine]
mastery_threshold = 10
pass_percentage = 50
flashcard_target = 30
exam_target = 20
"#;

const EXAMPLE_PATH: &str = r#"[path]
id = "vietnamese-basics"
topic = "Vietnamese"

[[nodes]]
id = "greetings"
title = "Greetings"
description = "Hello, goodbye, thank you and other everyday phrases"
kind = "theory"

[[nodes]]
id = "numbers"
title = "Numbers"
description = "Counting from one to one hundred"
kind = "practice"

[[nodes]]
id = "ordering-food"
title = "Ordering food"
description = "Ordering at a street stall and paying"
kind = "challenge"
mastery_threshold = 15
"#;
