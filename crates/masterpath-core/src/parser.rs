//! TOML learning path parser.
//!
//! Loads path definitions from TOML files and directories, and validates them.
//!
//! ```toml
//! [path]
//! id = "vietnamese-basics"
//! topic = "Vietnamese"
//!
//! [[nodes]]
//! id = "greetings"
//! title = "Greetings"
//! kind = "theory"
//! mastery_threshold = 10
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{default_mastery_threshold, LearningNode, LearningPath, NodeKind};

#[derive(Debug, Deserialize)]
struct TomlPathFile {
    path: TomlPathHeader,
    #[serde(default)]
    nodes: Vec<TomlNode>,
}

#[derive(Debug, Deserialize)]
struct TomlPathHeader {
    id: String,
    topic: String,
}

#[derive(Debug, Deserialize)]
struct TomlNode {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default = "default_mastery_threshold")]
    mastery_threshold: u32,
}

/// Parse a single TOML file into a `LearningPath`.
pub fn parse_path(path: &Path) -> Result<LearningPath> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read path file: {}", path.display()))?;

    parse_path_str(&content, path)
}

/// Parse a TOML string into a `LearningPath`. Every node starts locked.
pub fn parse_path_str(content: &str, source_path: &Path) -> Result<LearningPath> {
    let parsed: TomlPathFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let nodes = parsed
        .nodes
        .into_iter()
        .map(|n| {
            let kind: NodeKind = match n.kind {
                Some(kind) => kind.parse().map_err(|e: String| anyhow::anyhow!("{e}"))?,
                None => NodeKind::default(),
            };
            let mut node = LearningNode::new(n.id, n.title, kind);
            node.description = n.description;
            node.mastery_threshold = n.mastery_threshold;
            Ok(node)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LearningPath {
        id: parsed.path.id,
        topic: parsed.path.topic,
        nodes,
    })
}

/// Recursively load all `.toml` path files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_path_directory(dir: &Path) -> Result<Vec<LearningPath>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let file = entry?.path();
        if file.is_dir() {
            paths.extend(load_path_directory(&file)?);
        } else if file.extension().is_some_and(|ext| ext == "toml") {
            match parse_path(&file) {
                Ok(path) => paths.push(path),
                Err(e) => tracing::warn!("skipping {}: {e:#}", file.display()),
            }
        }
    }

    Ok(paths)
}

/// A warning from path validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The node ID (if applicable).
    pub node_id: Option<String>,
    pub message: String,
}

/// Validate a learning path for common issues.
pub fn validate_path(path: &LearningPath) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if path.nodes.is_empty() {
        warnings.push(ValidationWarning {
            node_id: None,
            message: "path has no nodes".into(),
        });
    }
    if path.topic.trim().is_empty() {
        warnings.push(ValidationWarning {
            node_id: None,
            message: "topic is empty".into(),
        });
    }

    let mut seen = HashSet::new();
    for node in &path.nodes {
        if !seen.insert(node.id.as_str()) {
            warnings.push(ValidationWarning {
                node_id: Some(node.id.clone()),
                message: format!("duplicate node ID: {}", node.id),
            });
        }
        if node.title.trim().is_empty() {
            warnings.push(ValidationWarning {
                node_id: Some(node.id.clone()),
                message: "title is empty".into(),
            });
        }
        // Zero would unlock the exam before any card is studied.
        if node.mastery_threshold == 0 {
            warnings.push(ValidationWarning {
                node_id: Some(node.id.clone()),
                message: "mastery_threshold is 0".into(),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeStatus;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[path]
id = "vietnamese-basics"
topic = "Vietnamese"

[[nodes]]
id = "greetings"
title = "Greetings"
description = "Hello, goodbye and thank you"
kind = "theory"

[[nodes]]
id = "numbers"
title = "Numbers"
kind = "practice"
mastery_threshold = 15
"#;

    #[test]
    fn parse_valid_toml() {
        let path = parse_path_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(path.id, "vietnamese-basics");
        assert_eq!(path.topic, "Vietnamese");
        assert_eq!(path.nodes.len(), 2);
        assert_eq!(path.nodes[0].mastery_threshold, 10);
        assert_eq!(path.nodes[0].description, "Hello, goodbye and thank you");
        assert_eq!(path.nodes[1].kind, NodeKind::Practice);
        assert_eq!(path.nodes[1].mastery_threshold, 15);
        assert!(path.nodes.iter().all(|n| n.status() == NodeStatus::Locked));
        assert!(validate_path(&path).is_empty());
    }

    #[test]
    fn parse_unknown_kind_fails() {
        let toml = r#"
[path]
id = "p"
topic = "T"

[[nodes]]
id = "a"
title = "A"
kind = "boss"
"#;
        let err = parse_path_str(toml, &PathBuf::from("test.toml")).unwrap_err();
        assert!(err.to_string().contains("unknown node kind"));
    }

    #[test]
    fn parse_malformed_toml() {
        let result = parse_path_str("this is not [valid toml }{", &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn validate_reports_problems() {
        let toml = r#"
[path]
id = "p"
topic = "T"

[[nodes]]
id = "same"
title = "First"
mastery_threshold = 0

[[nodes]]
id = "same"
title = " "
"#;
        let path = parse_path_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_path(&path);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
        assert!(warnings.iter().any(|w| w.message.contains("title is empty")));
        assert!(warnings.iter().any(|w| w.message.contains("mastery_threshold")));
    }

    #[test]
    fn validate_empty_path() {
        let path = parse_path_str("[path]\nid = \"p\"\ntopic = \"T\"\n", &PathBuf::from("t.toml"))
            .unwrap();
        let warnings = validate_path(&path);
        assert!(warnings.iter().any(|w| w.message == "path has no nodes"));
    }

    #[test]
    fn load_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("bad.toml"), "nope = [").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let paths = load_path_directory(dir.path()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].id, "vietnamese-basics");
    }
}
