//! External block definitions
//!
//! Declarative blocks loaded from `*.yaml`, `*.yml` and `*.json` files in a
//! directory (no recursion). A file that fails to parse is logged and skipped.

use crate::blocks::{ContextBlock, EndpointInfo};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBlockDefinition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scoring: Option<ScoreRules>,
    #[serde(default)]
    pub examples: Vec<BlockExample>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRules {
    #[serde(default)]
    pub base_score: Option<f64>,
    #[serde(default)]
    pub path_patterns: Vec<WeightedPattern>,
    #[serde(default)]
    pub operation_patterns: Vec<WeightedPattern>,
    #[serde(default)]
    pub schema_patterns: Vec<WeightedPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedPattern {
    pub pattern: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockExample {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub json: String,
}

/// A block backed by an [`ExternalBlockDefinition`]; patterns are compiled once.
pub struct ExternalContextBlock {
    id: String,
    definition: ExternalBlockDefinition,
    base_score: f64,
    path_patterns: Vec<(Regex, f64)>,
    operation_patterns: Vec<(Regex, f64)>,
    schema_patterns: Vec<(Regex, f64)>,
}

impl ExternalContextBlock {
    /// Build a block; `fallback_id` is used when the definition carries none.
    pub fn new(definition: ExternalBlockDefinition, fallback_id: &str) -> Self {
        let id = definition
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| fallback_id.to_string());
        let scoring = definition.scoring.clone().unwrap_or_default();

        Self {
            base_score: scoring.base_score.unwrap_or(0.0),
            path_patterns: compile_all(&id, &scoring.path_patterns),
            operation_patterns: compile_all(&id, &scoring.operation_patterns),
            schema_patterns: compile_all(&id, &scoring.schema_patterns),
            id,
            definition,
        }
    }

    pub fn definition(&self) -> &ExternalBlockDefinition {
        &self.definition
    }

    fn example_for(&self, path: &str, method: &str) -> Option<&BlockExample> {
        self.definition
            .examples
            .iter()
            .find(|example| condition_matches(example.condition.as_deref(), path, method))
            .or_else(|| self.definition.examples.first())
    }
}

fn compile_all(id: &str, patterns: &[WeightedPattern]) -> Vec<(Regex, f64)> {
    patterns
        .iter()
        .filter_map(|p| {
            match RegexBuilder::new(&p.pattern).case_insensitive(true).build() {
                Ok(regex) => Some((regex, p.score)),
                Err(e) => {
                    warn!(block = id, pattern = %p.pattern, error = %e, "Invalid block pattern ignored");
                    None
                }
            }
        })
        .collect()
}

fn weigh(patterns: &[(Regex, f64)], text: &str) -> f64 {
    patterns
        .iter()
        .filter(|(regex, _)| regex.is_match(text))
        .map(|(_, score)| score)
        .sum()
}

/// `path:x` tests for a path substring, `method:X` for the method; anything
/// else matches either. Empty conditions always match.
fn condition_matches(condition: Option<&str>, path: &str, method: &str) -> bool {
    let condition = match condition.map(str::trim).filter(|c| !c.is_empty()) {
        Some(condition) => condition.to_lowercase(),
        None => return true,
    };
    let path = path.to_lowercase();

    if let Some(at) = condition.find("path:") {
        return path.contains(condition[at + 5..].trim());
    }
    if let Some(at) = condition.find("method:") {
        return method.eq_ignore_ascii_case(condition[at + 7..].trim());
    }
    path.contains(&condition) || method.eq_ignore_ascii_case(&condition)
}

impl ContextBlock for ExternalContextBlock {
    fn id(&self) -> &str {
        &self.id
    }

    fn score(&self, info: &EndpointInfo) -> f64 {
        let operation = info.operation_id.as_deref().unwrap_or_default();
        let total = self.base_score
            + weigh(&self.path_patterns, &info.path)
            + weigh(&self.operation_patterns, operation)
            + weigh(&self.schema_patterns, &info.schema_minified);
        total.clamp(0.0, 1.0)
    }

    fn render(&self, info: &EndpointInfo) -> String {
        let mut text = String::new();
        if let Some(name) = &self.definition.name {
            text.push_str(&name.to_uppercase());
            text.push_str(" CONTEXT:\n");
        }

        if let Some(example) = self.example_for(&info.path, &info.method) {
            text.push_str("Example ");
            text.push_str(example.name.as_deref().unwrap_or("response"));
            text.push_str(":\n");
            text.push_str(&example.json);
            text.push('\n');
        }

        if !self.definition.rules.is_empty() {
            text.push_str("\nRules for your response:\n");
            for rule in &self.definition.rules {
                text.push_str("- ");
                text.push_str(rule);
                text.push('\n');
            }
        }
        text
    }
}

/// Loads external block definitions from one directory
#[derive(Debug, Clone)]
pub struct ExternalBlockLoader {
    enabled: bool,
    directory: PathBuf,
}

impl ExternalBlockLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            directory: directory.into(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Load every definition file, sorted by file name. A missing directory
    /// yields no blocks.
    pub fn load(&self) -> Vec<ExternalContextBlock> {
        if !self.enabled {
            info!("External block loading is disabled");
            return Vec::new();
        }

        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    directory = %self.directory.display(),
                    error = %e,
                    "External blocks directory not readable"
                );
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && block_format(path).is_some())
            .collect();
        files.sort();

        let blocks: Vec<ExternalContextBlock> =
            files.iter().filter_map(|path| load_block_file(path)).collect();

        info!(
            count = blocks.len(),
            directory = %self.directory.display(),
            "Loaded external context blocks"
        );
        blocks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockFormat {
    Json,
    Yaml,
}

fn block_format(path: &Path) -> Option<BlockFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "json" => Some(BlockFormat::Json),
        "yaml" | "yml" => Some(BlockFormat::Yaml),
        _ => None,
    }
}

fn load_block_file(path: &Path) -> Option<ExternalContextBlock> {
    let format = block_format(path)?;
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            error!(file = %path.display(), error = %e, "Failed to read block file");
            return None;
        }
    };

    let parsed = match format {
        BlockFormat::Json => {
            serde_json::from_str::<ExternalBlockDefinition>(&text).map_err(|e| e.to_string())
        }
        BlockFormat::Yaml => {
            serde_yaml::from_str::<ExternalBlockDefinition>(&text).map_err(|e| e.to_string())
        }
    };

    match parsed {
        Ok(definition) => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("block")
                .to_lowercase();
            let block = ExternalContextBlock::new(definition, &format!("external.{}", stem));
            info!(block = block.id(), file = %path.display(), "Loaded external block");
            Some(block)
        }
        Err(e) => {
            error!(file = %path.display(), error = %e, "Failed to load block file");
            None
        }
    }
}
