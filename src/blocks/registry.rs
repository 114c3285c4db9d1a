//! Context Selector
//!
//! Ranks every registered block for an endpoint and greedily fills a bounded
//! character budget. Selection never fails: a block that panics while scoring
//! or rendering is treated as irrelevant.

use crate::blocks::{builtin_blocks, ContextBlock, EndpointInfo, ExternalBlockLoader, GENERIC_BLOCK_ID};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Character budget floor applied whatever the caller asks for.
pub const MIN_BUDGET_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionBudget {
    pub max_blocks: usize,
    pub min_score: f64,
    pub budget_chars: usize,
}

impl Default for SelectionBudget {
    fn default() -> Self {
        Self {
            max_blocks: 2,
            min_score: 0.25,
            budget_chars: 3000,
        }
    }
}

/// A chosen block with the text it rendered during selection
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedBlock {
    pub id: String,
    pub score: f64,
    pub text: String,
}

pub struct ContextRegistry {
    builtin: Vec<Arc<dyn ContextBlock>>,
    external: RwLock<Vec<Arc<dyn ContextBlock>>>,
    loader: ExternalBlockLoader,
}

impl ContextRegistry {
    /// Built-in blocks followed by whatever `loader` finds.
    pub fn new(loader: ExternalBlockLoader) -> Self {
        let registry = Self {
            builtin: builtin_blocks(),
            external: RwLock::new(Vec::new()),
            loader,
        };
        registry.reload();
        registry
    }

    /// Registry over an explicit block list; reloads are no-ops.
    pub fn with_blocks(blocks: Vec<Arc<dyn ContextBlock>>) -> Self {
        Self {
            builtin: blocks,
            external: RwLock::new(Vec::new()),
            loader: ExternalBlockLoader::disabled(),
        }
    }

    /// Re-read external definitions and return how many were loaded.
    pub fn reload(&self) -> usize {
        let loaded: Vec<Arc<dyn ContextBlock>> = self
            .loader
            .load()
            .into_iter()
            .map(|block| Arc::new(block) as Arc<dyn ContextBlock>)
            .collect();
        let count = loaded.len();
        *self.external.write() = loaded;
        info!(
            builtin = self.builtin.len(),
            external = count,
            "Context registry initialized"
        );
        count
    }

    /// Registration order: built-in first, then external.
    pub fn blocks(&self) -> Vec<Arc<dyn ContextBlock>> {
        let mut all = self.builtin.clone();
        all.extend(self.external.read().iter().cloned());
        all
    }

    /// Safe score of every block, in registration order.
    pub fn scores(&self, info: &EndpointInfo) -> Vec<(String, f64)> {
        self.blocks()
            .iter()
            .map(|block| (block.id().to_string(), safe_score(block.as_ref(), info)))
            .collect()
    }

    pub fn select(&self, info: &EndpointInfo, budget: SelectionBudget) -> Vec<SelectedBlock> {
        let blocks = self.blocks();

        let mut ranked: Vec<(&Arc<dyn ContextBlock>, f64)> = blocks
            .iter()
            .map(|block| (block, safe_score(block.as_ref(), info)))
            .filter(|(_, score)| *score >= budget.min_score)
            .collect();
        // sort_by is stable, so ties keep registration order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        debug!(
            candidates = %ranked
                .iter()
                .take(5)
                .map(|(block, score)| format!("{}:{:.2}", block.id(), score))
                .collect::<Vec<_>>()
                .join(", "),
            "Context block candidates"
        );

        let mut remaining = budget.budget_chars.max(MIN_BUDGET_CHARS);
        let mut chosen = Vec::new();
        for (block, score) in ranked {
            if chosen.len() >= budget.max_blocks {
                break;
            }
            let Some(text) = safe_render(block.as_ref(), info) else {
                continue;
            };
            let len = text.chars().count();
            if len <= remaining {
                remaining -= len;
                chosen.push(SelectedBlock {
                    id: block.id().to_string(),
                    score,
                    text,
                });
            }
        }

        if chosen.is_empty() && budget.max_blocks > 0 {
            if let Some(fallback) = blocks.iter().find(|b| b.id() == GENERIC_BLOCK_ID) {
                if let Some(text) = safe_render(fallback.as_ref(), info) {
                    if text.chars().count() <= remaining {
                        chosen.push(SelectedBlock {
                            id: fallback.id().to_string(),
                            score: safe_score(fallback.as_ref(), info),
                            text,
                        });
                    }
                }
            }
        }

        chosen
    }
}

fn safe_score(block: &dyn ContextBlock, info: &EndpointInfo) -> f64 {
    match catch_unwind(AssertUnwindSafe(|| block.score(info))) {
        Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
        Ok(_) => 0.0,
        Err(_) => {
            warn!(block = block.id(), "Context block panicked while scoring");
            0.0
        }
    }
}

fn safe_render(block: &dyn ContextBlock, info: &EndpointInfo) -> Option<String> {
    match catch_unwind(AssertUnwindSafe(|| block.render(info))) {
        Ok(text) => Some(text),
        Err(_) => {
            warn!(block = block.id(), "Context block panicked while rendering");
            None
        }
    }
}
