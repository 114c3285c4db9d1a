//! Active specification handle
//!
//! The running service holds exactly one active specification. Reloads build a
//! complete index off to the side and swap it in under a short write lock;
//! readers clone the `Arc` and keep a consistent snapshot for the whole request.

use crate::openapi::index::EndpointIndex;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// One loaded version of the specification
pub struct SpecSnapshot {
    pub version: u64,
    pub index: EndpointIndex,
}

pub struct ActiveSpec {
    current: RwLock<Arc<SpecSnapshot>>,
}

impl ActiveSpec {
    /// Start with an empty index at version 0.
    pub fn empty() -> Self {
        Self::new(EndpointIndex::new())
    }

    pub fn new(index: EndpointIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(SpecSnapshot { version: 0, index })),
        }
    }

    /// Current snapshot; stays valid after later replacements.
    pub fn current(&self) -> Arc<SpecSnapshot> {
        self.current.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Swap in a fully built index and return its version.
    pub fn replace(&self, index: EndpointIndex) -> u64 {
        let mut guard = self.current.write();
        let version = guard.version + 1;
        *guard = Arc::new(SpecSnapshot { version, index });
        info!(version, "Active specification replaced");
        version
    }
}

impl Default for ActiveSpec {
    fn default() -> Self {
        Self::empty()
    }
}
