//! In-memory completion store.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use super::traits::CompletionStore;
use super::types::{Checkpoint, StoreError};

/// Completion store backed by in-memory maps.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCompletionStore {
    markers: Arc<RwLock<HashSet<(String, Checkpoint)>>>,
    logs: Arc<RwLock<HashMap<(String, Checkpoint), String>>>,
}

impl MemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a marker, as if an earlier run had completed the stage.
    pub fn insert(&self, unit: &str, checkpoint: Checkpoint) {
        self.markers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((unit.to_string(), checkpoint));
    }

    /// Returns the stored log for a stage, if any.
    pub fn log(&self, unit: &str, checkpoint: &Checkpoint) -> Option<String> {
        self.logs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(unit.to_string(), checkpoint.clone()))
            .cloned()
    }

    /// All markers recorded for a unit, sorted.
    pub fn markers_for(&self, unit: &str) -> Vec<Checkpoint> {
        let mut markers: Vec<Checkpoint> = self
            .markers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(u, _)| u == unit)
            .map(|(_, c)| c.clone())
            .collect();
        markers.sort();
        markers
    }
}

#[async_trait]
impl CompletionStore for MemoryCompletionStore {
    async fn exists(&self, unit: &str, checkpoint: &Checkpoint) -> Result<bool, StoreError> {
        Ok(self
            .markers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(unit.to_string(), checkpoint.clone())))
    }

    async fn mark(&self, unit: &str, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.insert(unit, checkpoint.clone());
        Ok(())
    }

    async fn write_log(
        &self,
        unit: &str,
        checkpoint: &Checkpoint,
        log: &str,
    ) -> Result<(), StoreError> {
        self.logs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((unit.to_string(), checkpoint.clone()), log.to_string());
        Ok(())
    }

    async fn invalidate(&self, unit: &str, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        self.markers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(unit.to_string(), checkpoint.clone()));
        Ok(())
    }
}
