//! Parsed tables cached per experiment and variant.
//!
//! Entries are created on first successful fetch and are not refreshed on a
//! timer. A pipeline run that rewrites an experiment's files invalidates that
//! experiment's entries explicitly; a failed run leaves them untouched.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::source::ResultSource;
use crate::table::ResultTable;
use crate::variant::ResultVariant;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub experiment: String,
    pub variant: ResultVariant,
}

impl CacheKey {
    pub fn new(experiment: &str, variant: &ResultVariant) -> Self {
        Self {
            experiment: experiment.to_string(),
            variant: variant.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, Arc<ResultTable>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, experiment: &str, variant: &ResultVariant) -> Option<Arc<ResultTable>> {
        self.entries
            .read()
            .await
            .get(&CacheKey::new(experiment, variant))
            .cloned()
    }

    /// Cached table, or fetch + parse + cache it. Variants that are not
    /// available yet are not cached, so they show up once generated.
    pub async fn load(
        &self,
        source: &dyn ResultSource,
        experiment: &str,
        variant: &ResultVariant,
    ) -> Result<Option<Arc<ResultTable>>> {
        if let Some(table) = self.get(experiment, variant).await {
            return Ok(Some(table));
        }

        debug!("Cache miss for {}/{}", experiment, variant);
        let Some(text) = source.fetch(experiment, variant).await? else {
            return Ok(None);
        };
        let table = Arc::new(ResultTable::parse(&text));

        let mut entries = self.entries.write().await;
        // A concurrent load may have won the race; keep its entry.
        let entry = entries
            .entry(CacheKey::new(experiment, variant))
            .or_insert(table);
        Ok(Some(entry.clone()))
    }

    /// Replace an entry with text a pipeline run just produced.
    pub async fn store(&self, experiment: &str, variant: &ResultVariant, text: &str) -> Arc<ResultTable> {
        let table = Arc::new(ResultTable::parse(text));
        self.entries
            .write()
            .await
            .insert(CacheKey::new(experiment, variant), table.clone());
        table
    }

    /// Drop every cached variant of `experiment`. Returns how many were dropped.
    pub async fn invalidate_experiment(&self, experiment: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.experiment != experiment);
        let dropped = before - entries.len();
        if dropped > 0 {
            info!("Invalidated {} cached tables for {}", dropped, experiment);
        }
        dropped
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
