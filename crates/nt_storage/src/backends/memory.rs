use async_trait::async_trait;
use nt_core::{ArticleStorage, CanonicalArticle, MergeReport, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::merge::merge_with_report;

/// The collection itself. Every merge swaps in a new `Arc`, so snapshots
/// handed out earlier stay exactly as they were.
#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Arc<Vec<CanonicalArticle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, incoming: Vec<CanonicalArticle>) -> MergeReport {
        let (merged, report) = merge_with_report(&self.articles, incoming);
        self.articles = Arc::new(merged);
        report
    }

    pub fn snapshot(&self) -> Arc<Vec<CanonicalArticle>> {
        Arc::clone(&self.articles)
    }

    pub fn get_by_id(&self, id: &str) -> Option<CanonicalArticle> {
        self.articles.iter().find(|a| a.id == id).cloned()
    }

    pub fn get_by_source(&self, source: &str) -> Vec<CanonicalArticle> {
        self.articles
            .iter()
            .filter(|article| article.source == source)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

// TODO: the collection grows for the life of the process; pick an eviction
// policy (age or count cap) once the dashboard's retention needs are known.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn merge_batch(&self, incoming: Vec<CanonicalArticle>) -> Result<MergeReport> {
        let mut store = self.store.write().await;
        let report = store.merge(incoming);
        debug!(
            new = report.new,
            updated = report.updated,
            unchanged = report.unchanged,
            total = store.len(),
            "merged batch"
        );
        Ok(report)
    }

    async fn snapshot(&self) -> Arc<Vec<CanonicalArticle>> {
        self.store.read().await.snapshot()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<CanonicalArticle>> {
        Ok(self.store.read().await.get_by_id(id))
    }

    async fn get_by_source(&self, source: &str) -> Result<Vec<CanonicalArticle>> {
        Ok(self.store.read().await.get_by_source(source))
    }
}
