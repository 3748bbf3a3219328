use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::CanonicalArticle;
use crate::Result;

/// What a merge did with one incoming article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleStatus {
    New,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl MergeReport {
    pub fn record(&mut self, status: ArticleStatus) {
        match status {
            ArticleStatus::New => self.new += 1,
            ArticleStatus::Updated => self.updated += 1,
            ArticleStatus::Unchanged => self.unchanged += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.new + self.updated + self.unchanged
    }
}

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Merge a normalized batch into the collection. Readers holding an older
    /// snapshot never observe the change.
    async fn merge_batch(&self, incoming: Vec<CanonicalArticle>) -> Result<MergeReport>;

    /// An immutable view of the collection, sorted by freshness descending.
    async fn snapshot(&self) -> Arc<Vec<CanonicalArticle>>;

    /// Look up a single article by id
    async fn get_by_id(&self, id: &str) -> Result<Option<CanonicalArticle>>;

    /// Get all articles from a specific source
    async fn get_by_source(&self, source: &str) -> Result<Vec<CanonicalArticle>>;
}
