use async_trait::async_trait;

use crate::types::RawArticleRecord;
use crate::Result;

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Fetch up to `count` of the most recent raw records from the backend.
    ///
    /// Fails with `Error::Network` on transport failure, `Error::Backend` on a
    /// non-success status and `Error::MalformedPayload` when the body is not a
    /// JSON array. Dropping the returned future abandons the request.
    async fn fetch_batch(&self, count: usize) -> Result<Vec<RawArticleRecord>>;
}
