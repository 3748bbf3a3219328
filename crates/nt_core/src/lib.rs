pub mod error;
pub mod models;
pub mod normalize;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::ArticleSource;
pub use normalize::{normalize, normalize_all};
pub use storage::{ArticleStatus, ArticleStorage, MergeReport};
pub use types::{CanonicalArticle, RawArticleRecord, Sentiment, SentimentSample};

pub mod prelude {
    pub use crate::{ArticleSource, ArticleStorage, CanonicalArticle, Error, RawArticleRecord, Result, Sentiment};
}
