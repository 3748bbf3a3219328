pub mod config;
pub mod fetcher;
pub mod logging;
pub mod scheduler;

pub use config::{parse_duration, SyncConfig};
pub use fetcher::{fetch_until_cancelled, HttpArticleSource};
pub use logging::{init_logging, Logger};
pub use scheduler::{sync_once, PollScheduler, SyncStatus};

pub mod prelude {
    pub use super::{HttpArticleSource, PollScheduler, SyncConfig, SyncStatus};
    pub use nt_core::{ArticleSource, ArticleStorage, CanonicalArticle, Error, Result};
}
