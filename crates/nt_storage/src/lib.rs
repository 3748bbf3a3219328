pub mod backends;
pub mod merge;
pub mod view;

pub use backends::*;
pub use merge::{merge_batch, merge_with_report, sort_by_freshness};
pub use view::{FeedFilter, FeedView, SentimentFilter, SentimentSummary};

pub mod prelude {
    pub use super::backends::*;
    pub use super::merge::merge_batch;
    pub use super::view::{FeedFilter, FeedView};
}
