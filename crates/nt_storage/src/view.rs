use nt_core::{CanonicalArticle, Sentiment};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

pub const ALL: &str = "all";
pub const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SentimentFilter {
    #[default]
    All,
    Only(Sentiment),
}

impl FromStr for SentimentFilter {
    type Err = nt_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case(ALL) {
            Ok(SentimentFilter::All)
        } else {
            s.parse().map(SentimentFilter::Only)
        }
    }
}

/// Search text, category and sentiment selection for the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub query: String,
    /// A category name, or `"all"` / empty for every category.
    pub category: String,
    pub sentiment: SentimentFilter,
}

impl FeedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_sentiment(mut self, sentiment: SentimentFilter) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty() || !self.all_categories() || self.sentiment != SentimentFilter::All
    }

    fn all_categories(&self) -> bool {
        let category = self.category.trim();
        category.is_empty() || category.eq_ignore_ascii_case(ALL)
    }

    pub fn matches(&self, article: &CanonicalArticle) -> bool {
        let query = self.query.trim().to_lowercase();
        let matches_search = query.is_empty()
            || article.title.to_lowercase().contains(&query)
            || article
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query));

        let matches_category =
            self.all_categories() || article.category.to_lowercase() == self.category.trim().to_lowercase();

        let matches_sentiment = match self.sentiment {
            SentimentFilter::All => true,
            SentimentFilter::Only(sentiment) => article.sentiment == sentiment,
        };

        matches_search && matches_category && matches_sentiment
    }

    /// Stable filter: survivors keep their relative order.
    pub fn apply<'a>(&self, articles: &'a [CanonicalArticle]) -> Vec<&'a CanonicalArticle> {
        articles.iter().filter(|a| self.matches(a)).collect()
    }
}

/// A filtered, prefix-paginated window over one store snapshot.
#[derive(Debug, Clone)]
pub struct FeedView {
    snapshot: Arc<Vec<CanonicalArticle>>,
    filter: FeedFilter,
    page_size: usize,
    pages: usize,
}

impl FeedView {
    pub fn new(snapshot: Arc<Vec<CanonicalArticle>>, filter: FeedFilter, page_size: usize) -> Self {
        Self {
            snapshot,
            filter,
            page_size: page_size.max(1),
            pages: 1,
        }
    }

    /// Swap in a newer snapshot, keeping filter and expanded pages.
    pub fn refresh(&mut self, snapshot: Arc<Vec<CanonicalArticle>>) {
        self.snapshot = snapshot;
    }

    /// Changing the filter collapses the window back to the first page.
    pub fn set_filter(&mut self, filter: FeedFilter) {
        self.filter = filter;
        self.pages = 1;
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn filtered(&self) -> Vec<&CanonicalArticle> {
        self.filter.apply(&self.snapshot)
    }

    pub fn visible(&self) -> Vec<&CanonicalArticle> {
        let mut filtered = self.filtered();
        filtered.truncate(self.pages * self.page_size);
        filtered
    }

    pub fn has_more(&self) -> bool {
        self.filtered().len() > self.pages * self.page_size
    }

    /// Expands the window by one page. Returns false when there was nothing left.
    pub fn load_more(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }
        self.pages += 1;
        true
    }

    pub fn summary(&self) -> SentimentSummary {
        SentimentSummary::from_articles(self.filtered())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub unknown: usize,
    pub average_score: f64,
}

impl SentimentSummary {
    pub fn from_articles<'a>(articles: impl IntoIterator<Item = &'a CanonicalArticle>) -> Self {
        let mut summary = Self::default();
        let mut total_score = 0.0;
        for article in articles {
            match article.sentiment {
                Sentiment::Positive => summary.positive += 1,
                Sentiment::Neutral => summary.neutral += 1,
                Sentiment::Negative => summary.negative += 1,
                Sentiment::Unknown => summary.unknown += 1,
            }
            total_score += article.sentiment_score;
        }
        let total = summary.total();
        if total > 0 {
            summary.average_score = total_score / total as f64;
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative + self.unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(id: &str, title: &str, description: Option<&str>, category: &str, sentiment: Sentiment) -> CanonicalArticle {
        CanonicalArticle {
            id: id.to_string(),
            title: title.to_string(),
            source: "Wired".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            fetched_at: None,
            url: None,
            category: category.to_string(),
            description: description.map(str::to_string),
            sentiment,
            sentiment_score: match sentiment {
                Sentiment::Positive => 0.5,
                Sentiment::Negative => -0.5,
                _ => 0.0,
            },
            image_url: None,
        }
    }

    fn collection() -> Vec<CanonicalArticle> {
        vec![
            article("1", "Climate models get faster", None, "technology", Sentiment::Positive),
            article("2", "Summit stalls", Some("No deal on CLIMATE targets"), "Politics", Sentiment::Negative),
            article("3", "Chip shortage eases", Some("Supply recovers"), "Technology", Sentiment::Neutral),
            article("4", "Data centers and the climate", Some("Cooling costs"), "Technology", Sentiment::Negative),
            article("5", "Weekend sports", None, "Sports", Sentiment::Positive),
        ]
    }

    fn ids(articles: &[&CanonicalArticle]) -> Vec<String> {
        articles.iter().map(|a| a.id.clone()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let articles = collection();
        assert_eq!(FeedFilter::new().apply(&articles).len(), 5);
        assert!(!FeedFilter::new().with_category("ALL").is_active());
    }

    #[test]
    fn test_query_category_and_sentiment() {
        let articles = collection();
        let filter = FeedFilter::new().with_query("climate").with_category("Technology");
        assert_eq!(ids(&filter.apply(&articles)), vec!["1", "4"]);

        let filter = FeedFilter::new().with_query("CLIMATE");
        assert_eq!(ids(&filter.apply(&articles)), vec!["1", "2", "4"]);

        let filter = FeedFilter::new()
            .with_query("climate")
            .with_sentiment("negative".parse().unwrap());
        assert_eq!(ids(&filter.apply(&articles)), vec!["2", "4"]);
    }

    #[test]
    fn test_sentiment_filter_parse() {
        assert_eq!("all".parse::<SentimentFilter>().unwrap(), SentimentFilter::All);
        assert_eq!("".parse::<SentimentFilter>().unwrap(), SentimentFilter::All);
        assert_eq!(
            "Neutral".parse::<SentimentFilter>().unwrap(),
            SentimentFilter::Only(Sentiment::Neutral)
        );
        assert!("angry".parse::<SentimentFilter>().is_err());
    }

    #[test]
    fn test_pagination_window() {
        let mut view = FeedView::new(Arc::new(collection()), FeedFilter::new(), 2);
        assert_eq!(ids(&view.visible()), vec!["1", "2"]);
        assert!(view.has_more());

        assert!(view.load_more());
        assert!(view.load_more());
        assert_eq!(view.visible().len(), 5);
        assert!(!view.has_more());
        assert!(!view.load_more());

        view.set_filter(FeedFilter::new().with_category("technology"));
        assert_eq!(ids(&view.visible()), vec!["1", "3"]);
    }

    #[test]
    fn test_refresh_keeps_window() {
        let mut view = FeedView::new(Arc::new(collection()), FeedFilter::new(), 2);
        view.load_more();

        let mut newer = collection();
        newer.insert(0, article("0", "Fresh", None, "General", Sentiment::Unknown));
        view.refresh(Arc::new(newer));
        assert_eq!(ids(&view.visible()), vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn test_summary() {
        let view = FeedView::new(Arc::new(collection()), FeedFilter::new(), 12);
        let summary = view.summary();
        assert_eq!(summary.positive, 2);
        assert_eq!(summary.negative, 2);
        assert_eq!(summary.neutral, 1);
        assert_eq!(summary.total(), 5);
        assert!((summary.average_score - 0.0).abs() < f64::EPSILON);
    }
}
