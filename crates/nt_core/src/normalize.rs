use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::types::{loose_number, parse_timestamp, CanonicalArticle, RawArticleRecord, Sentiment, SentimentSample};

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_SOURCE: &str = "Unknown";

/// Scores strictly above this are positive, strictly below its negation negative.
pub const SCORE_THRESHOLD: f64 = 0.1;

const POSITIVE_LABELS: &[&str] = &["positive", "pos", "bullish", "optimistic"];
const NEGATIVE_LABELS: &[&str] = &["negative", "neg", "bearish", "pessimistic"];
const NEUTRAL_LABELS: &[&str] = &["neutral", "neu", "mixed"];

// Last-resort heuristic over the article text. Crude on purpose.
const POSITIVE_WORDS: &[&str] = &[
    "breakthrough", "success", "growth", "recovery", "record high", "wins", "surge", "improve", "boost",
];
const NEGATIVE_WORDS: &[&str] = &[
    "crisis", "decline", "crash", "war", "death", "fail", "loss", "threat", "collapse",
];

pub fn normalize(raw: &RawArticleRecord) -> CanonicalArticle {
    normalize_at(raw, Utc::now())
}

/// Same as [`normalize`] with an explicit clock, for the timestamp fallback.
pub fn normalize_at(raw: &RawArticleRecord, now: DateTime<Utc>) -> CanonicalArticle {
    let fetched_at = raw.fetched_at.as_deref().and_then(parse_timestamp);
    let published_at = raw
        .published_at
        .as_deref()
        .and_then(parse_timestamp)
        .or(fetched_at)
        .unwrap_or(now);

    let (sentiment, score) = resolve_sentiment(raw);
    let id = non_empty(raw.id.as_deref()).unwrap_or_else(|| {
        let generated = Uuid::new_v4().to_string();
        debug!(id = %generated, title = ?raw.title, "record has no id, generated one");
        generated
    });

    CanonicalArticle {
        id,
        title: non_empty(raw.title.as_deref()).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        source: non_empty(raw.source.as_deref()).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        published_at,
        fetched_at,
        url: non_empty(raw.url.as_deref()),
        category: non_empty(raw.category.as_deref()).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        description: non_empty(raw.summary.as_deref()).or_else(|| non_empty(raw.content.as_deref())),
        sentiment,
        sentiment_score: finite_or_zero(score),
        image_url: non_empty(raw.image_url.as_deref()),
    }
}

/// Resolves sentiment in three tiers: newest backend sample, flattened
/// fields, then a keyword scan of the text.
pub fn resolve_sentiment(raw: &RawArticleRecord) -> (Sentiment, f64) {
    if let Some(sample) = latest_sample(&raw.sentiments) {
        let score = sample.score.as_ref().and_then(loose_number);
        return classify(sample.label.as_deref(), score);
    }

    let label = raw.sentiment_label.as_deref().or(raw.sentiment.as_deref());
    let score = raw
        .sentiment_score
        .as_ref()
        .or(raw.score.as_ref())
        .and_then(loose_number);
    if label.is_some() || score.is_some() {
        return classify(label, score);
    }

    (keyword_sentiment(raw), 0.0)
}

/// The sample with the greatest `createdAt`. Missing or unreadable timestamps
/// count as the epoch; ties keep their original order.
pub fn latest_sample(samples: &[SentimentSample]) -> Option<&SentimentSample> {
    let mut ordered: Vec<&SentimentSample> = samples.iter().collect();
    ordered.sort_by(|a, b| sample_time(b).cmp(&sample_time(a)));
    ordered.into_iter().next()
}

fn sample_time(sample: &SentimentSample) -> DateTime<Utc> {
    sample
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Label first, score threshold second. With neither a recognised label nor a
/// finite score there is nothing to go on and the result is `Unknown`.
pub fn classify(label: Option<&str>, score: Option<f64>) -> (Sentiment, f64) {
    let score = score.filter(|s| s.is_finite());
    if let Some(sentiment) = label.and_then(label_sentiment) {
        return (sentiment, score.unwrap_or(0.0));
    }
    match score {
        Some(s) => (score_sentiment(s), s),
        None => (Sentiment::Unknown, 0.0),
    }
}

pub fn label_sentiment(label: &str) -> Option<Sentiment> {
    let label = label.to_lowercase();
    let matches = |words: &[&str]| words.iter().any(|w| label.contains(w));
    if matches(POSITIVE_LABELS) {
        Some(Sentiment::Positive)
    } else if matches(NEGATIVE_LABELS) {
        Some(Sentiment::Negative)
    } else if matches(NEUTRAL_LABELS) {
        Some(Sentiment::Neutral)
    } else {
        None
    }
}

pub fn score_sentiment(score: f64) -> Sentiment {
    if score > SCORE_THRESHOLD {
        Sentiment::Positive
    } else if score < -SCORE_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn keyword_sentiment(raw: &RawArticleRecord) -> Sentiment {
    let text = [&raw.title, &raw.summary, &raw.content]
        .iter()
        .filter_map(|field| field.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let count = |words: &[&str]| words.iter().filter(|w| text.contains(*w)).count();
    let positive = count(POSITIVE_WORDS);
    let negative = count(NEGATIVE_WORDS);

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Convenience for callers holding a JSON array of records.
pub fn normalize_all(records: &[RawArticleRecord]) -> Vec<CanonicalArticle> {
    let now = Utc::now();
    records.iter().map(|raw| normalize_at(raw, now)).collect()
}
