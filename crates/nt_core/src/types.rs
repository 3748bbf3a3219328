use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One article record exactly as the backend sent it. Every field is optional
/// and tolerant of the wrong JSON type: a value that cannot be read is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticleRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fetched_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_samples")]
    pub sentiments: Vec<SentimentSample>,

    // Flattened sentiment fields some backend versions send instead of `sentiments`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub sentiment_label: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<Value>,
    #[serde(default)]
    pub score: Option<Value>,
}

/// A single backend-supplied sentiment observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSample {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Unknown => "unknown",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Sentiment::Positive => "📈",
            Sentiment::Neutral => "➖",
            Sentiment::Negative => "📉",
            Sentiment::Unknown => "❔",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            "unknown" => Ok(Sentiment::Unknown),
            other => Err(crate::Error::Config(format!("Unknown sentiment: {}", other))),
        }
    }
}

/// An article after ingestion: every required field filled, sentiment resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalArticle {
    pub id: String,
    pub title: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub category: String,
    pub description: Option<String>,
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
    pub image_url: Option<String>,
}

impl CanonicalArticle {
    /// The timestamp used to arbitrate merge conflicts and to order the store.
    pub fn freshness(&self) -> DateTime<Utc> {
        self.fetched_at.unwrap_or(self.published_at)
    }
}

/// Parses the timestamp shapes the backend has been seen to emit: RFC 3339
/// with an offset, or a bare local date-time which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Reads a loosely-typed score: JSON numbers and numeric strings.
pub fn loose_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_samples<'de, D>(deserializer: D) -> std::result::Result<Vec<SentimentSample>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_raw_record_tolerates_wrong_types() {
        let raw: RawArticleRecord = serde_json::from_value(json!({
            "id": 42,
            "title": ["not", "a", "string"],
            "publishedAt": "2024-03-01T10:00:00Z",
            "sentiments": "oops",
            "imageUrl": null
        }))
        .unwrap();

        assert_eq!(raw.id.as_deref(), Some("42"));
        assert_eq!(raw.title, None);
        assert!(raw.sentiments.is_empty());
        assert_eq!(raw.image_url, None);
    }

    #[test]
    fn test_raw_record_reads_samples() {
        let raw: RawArticleRecord = serde_json::from_value(json!({
            "sentiments": [
                {"id": "a", "label": "POSITIVE", "score": 0.8, "createdAt": "2024-03-01T10:00:00Z"},
                "garbage",
                {"label": "NEGATIVE"}
            ]
        }))
        .unwrap();

        assert_eq!(raw.sentiments.len(), 2);
        assert_eq!(raw.sentiments[0].label.as_deref(), Some("POSITIVE"));
        assert_eq!(raw.sentiments[1].created_at, None);
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn test_loose_number() {
        assert_eq!(loose_number(&json!(0.5)), Some(0.5));
        assert_eq!(loose_number(&json!("-0.25")), Some(-0.25));
        assert_eq!(loose_number(&json!("abc")), None);
        assert_eq!(loose_number(&json!(null)), None);
    }

    #[test]
    fn test_sentiment_from_str() {
        assert_eq!("Positive".parse::<Sentiment>().unwrap(), Sentiment::Positive);
        assert!("ecstatic".parse::<Sentiment>().is_err());
    }
}
