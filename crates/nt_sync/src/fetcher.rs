use async_trait::async_trait;
use nt_core::{ArticleSource, Error, RawArticleRecord, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SyncConfig;

/// Reads `GET {base}/api/articles/recent/{count}`.
#[derive(Debug, Clone)]
pub struct HttpArticleSource {
    client: Client,
    base_url: String,
}

impl HttpArticleSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(config.backend_url.clone(), config.request_timeout)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn recent_url(&self, count: usize) -> String {
        format!("{}/api/articles/recent/{}", self.base_url, count)
    }
}

#[async_trait]
impl ArticleSource for HttpArticleSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn fetch_batch(&self, count: usize) -> Result<Vec<RawArticleRecord>> {
        let url = self.recent_url(count);
        debug!(%url, "fetching recent articles");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_batch(&body)
    }
}

/// Decodes a recent-articles body. Anything other than a JSON array is
/// malformed; array items that are not objects are skipped.
pub fn parse_batch(body: &str) -> Result<Vec<RawArticleRecord>> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| Error::MalformedPayload(format!("invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::MalformedPayload(format!(
                "expected an array, got {}",
                json_kind(&other)
            )))
        }
    };

    let total = items.len();
    let records: Vec<RawArticleRecord> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if records.len() < total {
        warn!(skipped = total - records.len(), "skipped unreadable records");
    }
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Runs one fetch unless `cancel` fires first. `None` means the request was
/// abandoned and its result, if any, must not be applied.
pub async fn fetch_until_cancelled(
    source: &dyn ArticleSource,
    count: usize,
    cancel: &CancellationToken,
) -> Option<Result<Vec<RawArticleRecord>>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = source.fetch_batch(count) => Some(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source(base: &str) -> HttpArticleSource {
        HttpArticleSource::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_recent_url_trims_slashes() {
        let source = HttpArticleSource::with_client(Client::new(), "http://localhost:8000//");
        assert_eq!(source.recent_url(10), "http://localhost:8000/api/articles/recent/10");
    }

    #[test]
    fn test_parse_batch() {
        let records = parse_batch(r#"[{"id": "1", "title": "One"}, 7, {"id": 2}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id.as_deref(), Some("2"));

        assert!(matches!(parse_batch(r#"{"items": []}"#), Err(Error::MalformedPayload(_))));
        assert!(matches!(parse_batch("<html>"), Err(Error::MalformedPayload(_))));
    }

    #[tokio::test]
    async fn test_fetch_batch_ok() {
        let router = Router::new().route(
            "/api/articles/recent/:count",
            get(|Path(count): Path<usize>| async move {
                let items: Vec<_> = (0..count).map(|i| json!({"id": i, "title": format!("Story {}", i)})).collect();
                Json(json!(items))
            }),
        );
        let base = serve(router).await;

        let records = source(&base).fetch_batch(3).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].title.as_deref(), Some("Story 2"));
    }

    #[tokio::test]
    async fn test_fetch_batch_backend_error() {
        let router = Router::new().route(
            "/api/articles/recent/:count",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "database down") }),
        );
        let base = serve(router).await;

        match source(&base).fetch_batch(5).await {
            Err(Error::Backend { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "database down");
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_batch_malformed() {
        let router = Router::new().route(
            "/api/articles/recent/:count",
            get(|| async { Json(json!({"error": "not a list"})) }),
        );
        let base = serve(router).await;

        let result = source(&base).fetch_batch(5).await;
        assert!(matches!(result, Err(Error::MalformedPayload(_))));
    }

    #[tokio::test]
    async fn test_fetch_batch_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = source(&format!("http://{}", addr)).fetch_batch(5).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_cancelled_fetch_is_abandoned() {
        let router = Router::new().route(
            "/api/articles/recent/:count",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!([]))
            }),
        );
        let base = serve(router).await;
        let source = source(&base);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        assert!(fetch_until_cancelled(&source, 5, &cancel).await.is_none());
    }
}
