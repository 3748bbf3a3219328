use async_trait::async_trait;
use nt_core::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Checks that an image URL loads before it is shown.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// `Ok(())` when the image loads, `Error::ImageLoad` otherwise.
    async fn probe(&self, url: &str) -> Result<()>;
}

/// Probes with a plain GET carrying no cookies or credentials. Only the status
/// and content type are checked; the bytes are never read.
#[derive(Debug, Clone)]
pub struct HttpImageProbe {
    client: Client,
}

impl HttpImageProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn load_error(url: &str, reason: impl Into<String>) -> Error {
    Error::ImageLoad {
        url: url.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn probe(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| load_error(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(load_error(url, format!("status {}", status.as_u16())));
        }

        // A missing content type is given the benefit of the doubt.
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
                return Err(load_error(url, format!("not an image: {}", content_type)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    async fn serve() -> String {
        let router = Router::new()
            .route("/ok.png", get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G']) }))
            .route("/page", get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }))
            .route("/gone.png", get(|| async { StatusCode::NOT_FOUND }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_probe() {
        let base = serve().await;
        let probe = HttpImageProbe::new(Duration::from_secs(5)).unwrap();

        assert!(probe.probe(&format!("{}/ok.png", base)).await.is_ok());

        let not_image = probe.probe(&format!("{}/page", base)).await;
        assert!(matches!(not_image, Err(Error::ImageLoad { .. })));

        let missing = probe.probe(&format!("{}/gone.png", base)).await;
        match missing {
            Err(Error::ImageLoad { reason, .. }) => assert_eq!(reason, "status 404"),
            other => panic!("expected image load error, got {:?}", other),
        }

        let relative = probe.probe("/placeholder.svg").await;
        assert!(matches!(relative, Err(Error::ImageLoad { .. })));
    }
}
