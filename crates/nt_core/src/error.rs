use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure: connection refused, DNS, timeout, reset.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("Backend error (status {status}): {body}")]
    Backend { status: u16, body: String },

    /// The body parsed, but not into the shape we expect.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// One image candidate failed to load.
    #[error("Image load failed for {url}: {reason}")]
    ImageLoad { url: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Soft failures leave prior state intact and are retried by the next poll.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Backend { .. } | Error::MalformedPayload(_) | Error::ImageLoad { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
