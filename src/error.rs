use crate::db::posts::PostStatus;
use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to a text, embedding or image provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,
    #[error("provider rate limit reached")]
    RateLimited,
    #[error("provider server error ({status}): {body}")]
    Server { status: u16, body: String },
    #[error("provider rejected credentials ({status}): {body}")]
    Auth { status: u16, body: String },
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("http error: {0}")]
    Http(reqwest::Error),
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout
            | ProviderError::RateLimited
            | ProviderError::Server { .. } => true,
            ProviderError::Http(e) => e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    pub fn from_status(status: StatusCode, body: String) -> ProviderError {
        let code = status.as_u16();
        match code {
            429 => ProviderError::RateLimited,
            401 | 403 => ProviderError::Auth { status: code, body },
            _ if status.is_server_error() => {
                ProviderError::Server { status: code, body }
            }
            _ => ProviderError::Status { status: code, body },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Http(error)
        }
    }
}

/// Failures from the article, quota or vector stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slug already taken: {0}")]
    SlugConflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("cannot move post from {from} to {to}")]
    InvalidTransition { from: PostStatus, to: PostStatus },
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("in-memory store lock poisoned")]
    Poisoned,
}

/// Anything that can fail a single article in a generation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Provider(e) => e.is_transient(),
            PipelineError::Store(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}
