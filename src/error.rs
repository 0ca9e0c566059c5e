use thiserror::Error;

/// Failures talking to the topic service or poll store.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("remote service unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),
    #[error("remote service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("poll not found")]
    NotFound,
    #[error("could not decode {context}: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub(crate) fn decode(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            context,
            message: err.to_string(),
        }
    }
}

/// Failures of the local session storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session value for '{key}' is not valid JSON: {source}")]
    Serde {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PollResult<T> = Result<T, PollError>;
