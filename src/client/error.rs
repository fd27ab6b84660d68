use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("store unreachable: {0}")]
    BackendUnavailable(#[from] reqwest::Error),

    #[error("store rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("malformed response from store: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("no cell for habit '{habit}' on '{date}' in the current view")]
    NotInView { habit: String, date: String },

    #[error("local cache error: {0}")]
    Cache(String),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
