use thiserror::Error;

pub type Result<T> = std::result::Result<T, PushoverError>;

#[derive(Debug, Error)]
pub enum PushoverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {}", errors.join("; "))]
    Api { status: u16, errors: Vec<String> },

    #[error("Message rejected (request {request})")]
    Rejected { request: String },
}

impl From<reqwest::Error> for PushoverError {
    fn from(err: reqwest::Error) -> Self {
        PushoverError::Network(err.to_string())
    }
}
