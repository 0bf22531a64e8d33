use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{endpoint} failed with HTTP {status}: {detail}")]
    Status {
        endpoint: String,
        status: u16,
        detail: String,
    },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("not configured: {0}")]
    Misconfigured(String),
}

impl RemoteError {
    /// Whether the remote refused because the resource is already there.
    /// Matches HTTP 409/422 or a detail mentioning "already exists".
    pub fn is_already_exists(&self) -> bool {
        match self {
            RemoteError::Status { status, detail, .. } => {
                *status == 409
                    || *status == 422
                    || detail.to_lowercase().contains("already exists")
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}
