use thiserror::Error;
use worktally_core::ValidationError;
use worktally_store::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing, invalid or expired token. The user has to log in again.
    #[error("authentication required, please log in again")]
    Unauthorized,
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether the failure happened talking to the server (as opposed to
    /// local validation or storage).
    pub fn is_network(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Self::Http(_) => true,
            Self::Server { .. } | Self::Json(_) => true,
            _ => false,
        }
    }
}
