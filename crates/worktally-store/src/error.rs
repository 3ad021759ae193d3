use thiserror::Error;
use worktally_core::CountKey;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("no counting session is loaded")]
    NotLoaded,

    #[error("session {0} is already finalized")]
    Finalized(String),

    #[error("{0} is not an item of this survey")]
    UnknownItem(CountKey),

    #[error("subtract mode is off")]
    SubtractModeOff,
}
