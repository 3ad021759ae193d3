use thiserror::Error;

/// Input rejected locally, before anything is stored or sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} name must not be blank")]
    BlankName(&'static str),

    #[error("unknown work category: {0}")]
    UnknownCategory(String),

    #[error("malformed count key: {0:?}")]
    MalformedCountKey(String),

    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: String, end: String },

    #[error("local time {0} does not exist in this time zone")]
    NonexistentLocalTime(String),

    #[error("index {index} out of range for list of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("a work list must keep at least one entry")]
    LastEntry,
}
