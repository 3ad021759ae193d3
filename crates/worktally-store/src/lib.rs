//! Client-local state: key-value storage and the counting session.

pub mod active;
mod error;
pub mod session;
pub mod storage;

pub use active::{ActiveSurvey, clear_active, load_active, save_active};
pub use error::StoreError;
pub use session::{DiscardNotice, SessionDraft, SessionState, SessionStore, draft_key};
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
