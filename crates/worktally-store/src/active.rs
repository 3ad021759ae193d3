//! The client's single active-survey slot.
//!
//! Records which instance is being counted and against which template, so
//! a front end that restarts between taps can pick the session back up.

use serde::{Deserialize, Serialize};
use tracing::warn;
use worktally_core::SurveyTemplate;

use crate::StoreError;
use crate::storage::LocalStorage;

pub const ACTIVE_SESSION_KEY: &str = "active-session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSurvey {
    pub instance_id: String,
    pub template: SurveyTemplate,
}

/// The active survey, if any. An unreadable slot counts as empty.
pub fn load_active<S: LocalStorage + ?Sized>(storage: &S) -> Result<Option<ActiveSurvey>, StoreError> {
    let Some(raw) = storage.get(ACTIVE_SESSION_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(active) => Ok(Some(active)),
        Err(e) => {
            warn!(error = %e, "active session slot is corrupt, ignoring");
            Ok(None)
        }
    }
}

/// Make `active` the active survey, replacing any previous one.
pub fn save_active<S: LocalStorage + ?Sized>(storage: &S, active: &ActiveSurvey) -> Result<(), StoreError> {
    storage.set(ACTIVE_SESSION_KEY, &serde_json::to_string(active)?)
}

pub fn clear_active<S: LocalStorage + ?Sized>(storage: &S) -> Result<(), StoreError> {
    storage.remove(ACTIVE_SESSION_KEY)
}
