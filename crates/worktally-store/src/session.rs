//! The counting session state machine.
//!
//! ```text
//! Uninitialized --initialize--> Loaded --increment/decrement--> Loaded
//!                                  |
//!                                  +--finalize_commit / finalize_discard--> Finalized
//! ```
//!
//! Every mutation writes the draft to [`LocalStorage`] before returning, so a
//! crash never loses a recorded tap. A draft that cannot be read back is
//! treated as missing and the session starts from zero.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use worktally_core::{CategoryKey, CountKey, CountsMap, Metrics, SurveyTemplate, compute_metrics};

use crate::StoreError;
use crate::active;
use crate::storage::LocalStorage;

const DRAFT_KEY_PREFIX: &str = "survey-progress-";

/// Storage key of the draft for `instance_id`.
pub fn draft_key(instance_id: &str) -> String {
    format!("{DRAFT_KEY_PREFIX}{instance_id}")
}

/// The persisted form of an in-progress session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
    pub instance_id: String,
    pub counts: CountsMap,
}

/// Older clients stored the bare counts object under the draft key.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDraft {
    Current(SessionDraft),
    Legacy(CountsMap),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loaded,
    Finalized,
}

/// Returned by [`SessionStore::finalize_discard`]: the instance the remote
/// store should mark as discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct DiscardNotice {
    pub instance_id: String,
}

#[derive(Debug)]
struct LiveSession {
    instance_id: String,
    template: SurveyTemplate,
    counts: CountsMap,
    total_count: u64,
}

#[derive(Debug)]
enum Phase {
    Uninitialized,
    Loaded(LiveSession),
    Finalized(String),
}

/// Owns the one active counting session of a client.
#[derive(Debug)]
pub struct SessionStore<S> {
    storage: S,
    phase: Phase,
    subtract_mode: bool,
}

impl<S: LocalStorage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            phase: Phase::Uninitialized,
            subtract_mode: false,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Uninitialized => SessionState::Uninitialized,
            Phase::Loaded(_) => SessionState::Loaded,
            Phase::Finalized(_) => SessionState::Finalized,
        }
    }

    /// Load the session for `instance_id`, resuming its draft if one exists.
    ///
    /// Only `instance_id` decides what happens: calling this again for the
    /// session already loaded does nothing, whatever `template` is passed.
    /// When a draft exists its counts are taken verbatim; `template` is kept
    /// only to validate later taps and to compute metrics.
    pub fn initialize(&mut self, instance_id: &str, template: &SurveyTemplate) -> Result<(), StoreError> {
        if let Phase::Loaded(live) = &self.phase
            && live.instance_id == instance_id
        {
            debug!(instance_id, "session already loaded");
            return Ok(());
        }

        let live = match self.read_draft(instance_id)? {
            Some(counts) => {
                let total_count = counts.sum();
                info!(instance_id, total_count, "resumed session from draft");
                LiveSession {
                    instance_id: instance_id.to_string(),
                    template: template.clone(),
                    counts,
                    total_count,
                }
            }
            None => {
                info!(instance_id, template = %template.name, "started fresh session");
                LiveSession {
                    instance_id: instance_id.to_string(),
                    template: template.clone(),
                    counts: CountsMap::zeroed(template),
                    total_count: 0,
                }
            }
        };
        self.phase = Phase::Loaded(live);
        self.subtract_mode = false;
        Ok(())
    }

    fn read_draft(&self, instance_id: &str) -> Result<Option<CountsMap>, StoreError> {
        let Some(raw) = self.storage.get(&draft_key(instance_id))? else {
            return Ok(None);
        };
        match serde_json::from_str::<StoredDraft>(&raw) {
            Ok(StoredDraft::Current(draft)) if draft.instance_id == instance_id => Ok(Some(draft.counts)),
            Ok(StoredDraft::Current(draft)) => {
                warn!(
                    instance_id,
                    found = %draft.instance_id,
                    "draft belongs to another instance, starting fresh"
                );
                Ok(None)
            }
            Ok(StoredDraft::Legacy(counts)) => Ok(Some(counts)),
            Err(e) => {
                warn!(instance_id, error = %e, "draft is corrupt, starting fresh");
                Ok(None)
            }
        }
    }

    pub fn subtract_mode(&self) -> bool {
        self.subtract_mode
    }

    pub fn set_subtract_mode(&mut self, on: bool) {
        self.subtract_mode = on;
    }

    /// Record one observation of `item`. Returns the item's new count.
    pub fn increment(&mut self, category: CategoryKey, item: &str) -> Result<u64, StoreError> {
        let live = live_mut(&mut self.phase)?;
        let key = checked_key(live, category, item)?;
        let count = live.counts.increment(&key);
        live.total_count += 1;

        if let Err(e) = write_draft(&self.storage, live) {
            live.counts.decrement(&key);
            live.total_count -= 1;
            return Err(e);
        }
        debug!(instance_id = %live.instance_id, key = %key, count, "incremented");
        Ok(count)
    }

    /// Take back one observation of `item`. Needs subtract mode; a zero
    /// count stays at zero and nothing is written.
    pub fn decrement(&mut self, category: CategoryKey, item: &str) -> Result<u64, StoreError> {
        if !self.subtract_mode {
            return Err(StoreError::SubtractModeOff);
        }
        let live = live_mut(&mut self.phase)?;
        let key = checked_key(live, category, item)?;
        if !live.counts.decrement(&key) {
            return Ok(0);
        }
        live.total_count -= 1;

        if let Err(e) = write_draft(&self.storage, live) {
            live.counts.increment(&key);
            live.total_count += 1;
            return Err(e);
        }
        let count = live.counts.get(&key);
        debug!(instance_id = %live.instance_id, key = %key, count, "decremented");
        Ok(count)
    }

    /// A tap on an item button: decrement in subtract mode, else increment.
    pub fn tap(&mut self, category: CategoryKey, item: &str) -> Result<u64, StoreError> {
        if self.subtract_mode {
            self.decrement(category, item)
        } else {
            self.increment(category, item)
        }
    }

    /// End the session for saving. Deletes the draft and hands back the
    /// final counts; sending them anywhere is the caller's job.
    pub fn finalize_commit(&mut self) -> Result<CountsMap, StoreError> {
        let live = match std::mem::replace(&mut self.phase, Phase::Uninitialized) {
            Phase::Loaded(live) => live,
            other => {
                let err = not_live(&other);
                self.phase = other;
                return Err(err);
            }
        };
        if let Err(e) = self.clear_local(&live.instance_id) {
            self.phase = Phase::Loaded(live);
            return Err(e);
        }
        info!(instance_id = %live.instance_id, total_count = live.total_count, "session committed");
        self.phase = Phase::Finalized(live.instance_id);
        Ok(live.counts)
    }

    /// Abandon the session. Deletes the draft; the returned notice names the
    /// instance to discard remotely.
    pub fn finalize_discard(&mut self) -> Result<DiscardNotice, StoreError> {
        let instance_id = self.live()?.instance_id.clone();
        self.clear_local(&instance_id)?;
        self.phase = Phase::Finalized(instance_id.clone());
        info!(instance_id = %instance_id, "session discarded");
        Ok(DiscardNotice { instance_id })
    }

    fn clear_local(&self, instance_id: &str) -> Result<(), StoreError> {
        self.storage.remove(&draft_key(instance_id))?;
        if active::load_active(&self.storage)?.is_some_and(|a| a.instance_id == instance_id) {
            active::clear_active(&self.storage)?;
        }
        Ok(())
    }

    /// Fails unless a session is loaded and not yet finalized.
    pub fn ensure_loaded(&self) -> Result<(), StoreError> {
        self.live().map(|_| ())
    }

    pub fn instance_id(&self) -> Option<&str> {
        match &self.phase {
            Phase::Uninitialized => None,
            Phase::Loaded(live) => Some(&live.instance_id),
            Phase::Finalized(id) => Some(id),
        }
    }

    pub fn template(&self) -> Option<&SurveyTemplate> {
        self.live().ok().map(|l| &l.template)
    }

    /// Live counts; empty unless a session is loaded.
    pub fn counts(&self) -> CountsMap {
        self.live().map(|l| l.counts.clone()).unwrap_or_default()
    }

    pub fn count(&self, category: CategoryKey, item: &str) -> u64 {
        self.live()
            .map(|l| l.counts.get(&CountKey::new(category, item)))
            .unwrap_or(0)
    }

    pub fn total_count(&self) -> u64 {
        self.live().map(|l| l.total_count).unwrap_or(0)
    }

    /// Metrics of the live counts against the session's template.
    pub fn metrics(&self) -> Metrics {
        match self.live() {
            Ok(live) => compute_metrics(Some(&live.template), &live.counts),
            Err(_) => Metrics::NEUTRAL,
        }
    }

    fn live(&self) -> Result<&LiveSession, StoreError> {
        match &self.phase {
            Phase::Loaded(live) => Ok(live),
            other => Err(not_live(other)),
        }
    }
}

fn live_mut(phase: &mut Phase) -> Result<&mut LiveSession, StoreError> {
    match phase {
        Phase::Loaded(live) => Ok(live),
        other => Err(not_live(other)),
    }
}

fn not_live(phase: &Phase) -> StoreError {
    match phase {
        Phase::Finalized(id) => StoreError::Finalized(id.clone()),
        _ => StoreError::NotLoaded,
    }
}

fn checked_key(live: &LiveSession, category: CategoryKey, item: &str) -> Result<CountKey, StoreError> {
    let key = CountKey::new(category, item);
    if live.template.contains(&key) || live.counts.keys().any(|k| *k == key) {
        Ok(key)
    } else {
        Err(StoreError::UnknownItem(key))
    }
}

fn write_draft<S: LocalStorage>(storage: &S, live: &LiveSession) -> Result<(), StoreError> {
    let draft = SessionDraft {
        instance_id: live.instance_id.clone(),
        counts: live.counts.clone(),
    };
    let json = serde_json::to_string(&draft)?;
    storage.set(&draft_key(&live.instance_id), &json)
}
