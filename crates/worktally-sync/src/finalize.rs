//! Ending a counting session against the result store.
//!
//! The remote call always goes first. Local state is only finalized once
//! the server has accepted the result or the discard, so a failed request
//! leaves the draft in place to retry from.

use tracing::{info, warn};
use worktally_core::NewResult;
use worktally_store::{LocalStorage, SessionStore, StoreError};

use crate::SyncError;
use crate::api::ResultApi;

/// The result the live session would be saved as.
pub fn build_result<S: LocalStorage>(session: &SessionStore<S>) -> Result<NewResult, SyncError> {
    session.ensure_loaded()?;
    let (Some(instance_id), Some(template)) = (session.instance_id(), session.template()) else {
        return Err(StoreError::NotLoaded.into());
    };
    let metrics = session.metrics();
    Ok(NewResult {
        instance_id: instance_id.to_string(),
        survey_id: template.id.clone(),
        survey_name: template.name.clone(),
        counts: session.counts(),
        total_count: metrics.total,
        discovery_rate: metrics.discovery_rate,
        rank: metrics.rank,
    })
}

/// Save the session's result remotely, then delete its draft.
pub async fn commit_session<S, R>(session: &mut SessionStore<S>, results: &R) -> Result<NewResult, SyncError>
where
    S: LocalStorage,
    R: ResultApi + ?Sized,
{
    let result = build_result(session)?;
    if let Err(e) = results.save_result(&result).await {
        warn!(instance_id = %result.instance_id, error = %e, "saving result failed, draft kept");
        return Err(e);
    }
    session.finalize_commit()?;
    info!(
        instance_id = %result.instance_id,
        total_count = result.total_count,
        rank = %result.rank,
        "result saved"
    );
    Ok(result)
}

/// Mark the session's instance discarded remotely, then delete its draft.
/// Returns the discarded instance id.
pub async fn discard_session<S, R>(session: &mut SessionStore<S>, results: &R) -> Result<String, SyncError>
where
    S: LocalStorage,
    R: ResultApi + ?Sized,
{
    session.ensure_loaded()?;
    let instance_id = session
        .instance_id()
        .map(str::to_string)
        .ok_or(StoreError::NotLoaded)?;
    if let Err(e) = results.discard_instance(&instance_id).await {
        warn!(instance_id = %instance_id, error = %e, "discard failed, draft kept");
        return Err(e);
    }
    let notice = session.finalize_discard()?;
    Ok(notice.instance_id)
}
