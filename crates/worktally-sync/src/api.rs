//! Contracts of the remote collaborators.
//!
//! [`crate::ApiClient`] implements all of them over HTTP. Everything above
//! this layer is written against the traits so it can run on fakes.

use async_trait::async_trait;
use serde::Deserialize;
use worktally_core::{
    DateWindow, NewResult, Preset, ResultRecord, SurveyInstance, SurveyTemplate, User,
    WorkListsPayload,
};

use crate::SyncError;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(
        &self,
        company_code: &str,
        user_id: &str,
        password: &str,
    ) -> Result<LoginResponse, SyncError>;

    /// The user the token belongs to, or [`SyncError::Unauthorized`].
    async fn verify_token(&self, token: &str) -> Result<User, SyncError>;
}

/// Template and preset storage, scoped by the server to the caller's company.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<SurveyTemplate>, SyncError>;
    async fn create_template(&self, payload: &WorkListsPayload) -> Result<(), SyncError>;
    async fn update_template(&self, id: &str, payload: &WorkListsPayload) -> Result<(), SyncError>;
    async fn delete_templates(&self, ids: &[String]) -> Result<(), SyncError>;

    async fn list_presets(&self) -> Result<Vec<Preset>, SyncError>;
    async fn create_preset(&self, payload: &WorkListsPayload) -> Result<(), SyncError>;
    async fn update_preset(&self, id: &str, payload: &WorkListsPayload) -> Result<(), SyncError>;
    async fn delete_presets(&self, ids: &[String]) -> Result<(), SyncError>;
}

#[async_trait]
pub trait InstanceApi: Send + Sync {
    /// Open a new in-progress instance and return its id.
    async fn create_instance(&self, template_id: &str, template_name: &str) -> Result<String, SyncError>;
    async fn list_in_progress(&self) -> Result<Vec<SurveyInstance>, SyncError>;
}

#[async_trait]
pub trait ResultApi: Send + Sync {
    /// Store a result; the server also marks its instance completed.
    async fn save_result(&self, result: &NewResult) -> Result<(), SyncError>;
    /// Mark an instance discarded without storing a result.
    async fn discard_instance(&self, instance_id: &str) -> Result<(), SyncError>;
    async fn query_results(&self, window: &DateWindow) -> Result<Vec<ResultRecord>, SyncError>;
    async fn list_all_results(&self) -> Result<Vec<ResultRecord>, SyncError>;
    async fn delete_results(&self, ids: &[String]) -> Result<(), SyncError>;
}
