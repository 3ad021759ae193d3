//! Sync layer: remote collaborator contracts, the HTTP client, and the
//! flows that tie a local counting session to the server.

pub mod api;
pub mod coordinator;
mod error;
pub mod finalize;
pub mod summary;

#[cfg(feature = "http")]
pub mod http;

#[cfg(test)]
mod fake;

pub use api::{AuthApi, CatalogApi, InstanceApi, LoginResponse, ResultApi};
pub use coordinator::{ResumableInstance, SurveyInstanceCoordinator, UNKNOWN_TEMPLATE_LABEL};
pub use error::SyncError;
pub use finalize::{build_result, commit_session, discard_session};
pub use summary::{find_result, period_report, search_results};

#[cfg(feature = "http")]
pub use http::ApiClient;
