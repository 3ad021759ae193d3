//! HTTP client for the worktally API.

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use worktally_core::{
    DateWindow, NewResult, Preset, ResultRecord, SurveyInstance, SurveyTemplate, User,
    WorkListsPayload,
};

use crate::SyncError;
use crate::api::{AuthApi, CatalogApi, InstanceApi, LoginResponse, ResultApi};

/// Client for the worktally REST API.
///
/// Every call except login and token verification needs a bearer token;
/// without one the call fails with [`SyncError::Unauthorized`] before any
/// request is made.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedInstance {
    instance_id: String,
}

#[derive(Deserialize)]
struct VerifiedUser {
    user: User,
}

impl ApiClient {
    /// `base_url` should be like `http://localhost:5000` (no trailing slash).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, SyncError> {
        let token = self.token.as_deref().ok_or(SyncError::Unauthorized)?;
        let url = self.url(path);
        info!(method = %method, url = %url, "api request");
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let resp = send_authed(self.authed(Method::GET, path)?).await?;
        Ok(resp.json().await?)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Response, SyncError> {
        send_authed(self.authed(method, path)?.json(body)).await
    }
}

/// Message of a failed response: the API's `{ "message": ... }` field when
/// present, otherwise the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.to_string())
}

fn server_error(status: StatusCode, body: &str) -> SyncError {
    SyncError::Server {
        status: status.as_u16(),
        message: error_message(body),
    }
}

/// Statuses that mean the bearer token is missing, expired or not allowed.
fn rejects_token(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Turn a non-success status into [`SyncError::Server`].
async fn check_status(resp: Response) -> Result<Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let err = server_error(status, &body);
    warn!(status = status.as_u16(), error = %err, "api request failed");
    Err(err)
}

async fn send_authed(req: RequestBuilder) -> Result<Response, SyncError> {
    let resp = req.send().await?;
    if rejects_token(resp.status()) {
        warn!(status = resp.status().as_u16(), "token rejected");
        return Err(SyncError::Unauthorized);
    }
    check_status(resp).await
}

fn ids_body(ids: &[String]) -> serde_json::Value {
    json!({ "ids": ids })
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(
        &self,
        company_code: &str,
        user_id: &str,
        password: &str,
    ) -> Result<LoginResponse, SyncError> {
        let url = self.url("/api/login");
        info!(url = %url, company_code, user_id, "logging in");
        let body = json!({
            "companyCode": company_code,
            "userId": user_id,
            "password": password,
        });
        let resp = check_status(self.client.post(&url).json(&body).send().await?).await?;
        let login: LoginResponse = resp.json().await?;
        info!(user = %login.user.name, role = ?login.user.role, "logged in");
        Ok(login)
    }

    async fn verify_token(&self, token: &str) -> Result<User, SyncError> {
        let url = self.url("/api/verify-token");
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "token": token }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SyncError::Unauthorized);
        }
        let verified: VerifiedUser = resp.json().await?;
        Ok(verified.user)
    }
}

#[async_trait]
impl CatalogApi for ApiClient {
    async fn list_templates(&self) -> Result<Vec<SurveyTemplate>, SyncError> {
        let templates: Vec<SurveyTemplate> = self.get_json("/api/surveys").await?;
        info!(count = templates.len(), "fetched survey templates");
        Ok(templates)
    }

    async fn create_template(&self, payload: &WorkListsPayload) -> Result<(), SyncError> {
        self.send_json(Method::POST, "/api/surveys", payload).await?;
        Ok(())
    }

    async fn update_template(&self, id: &str, payload: &WorkListsPayload) -> Result<(), SyncError> {
        self.send_json(Method::PUT, &format!("/api/surveys/{id}"), payload)
            .await?;
        Ok(())
    }

    async fn delete_templates(&self, ids: &[String]) -> Result<(), SyncError> {
        self.send_json(Method::DELETE, "/api/surveys", &ids_body(ids))
            .await?;
        info!(count = ids.len(), "deleted survey templates");
        Ok(())
    }

    async fn list_presets(&self) -> Result<Vec<Preset>, SyncError> {
        self.get_json("/api/presets").await
    }

    async fn create_preset(&self, payload: &WorkListsPayload) -> Result<(), SyncError> {
        self.send_json(Method::POST, "/api/presets", payload).await?;
        Ok(())
    }

    async fn update_preset(&self, id: &str, payload: &WorkListsPayload) -> Result<(), SyncError> {
        self.send_json(Method::PUT, &format!("/api/presets/{id}"), payload)
            .await?;
        Ok(())
    }

    async fn delete_presets(&self, ids: &[String]) -> Result<(), SyncError> {
        self.send_json(Method::DELETE, "/api/presets", &ids_body(ids))
            .await?;
        info!(count = ids.len(), "deleted presets");
        Ok(())
    }
}

#[async_trait]
impl InstanceApi for ApiClient {
    async fn create_instance(&self, template_id: &str, template_name: &str) -> Result<String, SyncError> {
        let body = json!({
            "surveyTemplateId": template_id,
            "surveyTemplateName": template_name,
        });
        let resp = self
            .send_json(Method::POST, "/api/survey-instances", &body)
            .await?;
        let created: CreatedInstance = resp.json().await?;
        info!(instance_id = %created.instance_id, template_id, "created survey instance");
        Ok(created.instance_id)
    }

    async fn list_in_progress(&self) -> Result<Vec<SurveyInstance>, SyncError> {
        self.get_json("/api/survey-instances/in-progress").await
    }
}

#[async_trait]
impl ResultApi for ApiClient {
    async fn save_result(&self, result: &NewResult) -> Result<(), SyncError> {
        self.send_json(Method::POST, "/api/results", result).await?;
        info!(instance_id = %result.instance_id, total_count = result.total_count, "saved result");
        Ok(())
    }

    async fn discard_instance(&self, instance_id: &str) -> Result<(), SyncError> {
        self.send_json(
            Method::POST,
            "/api/results/discard",
            &json!({ "instanceId": instance_id }),
        )
        .await?;
        info!(instance_id, "discarded survey instance");
        Ok(())
    }

    async fn query_results(&self, window: &DateWindow) -> Result<Vec<ResultRecord>, SyncError> {
        let start = window.start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let end = window.end.to_rfc3339_opts(SecondsFormat::Millis, true);
        let req = self
            .authed(Method::GET, "/api/results")?
            .query(&[("startDate", start.as_str()), ("endDate", end.as_str())]);
        let records: Vec<ResultRecord> = send_authed(req).await?.json().await?;
        info!(count = records.len(), start = %start, end = %end, "queried results");
        Ok(records)
    }

    async fn list_all_results(&self) -> Result<Vec<ResultRecord>, SyncError> {
        self.get_json("/api/results").await
    }

    async fn delete_results(&self, ids: &[String]) -> Result<(), SyncError> {
        self.send_json(Method::DELETE, "/api/results", &ids_body(ids))
            .await?;
        info!(count = ids.len(), "deleted results");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worktally_core::{CountKey, Role};

    #[test]
    fn api_client_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/".into());
        assert_eq!(client.base_url, "http://localhost:5000");
        assert_eq!(client.url("/api/surveys"), "http://localhost:5000/api/surveys");
    }

    #[tokio::test]
    async fn calls_without_token_fail_before_sending() {
        // Port 9 (discard) is never contacted: the token check comes first.
        let client = ApiClient::new("http://127.0.0.1:9".into());
        assert!(matches!(
            client.list_templates().await,
            Err(SyncError::Unauthorized)
        ));
        assert!(matches!(
            client.discard_instance("i1").await,
            Err(SyncError::Unauthorized)
        ));
    }

    #[test]
    fn with_token_sets_bearer() {
        let mut client = ApiClient::new("http://localhost:5000".into()).with_token("abc");
        assert_eq!(client.token(), Some("abc"));
        client.set_token(None);
        assert!(client.authed(Method::GET, "/api/surveys").is_err());
    }

    #[test]
    fn auth_statuses_reject_the_token() {
        assert!(rejects_token(StatusCode::UNAUTHORIZED));
        assert!(rejects_token(StatusCode::FORBIDDEN));
        assert!(!rejects_token(StatusCode::NOT_FOUND));
        assert!(!rejects_token(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn server_error_uses_message_field() {
        let err = server_error(StatusCode::BAD_REQUEST, r#"{"message":"name is required"}"#);
        assert!(matches!(
            err,
            SyncError::Server { status: 400, ref message } if message == "name is required"
        ));
    }

    #[test]
    fn server_error_falls_back_to_raw_body() {
        let err = server_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(
            err,
            SyncError::Server { status: 502, ref message } if message == "<html>bad gateway</html>"
        ));
        assert_eq!(error_message(r#"{"error":"x"}"#), r#"{"error":"x"}"#);
        assert_eq!(error_message(""), "");
    }

    #[test]
    fn login_response_parses() {
        let json = r#"{
            "token": "jwt.abc.def",
            "user": {"name": "Mika", "userId": "mika", "role": "user", "companyCode": "C01"}
        }"#;
        let parsed: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.token, "jwt.abc.def");
        assert_eq!(parsed.user.role, Role::User);
    }

    #[test]
    fn created_instance_parses() {
        let parsed: CreatedInstance = serde_json::from_str(r#"{"instanceId":"xyz"}"#).unwrap();
        assert_eq!(parsed.instance_id, "xyz");
    }

    #[test]
    fn new_result_body_matches_api_fields() {
        let result = NewResult {
            instance_id: "i1".into(),
            survey_id: "t1".into(),
            survey_name: "Line".into(),
            counts: [("wasteful-Wait".parse::<CountKey>().unwrap(), 2)].into_iter().collect(),
            total_count: 2,
            discovery_rate: 50.0,
            rank: worktally_core::Rank::D,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["instanceId"], "i1");
        assert_eq!(json["surveyId"], "t1");
        assert_eq!(json["counts"]["wasteful-Wait"], 2);
        assert_eq!(json["rank"], "D");
    }
}
