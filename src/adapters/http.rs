//! REST gateway for a Strapi-style backend.
//!
//! Every call is a single JSON request. Error statuses are turned into
//! [`GatewayError::Api`] with the decoded body attached so workers can pull
//! the backend's own message out of it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::{Gateway, GatewayError, SessionStore};
use crate::config::ApiSettings;
use crate::domain::{
    AssetUpload, AuthSession, Credentials, NewAccount, NewCompany, ProfileListing,
    ProfileRequest, RecordId, User,
};

/// HTTP client for the backend API
pub struct HttpGateway {
    /// API root, without trailing slash
    base_url: String,
    /// Per-request timeout
    timeout: Duration,
    /// Where the bearer token is read from
    session: Arc<dyn SessionStore>,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration, session: Arc<dyn SessionStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout,
            session,
            client: reqwest::Client::new(),
        }
    }

    /// Create from config
    pub fn from_settings(settings: &ApiSettings, session: Arc<dyn SessionStore>) -> Self {
        Self::new(
            settings.base_url.clone(),
            Duration::from_secs(settings.timeout_seconds),
            session,
        )
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach timeout and, if present, the bearer token
    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.timeout(self.timeout);
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = self.prepare(request).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<Value>().await.ok();
        debug!(status = status.as_u16(), "API returned error status");
        Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Decode a body where `null` or an empty body mean "no payload"
    async fn optional_body<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, GatewayError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))?;
        if value.is_null() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Unwrap the `{data: ...}` envelope used by collection endpoints
    async fn enveloped(&self, request: RequestBuilder) -> Result<Option<Value>, GatewayError> {
        let body: Option<Value> = self.optional_body(request).await?;
        Ok(body
            .and_then(|mut body| body.get_mut("data").map(Value::take))
            .filter(|data| !data.is_null()))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<AuthSession>, GatewayError> {
        let request = self.client.post(self.api_url("auth/local")).json(&json!({
            "identifier": credentials.email,
            "password": credentials.password,
        }));
        self.optional_body(request).await
    }

    async fn register_account(
        &self,
        account: &NewAccount<'_>,
    ) -> Result<Option<AuthSession>, GatewayError> {
        let request = self
            .client
            .post(self.api_url("auth/local/register"))
            .json(account);
        self.optional_body(request).await
    }

    async fn fetch_current_session(&self) -> Result<Option<User>, GatewayError> {
        let request = self.client.get(self.api_url("users/me"));
        self.optional_body(request).await
    }

    async fn fetch_profile(&self, user_id: &RecordId) -> Result<ProfileListing, GatewayError> {
        let request = self.client.get(self.api_url("profiles")).query(&[
            ("filters[user][id][$eq]", user_id.to_string()),
            ("populate", "*".to_string()),
        ]);
        let listing: Option<ProfileListing> = self.optional_body(request).await?;
        Ok(listing.unwrap_or_default())
    }

    async fn create_profile(
        &self,
        request: &ProfileRequest,
    ) -> Result<Option<Value>, GatewayError> {
        let request = self
            .client
            .post(self.api_url("profiles"))
            .json(&json!({ "data": request }));
        self.enveloped(request).await
    }

    async fn create_parent_resource(
        &self,
        company: &NewCompany,
    ) -> Result<Option<Value>, GatewayError> {
        let request = self
            .client
            .post(self.api_url("companies"))
            .json(&json!({ "data": company }));
        self.enveloped(request).await
    }

    async fn upload_asset(&self, upload: &AssetUpload) -> Result<Option<Vec<Value>>, GatewayError> {
        let file_name = upload
            .file
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file_bytes = tokio::fs::read(&upload.file).await?;
        let part = Part::bytes(file_bytes).file_name(file_name);
        let form = Form::new().part("files", part);

        let request = self.client.post(self.api_url("upload")).multipart(form);
        self.optional_body(request).await
    }

    async fn end_session(&self) -> Result<(), GatewayError> {
        let request = self.client.post(self.api_url("auth/logout"));
        self.send(request).await?;
        Ok(())
    }
}
