//! Interfaces for the external collaborators.
//!
//! The coordinator never talks to the network or to storage directly. It
//! goes through a [`Gateway`] for remote calls and a [`SessionStore`] for the
//! session credential, so both can be swapped out (the integration tests use
//! scripted fakes).

pub mod http;
pub mod session;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    AssetUpload, AuthSession, Credentials, NewAccount, NewCompany, ProfileListing,
    ProfileRequest, RecordId, User,
};

// Re-export the concrete collaborators
pub use http::HttpGateway;
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

/// Errors raised by a remote call
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The API answered with an error status and (maybe) a structured body
    #[error("API error (status {status})")]
    Api { status: u16, body: Option<Value> },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Human-readable message for an error outcome.
    ///
    /// Prefers the message inside a structured error payload and falls back
    /// to the error's own description.
    pub fn user_message(&self) -> String {
        if let GatewayError::Api {
            body: Some(body), ..
        } = self
        {
            if let Some(message) = structured_message(body) {
                return message;
            }
        }
        self.to_string()
    }
}

fn structured_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::Object(error)) => {
            if let Some(Value::String(message)) = error.get("message") {
                return Some(message.clone());
            }
        }
        Some(Value::String(message)) => return Some(message.clone()),
        _ => {}
    }
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// Remote operations the workers rely on.
///
/// `Ok(None)` means the call succeeded but carried no payload, which workers
/// treat as an application-level failure.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Human-readable gateway name
    fn name(&self) -> &str;

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<AuthSession>, GatewayError>;

    async fn register_account(
        &self,
        account: &NewAccount<'_>,
    ) -> Result<Option<AuthSession>, GatewayError>;

    /// Resolve the user the stored credential belongs to
    async fn fetch_current_session(&self) -> Result<Option<User>, GatewayError>;

    async fn fetch_profile(&self, user_id: &RecordId) -> Result<ProfileListing, GatewayError>;

    async fn create_profile(
        &self,
        request: &ProfileRequest,
    ) -> Result<Option<Value>, GatewayError>;

    /// Create a company; the returned record carries its `id`
    async fn create_parent_resource(
        &self,
        company: &NewCompany,
    ) -> Result<Option<Value>, GatewayError>;

    /// Upload a file; the API answers with a list of stored file records
    async fn upload_asset(&self, upload: &AssetUpload) -> Result<Option<Vec<Value>>, GatewayError>;

    async fn end_session(&self) -> Result<(), GatewayError>;
}
