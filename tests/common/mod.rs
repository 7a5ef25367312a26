//! Shared test fixtures: a scripted gateway and journal helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use onboard::adapters::{Gateway, GatewayError, MemorySessionStore};
use onboard::core::Coordinator;
use onboard::domain::{
    AssetUpload, AuthSession, Credentials, IntentKind, NewAccount, NewCompany, Notice,
    Polarity, ProfileListing, ProfileRequest, RecordId, Signal, User,
};

/// What a scripted call answers
#[derive(Clone, Debug)]
pub enum Reply<T> {
    Data(T),
    Empty,
    Fail { status: u16, body: Value },
    Down(String),
}

impl<T: Clone> Reply<T> {
    fn produce(&self) -> Result<Option<T>, GatewayError> {
        match self {
            Reply::Data(data) => Ok(Some(data.clone())),
            Reply::Empty => Ok(None),
            Reply::Fail { status, body } => Err(GatewayError::Api {
                status: *status,
                body: Some(body.clone()),
            }),
            Reply::Down(message) => Err(GatewayError::Transport(message.clone())),
        }
    }
}

pub fn user(id: impl Into<RecordId>) -> User {
    let mut user = User::new(id);
    user.username = Some("ada".to_string());
    user.email = Some("ada@example.com".to_string());
    user
}

pub fn auth(id: impl Into<RecordId>) -> AuthSession {
    AuthSession {
        jwt: "jwt-1".to_string(),
        user: user(id),
    }
}

pub fn profile_listing() -> ProfileListing {
    serde_json::from_value(json!({
        "data": [{
            "id": 21,
            "attributes": {
                "name": "ada",
                "company": {"data": {"id": 3, "attributes": {"name": "Acme"}}},
                "profilePhoto": {"data": {"id": 11, "attributes": {"name": "me.png"}}}
            }
        }]
    }))
    .unwrap()
}

/// Gateway with one scripted reply per operation.
///
/// Every call sleeps for `delay` while counted as active, so tests can check
/// how many calls overlapped.
pub struct FakeGateway {
    pub authenticate: Mutex<Reply<AuthSession>>,
    pub register: Mutex<Reply<AuthSession>>,
    pub current_session: Mutex<Reply<User>>,
    pub profile: Mutex<Reply<ProfileListing>>,
    pub create_profile: Mutex<Reply<Value>>,
    pub create_company: Mutex<Reply<Value>>,
    pub upload: Mutex<Reply<Vec<Value>>>,
    pub end_session: Mutex<Reply<()>>,

    pub delay: Duration,
    calls: Mutex<Vec<&'static str>>,
    profile_requests: Mutex<Vec<ProfileRequest>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            authenticate: Mutex::new(Reply::Data(auth(8i64))),
            register: Mutex::new(Reply::Data(auth(8i64))),
            current_session: Mutex::new(Reply::Data(user(8i64))),
            profile: Mutex::new(Reply::Data(profile_listing())),
            create_profile: Mutex::new(Reply::Data(json!({"id": 21, "attributes": {"name": "ada"}}))),
            create_company: Mutex::new(Reply::Data(json!({"id": 3, "attributes": {"name": "Acme"}}))),
            upload: Mutex::new(Reply::Data(vec![json!({"id": 11, "name": "me.png"})])),
            end_session: Mutex::new(Reply::Data(())),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            profile_requests: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn profile_requests(&self) -> Vec<ProfileRequest> {
        self.profile_requests.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn call<T: Clone>(
        &self,
        name: &'static str,
        reply: &Mutex<Reply<T>>,
    ) -> Result<Option<T>, GatewayError> {
        self.calls.lock().unwrap().push(name);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = reply.lock().unwrap().produce();
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    fn name(&self) -> &str {
        "fake"
    }

    async fn authenticate(
        &self,
        _credentials: &Credentials,
    ) -> Result<Option<AuthSession>, GatewayError> {
        self.call("authenticate", &self.authenticate).await
    }

    async fn register_account(
        &self,
        _account: &NewAccount<'_>,
    ) -> Result<Option<AuthSession>, GatewayError> {
        self.call("register_account", &self.register).await
    }

    async fn fetch_current_session(&self) -> Result<Option<User>, GatewayError> {
        self.call("fetch_current_session", &self.current_session).await
    }

    async fn fetch_profile(&self, _user_id: &RecordId) -> Result<ProfileListing, GatewayError> {
        Ok(self
            .call("fetch_profile", &self.profile)
            .await?
            .unwrap_or_default())
    }

    async fn create_profile(
        &self,
        request: &ProfileRequest,
    ) -> Result<Option<Value>, GatewayError> {
        self.profile_requests.lock().unwrap().push(request.clone());
        self.call("create_profile", &self.create_profile).await
    }

    async fn create_parent_resource(
        &self,
        _company: &NewCompany,
    ) -> Result<Option<Value>, GatewayError> {
        self.call("create_parent_resource", &self.create_company).await
    }

    async fn upload_asset(&self, _upload: &AssetUpload) -> Result<Option<Vec<Value>>, GatewayError> {
        self.call("upload_asset", &self.upload).await
    }

    async fn end_session(&self) -> Result<(), GatewayError> {
        self.call("end_session", &self.end_session).await.map(|_| ())
    }
}

/// A coordinator over a fake gateway and an in-memory session store
pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub session: Arc<MemorySessionStore>,
    pub coordinator: Coordinator,
}

impl Harness {
    pub fn start(gateway: FakeGateway) -> Self {
        Self::with_session(gateway, MemorySessionStore::new())
    }

    pub fn with_session(gateway: FakeGateway, session: MemorySessionStore) -> Self {
        let gateway = Arc::new(gateway);
        let session = Arc::new(session);
        let coordinator = Coordinator::start(gateway.clone(), session.clone()).unwrap();
        Self {
            gateway,
            session,
            coordinator,
        }
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.coordinator.bus().journal().signals()
    }
}

/// Kinds of every intent in the journal, in order
pub fn intents(signals: &[Signal]) -> Vec<IntentKind> {
    signals
        .iter()
        .filter_map(Signal::as_intent)
        .map(|intent| intent.kind())
        .collect()
}

/// (kind, polarity) of every outcome in the journal, in order
pub fn outcomes(signals: &[Signal]) -> Vec<(IntentKind, Polarity)> {
    signals
        .iter()
        .filter_map(Signal::as_outcome)
        .map(|outcome| (outcome.kind(), outcome.polarity()))
        .collect()
}

pub fn notices(signals: &[Signal]) -> Vec<Notice> {
    signals.iter().filter_map(Signal::as_notice).cloned().collect()
}
