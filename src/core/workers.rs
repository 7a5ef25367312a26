//! Worker routines, one per intent kind.
//!
//! Each worker makes exactly one remote call, updates the read model on
//! success and emits exactly one outcome for its kind. Failures never leave
//! a worker: they become error outcomes carrying the best message available.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::bus::SignalBus;
use super::orchestrator::RegistrationOrchestrator;
use super::population::ProfilePopulator;
use super::state::SessionState;
use crate::adapters::{Gateway, SessionStore};
use crate::domain::{
    Asset, AssetUpload, Credentials, Intent, IntentKind, NewCompany, Notice, Outcome,
    ProfileRequest, RegisterRequest,
};

/// Something a watcher can hand intents to
#[async_trait]
pub trait IntentHandler: Send + Sync {
    /// Run to completion; must not panic or return early with work pending
    async fn handle(&self, intent: &Intent);
}

/// The full set of workers sharing one gateway, session store and bus
pub struct Workers {
    gateway: Arc<dyn Gateway>,
    session: Arc<dyn SessionStore>,
    state: Arc<SessionState>,
    bus: SignalBus,
    populator: ProfilePopulator,
    orchestrator: RegistrationOrchestrator,
}

impl Workers {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        session: Arc<dyn SessionStore>,
        state: Arc<SessionState>,
        bus: SignalBus,
    ) -> Self {
        let populator = ProfilePopulator::new(gateway.clone(), state.clone(), bus.clone());
        let orchestrator = RegistrationOrchestrator::new(bus.clone(), state.clone());
        Self {
            gateway,
            session,
            state,
            bus,
            populator,
            orchestrator,
        }
    }

    fn succeed(&self, kind: IntentKind, payload: Value) {
        info!(%kind, "Worker succeeded");
        self.bus.emit(Outcome::success(kind, payload));
    }

    fn fail(&self, kind: IntentKind, message: impl Into<String>) {
        let message = message.into();
        warn!(%kind, %message, "Worker failed");
        self.bus.emit(Outcome::error(kind, message));
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn sign_in(&self, credentials: &Credentials) {
        let kind = IntentKind::SignIn;
        let auth = match self.gateway.authenticate(credentials).await {
            Ok(Some(auth)) => auth,
            Ok(None) => return self.fail(kind, "Login epic Fail"),
            Err(e) => return self.fail(kind, e.user_message()),
        };

        if let Err(e) = self.session.store(&auth.jwt) {
            return self.fail(kind, e.to_string());
        }
        self.state.set_user(auth.user.clone());
        self.succeed(kind, auth.user.to_value());

        self.populator.populate(&auth.user.id).await;
    }

    #[instrument(skip_all)]
    pub async fn sign_in_by_token(&self) {
        let kind = IntentKind::SignInByToken;
        let message = match self.gateway.fetch_current_session().await {
            Ok(Some(user)) => {
                self.state.set_user(user.clone());
                self.succeed(kind, user.to_value());
                self.populator.populate(&user.id).await;
                return;
            }
            Ok(None) => "Login data parse failure".to_string(),
            Err(e) => e.user_message(),
        };

        // The stored credential did not verify
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to erase session credential");
        }
        self.fail(kind, message);
    }

    #[instrument(skip_all)]
    pub async fn sign_out(&self) {
        let kind = IntentKind::SignOut;
        if let Err(e) = self.gateway.end_session().await {
            return self.fail(kind, e.user_message());
        }

        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to erase session credential");
        }
        self.state.clear();
        self.succeed(kind, Value::Null);
        self.bus.emit(Notice::ParentResourceRemoved);
    }

    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) {
        let kind = IntentKind::Register;
        let auth = match self.gateway.register_account(&request.account()).await {
            Ok(Some(auth)) => auth,
            Ok(None) => return self.fail(kind, "Register Failed"),
            Err(e) => return self.fail(kind, e.user_message()),
        };

        if let Err(e) = self.session.store(&auth.jwt) {
            return self.fail(kind, e.to_string());
        }
        self.state.set_user(auth.user.clone());
        self.succeed(kind, auth.user.to_value());

        // Runs inside this invocation, so the next register intent waits for it
        let outcome = self.orchestrator.run(request).await;
        info!(completed = outcome.is_completed(), "Registration finished");
    }

    #[instrument(skip_all, fields(file = %upload.file.display()))]
    pub async fn upload_asset(&self, upload: &AssetUpload) {
        let kind = IntentKind::UploadAsset;
        let records = match self.gateway.upload_asset(upload).await {
            Ok(Some(records)) => records,
            Ok(None) => return self.fail(kind, "Upload Failed"),
            Err(e) => return self.fail(kind, e.user_message()),
        };

        let Some(asset) = records.into_iter().next().and_then(Asset::from_upload_record) else {
            return self.fail(kind, "Upload Failed");
        };

        let payload = asset.to_value();
        self.state.set_image(Some(payload.clone()));
        self.succeed(kind, payload);
    }

    #[instrument(skip_all, fields(name = %request.name))]
    pub async fn create_profile(&self, request: &ProfileRequest) {
        let kind = IntentKind::CreateProfile;
        match self.gateway.create_profile(request).await {
            Ok(Some(profile)) => {
                self.state.set_profile(profile.clone());
                self.succeed(kind, profile);
            }
            Ok(None) => self.fail(kind, "Data error"),
            Err(e) => self.fail(kind, e.user_message()),
        }
    }

    #[instrument(skip_all, fields(slug = %company.slug))]
    pub async fn create_parent_resource(&self, company: &NewCompany) {
        let kind = IntentKind::CreateParentResource;
        match self.gateway.create_parent_resource(company).await {
            Ok(Some(record)) => {
                self.state.set_company(Some(record.clone()));
                self.succeed(kind, record);
            }
            Ok(None) => self.fail(kind, "Company creation failed"),
            Err(e) => self.fail(kind, e.user_message()),
        }
    }
}

#[async_trait]
impl IntentHandler for Workers {
    async fn handle(&self, intent: &Intent) {
        match intent {
            Intent::SignIn(credentials) => self.sign_in(credentials).await,
            Intent::SignInByToken => self.sign_in_by_token().await,
            Intent::SignOut => self.sign_out().await,
            Intent::Register(request) => self.register(request).await,
            Intent::CreateProfile(request) => self.create_profile(request).await,
            Intent::UploadAsset(upload) => self.upload_asset(upload).await,
            Intent::CreateParentResource(company) => self.create_parent_resource(company).await,
        }
    }
}
