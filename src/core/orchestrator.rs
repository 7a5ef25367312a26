//! Registration orchestrator.
//!
//! Runs after an account has been registered. Depending on the request it
//! creates the company, uploads the profile photo, then creates the profile.
//! Each step emits an intent and suspends until that kind's success or error
//! outcome arrives, whichever comes first.
//!
//! ```text
//! START ─┬─► COMPANY_PENDING ─┬─► IMAGE_PENDING ─┬─► PROFILE_PENDING ─► DONE
//!        └────────────────────┴──────────────────┘          │
//!                 any *_PENDING error ─────────────────► ABORTED
//! ```
//!
//! An error outcome ends the workflow without undoing earlier steps: a
//! company created before a failed upload stays created. Failures outside
//! the step outcomes (missing read-model data, non-numeric ids, an intent no
//! watcher accepts, a closed bus) are reported as a register error.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::bus::{BusError, SignalBus};
use super::state::ReadModel;
use crate::domain::{
    AssetUpload, CompanyRef, IdError, Intent, IntentKind, Outcome, ProfileRequest, RecordId,
    RegisterRequest, RegistrationOutcome, RegistrationStep,
};

/// Failures that are not step outcomes
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("No {0} available in session state")]
    MissingState(&'static str),

    #[error("Invalid {field} id: {source}")]
    InvalidId {
        field: &'static str,
        #[source]
        source: IdError,
    },

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// A workflow error tagged with the step it happened in
#[derive(Debug)]
struct StepFailure {
    at: RegistrationStep,
    error: WorkflowError,
}

impl StepFailure {
    fn new(at: RegistrationStep, error: impl Into<WorkflowError>) -> Self {
        Self {
            at,
            error: error.into(),
        }
    }
}

/// Workflow-local state, built up step by step and dropped at the end
#[derive(Debug, Clone)]
struct RegistrationDraft {
    username: String,
    user_role: String,
    company: CompanyRef,
    image: Option<AssetUpload>,
    profile_photo: Option<RecordId>,
}

impl RegistrationDraft {
    fn from_request(request: &RegisterRequest) -> Self {
        Self {
            username: request.username.clone(),
            user_role: request.user_role.clone(),
            company: request.company.clone(),
            image: request.image.clone(),
            profile_photo: None,
        }
    }

    /// Assemble the create-profile payload; ids are coerced to integers
    fn profile_request(&self, user: &RecordId) -> Result<ProfileRequest, WorkflowError> {
        let company = match &self.company {
            CompanyRef::Identifier(id) => id.coerce().map_err(|source| WorkflowError::InvalidId {
                field: "company",
                source,
            })?,
            CompanyRef::NewResource(_) => return Err(WorkflowError::MissingState("company id")),
        };
        let user = user.coerce().map_err(|source| WorkflowError::InvalidId {
            field: "user",
            source,
        })?;

        Ok(ProfileRequest {
            name: self.username.clone(),
            company,
            user,
            user_role: self.user_role.clone(),
            profile_photo: self.profile_photo.clone(),
        })
    }
}

/// Coordinates the post-registration steps
#[derive(Clone)]
pub struct RegistrationOrchestrator {
    bus: SignalBus,
    read_model: Arc<dyn ReadModel>,
}

impl RegistrationOrchestrator {
    pub fn new(bus: SignalBus, read_model: Arc<dyn ReadModel>) -> Self {
        Self { bus, read_model }
    }

    /// Run the workflow to completion or abort.
    ///
    /// Callers must not start two registrations at once: outcomes are matched
    /// by kind only.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn run(&self, request: &RegisterRequest) -> RegistrationOutcome {
        let mut draft = RegistrationDraft::from_request(request);

        match self.advance(&mut draft).await {
            Ok(outcome) => {
                match &outcome {
                    RegistrationOutcome::Completed { .. } => info!("Registration workflow completed"),
                    RegistrationOutcome::Aborted { at, reason } => {
                        warn!(step = %at, %reason, "Registration workflow aborted")
                    }
                }
                outcome
            }
            Err(failure) => {
                let reason = failure.error.to_string();
                warn!(step = %failure.at, %reason, "Registration workflow failed");
                self.bus.emit(Outcome::error(IntentKind::Register, reason.clone()));
                RegistrationOutcome::Aborted {
                    at: failure.at,
                    reason,
                }
            }
        }
    }

    async fn advance(
        &self,
        draft: &mut RegistrationDraft,
    ) -> Result<RegistrationOutcome, StepFailure> {
        if let CompanyRef::NewResource(company) = &draft.company {
            let step = RegistrationStep::CompanyPending;
            let outcome = self
                .gate(step, Intent::CreateParentResource(company.clone()))
                .await?;
            if let Outcome::Error { message, .. } = outcome {
                return Ok(aborted(step, message));
            }

            let id = self
                .read_model
                .created_parent_resource_id()
                .ok_or_else(|| StepFailure::new(step, WorkflowError::MissingState("created company")))?;
            draft.company = CompanyRef::Identifier(id);
        }

        if let Some(image) = draft.image.clone() {
            let step = RegistrationStep::ImagePending;
            let outcome = self.gate(step, Intent::UploadAsset(image)).await?;
            if let Outcome::Error { message, .. } = outcome {
                return Ok(aborted(step, message));
            }

            let id = self
                .read_model
                .uploaded_asset_id()
                .ok_or_else(|| StepFailure::new(step, WorkflowError::MissingState("uploaded image")))?;
            draft.profile_photo = Some(id);
        }

        let step = RegistrationStep::ProfilePending;
        let user = self
            .read_model
            .current_user_id()
            .ok_or_else(|| StepFailure::new(step, WorkflowError::MissingState("signed-in user")))?;
        let request = draft
            .profile_request(&user)
            .map_err(|e| StepFailure::new(step, e))?;

        match self.gate(step, Intent::CreateProfile(request)).await? {
            Outcome::Success { payload, .. } => Ok(RegistrationOutcome::Completed { profile: payload }),
            Outcome::Error { message, .. } => Ok(aborted(step, message)),
        }
    }

    /// Emit an intent and suspend until its kind resolves
    async fn gate(&self, step: RegistrationStep, intent: Intent) -> Result<Outcome, StepFailure> {
        let kind = intent.kind();
        let waiter = self.bus.outcome_waiter(kind);

        debug!(%step, %kind, "Entering pending step");
        self.bus
            .emit_intent(intent)
            .map_err(|e| StepFailure::new(step, e))?;

        let resolution = waiter
            .resolve()
            .await
            .map_err(|e| StepFailure::new(step, e))?;
        Ok(resolution.outcome)
    }
}

fn aborted(at: RegistrationStep, reason: String) -> RegistrationOutcome {
    RegistrationOutcome::Aborted { at, reason }
}
