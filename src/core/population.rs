//! Best-effort profile bundle population.
//!
//! After a sign-in, the user's profile, company and photo are fetched in one
//! call and pushed out as notices. Any failure here is logged and dropped:
//! the sign-in already succeeded and nothing waits on these signals.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use super::bus::SignalBus;
use super::state::SessionState;
use crate::adapters::{Gateway, GatewayError};
use crate::domain::{Notice, RecordId};

#[derive(Debug, Error)]
enum PopulateError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("No profile found for user {0}")]
    NoProfile(RecordId),
}

/// Fetches the profile bundle for a user
#[derive(Clone)]
pub struct ProfilePopulator {
    gateway: Arc<dyn Gateway>,
    state: Arc<SessionState>,
    bus: SignalBus,
}

impl ProfilePopulator {
    pub fn new(gateway: Arc<dyn Gateway>, state: Arc<SessionState>, bus: SignalBus) -> Self {
        Self {
            gateway,
            state,
            bus,
        }
    }

    /// Fetch and publish the bundle. Never fails and never emits an outcome.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn populate(&self, user_id: &RecordId) {
        if let Err(e) = self.try_populate(user_id).await {
            debug!(error = %e, "Profile population skipped");
        }
    }

    async fn try_populate(&self, user_id: &RecordId) -> Result<(), PopulateError> {
        let listing = self.gateway.fetch_profile(user_id).await?;
        let profile = listing
            .data
            .into_iter()
            .next()
            .ok_or_else(|| PopulateError::NoProfile(user_id.clone()))?;

        let company = profile.attributes.company.clone();
        self.state.set_company(company.clone());
        self.bus.emit(Notice::ParentResourceAssociated(company));

        let record = profile.to_value();
        self.state.set_profile(record.clone());
        self.bus.emit(Notice::ProfileFetched(record));

        let photo = profile.photo().cloned();
        self.state.set_image(photo.clone());
        self.bus.emit(Notice::AssetFetched(photo));

        debug!("Profile bundle populated");
        Ok(())
    }
}
