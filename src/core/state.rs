//! Shared read model.
//!
//! A snapshot of what the workers have learned so far: the signed-in user,
//! the company they created or belong to, their profile and photo. Workers
//! write it on their success paths, always before emitting the success
//! signal, so anything that waited for that signal reads the new value.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::domain::{RecordId, User};

/// Queries the registration orchestrator needs
pub trait ReadModel: Send + Sync {
    /// Id of the signed-in user
    fn current_user_id(&self) -> Option<RecordId>;

    /// Id of the company created by the last create-parent-resource call
    fn created_parent_resource_id(&self) -> Option<RecordId>;

    /// Id of the most recently uploaded asset
    fn uploaded_asset_id(&self) -> Option<RecordId>;
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    user: Option<User>,
    company: Option<Value>,
    profile: Option<Value>,
    image: Option<Value>,
}

/// In-process read model
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<Snapshot>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn company(&self) -> Option<Value> {
        self.read().company.clone()
    }

    pub fn profile(&self) -> Option<Value> {
        self.read().profile.clone()
    }

    pub fn image(&self) -> Option<Value> {
        self.read().image.clone()
    }

    pub fn set_user(&self, user: User) {
        self.write().user = Some(user);
    }

    pub fn set_company(&self, company: Option<Value>) {
        self.write().company = company;
    }

    pub fn set_profile(&self, profile: Value) {
        self.write().profile = Some(profile);
    }

    pub fn set_image(&self, image: Option<Value>) {
        self.write().image = image;
    }

    /// Forget everything tied to the current session
    pub fn clear(&self) {
        *self.write() = Snapshot::default();
    }
}

/// Pull an `id` out of a record, tolerating the `{data: {id}}` envelope
fn record_id(record: &Value) -> Option<RecordId> {
    let id = record
        .get("id")
        .or_else(|| record.get("data").and_then(|data| data.get("id")))?;
    serde_json::from_value(id.clone()).ok()
}

impl ReadModel for SessionState {
    fn current_user_id(&self) -> Option<RecordId> {
        self.read().user.as_ref().map(|user| user.id.clone())
    }

    fn created_parent_resource_id(&self) -> Option<RecordId> {
        self.read().company.as_ref().and_then(record_id)
    }

    fn uploaded_asset_id(&self) -> Option<RecordId> {
        self.read().image.as_ref().and_then(record_id)
    }
}
