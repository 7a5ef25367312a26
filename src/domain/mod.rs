//! Domain types for the onboard coordinator.
//!
//! This module contains the core data structures:
//! - Signals: intents, outcomes and notices carried on the bus
//! - Records: response shapes returned by the remote API
//! - Registration: request payloads and the registration workflow states

pub mod records;
pub mod registration;
pub mod signals;

// Re-export commonly used types
pub use records::{
    Asset, AuthSession, IdError, ProfileAttributes, ProfileListing, ProfileRecord, RecordId,
    Relation, User,
};
pub use registration::{
    AssetUpload, CompanyRef, Credentials, NewAccount, NewCompany, ProfileRequest,
    RegisterRequest, RegistrationOutcome, RegistrationStep,
};
pub use signals::{Intent, IntentKind, Notice, Outcome, Polarity, Signal};
