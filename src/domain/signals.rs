//! Signals carried on the bus.
//!
//! Every component communicates by emitting a [`Signal`] or waiting for one.
//! Intents ask for work, outcomes report exactly one result per worker
//! invocation, and notices are best-effort side-channel updates.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registration::{
    AssetUpload, Credentials, NewCompany, ProfileRequest, RegisterRequest,
};

/// The closed set of intent kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentKind {
    SignIn,
    SignInByToken,
    SignOut,
    Register,
    CreateProfile,
    UploadAsset,
    CreateParentResource,
}

impl IntentKind {
    /// All kinds, in the order watchers are started
    pub const ALL: [IntentKind; 7] = [
        IntentKind::SignIn,
        IntentKind::SignInByToken,
        IntentKind::SignOut,
        IntentKind::Register,
        IntentKind::UploadAsset,
        IntentKind::CreateProfile,
        IntentKind::CreateParentResource,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::SignIn => "sign-in",
            IntentKind::SignInByToken => "sign-in-by-token",
            IntentKind::SignOut => "sign-out",
            IntentKind::Register => "register",
            IntentKind::CreateProfile => "create-profile",
            IntentKind::UploadAsset => "upload-asset",
            IntentKind::CreateParentResource => "create-parent-resource",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to perform one business operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum Intent {
    SignIn(Credentials),
    SignInByToken,
    SignOut,
    Register(RegisterRequest),
    CreateProfile(ProfileRequest),
    UploadAsset(AssetUpload),
    CreateParentResource(NewCompany),
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::SignIn(_) => IntentKind::SignIn,
            Intent::SignInByToken => IntentKind::SignInByToken,
            Intent::SignOut => IntentKind::SignOut,
            Intent::Register(_) => IntentKind::Register,
            Intent::CreateProfile(_) => IntentKind::CreateProfile,
            Intent::UploadAsset(_) => IntentKind::UploadAsset,
            Intent::CreateParentResource(_) => IntentKind::CreateParentResource,
        }
    }
}

/// Success or error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Success,
    Error,
}

impl Polarity {
    pub fn opposite(self) -> Self {
        match self {
            Polarity::Success => Polarity::Error,
            Polarity::Error => Polarity::Success,
        }
    }
}

/// The result of exactly one worker invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "polarity", rename_all = "snake_case")]
pub enum Outcome {
    Success { kind: IntentKind, payload: Value },
    Error { kind: IntentKind, message: String },
}

impl Outcome {
    pub fn success(kind: IntentKind, payload: Value) -> Self {
        Outcome::Success { kind, payload }
    }

    pub fn error(kind: IntentKind, message: impl Into<String>) -> Self {
        Outcome::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> IntentKind {
        match self {
            Outcome::Success { kind, .. } | Outcome::Error { kind, .. } => *kind,
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            Outcome::Success { .. } => Polarity::Success,
            Outcome::Error { .. } => Polarity::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.polarity() == Polarity::Success
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Outcome::Success { payload, .. } => Some(payload),
            Outcome::Error { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Error { message, .. } => Some(message),
        }
    }
}

/// Side-channel updates produced outside the intent/outcome contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notice", content = "payload", rename_all = "kebab-case")]
pub enum Notice {
    /// The signed-in user's company, as the profile lookup returned it
    ParentResourceAssociated(Option<Value>),

    /// Full profile record for the signed-in user
    ProfileFetched(Value),

    /// Profile photo, absent when the profile has none
    AssetFetched(Option<Value>),

    /// The company should no longer be shown
    ParentResourceRemoved,
}

/// Anything that travels on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "signal", rename_all = "snake_case")]
pub enum Signal {
    Intent(Intent),
    Outcome(Outcome),
    Notice(Notice),
}

impl Signal {
    pub fn as_intent(&self) -> Option<&Intent> {
        match self {
            Signal::Intent(intent) => Some(intent),
            _ => None,
        }
    }

    pub fn as_outcome(&self) -> Option<&Outcome> {
        match self {
            Signal::Outcome(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn as_notice(&self) -> Option<&Notice> {
        match self {
            Signal::Notice(notice) => Some(notice),
            _ => None,
        }
    }
}

impl From<Intent> for Signal {
    fn from(intent: Intent) -> Self {
        Signal::Intent(intent)
    }
}

impl From<Outcome> for Signal {
    fn from(outcome: Outcome) -> Self {
        Signal::Outcome(outcome)
    }
}

impl From<Notice> for Signal {
    fn from(notice: Notice) -> Self {
        Signal::Notice(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_kind_matches_variant() {
        assert_eq!(Intent::SignOut.kind(), IntentKind::SignOut);
        assert_eq!(
            Intent::CreateParentResource(NewCompany::named("Acme")).kind(),
            IntentKind::CreateParentResource
        );
        assert_eq!(IntentKind::SignInByToken.to_string(), "sign-in-by-token");
    }

    #[test]
    fn test_signal_wire_format() {
        let signal = Signal::from(Outcome::error(IntentKind::UploadAsset, "Upload Failed"));
        let value = serde_json::to_value(&signal).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "outcome",
                "signal": {"polarity": "error", "kind": "upload-asset", "message": "Upload Failed"}
            })
        );

        let intent = Signal::from(Intent::SignInByToken);
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["signal"]["kind"], json!("sign-in-by-token"));

        let parsed: Signal = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, intent);
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = Outcome::success(IntentKind::SignIn, json!({"id": 1}));
        assert!(ok.is_success());
        assert_eq!(ok.payload(), Some(&json!({"id": 1})));
        assert_eq!(ok.message(), None);

        let err = Outcome::error(IntentKind::SignIn, "bad password");
        assert_eq!(err.polarity(), Polarity::Error);
        assert_eq!(err.polarity().opposite(), Polarity::Success);
        assert_eq!(err.message(), Some("bad password"));
    }
}
