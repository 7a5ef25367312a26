//! Records returned by the remote API.
//!
//! These mirror the response shapes the gateway hands back. Identifiers come
//! back as either numbers or strings depending on the endpoint, so they are
//! kept as [`RecordId`] until a caller needs an integer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors converting a record identifier to an integer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("Identifier is not numeric: {0:?}")]
    NotNumeric(String),

    #[error("Identifier out of range: {0}")]
    OutOfRange(String),
}

/// Identifier as the remote API returned it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Coerce to an integer using leading-integer parsing.
    ///
    /// Leading whitespace and an optional sign are accepted, then digits are
    /// consumed until the first non-digit: `"12"` and `"12abc"` both give 12,
    /// `"abc"` is rejected.
    pub fn coerce(&self) -> Result<i64, IdError> {
        match self {
            RecordId::Int(n) => Ok(*n),
            RecordId::Text(s) => parse_leading_int(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

fn parse_leading_int(raw: &str) -> Result<i64, IdError> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(IdError::NotNumeric(raw.to_string()));
    }

    let value: i64 = digits
        .parse()
        .map_err(|_| IdError::OutOfRange(raw.to_string()))?;

    Ok(if negative { -value } else { value })
}

/// An account as returned by the auth endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Remaining fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            username: None,
            email: None,
            extra: Map::new(),
        }
    }

    /// JSON form used as an outcome payload
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Successful authentication or registration response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Session credential to persist
    pub jwt: String,

    pub user: User,
}

/// An uploaded file, reshaped to `{id, attributes}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: RecordId,
    pub attributes: Map<String, Value>,
}

impl Asset {
    /// Split the `id` field off a raw upload record.
    ///
    /// Returns `None` when the record is not an object or has no usable id.
    pub fn from_upload_record(record: Value) -> Option<Self> {
        let Value::Object(mut fields) = record else {
            return None;
        };
        let id = serde_json::from_value(fields.remove("id")?).ok()?;
        Some(Self {
            id,
            attributes: fields,
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Response of the profile lookup endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileListing {
    #[serde(default)]
    pub data: Vec<ProfileRecord>,
}

/// A single profile entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: RecordId,

    #[serde(default)]
    pub attributes: ProfileAttributes,
}

impl ProfileRecord {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The nested photo payload, if the response carried one
    pub fn photo(&self) -> Option<&Value> {
        self.attributes
            .profile_photo
            .as_ref()
            .and_then(|relation| relation.data.as_ref())
    }
}

/// Profile attributes; relations may be absent depending on populate flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<Relation>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A populated relation wrapper (`{data: ...}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default)]
    pub data: Option<Value>,
}
