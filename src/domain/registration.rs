//! Request payloads and registration workflow types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::records::RecordId;

/// Email/password pair for sign-in
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    /// Never serialized, so journaled intents carry no secret
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs and journals printed with {:?}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fields sent to the account registration endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// A parent resource (company) to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub slug: String,
}

impl NewCompany {
    /// Build from a name, deriving the slug
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Self { name, slug }
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// The company a registering user belongs to.
///
/// Either an existing company referenced by id, or a new one that the
/// registration workflow has to create first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompanyRef {
    Identifier(RecordId),
    NewResource(NewCompany),
}

impl FromStr for CompanyRef {
    type Err = String;

    /// `42` references an existing company; `Acme` or `Acme:acme-inc`
    /// requests a new one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("company must not be empty".to_string());
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<i64>()
                .map(|n| CompanyRef::Identifier(RecordId::Int(n)))
                .map_err(|e| e.to_string());
        }
        match s.split_once(':') {
            Some((name, slug)) if !slug.trim().is_empty() => {
                Ok(CompanyRef::NewResource(NewCompany {
                    name: name.trim().to_string(),
                    slug: slug.trim().to_string(),
                }))
            }
            Some((name, _)) => Ok(CompanyRef::NewResource(NewCompany::named(name))),
            None => Ok(CompanyRef::NewResource(NewCompany::named(s))),
        }
    }
}

/// A file to upload as the profile photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUpload {
    pub file: PathBuf,
}

impl AssetUpload {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

/// Payload of a register intent
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    pub user_role: String,
    pub company: CompanyRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<AssetUpload>,
}

impl RegisterRequest {
    pub fn account(&self) -> NewAccount<'_> {
        NewAccount {
            username: &self.username,
            email: &self.email,
            password: &self.password,
        }
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("user_role", &self.user_role)
            .field("company", &self.company)
            .field("image", &self.image)
            .finish()
    }
}

/// Payload of a create-profile intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub name: String,
    pub company: i64,
    pub user: i64,
    pub user_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<RecordId>,
}

/// Steps of the registration workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    Start,
    CompanyPending,
    ImagePending,
    ProfilePending,
    Done,
    Aborted,
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistrationStep::Start => "start",
            RegistrationStep::CompanyPending => "company_pending",
            RegistrationStep::ImagePending => "image_pending",
            RegistrationStep::ProfilePending => "profile_pending",
            RegistrationStep::Done => "done",
            RegistrationStep::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// How a registration workflow ended
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    /// The profile was created
    Completed { profile: Value },

    /// A step failed; nothing already created is rolled back
    Aborted { at: RegistrationStep, reason: String },
}

impl RegistrationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RegistrationOutcome::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_company_ref_from_json() {
        let by_id: CompanyRef = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(by_id, CompanyRef::Identifier(RecordId::Int(4)));

        let by_text: CompanyRef = serde_json::from_value(json!("4")).unwrap();
        assert_eq!(by_text, CompanyRef::Identifier(RecordId::Text("4".into())));

        let new: CompanyRef =
            serde_json::from_value(json!({"name": "Acme", "slug": "acme"})).unwrap();
        assert_eq!(
            new,
            CompanyRef::NewResource(NewCompany {
                name: "Acme".into(),
                slug: "acme".into()
            })
        );
    }

    #[test]
    fn test_company_ref_from_str() {
        assert_eq!(
            "17".parse::<CompanyRef>().unwrap(),
            CompanyRef::Identifier(RecordId::Int(17))
        );
        assert_eq!(
            "Acme Corp".parse::<CompanyRef>().unwrap(),
            CompanyRef::NewResource(NewCompany {
                name: "Acme Corp".into(),
                slug: "acme-corp".into()
            })
        );
        assert_eq!(
            "Acme:acme-inc".parse::<CompanyRef>().unwrap(),
            CompanyRef::NewResource(NewCompany {
                name: "Acme".into(),
                slug: "acme-inc".into()
            })
        );
        assert!("  ".parse::<CompanyRef>().is_err());
    }

    #[test]
    fn test_register_request_image_optional() {
        let request: RegisterRequest = serde_json::from_value(json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "pw",
            "userRole": "admin",
            "company": 3
        }))
        .unwrap();
        assert!(request.image.is_none());
        assert!(!format!("{:?}", request).contains("pw\""));
    }

    #[test]
    fn test_passwords_are_never_serialized() {
        let credentials = Credentials::new("ada@example.com", "hunter2");
        let value = serde_json::to_value(&credentials).unwrap();
        assert_eq!(value, json!({"email": "ada@example.com"}));

        // Journaled payloads still read back, minus the secret
        let parsed: Credentials = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.email, "ada@example.com");
        assert!(parsed.password.is_empty());

        let request = RegisterRequest {
            username: "ada".into(),
            email: "ada@example.com".into(),
            password: "hunter2".into(),
            user_role: "owner".into(),
            company: CompanyRef::Identifier(RecordId::Int(3)),
            image: None,
        };
        let text = serde_json::to_string(&request).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("password"));

        // The account payload sent to the API keeps it
        let account = serde_json::to_value(request.account()).unwrap();
        assert_eq!(account["password"], json!("hunter2"));
    }

    #[test]
    fn test_profile_request_wire_names() {
        let request = ProfileRequest {
            name: "ada".into(),
            company: 3,
            user: 8,
            user_role: "admin".into(),
            profile_photo: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"name": "ada", "company": 3, "user": 8, "userRole": "admin"})
        );
    }
}
