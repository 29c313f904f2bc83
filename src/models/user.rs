//! Caller identity models

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Caller role
///
/// The four school roles form a closed set. Any other value (HR variants and
/// similar operational roles) is carried as an uppercase extension role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Parent,
    Other(String),
}

impl Role {
    /// Parse a role name, normalising it to uppercase
    pub fn parse(value: &str) -> Self {
        let upper = value.trim().to_uppercase();
        match upper.as_str() {
            "ADMIN" => Role::Admin,
            "TEACHER" => Role::Teacher,
            "STUDENT" => Role::Student,
            "PARENT" => Role::Parent,
            _ => Role::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "ADMIN",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
            Role::Parent => "PARENT",
            Role::Other(name) => name,
        }
    }

    /// Re-normalise a role that may have been built by hand
    pub fn normalized(&self) -> Self {
        Role::parse(self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::parse(value)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::parse(&raw))
    }
}

/// Decoded payload of a verified bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSet {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub token_version: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

/// Resolved caller identity for the lifetime of one request
///
/// Built fresh by the authentication guard and stored in the request
/// extensions; never shared between requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: String,
    pub role: Role,
    /// Credential epoch, carried through for downstream checks
    pub token_version: i64,
    pub branch_id: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role: role.normalized(),
            token_version: 0,
            branch_id: None,
            name: None,
            surname: None,
        }
    }

    pub fn with_token_version(mut self, token_version: i64) -> Self {
        self.token_version = token_version;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<ClaimSet> for AuthenticatedUser {
    fn from(claims: ClaimSet) -> Self {
        Self {
            id: claims.id,
            role: Role::parse(&claims.role),
            token_version: claims.token_version,
            branch_id: claims.branch_id,
            name: claims.name,
            surname: claims.surname,
        }
    }
}
