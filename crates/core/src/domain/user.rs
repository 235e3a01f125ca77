use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    Supervisor,
    Owner,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "staff" => Some(Self::Staff),
            "supervisor" => Some(Self::Supervisor),
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Supervisor => "supervisor",
            Self::Owner => "owner",
            Self::Admin => "admin",
        }
    }

    /// Owner and admin hold the same review authority.
    pub fn is_owner_level(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    pub fn requires_department(&self) -> bool {
        matches!(self, Self::Staff | Self::Supervisor)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The review stage a requisition is routed to next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewerRole {
    Supervisor,
    Owner,
}

impl ReviewerRole {
    pub fn role(&self) -> Role {
        match self {
            Self::Supervisor => Role::Supervisor,
            Self::Owner => Role::Owner,
        }
    }

    /// Supervisors are looked up per department, owners company-wide.
    pub fn is_department_scoped(&self) -> bool {
        matches!(self, Self::Supervisor)
    }

    pub fn as_str(&self) -> &'static str {
        self.role().as_str()
    }
}

/// A record in the user store. Credentials live with the auth provider, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity a request acts under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department: Option<String>,
}

impl Actor {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        department: Option<&str>,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role,
            department: department.map(str::to_owned),
        }
    }

    /// Department with surrounding whitespace removed; blank counts as missing.
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn is(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

impl From<User> for Actor {
    fn from(user: User) -> Self {
        Self { email: user.email, name: user.name, role: user.role, department: user.department }
    }
}
