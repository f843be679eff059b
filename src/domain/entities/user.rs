use std::{fmt, str::FromStr};

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use validator::{Validate, ValidationError};

use crate::entities::ids::RecordId;

pub const USER_SORT_FIELDS: &[&str] = &["id", "username", "email", "role", "created_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Unset or unknown roles collapse to the default `user` role.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|r| r.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn fields(&self) -> UserFields {
        UserFields {
            username: self.username.clone(),
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            role: self.role,
            is_active: self.is_active,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Mutable columns of a user, written in full on create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFields {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

/// User as embedded in an alumni profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// Usernames are stored trimmed, so the bounds apply to the trimmed text.
fn username_length(value: &str) -> Result<(), ValidationError> {
    let chars = value.trim().chars().count();
    if (3..=50).contains(&chars) {
        return Ok(());
    }
    let mut error = ValidationError::new("length");
    error.message = Some("Must be between 3 and 50 characters".into());
    Err(error)
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RegisterUser {
    #[validate(custom(function = "username_length"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Must be at least 6 characters"))]
    pub password: String,

    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LoginUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Partial admin update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct UpdateUser {
    #[validate(custom(function = "username_length"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "Must be at least 6 characters"))]
    pub password: Option<String>,

    pub role: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
