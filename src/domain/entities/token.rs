use serde::{Serialize, Deserialize};

use crate::entities::{ids::RecordId, user::{PublicUser, Role}};
use crate::errors::AuthError;

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: PublicUser,
}

impl AuthResponse {
    pub fn new(access_token: String, expires_in: i64, user: PublicUser) -> Self {
        AuthResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Authenticated caller derived from validated token claims.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: RecordId,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl TryFrom<&Claims> for Identity {
    type Error = AuthError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let id = claims.sub.parse::<RecordId>().map_err(|_| AuthError::InvalidUserId)?;
        Ok(Identity {
            id,
            username: claims.username.clone(),
            role: claims.role,
        })
    }
}
