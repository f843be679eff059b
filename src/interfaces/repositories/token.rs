use crate::entities::{token::Claims, user::User};
use crate::errors::AuthError;

/// Issues and validates signed, time-boxed access tokens.
pub trait TokenService: Send + Sync {
    fn issue(&self, user: &User) -> Result<String, AuthError>;
    fn validate(&self, token: &str) -> Result<Claims, AuthError>;
    /// Token lifetime in seconds.
    fn ttl_seconds(&self) -> i64;
}
