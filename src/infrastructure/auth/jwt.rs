use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};

use crate::entities::token::Claims;
use crate::entities::user::User;
use crate::errors::AuthError;
use crate::repositories::token::TokenService;
use crate::settings::{AppConfig, JwtKeys};

const JWT_ALGORITHM: Algorithm = Algorithm::HS512;

#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    access_expiration: Duration,
}

impl JwtService {
    pub fn new(config: &AppConfig) -> Self {
        JwtService {
            keys: JwtKeys::from(config),
            access_expiration: Duration::minutes(config.jwt_expiration_minutes),
        }
    }

    pub fn create_jwt(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = (now + self.access_expiration).timestamp() as usize;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            exp,
            iat: now.timestamp() as usize,
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.keys.encoding).map_err(|_| AuthError::TokenCreation)
    }

    pub fn decode_jwt(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::from)
    }
}

impl TokenService for JwtService {
    fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.create_jwt(user)
    }

    fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_jwt(token)
    }

    fn ttl_seconds(&self) -> i64 {
        self.access_expiration.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ids::RecordId, user::Role};

    fn config(minutes: i64) -> AppConfig {
        AppConfig {
            jwt_secret: "an_hs512_secret_that_is_long_enough_for_tests".into(),
            jwt_expiration_minutes: minutes,
            ..AppConfig::default()
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: RecordId::Seq(12),
            username: "rina".into(),
            email: "rina@example.com".into(),
            password_hash: String::new(),
            role: Role::Admin,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_validates_with_identity_claims() {
        let service = JwtService::new(&config(60));
        let token = service.issue(&user()).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.sub, "12");
        assert_eq!(claims.username, "rina");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(service.ttl_seconds(), 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = JwtService::new(&config(-5));
        let token = service.issue(&user()).unwrap();
        assert!(matches!(service.validate(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let issuer = JwtService::new(&config(60));
        let mut other = config(60);
        other.jwt_secret = "a_completely_different_secret_of_enough_length".into();
        let verifier = JwtService::new(&other);

        let token = issuer.issue(&user()).unwrap();
        assert!(matches!(verifier.validate(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(verifier.validate("not-a-jwt"), Err(AuthError::InvalidToken)));
    }
}
