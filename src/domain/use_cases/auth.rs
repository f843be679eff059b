use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::entities::{
    ids::RecordId,
    pagination::{Page, PaginationRequest, PaginationResponse},
    token::{AuthResponse, Identity},
    user::{LoginUser, PublicUser, RegisterUser, Role, UpdateUser, User, UserFields, USER_SORT_FIELDS},
};
use crate::errors::{AppError, AuthError};
use crate::repositories::{token::TokenService, user::UserRepository};
use crate::settings::AdminSeed;

pub struct AuthHandler<T>
where
    T: TokenService,
{
    pub users: Arc<dyn UserRepository>,
    pub token_service: T,
}

impl<T> AuthHandler<T>
where
    T: TokenService,
{
    pub fn new(users: Arc<dyn UserRepository>, token_service: T) -> Self {
        AuthHandler { users, token_service }
    }

    /// Registers a new user after validation, uniqueness checks and password hashing
    pub async fn register(&self, request: RegisterUser) -> Result<PublicUser, AppError> {
        request.validate()?;

        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();
        self.ensure_unique(&username, &email, None).await?;

        let fields = UserFields {
            username,
            email,
            password_hash: hash_password(&request.password)?,
            role: Role::parse_or_default(request.role.as_deref()),
            is_active: true,
        };

        let user = self.users.create(&fields).await?;
        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user.into())
    }

    /// Every credential failure looks the same to the caller.
    pub async fn login(&self, request: LoginUser) -> Result<AuthResponse, AuthError> {
        if request.validate().is_err() {
            debug!("login rejected: malformed credentials");
            return Err(AuthError::WrongCredentials);
        }

        let email = request.email.trim().to_lowercase();
        let user = match self.users.get_by_email(&email).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("login rejected: unknown email");
                return Err(AuthError::WrongCredentials);
            }
            Err(AppError::Unavailable(detail)) => {
                warn!(detail = %detail, "login aborted: user store unavailable");
                return Err(AuthError::BackendUnavailable);
            }
            Err(e) => {
                warn!(error = %e, "login aborted: user lookup failed");
                return Err(AuthError::WrongCredentials);
            }
        };

        if !user.is_active {
            debug!(user_id = %user.id, "login rejected: account inactive");
            return Err(AuthError::WrongCredentials);
        }

        let is_password_valid = verify_password(&request.password, &user.password_hash)
            .map_err(|e| {
                warn!(user_id = %user.id, error = %e, "stored password hash is unusable");
                AuthError::WrongCredentials
            })?;
        if !is_password_valid {
            debug!(user_id = %user.id, "login rejected: wrong password");
            return Err(AuthError::WrongCredentials);
        }

        let response = self.create_auth_response(user)?;
        info!("User logged in successfully");
        Ok(response)
    }

    pub fn create_auth_response(&self, user: User) -> Result<AuthResponse, AuthError> {
        let access_token = self.token_service.issue(&user).map_err(|e| {
            warn!("Failed to create JWT: {}", e);
            AuthError::TokenCreation
        })?;

        Ok(AuthResponse::new(access_token, self.token_service.ttl_seconds(), user.into()))
    }

    pub async fn profile(&self, identity: &Identity) -> Result<PublicUser, AppError> {
        self.users.get_by_id(&identity.id).await.map(PublicUser::from)
    }

    pub async fn list_users(&self, request: &PaginationRequest) -> Result<PaginationResponse<PublicUser>, AppError> {
        let query = request.normalize(USER_SORT_FIELDS);
        let page = self.users.list_paged(&query).await?;
        let page = Page {
            items: page.items.into_iter().map(PublicUser::from).collect(),
            total: page.total,
        };
        Ok(PaginationResponse::new(page, &query))
    }

    pub async fn list_all_users(&self) -> Result<Vec<PublicUser>, AppError> {
        Ok(self.users.list().await?.into_iter().map(PublicUser::from).collect())
    }

    pub async fn get_user(&self, id: &RecordId) -> Result<PublicUser, AppError> {
        self.users.get_by_id(id).await.map(PublicUser::from)
    }

    /// Admin edit. Absent fields keep their stored value; a new password is re-hashed.
    pub async fn update_user(&self, id: &RecordId, request: UpdateUser) -> Result<PublicUser, AppError> {
        request.validate()?;

        let current = self.users.get_by_id(id).await?;
        let mut fields = current.fields();

        if let Some(username) = request.username {
            fields.username = username.trim().to_string();
        }
        if let Some(email) = request.email {
            fields.email = email.trim().to_lowercase();
        }
        if let Some(role) = request.role {
            fields.role = role.parse::<Role>().map_err(AppError::InvalidInput)?;
        }
        if let Some(is_active) = request.is_active {
            fields.is_active = is_active;
        }
        if let Some(password) = request.password {
            fields.password_hash = hash_password(&password)?;
        }

        self.ensure_unique(&fields.username, &fields.email, Some(id)).await?;

        let user = self.users.update(id, &fields).await?;
        info!(user_id = %user.id, "User updated");
        Ok(user.into())
    }

    /// Hard delete without cascade; a profile still naming the user reads back with no joined user.
    pub async fn delete_user(&self, id: &RecordId) -> Result<(), AppError> {
        self.users.delete(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    pub async fn count_users(&self) -> Result<i64, AppError> {
        self.users.count().await
    }

    /// Creates the configured admin account unless a user with that email exists.
    /// Returns whether an account was created.
    pub async fn bootstrap_admin(&self, seed: &AdminSeed) -> Result<bool, AppError> {
        let email = seed.email.to_lowercase();
        if self.users.get_by_email(&email).await?.is_some() {
            info!("Admin account already present, skipping bootstrap");
            return Ok(false);
        }

        let username = if seed.username.is_empty() { "admin".to_string() } else { seed.username.clone() };
        let fields = UserFields {
            username,
            email,
            password_hash: hash_password(seed.password.as_str())?,
            role: Role::Admin,
            is_active: true,
        };
        let admin = self.users.create(&fields).await?;
        info!(user_id = %admin.id, "Admin account bootstrapped");
        Ok(true)
    }

    /// `Conflict` when another user already holds the username or email.
    async fn ensure_unique(&self, username: &str, email: &str, current: Option<&RecordId>) -> Result<(), AppError> {
        let is_other = |user: &User| current != Some(&user.id);

        if let Some(user) = self.users.get_by_username(username).await? {
            if is_other(&user) {
                return Err(AppError::Conflict("Username already taken".into()));
            }
        }
        if let Some(user) = self.users.get_by_email(email).await? {
            if is_other(&user) {
                return Err(AppError::Conflict("Email already registered".into()));
            }
        }
        Ok(())
    }
}
