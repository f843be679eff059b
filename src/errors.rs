use std::borrow::Cow;
use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse
};
use jsonwebtoken::errors::{ErrorKind, Error as JwtError};
use derive_more::Display;
use serde::Serialize;
use validator::ValidationErrors;

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    InvalidInput(String),
    NotFound(String),
    Conflict(String),
    PreconditionFailed(String),
    UnauthorizedAccess,
    ForbiddenAccess,
    Unavailable(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::PreconditionFailed(msg) => write!(f, "Precondition failed: {}", msg),
            AppError::UnauthorizedAccess => write!(f, "Unauthorized access"),
            AppError::ForbiddenAccess => write!(f, "Forbidden access"),
            AppError::Unavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal server error: {}", msg)
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Stable machine-readable error kind used in response payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::PreconditionFailed(_) => "precondition_failed",
            AppError::UnauthorizedAccess => "unauthorized",
            AppError::ForbiddenAccess => "forbidden",
            AppError::Unavailable(_) => "unavailable",
            AppError::InternalError(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::PreconditionFailed(msg) => msg.clone(),
            AppError::ValidationError(_) => "Validation failed".to_string(),
            AppError::UnauthorizedAccess => "Unauthorized access".to_string(),
            AppError::ForbiddenAccess => "Forbidden access".to_string(),
            // Backend detail stays in the logs.
            AppError::Unavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::InternalError(_) => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unavailable(detail) => tracing::warn!(detail = %detail, "backend unavailable"),
            AppError::InternalError(detail) => tracing::error!(detail = %detail, "internal error"),
            _ => {}
        }

        let body = match self {
            AppError::ValidationError(errors) => {
                serde_json::json!({
                    "error": self.kind(),
                    "message": self.public_message(),
                    "details": errors
                })
            }
            _ => {
                serde_json::json!({
                    "error": self.kind(),
                    "message": self.public_message()
                })
            }
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            AppError::UnauthorizedAccess => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenAccess => StatusCode::FORBIDDEN,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(|e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();

        AppError::ValidationError(field_errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(e) if e.code() == Some(Cow::Borrowed("23505")) => {
                AppError::Conflict("Record with the same unique field already exists".into())
            }
            sqlx::Error::Database(e) if e.code() == Some(Cow::Borrowed("23503")) => {
                AppError::Conflict("Foreign key violation".into())
            }
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Unavailable(format!("Database error: {}", err))
            }
            _ => AppError::InternalError(format!("Database error: {}", err))
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind as MongoErrorKind, WriteFailure};

        const DUPLICATE_KEY: i32 = 11000;

        match err.kind.as_ref() {
            MongoErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
                AppError::Conflict("Record with the same unique field already exists".into())
            }
            MongoErrorKind::Command(e) if e.code == DUPLICATE_KEY => {
                AppError::Conflict("Record with the same unique field already exists".into())
            }
            MongoErrorKind::ServerSelection { .. }
            | MongoErrorKind::Io(_)
            | MongoErrorKind::ConnectionPoolCleared { .. } => {
                AppError::Unavailable(format!("Document store error: {}", err))
            }
            _ => AppError::InternalError(format!("Document store error: {}", err)),
        }
    }
}

impl From<bson::de::Error> for AppError {
    fn from(err: bson::de::Error) -> Self {
        AppError::InternalError(format!("Document decode error: {}", err))
    }
}

impl From<bson::ser::Error> for AppError {
    fn from(err: bson::ser::Error) -> Self {
        AppError::InternalError(format!("Document encode error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            AppError::Unavailable(format!("Records service error: {}", err))
        } else if err.is_decode() {
            AppError::InternalError(format!("Records service returned an unexpected body: {}", err))
        } else {
            AppError::InternalError(format!("Records service error: {}", err))
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum AuthError {
    #[display("Invalid token")]
    InvalidToken,

    #[display("Wrong credentials")]
    WrongCredentials,

    #[display("Token creation error")]
    TokenCreation,

    #[display("Token expired")]
    TokenExpired,

    #[display("Missing credentials")]
    MissingCredentials,

    #[display("Missing JWT service")]
    MissingJwtService,

    #[display("Invalid user ID")]
    InvalidUserId,

    #[display("Forbidden: {_0}")]
    Forbidden(String),

    #[display("Authentication backend unavailable")]
    BackendUnavailable,
}

impl std::error::Error for AuthError {}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        let (kind, message) = match self {
            AuthError::TokenExpired => ("unauthorized", "Token has expired".to_string()),
            AuthError::Forbidden(_) => ("forbidden", self.to_string()),
            AuthError::TokenCreation | AuthError::MissingJwtService => {
                ("internal_error", "Internal server error".to_string())
            }
            AuthError::BackendUnavailable => ("unavailable", "Service temporarily unavailable".to_string()),
            _ => ("unauthorized", self.to_string()),
        };
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({"error": kind, "message": message}))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::WrongCredentials => StatusCode::UNAUTHORIZED,
            AuthError::TokenCreation => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthError::MissingJwtService => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InvalidUserId => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden(_) => AppError::ForbiddenAccess,
            AuthError::TokenCreation | AuthError::MissingJwtService => {
                AppError::InternalError(err.to_string())
            }
            AuthError::BackendUnavailable => AppError::Unavailable(err.to_string()),
            _ => AppError::UnauthorizedAccess,
        }
    }
}

#[derive(Debug, Display)]
pub enum PasswordError {
    #[display("Invalid password parameters: {_0}")]
    InvalidParameters(String),

    #[display("Password hashing failed: {_0}")]
    HashingError(String),

    #[display("Invalid password hash format: {_0}")]
    InvalidHashFormat(String),

    #[display("Password verification failed: {_0}")]
    VerificationError(String),
}

impl std::error::Error for PasswordError {}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}
