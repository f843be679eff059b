use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    all_of, eq, parse_timestamp, reword, search_clause, PocketBaseClient, USERS,
};
use crate::{
    entities::{
        ids::RecordId,
        pagination::{Page, PageQuery},
        user::{Role, User, UserFields, UserSummary},
    },
    errors::AppError,
    repositories::user::UserRepository,
};

const NOT_FOUND: &str = "User not found";
const DUPLICATE: &str = "Username or email already exists";

#[derive(Debug, Clone, Deserialize)]
pub(super) struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_active: bool,
    pub created: String,
    pub updated: String,
}

impl UserRecord {
    pub fn summary(self) -> UserSummary {
        UserSummary {
            id: RecordId::Key(self.id),
            username: self.username,
            email: self.email,
            role: Role::parse_or_default(Some(&self.role)),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = AppError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        Ok(User {
            id: RecordId::Key(record.id),
            role: Role::parse_or_default(Some(&record.role)),
            username: record.username,
            email: record.email,
            password_hash: record.password_hash,
            is_active: record.is_active,
            created_at: parse_timestamp(&record.created)?,
            updated_at: parse_timestamp(&record.updated)?,
        })
    }
}

#[derive(Serialize)]
struct UserBody<'a> {
    username: &'a str,
    email: String,
    password_hash: &'a str,
    role: &'static str,
    is_active: bool,
}

impl<'a> From<&'a UserFields> for UserBody<'a> {
    fn from(fields: &'a UserFields) -> Self {
        UserBody {
            username: &fields.username,
            email: fields.email.to_lowercase(),
            password_hash: &fields.password_hash,
            role: fields.role.as_str(),
            is_active: fields.is_active,
        }
    }
}

fn convert(records: Vec<UserRecord>) -> Result<Vec<User>, AppError> {
    records.into_iter().map(User::try_from).collect()
}

#[derive(Clone)]
pub struct PbUserRepo {
    client: PocketBaseClient,
}

impl PbUserRepo {
    pub fn new(client: PocketBaseClient) -> Self {
        PbUserRepo { client }
    }

    async fn find_by(&self, field: &str, value: &str) -> Result<Option<User>, AppError> {
        self.client
            .first::<UserRecord>(USERS, eq(field, value))
            .await?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl UserRepository for PbUserRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        self.client
            .health()
            .await
            .map_err(|e| AppError::Unavailable(format!("Records service health check failed: {e}")))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        convert(self.client.list_all(USERS, None, "-created").await?)
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<User>, AppError> {
        let filter = all_of(search_clause(query, &["username", "email", "role"]));
        let (items, total) = self
            .client
            .list_window::<UserRecord>(USERS, query, filter)
            .await?;
        Ok(Page { items: convert(items)?, total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<User, AppError> {
        self.client
            .get::<UserRecord>(USERS, &id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?
            .try_into()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_by("email", &email.trim().to_lowercase()).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_by("username", username).await
    }

    async fn create(&self, user: &UserFields) -> Result<User, AppError> {
        self.client
            .create::<UserRecord, _>(USERS, &UserBody::from(user))
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))?
            .try_into()
    }

    async fn update(&self, id: &RecordId, user: &UserFields) -> Result<User, AppError> {
        self.client
            .update::<UserRecord, _>(USERS, &id.to_string(), &UserBody::from(user))
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))?
            .try_into()
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.client
            .delete(USERS, &id.to_string())
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.client.count(USERS, None).await
    }
}
