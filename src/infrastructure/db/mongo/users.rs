use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use mongodb::{options::ReturnDocument, Collection};
use serde::{Deserialize, Serialize};

use super::{conflict_as, sort_doc, with_search, MongoStore, USERS};
use crate::{
    entities::{
        ids::RecordId,
        pagination::{Page, PageQuery},
        user::{Role, User, UserFields, UserSummary},
    },
    errors::AppError,
    repositories::user::UserRepository,
};

const DUPLICATE_USER: &str = "Username or email already exists";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct UserDoc {
    #[serde(rename = "_id")]
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

impl UserDoc {
    pub fn summary(self) -> UserSummary {
        UserSummary {
            id: RecordId::Seq(self.id),
            username: self.username,
            email: self.email,
            role: Role::parse_or_default(Some(&self.role)),
        }
    }
}

impl From<UserDoc> for User {
    fn from(doc: UserDoc) -> Self {
        User {
            id: RecordId::Seq(doc.id),
            role: Role::parse_or_default(Some(&doc.role)),
            username: doc.username,
            email: doc.email,
            password_hash: doc.password_hash,
            is_active: doc.is_active,
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
        }
    }
}

#[derive(Clone)]
pub struct MongoUserRepo {
    store: MongoStore,
}

impl MongoUserRepo {
    pub fn new(store: MongoStore) -> Self {
        MongoUserRepo { store }
    }

    fn users(&self) -> Collection<UserDoc> {
        self.store.collection(USERS)
    }
}

#[async_trait]
impl UserRepository for MongoUserRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        self.store.ping().await
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let docs: Vec<UserDoc> = self
            .users()
            .find(doc! {})
            .sort(doc! { "_id": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs.into_iter().map(User::from).collect())
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<User>, AppError> {
        let filter = with_search(doc! {}, query, &["username", "email", "role"]);
        let total = self.users().count_documents(filter.clone()).await? as i64;

        let docs: Vec<UserDoc> = self
            .users()
            .find(filter)
            .sort(sort_doc(query))
            .skip(query.offset() as u64)
            .limit(query.limit)
            .await?
            .try_collect()
            .await?;

        Ok(Page { items: docs.into_iter().map(User::from).collect(), total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<User, AppError> {
        self.users()
            .find_one(doc! { "_id": id.as_seq()? })
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let found = self
            .users()
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?;
        Ok(found.map(User::from))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let found = self.users().find_one(doc! { "username": username }).await?;
        Ok(found.map(User::from))
    }

    async fn create(&self, user: &UserFields) -> Result<User, AppError> {
        let now = bson::DateTime::now();
        let doc = UserDoc {
            id: self.store.next_id(USERS).await?,
            username: user.username.clone(),
            email: user.email.to_lowercase(),
            password_hash: user.password_hash.clone(),
            role: user.role.as_str().to_string(),
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };

        self.users()
            .insert_one(&doc)
            .await
            .map_err(conflict_as(DUPLICATE_USER))?;
        Ok(doc.into())
    }

    async fn update(&self, id: &RecordId, user: &UserFields) -> Result<User, AppError> {
        let update = doc! {
            "$set": {
                "username": user.username.as_str(),
                "email": user.email.to_lowercase(),
                "password_hash": user.password_hash.as_str(),
                "role": user.role.as_str(),
                "is_active": user.is_active,
                "updated_at": bson::DateTime::now(),
            }
        };

        self.users()
            .find_one_and_update(doc! { "_id": id.as_seq()? }, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(conflict_as(DUPLICATE_USER))?
            .map(User::from)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let result = self.users().delete_one(doc! { "_id": id.as_seq()? }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.users().count_documents(doc! {}).await? as i64)
    }
}
