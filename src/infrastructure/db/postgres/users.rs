use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};

use super::{push_search, push_window};
use crate::{
    entities::{
        ids::RecordId,
        pagination::{Page, PageQuery},
        user::{Role, User, UserFields},
    },
    errors::AppError,
    repositories::user::UserRepository,
};

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.role, u.is_active, u.created_at, u.updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: RecordId::Seq(row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: Role::parse_or_default(Some(&row.role)),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        PgUserRepo { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE LOWER(u.{column}) = LOWER($1)");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserRepository for PgUserRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Unavailable(format!("Database ping failed: {e}")))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<User>, AppError> {
        let search_columns = ["u.username", "u.email", "u.role"];

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users u WHERE TRUE");
        push_search(&mut count, query, &search_columns);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE TRUE"));
        push_search(&mut select, query, &search_columns);
        push_window(&mut select, query, "u");
        let rows: Vec<UserRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page { items: rows.into_iter().map(User::from).collect(), total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<User, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_seq()?)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_by("email", email).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn create(&self, user: &UserFields) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users AS u (username, email, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING u.id, u.username, u.email, u.password_hash, u.role, u.is_active, u.created_at, u.updated_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Username or email already exists".into()),
            other => other,
        })?;

        Ok(row.into())
    }

    async fn update(&self, id: &RecordId, user: &UserFields) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users AS u SET
                username = $1,
                email = $2,
                password_hash = $3,
                role = $4,
                is_active = $5,
                updated_at = NOW()
            WHERE u.id = $6
            RETURNING u.id, u.username, u.email, u.password_hash, u.role, u.is_active, u.created_at, u.updated_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(id.as_seq()?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Username or email already exists".into()),
            other => other,
        })?;

        row.map(User::from)
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_seq()?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
