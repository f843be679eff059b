use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use tracing::info;
use std::time::Duration;

use crate::entities::pagination::PageQuery;
use crate::errors::AppError;

mod alumni;
mod employment;
mod students;
mod users;

pub use alumni::PgAlumniRepo;
pub use employment::PgEmploymentRepo;
pub use students::PgStudentRepo;
pub use users::PgUserRepo;

/// One connection attempt; a database that is down at startup is reported
/// to the caller instead of being waited for.
pub async fn create_pool(database_url: &str, acquire_timeout: Duration) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await?;

    info!("Database connection established.");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalError(format!("Migration failed: {e}")))?;
    info!("Database migrations applied.");
    Ok(())
}

/// `%term%` pattern with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Appends `AND (col ILIKE $n OR ...)` when the query carries a search term.
fn push_search(builder: &mut QueryBuilder<'_, Postgres>, query: &PageQuery, columns: &[&str]) {
    let Some(term) = query.search.as_deref() else {
        return;
    };
    let pattern = like_pattern(term);

    builder.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(*column).push(" ILIKE ").push_bind(pattern.clone());
    }
    builder.push(")");
}

/// Appends ORDER BY / LIMIT / OFFSET. `prefix` is the table alias.
fn push_window(builder: &mut QueryBuilder<'_, Postgres>, query: &PageQuery, prefix: &str) {
    builder.push(format!(
        " ORDER BY {prefix}.{} {}, {prefix}.id ASC",
        query.sort.field,
        query.sort.direction.as_sql()
    ));
    builder.push(" LIMIT ").push_bind(query.limit);
    builder.push(" OFFSET ").push_bind(query.offset());
}
