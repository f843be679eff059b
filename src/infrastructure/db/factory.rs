//! Backend selection.
//!
//! Every backend hands out the same four repository traits; the rest of the
//! crate only ever sees [`Repositories`]. Each adapter is wrapped in
//! [`Bounded`] so no call can outlive its deadline.

use std::{fmt, str::FromStr, sync::Arc};

use tracing::info;

use super::{
    deadline::{Bounded, Deadlines},
    memory::MemoryStore,
    mongo::MongoStore,
    pocketbase::PocketBaseClient,
    postgres,
};
use crate::{
    errors::AppError,
    repositories::{
        alumni::AlumniRepository, employment::EmploymentRepository, student::StudentRepository,
        user::UserRepository,
    },
    settings::AppConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgres,
    Mongo,
    PocketBase,
    /// Process-local maps; nothing survives a restart.
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(BackendKind::Postgres),
            "mongo" | "mongodb" => Ok(BackendKind::Mongo),
            "pocketbase" | "pb" => Ok(BackendKind::PocketBase),
            "memory" | "local" => Ok(BackendKind::Memory),
            other => Err(format!(
                "Unknown backend '{other}', expected one of postgres, mongo, pocketbase, memory"
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Mongo => "mongo",
            BackendKind::PocketBase => "pocketbase",
            BackendKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// The four repositories of one backend.
#[derive(Clone)]
pub struct Repositories {
    pub kind: BackendKind,
    pub users: Arc<dyn UserRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub alumni: Arc<dyn AlumniRepository>,
    pub employment: Arc<dyn EmploymentRepository>,
}

macro_rules! bounded {
    ($kind:expr, $source:expr, $deadlines:expr) => {{
        let source = $source;
        Repositories {
            kind: $kind,
            users: Arc::new(Bounded::new(source.users(), $deadlines)),
            students: Arc::new(Bounded::new(source.students(), $deadlines)),
            alumni: Arc::new(Bounded::new(source.alumni(), $deadlines)),
            employment: Arc::new(Bounded::new(source.employment(), $deadlines)),
        }
    }};
}

pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Connects to the configured backend.
    pub async fn create(config: &AppConfig) -> Result<Repositories, AppError> {
        let kind = config
            .backend_kind()
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        let deadlines = config.deadlines();

        let repositories = match kind {
            BackendKind::Postgres => {
                let pool = postgres::create_pool(&config.database_url, deadlines.lookup)
                    .await
                    .map_err(|e| AppError::Unavailable(format!("Database connection failed: {e}")))?;
                if config.run_migrations {
                    postgres::run_migrations(&pool).await?;
                }
                bounded!(kind, PgSource(pool), deadlines)
            }
            BackendKind::Mongo => {
                let store = MongoStore::connect(&config.mongo_uri, &config.mongo_database, deadlines.lookup).await?;
                bounded!(kind, store, deadlines)
            }
            BackendKind::PocketBase => {
                let client = PocketBaseClient::new(
                    &config.pocketbase_url,
                    config.pocketbase_token.clone(),
                    deadlines.scan,
                )?;
                bounded!(kind, client, deadlines)
            }
            BackendKind::Memory => Self::memory(deadlines),
        };

        info!(backend = %kind, "Repositories ready.");
        Ok(repositories)
    }

    /// Fresh, empty in-memory repositories.
    pub fn memory(deadlines: Deadlines) -> Repositories {
        bounded!(BackendKind::Memory, MemoryStore::new(), deadlines)
    }
}

/// Gives the relational adapters the same accessor shape as the other stores.
struct PgSource(sqlx::PgPool);

impl PgSource {
    fn users(&self) -> postgres::PgUserRepo {
        postgres::PgUserRepo::new(self.0.clone())
    }

    fn students(&self) -> postgres::PgStudentRepo {
        postgres::PgStudentRepo::new(self.0.clone())
    }

    fn alumni(&self) -> postgres::PgAlumniRepo {
        postgres::PgAlumniRepo::new(self.0.clone())
    }

    fn employment(&self) -> postgres::PgEmploymentRepo {
        postgres::PgEmploymentRepo::new(self.0.clone())
    }
}
