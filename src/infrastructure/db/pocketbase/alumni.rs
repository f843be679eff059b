use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    all_of, any_id, eq, non_empty, parse_timestamp, reword, search_clause, users::UserRecord,
    PocketBaseClient, ALUMNI, USERS,
};
use crate::{
    entities::{
        alumni::{Alumni, AlumniFields, AlumniSummary},
        ids::RecordId,
        pagination::{Page, PageQuery},
        user::UserSummary,
    },
    errors::AppError,
    repositories::alumni::AlumniRepository,
};

const NOT_FOUND: &str = "Alumni not found";
const DUPLICATE: &str = "Alumni NIM already exists or the user already has a profile";

#[derive(Debug, Clone, Deserialize)]
pub(super) struct AlumniRecord {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub nim: String,
    pub nama: String,
    pub jurusan: String,
    pub angkatan: i32,
    pub tahun_lulus: i32,
    pub email: String,
    #[serde(default)]
    pub no_telepon: String,
    #[serde(default)]
    pub alamat: String,
    pub created: String,
    pub updated: String,
}

impl AlumniRecord {
    pub fn summary(self) -> AlumniSummary {
        AlumniSummary {
            id: RecordId::Key(self.id),
            user_id: non_empty(self.user_id).map(RecordId::Key),
            nim: self.nim,
            nama: self.nama,
            jurusan: self.jurusan,
            angkatan: self.angkatan,
            tahun_lulus: self.tahun_lulus,
            email: self.email,
        }
    }

    fn into_alumni(self, owners: &HashMap<String, UserSummary>) -> Result<Alumni, AppError> {
        let user = owners.get(&self.user_id).cloned();
        Ok(Alumni {
            id: RecordId::Key(self.id),
            created_at: parse_timestamp(&self.created)?,
            updated_at: parse_timestamp(&self.updated)?,
            user_id: non_empty(self.user_id).map(RecordId::Key),
            nim: self.nim,
            nama: self.nama,
            jurusan: self.jurusan,
            angkatan: self.angkatan,
            tahun_lulus: self.tahun_lulus,
            email: self.email,
            no_telepon: non_empty(self.no_telepon),
            alamat: non_empty(self.alamat),
            user,
        })
    }
}

/// Unset optional fields are written as empty strings, the service's
/// representation of "no value".
#[derive(Serialize)]
struct AlumniBody<'a> {
    user_id: String,
    nim: &'a str,
    nama: &'a str,
    jurusan: &'a str,
    angkatan: i32,
    tahun_lulus: i32,
    email: &'a str,
    no_telepon: &'a str,
    alamat: &'a str,
}

impl<'a> From<&'a AlumniFields> for AlumniBody<'a> {
    fn from(fields: &'a AlumniFields) -> Self {
        AlumniBody {
            user_id: fields.user_id.as_ref().map(RecordId::to_string).unwrap_or_default(),
            nim: &fields.nim,
            nama: &fields.nama,
            jurusan: &fields.jurusan,
            angkatan: fields.angkatan,
            tahun_lulus: fields.tahun_lulus,
            email: &fields.email,
            no_telepon: fields.no_telepon.as_deref().unwrap_or_default(),
            alamat: fields.alamat.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct PbAlumniRepo {
    client: PocketBaseClient,
}

impl PbAlumniRepo {
    pub fn new(client: PocketBaseClient) -> Self {
        PbAlumniRepo { client }
    }

    /// Resolves owners in one batched lookup. Missing users simply do not
    /// appear in the map.
    async fn join(&self, records: Vec<AlumniRecord>) -> Result<Vec<Alumni>, AppError> {
        let mut user_ids: Vec<String> = records
            .iter()
            .filter(|r| !r.user_id.is_empty())
            .map(|r| r.user_id.clone())
            .collect();
        user_ids.sort();
        user_ids.dedup();

        let owners: HashMap<String, UserSummary> = match any_id(&user_ids) {
            Some(filter) => self
                .client
                .list_all::<UserRecord>(USERS, Some(filter), "created")
                .await?
                .into_iter()
                .map(|user| (user.id.clone(), user.summary()))
                .collect(),
            None => HashMap::new(),
        };

        records.into_iter().map(|r| r.into_alumni(&owners)).collect()
    }

    async fn find_by(&self, field: &str, value: &str) -> Result<Option<Alumni>, AppError> {
        let found = self.client.first::<AlumniRecord>(ALUMNI, eq(field, value)).await?;
        Ok(self.join(found.into_iter().collect()).await?.pop())
    }
}

#[async_trait]
impl AlumniRepository for PbAlumniRepo {
    async fn list(&self) -> Result<Vec<Alumni>, AppError> {
        let records = self.client.list_all(ALUMNI, None, "-created").await?;
        self.join(records).await
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Alumni>, AppError> {
        let filter = all_of(search_clause(query, &["nim", "nama", "jurusan", "email"]));
        let (items, total) = self
            .client
            .list_window::<AlumniRecord>(ALUMNI, query, filter)
            .await?;
        Ok(Page { items: self.join(items).await?, total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Alumni, AppError> {
        let record = self
            .client
            .get::<AlumniRecord>(ALUMNI, &id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
        self.join(vec![record])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))
    }

    async fn get_by_user_id(&self, user_id: &RecordId) -> Result<Option<Alumni>, AppError> {
        self.find_by("user_id", &user_id.to_string()).await
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Alumni>, AppError> {
        self.find_by("nim", nim).await
    }

    async fn create(&self, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        let record = self
            .client
            .create::<AlumniRecord, _>(ALUMNI, &AlumniBody::from(alumni))
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))?;
        self.get_by_id(&RecordId::Key(record.id)).await
    }

    async fn update(&self, id: &RecordId, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        self.client
            .update::<AlumniRecord, _>(ALUMNI, &id.to_string(), &AlumniBody::from(alumni))
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))?;
        self.get_by_id(id).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.client
            .delete(ALUMNI, &id.to_string())
            .await
            .map_err(reword(NOT_FOUND, DUPLICATE))
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.client.count(ALUMNI, None).await
    }
}
