use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::{
    all_of, alumni::AlumniRecord, any_id, eq, format_date, format_timestamp, non_empty,
    parse_date, parse_optional_date, parse_optional_timestamp, parse_timestamp, search_clause, PocketBaseClient,
    ALUMNI, EMPLOYMENT,
};
use crate::{
    entities::{
        alumni::AlumniSummary,
        employment::{BatchFailure, BatchReport, EmploymentFields, EmploymentRecord, Visibility},
        ids::RecordId,
        pagination::{Page, PageQuery},
    },
    errors::AppError,
    repositories::employment::EmploymentRepository,
};

const NOT_FOUND: &str = "Employment record not found";
const SEARCH_FIELDS: [&str; 4] = ["nama_perusahaan", "posisi_jabatan", "bidang_industri", "lokasi_kerja"];
const ACTIVE: &str = r#"deleted_at = """#;
const TRASHED: &str = r#"deleted_at != """#;

#[derive(Debug, Clone, Deserialize)]
struct EmploymentRow {
    id: String,
    alumni_id: String,
    nama_perusahaan: String,
    posisi_jabatan: String,
    bidang_industri: String,
    lokasi_kerja: String,
    #[serde(default)]
    gaji_range: String,
    tanggal_mulai_kerja: String,
    #[serde(default)]
    tanggal_selesai_kerja: String,
    #[serde(default)]
    status_pekerjaan: String,
    #[serde(default)]
    deskripsi_pekerjaan: String,
    #[serde(default)]
    deleted_at: String,
    created: String,
    updated: String,
}

impl EmploymentRow {
    fn is_trashed(&self) -> bool {
        !self.deleted_at.is_empty()
    }

    fn into_record(self, alumni: &HashMap<String, AlumniSummary>) -> Result<EmploymentRecord, AppError> {
        Ok(EmploymentRecord {
            alumni: alumni.get(&self.alumni_id).cloned(),
            id: RecordId::Key(self.id),
            alumni_id: RecordId::Key(self.alumni_id),
            nama_perusahaan: self.nama_perusahaan,
            posisi_jabatan: self.posisi_jabatan,
            bidang_industri: self.bidang_industri,
            lokasi_kerja: self.lokasi_kerja,
            gaji_range: non_empty(self.gaji_range),
            tanggal_mulai_kerja: parse_date(&self.tanggal_mulai_kerja)?,
            tanggal_selesai_kerja: parse_optional_date(&self.tanggal_selesai_kerja)?,
            status_pekerjaan: self.status_pekerjaan,
            deskripsi_pekerjaan: non_empty(self.deskripsi_pekerjaan),
            deleted_at: parse_optional_timestamp(&self.deleted_at)?,
            created_at: parse_timestamp(&self.created)?,
            updated_at: parse_timestamp(&self.updated)?,
        })
    }
}

#[derive(Serialize)]
struct EmploymentBody<'a> {
    alumni_id: String,
    nama_perusahaan: &'a str,
    posisi_jabatan: &'a str,
    bidang_industri: &'a str,
    lokasi_kerja: &'a str,
    gaji_range: &'a str,
    tanggal_mulai_kerja: String,
    tanggal_selesai_kerja: String,
    status_pekerjaan: &'a str,
    deskripsi_pekerjaan: &'a str,
}

impl<'a> From<&'a EmploymentFields> for EmploymentBody<'a> {
    fn from(fields: &'a EmploymentFields) -> Self {
        EmploymentBody {
            alumni_id: fields.alumni_id.to_string(),
            nama_perusahaan: &fields.nama_perusahaan,
            posisi_jabatan: &fields.posisi_jabatan,
            bidang_industri: &fields.bidang_industri,
            lokasi_kerja: &fields.lokasi_kerja,
            gaji_range: fields.gaji_range.as_deref().unwrap_or_default(),
            tanggal_mulai_kerja: format_date(fields.tanggal_mulai_kerja),
            tanggal_selesai_kerja: fields.tanggal_selesai_kerja.map(format_date).unwrap_or_default(),
            status_pekerjaan: &fields.status_pekerjaan,
            deskripsi_pekerjaan: fields.deskripsi_pekerjaan.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct PbEmploymentRepo {
    client: PocketBaseClient,
}

impl PbEmploymentRepo {
    pub fn new(client: PocketBaseClient) -> Self {
        PbEmploymentRepo { client }
    }

    /// Resolves alumni profiles in one batched lookup; dangling references
    /// come back without an embedded profile.
    async fn join(&self, rows: Vec<EmploymentRow>) -> Result<Vec<EmploymentRecord>, AppError> {
        let ids: Vec<String> = rows
            .iter()
            .map(|r| r.alumni_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let alumni: HashMap<String, AlumniSummary> = match any_id(&ids) {
            Some(filter) => self
                .client
                .list_all::<AlumniRecord>(ALUMNI, Some(filter), "created")
                .await?
                .into_iter()
                .map(|a| (a.id.clone(), a.summary()))
                .collect(),
            None => HashMap::new(),
        };

        rows.into_iter().map(|r| r.into_record(&alumni)).collect()
    }

    async fn fetch(&self, id: &RecordId) -> Result<Option<EmploymentRow>, AppError> {
        self.client.get(EMPLOYMENT, &id.to_string()).await
    }

    async fn owned_by(&self, alumni_id: &str, extra: &str, sort: &str) -> Result<Vec<EmploymentRow>, AppError> {
        let filter = all_of([eq("alumni_id", alumni_id), extra.to_string()]);
        self.client.list_all(EMPLOYMENT, filter, sort).await
    }

    async fn alumni_of(&self, user_id: &RecordId) -> Result<Option<String>, AppError> {
        let found = self
            .client
            .first::<AlumniRecord>(ALUMNI, eq("user_id", &user_id.to_string()))
            .await?;
        Ok(found.map(|a| a.id))
    }

    async fn mark_deleted(&self, id: &str, deleted_at: String) -> Result<(), AppError> {
        self.client
            .update::<serde_json::Value, _>(EMPLOYMENT, id, &json!({ "deleted_at": deleted_at }))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl EmploymentRepository for PbEmploymentRepo {
    async fn list(&self) -> Result<Vec<EmploymentRecord>, AppError> {
        let rows = self
            .client
            .list_all(EMPLOYMENT, Some(ACTIVE.to_string()), "-created")
            .await?;
        self.join(rows).await
    }

    async fn list_paged(&self, query: &PageQuery, visibility: Visibility) -> Result<Page<EmploymentRecord>, AppError> {
        let state = match visibility {
            Visibility::Active => ACTIVE,
            Visibility::Trashed => TRASHED,
        };
        let filter = all_of(std::iter::once(state.to_string()).chain(search_clause(query, &SEARCH_FIELDS)));
        let (items, total) = self
            .client
            .list_window::<EmploymentRow>(EMPLOYMENT, query, filter)
            .await?;
        Ok(Page { items: self.join(items).await?, total })
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<EmploymentRecord, AppError> {
        let row = self
            .fetch(id)
            .await?
            .filter(|row| !row.is_trashed())
            .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
        self.join(vec![row])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))
    }

    async fn list_by_alumni(&self, alumni_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        let rows = self.owned_by(&alumni_id.to_string(), ACTIVE, "-created").await?;
        self.join(rows).await
    }

    async fn list_by_user(&self, user_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        match self.alumni_of(user_id).await? {
            Some(alumni_id) => self.join(self.owned_by(&alumni_id, ACTIVE, "-created").await?).await,
            None => Ok(Vec::new()),
        }
    }

    async fn create(&self, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        let mut body = serde_json::to_value(EmploymentBody::from(record))
            .map_err(|e| AppError::InternalError(format!("Cannot encode employment record: {e}")))?;
        body["deleted_at"] = json!("");

        let created: EmploymentRow = self.client.create(EMPLOYMENT, &body).await?;
        self.get_by_id(&RecordId::Key(created.id)).await
    }

    async fn update(&self, id: &RecordId, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        // Confirms the record is active; trashed records are not editable.
        self.get_by_id(id).await?;
        self.client
            .update::<EmploymentRow, _>(EMPLOYMENT, &id.to_string(), &EmploymentBody::from(record))
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(NOT_FOUND.into()),
                other => other,
            })?;
        self.get_by_id(id).await
    }

    async fn soft_delete(&self, id: &RecordId) -> Result<(), AppError> {
        let row = self
            .fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
        if row.is_trashed() {
            return Err(AppError::Conflict("Employment record is already in the trash".into()));
        }
        self.mark_deleted(&row.id, format_timestamp(Utc::now())).await
    }

    async fn soft_delete_by_owner(&self, alumni_id: &RecordId) -> Result<BatchReport, AppError> {
        let rows = self.owned_by(&alumni_id.to_string(), ACTIVE, "created").await?;
        let mut report = BatchReport::default();

        // One request per record: the service has no multi-record update, so
        // each item succeeds or fails on its own and the rest carry on.
        for row in rows {
            let id = RecordId::Key(row.id.clone());
            match self.mark_deleted(&row.id, format_timestamp(Utc::now())).await {
                Ok(()) => report.affected.push(id),
                Err(e) => {
                    warn!(employment_id = %id, error = %e, "Failed to trash employment record");
                    report.failed.push(BatchFailure { id, reason: e.to_string() });
                }
            }
        }

        info!(
            alumni_id = %alumni_id,
            trashed = report.affected.len(),
            failed = report.failed.len(),
            "Trashed employment records of alumni"
        );
        Ok(report)
    }

    async fn restore(&self, id: &RecordId) -> Result<(), AppError> {
        let row = self
            .fetch(id)
            .await?
            .filter(EmploymentRow::is_trashed)
            .ok_or_else(|| AppError::NotFound("No trashed employment record with that id".into()))?;
        self.mark_deleted(&row.id, String::new()).await
    }

    async fn hard_delete(&self, id: &RecordId) -> Result<(), AppError> {
        let row = self
            .fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
        if !row.is_trashed() {
            return Err(AppError::PreconditionFailed(
                "Employment record must be in the trash before permanent deletion".into(),
            ));
        }
        self.client.delete(EMPLOYMENT, &row.id).await
    }

    async fn list_deleted(&self, owner: Option<RecordId>) -> Result<Vec<EmploymentRecord>, AppError> {
        let rows = match owner {
            Some(owner) => match self.alumni_of(&owner).await? {
                Some(alumni_id) => self.owned_by(&alumni_id, TRASHED, "-deleted_at").await?,
                None => Vec::new(),
            },
            None => {
                self.client
                    .list_all(EMPLOYMENT, Some(TRASHED.to_string()), "-deleted_at")
                    .await?
            }
        };
        self.join(rows).await
    }

    async fn count_active(&self) -> Result<i64, AppError> {
        self.client.count(EMPLOYMENT, Some(ACTIVE.to_string())).await
    }

    async fn count_alumni_by_company(&self, company: &str) -> Result<i64, AppError> {
        let filter = all_of([eq("nama_perusahaan", company), ACTIVE.to_string()]);
        let rows: Vec<EmploymentRow> = self.client.list_all(EMPLOYMENT, filter, "created").await?;
        let distinct: HashSet<String> = rows.into_iter().map(|r| r.alumni_id).collect();
        Ok(distinct.len() as i64)
    }
}
