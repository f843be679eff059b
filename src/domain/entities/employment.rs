use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::entities::{alumni::AlumniSummary, ids::RecordId, not_blank};

pub const EMPLOYMENT_SORT_FIELDS: &[&str] = &[
    "id",
    "nama_perusahaan",
    "posisi_jabatan",
    "bidang_industri",
    "lokasi_kerja",
    "tanggal_mulai_kerja",
    "created_at",
    "deleted_at",
];

pub const DEFAULT_EMPLOYMENT_STATUS: &str = "aktif";

/// A job history entry. `deleted_at` is the soft-delete marker:
/// `None` is ACTIVE, `Some(_)` is TRASHED.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmploymentRecord {
    pub id: RecordId,
    pub alumni_id: RecordId,
    pub nama_perusahaan: String,
    pub posisi_jabatan: String,
    pub bidang_industri: String,
    pub lokasi_kerja: String,
    pub gaji_range: Option<String>,
    pub tanggal_mulai_kerja: NaiveDate,
    pub tanggal_selesai_kerja: Option<NaiveDate>,
    pub status_pekerjaan: String,
    pub deskripsi_pekerjaan: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub alumni: Option<AlumniSummary>,
}

impl EmploymentRecord {
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Case-insensitive match of a lowercased needle against the searchable columns.
    pub fn matches_search(&self, needle: &str) -> bool {
        [&self.nama_perusahaan, &self.posisi_jabatan, &self.bidang_industri, &self.lokasi_kerja]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    pub fn fields(&self) -> EmploymentFields {
        EmploymentFields {
            alumni_id: self.alumni_id.clone(),
            nama_perusahaan: self.nama_perusahaan.clone(),
            posisi_jabatan: self.posisi_jabatan.clone(),
            bidang_industri: self.bidang_industri.clone(),
            lokasi_kerja: self.lokasi_kerja.clone(),
            gaji_range: self.gaji_range.clone(),
            tanggal_mulai_kerja: self.tanggal_mulai_kerja,
            tanggal_selesai_kerja: self.tanggal_selesai_kerja,
            status_pekerjaan: self.status_pekerjaan.clone(),
            deskripsi_pekerjaan: self.deskripsi_pekerjaan.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Active,
    Trashed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmploymentFields {
    pub alumni_id: RecordId,
    pub nama_perusahaan: String,
    pub posisi_jabatan: String,
    pub bidang_industri: String,
    pub lokasi_kerja: String,
    pub gaji_range: Option<String>,
    pub tanggal_mulai_kerja: NaiveDate,
    pub tanggal_selesai_kerja: Option<NaiveDate>,
    pub status_pekerjaan: String,
    pub deskripsi_pekerjaan: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_employment_period"))]
pub struct EmploymentPayload {
    pub alumni_id: RecordId,

    #[validate(length(min = 1, max = 100, message = "Company name is required"), custom(function = "not_blank"))]
    pub nama_perusahaan: String,

    #[validate(length(min = 1, max = 100, message = "Job title is required"), custom(function = "not_blank"))]
    pub posisi_jabatan: String,

    #[validate(length(min = 1, max = 100, message = "Industry is required"), custom(function = "not_blank"))]
    pub bidang_industri: String,

    #[validate(length(min = 1, max = 100, message = "Location is required"), custom(function = "not_blank"))]
    pub lokasi_kerja: String,

    #[validate(length(max = 50, message = "Salary range is too long"))]
    pub gaji_range: Option<String>,

    pub tanggal_mulai_kerja: NaiveDate,

    pub tanggal_selesai_kerja: Option<NaiveDate>,

    #[validate(length(max = 50, message = "Status is too long"))]
    pub status_pekerjaan: Option<String>,

    pub deskripsi_pekerjaan: Option<String>,
}

fn validate_employment_period(payload: &EmploymentPayload) -> Result<(), ValidationError> {
    if let Some(end) = payload.tanggal_selesai_kerja {
        if end < payload.tanggal_mulai_kerja {
            let mut error = ValidationError::new("tanggal_selesai_kerja");
            error.message = Some("End date cannot precede the start date".into());
            return Err(error);
        }
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<EmploymentPayload> for EmploymentFields {
    fn from(payload: EmploymentPayload) -> Self {
        EmploymentFields {
            alumni_id: payload.alumni_id,
            nama_perusahaan: payload.nama_perusahaan.trim().to_string(),
            posisi_jabatan: payload.posisi_jabatan.trim().to_string(),
            bidang_industri: payload.bidang_industri.trim().to_string(),
            lokasi_kerja: payload.lokasi_kerja.trim().to_string(),
            gaji_range: non_blank(payload.gaji_range),
            tanggal_mulai_kerja: payload.tanggal_mulai_kerja,
            tanggal_selesai_kerja: payload.tanggal_selesai_kerja,
            status_pekerjaan: non_blank(payload.status_pekerjaan)
                .unwrap_or_else(|| DEFAULT_EMPLOYMENT_STATUS.to_string()),
            deskripsi_pekerjaan: non_blank(payload.deskripsi_pekerjaan),
        }
    }
}

/// Outcome of a bulk soft delete. Items already trashed are not touched,
/// so re-running a partially failed batch only retries what is left.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BatchReport {
    pub affected: Vec<RecordId>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchFailure {
    pub id: RecordId,
    pub reason: String,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> EmploymentPayload {
        EmploymentPayload {
            alumni_id: RecordId::Seq(1),
            nama_perusahaan: " Acme Corp ".into(),
            posisi_jabatan: "Engineer".into(),
            bidang_industri: "Technology".into(),
            lokasi_kerja: "Jakarta".into(),
            gaji_range: Some("".into()),
            tanggal_mulai_kerja: NaiveDate::from_ymd_opt(2022, 1, 10).unwrap(),
            tanggal_selesai_kerja: None,
            status_pekerjaan: None,
            deskripsi_pekerjaan: None,
        }
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut p = payload();
        p.tanggal_selesai_kerja = NaiveDate::from_ymd_opt(2021, 12, 31);
        assert!(p.validate().is_err());
    }

    #[test]
    fn whitespace_only_required_fields_are_rejected() {
        assert!(payload().validate().is_ok());
        let blanks: [fn(&mut EmploymentPayload); 4] = [
            |p| p.nama_perusahaan = "   ".into(),
            |p| p.posisi_jabatan = "\t".into(),
            |p| p.bidang_industri = " ".into(),
            |p| p.lokasi_kerja = "  \n ".into(),
        ];
        for blank in blanks {
            let mut p = payload();
            blank(&mut p);
            assert!(p.validate().is_err());
        }
    }

    #[test]
    fn fields_are_trimmed_and_defaulted() {
        let fields = EmploymentFields::from(payload());
        assert_eq!(fields.nama_perusahaan, "Acme Corp");
        assert_eq!(fields.status_pekerjaan, DEFAULT_EMPLOYMENT_STATUS);
        assert!(fields.gaji_range.is_none());
    }
}
