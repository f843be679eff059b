use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::entities::{ids::RecordId, not_blank, user::UserSummary};

pub const ALUMNI_SORT_FIELDS: &[&str] = &["id", "nim", "nama", "jurusan", "angkatan", "tahun_lulus", "email", "created_at"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alumni {
    pub id: RecordId,
    pub user_id: Option<RecordId>,
    pub nim: String,
    pub nama: String,
    pub jurusan: String,
    pub angkatan: i32,
    pub tahun_lulus: i32,
    pub email: String,
    pub no_telepon: Option<String>,
    pub alamat: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Joined owner; `None` when unlinked or when the user no longer exists.
    pub user: Option<UserSummary>,
}

impl Alumni {
    pub fn summary(&self) -> AlumniSummary {
        AlumniSummary {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            nim: self.nim.clone(),
            nama: self.nama.clone(),
            jurusan: self.jurusan.clone(),
            angkatan: self.angkatan,
            tahun_lulus: self.tahun_lulus,
            email: self.email.clone(),
        }
    }

    pub fn is_owned_by(&self, user_id: &RecordId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }
}

/// Alumni as embedded in an employment record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlumniSummary {
    pub id: RecordId,
    pub user_id: Option<RecordId>,
    pub nim: String,
    pub nama: String,
    pub jurusan: String,
    pub angkatan: i32,
    pub tahun_lulus: i32,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlumniFields {
    pub user_id: Option<RecordId>,
    pub nim: String,
    pub nama: String,
    pub jurusan: String,
    pub angkatan: i32,
    pub tahun_lulus: i32,
    pub email: String,
    pub no_telepon: Option<String>,
    pub alamat: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_graduation_year"))]
pub struct AlumniPayload {
    pub user_id: Option<RecordId>,

    #[validate(length(min = 1, max = 20, message = "NIM is required"), custom(function = "not_blank"))]
    pub nim: String,

    #[validate(length(min = 1, max = 100, message = "Name is required"), custom(function = "not_blank"))]
    pub nama: String,

    #[validate(length(min = 1, max = 100, message = "Department is required"), custom(function = "not_blank"))]
    pub jurusan: String,

    #[validate(range(min = 1900, max = 2200, message = "Cohort year is out of range"))]
    pub angkatan: i32,

    #[validate(range(min = 1900, max = 2200, message = "Graduation year is out of range"))]
    pub tahun_lulus: i32,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 20, message = "Phone number is too long"))]
    pub no_telepon: Option<String>,

    pub alamat: Option<String>,
}

fn validate_graduation_year(payload: &AlumniPayload) -> Result<(), ValidationError> {
    if payload.tahun_lulus < payload.angkatan {
        let mut error = ValidationError::new("tahun_lulus");
        error.message = Some("Graduation year cannot precede the cohort year".into());
        return Err(error);
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<AlumniPayload> for AlumniFields {
    fn from(payload: AlumniPayload) -> Self {
        AlumniFields {
            user_id: payload.user_id,
            nim: payload.nim.trim().to_string(),
            nama: payload.nama.trim().to_string(),
            jurusan: payload.jurusan.trim().to_string(),
            angkatan: payload.angkatan,
            tahun_lulus: payload.tahun_lulus,
            email: payload.email.trim().to_lowercase(),
            no_telepon: non_blank(payload.no_telepon),
            alamat: non_blank(payload.alamat),
        }
    }
}

/// One bucket of a grouped count, such as alumni per graduation year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountBucket {
    pub key: String,
    pub total: i64,
}
