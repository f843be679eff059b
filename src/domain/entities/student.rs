use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{ids::RecordId, not_blank};

pub const STUDENT_SORT_FIELDS: &[&str] = &["id", "nim", "nama", "jurusan", "angkatan", "email", "created_at"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: RecordId,
    pub nim: String,
    pub nama: String,
    pub jurusan: String,
    pub angkatan: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentFields {
    pub nim: String,
    pub nama: String,
    pub jurusan: String,
    pub angkatan: i32,
    pub email: String,
}

/// Body of student create and update requests.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct StudentPayload {
    #[validate(length(min = 1, max = 20, message = "NIM is required"), custom(function = "not_blank"))]
    pub nim: String,

    #[validate(length(min = 1, max = 100, message = "Name is required"), custom(function = "not_blank"))]
    pub nama: String,

    #[validate(length(min = 1, max = 100, message = "Department is required"), custom(function = "not_blank"))]
    pub jurusan: String,

    #[validate(range(min = 1900, max = 2200, message = "Cohort year is out of range"))]
    pub angkatan: i32,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

impl From<StudentPayload> for StudentFields {
    fn from(payload: StudentPayload) -> Self {
        StudentFields {
            nim: payload.nim.trim().to_string(),
            nama: payload.nama.trim().to_string(),
            jurusan: payload.jurusan.trim().to_string(),
            angkatan: payload.angkatan,
            email: payload.email.trim().to_lowercase(),
        }
    }
}
