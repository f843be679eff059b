use std::{future::Future, time::Duration};

use async_trait::async_trait;
use tracing::warn;

use crate::{
    entities::{
        alumni::{Alumni, AlumniFields},
        employment::{BatchReport, EmploymentFields, EmploymentRecord, Visibility},
        ids::RecordId,
        pagination::{Page, PageQuery},
        student::{Student, StudentFields},
        user::{User, UserFields},
    },
    errors::AppError,
    repositories::{
        alumni::AlumniRepository, employment::EmploymentRepository,
        student::StudentRepository, user::UserRepository,
    },
};

/// How long a single adapter call may take, by call weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub lookup: Duration,
    pub scan: Duration,
    pub bulk: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Deadlines {
            lookup: Duration::from_secs(5),
            scan: Duration::from_secs(10),
            bulk: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    /// Point reads and single-row writes.
    Lookup,
    /// Listings, searches and counts.
    Scan,
    /// Multi-record mutations.
    Bulk,
}

impl Deadlines {
    pub fn window(&self, weight: Weight) -> Duration {
        match weight {
            Weight::Lookup => self.lookup,
            Weight::Scan => self.scan,
            Weight::Bulk => self.bulk,
        }
    }

    /// Runs `call` within its window. On expiry the future is dropped, which
    /// returns pooled connections and closes open cursors and requests.
    pub async fn run<T, F>(&self, weight: Weight, op: &'static str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let window = self.window(weight);
        match tokio::time::timeout(window, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout_ms = window.as_millis() as u64, "backend call timed out");
                Err(AppError::Unavailable(format!("{op} timed out after {window:?}")))
            }
        }
    }
}

/// Wraps an adapter so every call is bounded by [`Deadlines`].
pub struct Bounded<R> {
    inner: R,
    deadlines: Deadlines,
}

impl<R> Bounded<R> {
    pub fn new(inner: R, deadlines: Deadlines) -> Self {
        Bounded { inner, deadlines }
    }
}

#[async_trait]
impl<R: UserRepository> UserRepository for Bounded<R> {
    async fn check_connection(&self) -> Result<(), AppError> {
        self.deadlines.run(Weight::Lookup, "users.check_connection", self.inner.check_connection()).await
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        self.deadlines.run(Weight::Scan, "users.list", self.inner.list()).await
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<User>, AppError> {
        self.deadlines.run(Weight::Scan, "users.list_paged", self.inner.list_paged(query)).await
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<User, AppError> {
        self.deadlines.run(Weight::Lookup, "users.get_by_id", self.inner.get_by_id(id)).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.deadlines.run(Weight::Lookup, "users.get_by_email", self.inner.get_by_email(email)).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.deadlines.run(Weight::Lookup, "users.get_by_username", self.inner.get_by_username(username)).await
    }

    async fn create(&self, user: &UserFields) -> Result<User, AppError> {
        self.deadlines.run(Weight::Lookup, "users.create", self.inner.create(user)).await
    }

    async fn update(&self, id: &RecordId, user: &UserFields) -> Result<User, AppError> {
        self.deadlines.run(Weight::Lookup, "users.update", self.inner.update(id, user)).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.deadlines.run(Weight::Lookup, "users.delete", self.inner.delete(id)).await
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.deadlines.run(Weight::Scan, "users.count", self.inner.count()).await
    }
}

#[async_trait]
impl<R: StudentRepository> StudentRepository for Bounded<R> {
    async fn list(&self) -> Result<Vec<Student>, AppError> {
        self.deadlines.run(Weight::Scan, "students.list", self.inner.list()).await
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Student>, AppError> {
        self.deadlines.run(Weight::Scan, "students.list_paged", self.inner.list_paged(query)).await
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Student, AppError> {
        self.deadlines.run(Weight::Lookup, "students.get_by_id", self.inner.get_by_id(id)).await
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Student>, AppError> {
        self.deadlines.run(Weight::Lookup, "students.get_by_nim", self.inner.get_by_nim(nim)).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        self.deadlines.run(Weight::Lookup, "students.get_by_email", self.inner.get_by_email(email)).await
    }

    async fn create(&self, student: &StudentFields) -> Result<Student, AppError> {
        self.deadlines.run(Weight::Lookup, "students.create", self.inner.create(student)).await
    }

    async fn update(&self, id: &RecordId, student: &StudentFields) -> Result<Student, AppError> {
        self.deadlines.run(Weight::Lookup, "students.update", self.inner.update(id, student)).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.deadlines.run(Weight::Lookup, "students.delete", self.inner.delete(id)).await
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.deadlines.run(Weight::Scan, "students.count", self.inner.count()).await
    }
}

#[async_trait]
impl<R: AlumniRepository> AlumniRepository for Bounded<R> {
    async fn list(&self) -> Result<Vec<Alumni>, AppError> {
        self.deadlines.run(Weight::Scan, "alumni.list", self.inner.list()).await
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Alumni>, AppError> {
        self.deadlines.run(Weight::Scan, "alumni.list_paged", self.inner.list_paged(query)).await
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Alumni, AppError> {
        self.deadlines.run(Weight::Lookup, "alumni.get_by_id", self.inner.get_by_id(id)).await
    }

    async fn get_by_user_id(&self, user_id: &RecordId) -> Result<Option<Alumni>, AppError> {
        self.deadlines.run(Weight::Lookup, "alumni.get_by_user_id", self.inner.get_by_user_id(user_id)).await
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Alumni>, AppError> {
        self.deadlines.run(Weight::Lookup, "alumni.get_by_nim", self.inner.get_by_nim(nim)).await
    }

    async fn create(&self, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        self.deadlines.run(Weight::Lookup, "alumni.create", self.inner.create(alumni)).await
    }

    async fn update(&self, id: &RecordId, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        self.deadlines.run(Weight::Lookup, "alumni.update", self.inner.update(id, alumni)).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.deadlines.run(Weight::Lookup, "alumni.delete", self.inner.delete(id)).await
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.deadlines.run(Weight::Scan, "alumni.count", self.inner.count()).await
    }
}

#[async_trait]
impl<R: EmploymentRepository> EmploymentRepository for Bounded<R> {
    async fn list(&self) -> Result<Vec<EmploymentRecord>, AppError> {
        self.deadlines.run(Weight::Scan, "employment.list", self.inner.list()).await
    }

    async fn list_paged(&self, query: &PageQuery, visibility: Visibility) -> Result<Page<EmploymentRecord>, AppError> {
        self.deadlines.run(Weight::Scan, "employment.list_paged", self.inner.list_paged(query, visibility)).await
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<EmploymentRecord, AppError> {
        self.deadlines.run(Weight::Lookup, "employment.get_by_id", self.inner.get_by_id(id)).await
    }

    async fn list_by_alumni(&self, alumni_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        self.deadlines.run(Weight::Scan, "employment.list_by_alumni", self.inner.list_by_alumni(alumni_id)).await
    }

    async fn list_by_user(&self, user_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        self.deadlines.run(Weight::Scan, "employment.list_by_user", self.inner.list_by_user(user_id)).await
    }

    async fn create(&self, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        self.deadlines.run(Weight::Lookup, "employment.create", self.inner.create(record)).await
    }

    async fn update(&self, id: &RecordId, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        self.deadlines.run(Weight::Lookup, "employment.update", self.inner.update(id, record)).await
    }

    async fn soft_delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.deadlines.run(Weight::Lookup, "employment.soft_delete", self.inner.soft_delete(id)).await
    }

    async fn soft_delete_by_owner(&self, alumni_id: &RecordId) -> Result<BatchReport, AppError> {
        self.deadlines.run(Weight::Bulk, "employment.soft_delete_by_owner", self.inner.soft_delete_by_owner(alumni_id)).await
    }

    async fn restore(&self, id: &RecordId) -> Result<(), AppError> {
        self.deadlines.run(Weight::Lookup, "employment.restore", self.inner.restore(id)).await
    }

    async fn hard_delete(&self, id: &RecordId) -> Result<(), AppError> {
        self.deadlines.run(Weight::Lookup, "employment.hard_delete", self.inner.hard_delete(id)).await
    }

    async fn list_deleted(&self, owner: Option<RecordId>) -> Result<Vec<EmploymentRecord>, AppError> {
        self.deadlines.run(Weight::Scan, "employment.list_deleted", self.inner.list_deleted(owner)).await
    }

    async fn count_active(&self) -> Result<i64, AppError> {
        self.deadlines.run(Weight::Scan, "employment.count_active", self.inner.count_active()).await
    }

    async fn count_alumni_by_company(&self, company: &str) -> Result<i64, AppError> {
        self.deadlines.run(Weight::Scan, "employment.count_alumni_by_company", self.inner.count_alumni_by_company(company)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight() -> Deadlines {
        Deadlines {
            lookup: Duration::from_millis(20),
            scan: Duration::from_millis(20),
            bulk: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn elapsed_call_becomes_unavailable() {
        let result: Result<(), AppError> = tight()
            .run(Weight::Lookup, "test.slow", async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn fast_call_passes_through_errors_untouched() {
        let result: Result<(), AppError> = tight()
            .run(Weight::Scan, "test.fast", async { Err(AppError::NotFound("gone".into())) })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    struct StalledStudents;

    #[async_trait]
    impl StudentRepository for StalledStudents {
        async fn list(&self) -> Result<Vec<Student>, AppError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
        async fn list_paged(&self, _: &PageQuery) -> Result<Page<Student>, AppError> {
            unimplemented!()
        }
        async fn get_by_id(&self, _: &RecordId) -> Result<Student, AppError> {
            unimplemented!()
        }
        async fn get_by_nim(&self, _: &str) -> Result<Option<Student>, AppError> {
            unimplemented!()
        }
        async fn get_by_email(&self, _: &str) -> Result<Option<Student>, AppError> {
            unimplemented!()
        }
        async fn create(&self, _: &StudentFields) -> Result<Student, AppError> {
            unimplemented!()
        }
        async fn update(&self, _: &RecordId, _: &StudentFields) -> Result<Student, AppError> {
            unimplemented!()
        }
        async fn delete(&self, _: &RecordId) -> Result<(), AppError> {
            unimplemented!()
        }
        async fn count(&self) -> Result<i64, AppError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn bounded_adapter_times_out_stalled_backend() {
        let repo = Bounded::new(StalledStudents, tight());
        assert!(matches!(repo.list().await, Err(AppError::Unavailable(_))));
    }
}
