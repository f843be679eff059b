//! In-process implementation of every repository contract.
//!
//! Used by the test suites and for running the API without external
//! services. Tables live behind one lock so joins see a consistent snapshot
//! and id assignment is serialized.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

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

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    students: BTreeMap<i64, Student>,
    alumni: BTreeMap<i64, Alumni>,
    employment: BTreeMap<i64, EmploymentRecord>,
    next_user: i64,
    next_student: i64,
    next_alumni: i64,
    next_employment: i64,
}

impl Tables {
    fn next(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn join_alumni(&self, alumni: &Alumni) -> Alumni {
        let mut joined = alumni.clone();
        joined.user = alumni
            .user_id
            .as_ref()
            .and_then(|uid| uid.as_seq().ok())
            .and_then(|uid| self.users.get(&uid))
            .map(User::summary);
        joined
    }

    fn join_employment(&self, record: &EmploymentRecord) -> EmploymentRecord {
        let mut joined = record.clone();
        joined.alumni = record
            .alumni_id
            .as_seq()
            .ok()
            .and_then(|aid| self.alumni.get(&aid))
            .map(Alumni::summary);
        joined
    }

    fn alumni_owned_by(&self, user_id: &RecordId) -> Option<&Alumni> {
        self.alumni.values().find(|a| a.is_owned_by(user_id))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> MemoryUserRepo {
        MemoryUserRepo { tables: Arc::clone(&self.tables) }
    }

    pub fn students(&self) -> MemoryStudentRepo {
        MemoryStudentRepo { tables: Arc::clone(&self.tables) }
    }

    pub fn alumni(&self) -> MemoryAlumniRepo {
        MemoryAlumniRepo { tables: Arc::clone(&self.tables) }
    }

    pub fn employment(&self) -> MemoryEmploymentRepo {
        MemoryEmploymentRepo { tables: Arc::clone(&self.tables) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Int(i64),
    Text(String),
    Date(Option<NaiveDate>),
    Time(Option<DateTime<Utc>>),
}

fn text(value: &str) -> SortKey {
    SortKey::Text(value.to_lowercase())
}

fn matches_search(needle: Option<&str>, haystack: &[&str]) -> bool {
    match needle {
        None => true,
        Some(n) => haystack.iter().any(|h| h.to_lowercase().contains(n)),
    }
}

/// Orders `(sort key, id, row)` tuples and cuts out the requested window.
fn paginate<T>(mut rows: Vec<(SortKey, i64, T)>, query: &PageQuery) -> Page<T> {
    let descending = query.sort.direction.is_desc();
    rows.sort_by(|a, b| {
        let primary = if descending { b.0.cmp(&a.0) } else { a.0.cmp(&b.0) };
        primary.then(a.1.cmp(&b.1))
    });

    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(query.offset() as usize)
        .take(query.limit as usize)
        .map(|(_, _, row)| row)
        .collect();

    Page { items, total }
}

fn newest_first<T>(rows: impl Iterator<Item = (i64, T)>) -> Vec<T> {
    let mut rows: Vec<(i64, T)> = rows.collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    rows.into_iter().map(|(_, row)| row).collect()
}

pub struct MemoryUserRepo {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryUserRepo {
    fn ensure_unique(tables: &Tables, user: &UserFields, except: Option<i64>) -> Result<(), AppError> {
        let clash = tables.users.iter().any(|(id, existing)| {
            Some(*id) != except
                && (existing.username == user.username || existing.email.eq_ignore_ascii_case(&user.email))
        });
        if clash {
            return Err(AppError::Conflict("Username or email already exists".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read();
        Ok(newest_first(tables.users.iter().map(|(id, u)| (*id, u.clone()))))
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<User>, AppError> {
        let tables = self.tables.read();
        let needle = query.needle();
        let rows = tables
            .users
            .iter()
            .filter(|(_, u)| matches_search(needle.as_deref(), &[u.username.as_str(), u.email.as_str(), u.role.as_str()]))
            .map(|(id, u)| {
                let key = match query.sort.field {
                    "username" => text(&u.username),
                    "email" => text(&u.email),
                    "role" => text(u.role.as_str()),
                    "created_at" => SortKey::Time(Some(u.created_at)),
                    _ => SortKey::Int(*id),
                };
                (key, *id, u.clone())
            })
            .collect();
        Ok(paginate(rows, query))
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<User, AppError> {
        let seq = id.as_seq()?;
        self.tables
            .read()
            .users
            .get(&seq)
            .cloned()
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read();
        Ok(tables.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read();
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn create(&self, user: &UserFields) -> Result<User, AppError> {
        let mut tables = self.tables.write();
        Self::ensure_unique(&tables, user, None)?;

        let id = Tables::next(&mut tables.next_user);
        let now = Utc::now();
        let created = User {
            id: RecordId::Seq(id),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: &RecordId, user: &UserFields) -> Result<User, AppError> {
        let seq = id.as_seq()?;
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&seq) {
            return Err(AppError::NotFound("User not found".into()));
        }
        Self::ensure_unique(&tables, user, Some(seq))?;

        let existing = tables
            .users
            .get_mut(&seq)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        existing.username = user.username.clone();
        existing.email = user.email.clone();
        existing.password_hash = user.password_hash.clone();
        existing.role = user.role;
        existing.is_active = user.is_active;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        self.tables
            .write()
            .users
            .remove(&seq)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.tables.read().users.len() as i64)
    }
}

pub struct MemoryStudentRepo {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStudentRepo {
    fn ensure_unique(tables: &Tables, student: &StudentFields, except: Option<i64>) -> Result<(), AppError> {
        let clash = tables.students.iter().any(|(id, existing)| {
            Some(*id) != except
                && (existing.nim == student.nim || existing.email.eq_ignore_ascii_case(&student.email))
        });
        if clash {
            return Err(AppError::Conflict("Student NIM or email already exists".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StudentRepository for MemoryStudentRepo {
    async fn list(&self) -> Result<Vec<Student>, AppError> {
        let tables = self.tables.read();
        Ok(newest_first(tables.students.iter().map(|(id, s)| (*id, s.clone()))))
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Student>, AppError> {
        let tables = self.tables.read();
        let needle = query.needle();
        let rows = tables
            .students
            .iter()
            .filter(|(_, s)| matches_search(needle.as_deref(), &[s.nim.as_str(), s.nama.as_str(), s.jurusan.as_str(), s.email.as_str()]))
            .map(|(id, s)| {
                let key = match query.sort.field {
                    "nim" => text(&s.nim),
                    "nama" => text(&s.nama),
                    "jurusan" => text(&s.jurusan),
                    "angkatan" => SortKey::Int(s.angkatan as i64),
                    "email" => text(&s.email),
                    "created_at" => SortKey::Time(Some(s.created_at)),
                    _ => SortKey::Int(*id),
                };
                (key, *id, s.clone())
            })
            .collect();
        Ok(paginate(rows, query))
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Student, AppError> {
        let seq = id.as_seq()?;
        self.tables
            .read()
            .students
            .get(&seq)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Student not found".into()))
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Student>, AppError> {
        Ok(self.tables.read().students.values().find(|s| s.nim == nim).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        Ok(self
            .tables
            .read()
            .students
            .values()
            .find(|s| s.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, student: &StudentFields) -> Result<Student, AppError> {
        let mut tables = self.tables.write();
        Self::ensure_unique(&tables, student, None)?;

        let id = Tables::next(&mut tables.next_student);
        let now = Utc::now();
        let created = Student {
            id: RecordId::Seq(id),
            nim: student.nim.clone(),
            nama: student.nama.clone(),
            jurusan: student.jurusan.clone(),
            angkatan: student.angkatan,
            email: student.email.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.students.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: &RecordId, student: &StudentFields) -> Result<Student, AppError> {
        let seq = id.as_seq()?;
        let mut tables = self.tables.write();
        if !tables.students.contains_key(&seq) {
            return Err(AppError::NotFound("Student not found".into()));
        }
        Self::ensure_unique(&tables, student, Some(seq))?;

        let existing = tables
            .students
            .get_mut(&seq)
            .ok_or_else(|| AppError::NotFound("Student not found".into()))?;
        existing.nim = student.nim.clone();
        existing.nama = student.nama.clone();
        existing.jurusan = student.jurusan.clone();
        existing.angkatan = student.angkatan;
        existing.email = student.email.clone();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        self.tables
            .write()
            .students
            .remove(&seq)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Student not found".into()))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.tables.read().students.len() as i64)
    }
}

pub struct MemoryAlumniRepo {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryAlumniRepo {
    fn ensure_unique(tables: &Tables, alumni: &AlumniFields, except: Option<i64>) -> Result<(), AppError> {
        let clash = tables.alumni.iter().any(|(id, existing)| {
            Some(*id) != except
                && (existing.nim == alumni.nim
                    || (alumni.user_id.is_some() && existing.user_id == alumni.user_id))
        });
        if clash {
            return Err(AppError::Conflict("Alumni NIM or user link already exists".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AlumniRepository for MemoryAlumniRepo {
    async fn list(&self) -> Result<Vec<Alumni>, AppError> {
        let tables = self.tables.read();
        Ok(newest_first(tables.alumni.iter().map(|(id, a)| (*id, tables.join_alumni(a)))))
    }

    async fn list_paged(&self, query: &PageQuery) -> Result<Page<Alumni>, AppError> {
        let tables = self.tables.read();
        let needle = query.needle();
        let rows = tables
            .alumni
            .iter()
            .filter(|(_, a)| matches_search(needle.as_deref(), &[a.nim.as_str(), a.nama.as_str(), a.jurusan.as_str(), a.email.as_str()]))
            .map(|(id, a)| {
                let key = match query.sort.field {
                    "nim" => text(&a.nim),
                    "nama" => text(&a.nama),
                    "jurusan" => text(&a.jurusan),
                    "angkatan" => SortKey::Int(a.angkatan as i64),
                    "tahun_lulus" => SortKey::Int(a.tahun_lulus as i64),
                    "email" => text(&a.email),
                    "created_at" => SortKey::Time(Some(a.created_at)),
                    _ => SortKey::Int(*id),
                };
                (key, *id, tables.join_alumni(a))
            })
            .collect();
        Ok(paginate(rows, query))
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Alumni, AppError> {
        let seq = id.as_seq()?;
        let tables = self.tables.read();
        tables
            .alumni
            .get(&seq)
            .map(|a| tables.join_alumni(a))
            .ok_or_else(|| AppError::NotFound("Alumni not found".into()))
    }

    async fn get_by_user_id(&self, user_id: &RecordId) -> Result<Option<Alumni>, AppError> {
        let tables = self.tables.read();
        Ok(tables.alumni_owned_by(user_id).map(|a| tables.join_alumni(a)))
    }

    async fn get_by_nim(&self, nim: &str) -> Result<Option<Alumni>, AppError> {
        let tables = self.tables.read();
        Ok(tables.alumni.values().find(|a| a.nim == nim).map(|a| tables.join_alumni(a)))
    }

    async fn create(&self, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        let mut tables = self.tables.write();
        Self::ensure_unique(&tables, alumni, None)?;

        let id = Tables::next(&mut tables.next_alumni);
        let now = Utc::now();
        let created = Alumni {
            id: RecordId::Seq(id),
            user_id: alumni.user_id.clone(),
            nim: alumni.nim.clone(),
            nama: alumni.nama.clone(),
            jurusan: alumni.jurusan.clone(),
            angkatan: alumni.angkatan,
            tahun_lulus: alumni.tahun_lulus,
            email: alumni.email.clone(),
            no_telepon: alumni.no_telepon.clone(),
            alamat: alumni.alamat.clone(),
            created_at: now,
            updated_at: now,
            user: None,
        };
        tables.alumni.insert(id, created.clone());
        Ok(tables.join_alumni(&created))
    }

    async fn update(&self, id: &RecordId, alumni: &AlumniFields) -> Result<Alumni, AppError> {
        let seq = id.as_seq()?;
        let mut tables = self.tables.write();
        if !tables.alumni.contains_key(&seq) {
            return Err(AppError::NotFound("Alumni not found".into()));
        }
        Self::ensure_unique(&tables, alumni, Some(seq))?;

        let existing = tables
            .alumni
            .get_mut(&seq)
            .ok_or_else(|| AppError::NotFound("Alumni not found".into()))?;
        existing.user_id = alumni.user_id.clone();
        existing.nim = alumni.nim.clone();
        existing.nama = alumni.nama.clone();
        existing.jurusan = alumni.jurusan.clone();
        existing.angkatan = alumni.angkatan;
        existing.tahun_lulus = alumni.tahun_lulus;
        existing.email = alumni.email.clone();
        existing.no_telepon = alumni.no_telepon.clone();
        existing.alamat = alumni.alamat.clone();
        existing.updated_at = Utc::now();
        let updated = existing.clone();
        Ok(tables.join_alumni(&updated))
    }

    async fn delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        self.tables
            .write()
            .alumni
            .remove(&seq)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Alumni not found".into()))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.tables.read().alumni.len() as i64)
    }
}

pub struct MemoryEmploymentRepo {
    tables: Arc<RwLock<Tables>>,
}

fn employment_sort_key(record: &EmploymentRecord, field: &str, id: i64) -> SortKey {
    match field {
        "nama_perusahaan" => text(&record.nama_perusahaan),
        "posisi_jabatan" => text(&record.posisi_jabatan),
        "bidang_industri" => text(&record.bidang_industri),
        "lokasi_kerja" => text(&record.lokasi_kerja),
        "tanggal_mulai_kerja" => SortKey::Date(Some(record.tanggal_mulai_kerja)),
        "created_at" => SortKey::Time(Some(record.created_at)),
        "deleted_at" => SortKey::Time(record.deleted_at),
        _ => SortKey::Int(id),
    }
}

#[async_trait]
impl EmploymentRepository for MemoryEmploymentRepo {
    async fn list(&self) -> Result<Vec<EmploymentRecord>, AppError> {
        let tables = self.tables.read();
        Ok(newest_first(
            tables
                .employment
                .iter()
                .filter(|(_, e)| !e.is_trashed())
                .map(|(id, e)| (*id, tables.join_employment(e))),
        ))
    }

    async fn list_paged(&self, query: &PageQuery, visibility: Visibility) -> Result<Page<EmploymentRecord>, AppError> {
        let tables = self.tables.read();
        let needle = query.needle();
        let want_trashed = visibility == Visibility::Trashed;
        let rows = tables
            .employment
            .iter()
            .filter(|(_, e)| e.is_trashed() == want_trashed)
            .filter(|(_, e)| {
                matches_search(
                    needle.as_deref(),
                    &[
                        e.nama_perusahaan.as_str(),
                        e.posisi_jabatan.as_str(),
                        e.bidang_industri.as_str(),
                        e.lokasi_kerja.as_str(),
                    ],
                )
            })
            .map(|(id, e)| (employment_sort_key(e, query.sort.field, *id), *id, tables.join_employment(e)))
            .collect();
        Ok(paginate(rows, query))
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<EmploymentRecord, AppError> {
        let seq = id.as_seq()?;
        let tables = self.tables.read();
        tables
            .employment
            .get(&seq)
            .filter(|e| !e.is_trashed())
            .map(|e| tables.join_employment(e))
            .ok_or_else(|| AppError::NotFound("Employment record not found".into()))
    }

    async fn list_by_alumni(&self, alumni_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        let tables = self.tables.read();
        Ok(newest_first(
            tables
                .employment
                .iter()
                .filter(|(_, e)| !e.is_trashed() && &e.alumni_id == alumni_id)
                .map(|(id, e)| (*id, tables.join_employment(e))),
        ))
    }

    async fn list_by_user(&self, user_id: &RecordId) -> Result<Vec<EmploymentRecord>, AppError> {
        let tables = self.tables.read();
        let Some(alumni) = tables.alumni_owned_by(user_id) else {
            return Ok(Vec::new());
        };
        let alumni_id = alumni.id.clone();
        Ok(newest_first(
            tables
                .employment
                .iter()
                .filter(|(_, e)| !e.is_trashed() && e.alumni_id == alumni_id)
                .map(|(id, e)| (*id, tables.join_employment(e))),
        ))
    }

    async fn create(&self, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        let mut tables = self.tables.write();
        let id = Tables::next(&mut tables.next_employment);
        let now = Utc::now();
        let created = EmploymentRecord {
            id: RecordId::Seq(id),
            alumni_id: record.alumni_id.clone(),
            nama_perusahaan: record.nama_perusahaan.clone(),
            posisi_jabatan: record.posisi_jabatan.clone(),
            bidang_industri: record.bidang_industri.clone(),
            lokasi_kerja: record.lokasi_kerja.clone(),
            gaji_range: record.gaji_range.clone(),
            tanggal_mulai_kerja: record.tanggal_mulai_kerja,
            tanggal_selesai_kerja: record.tanggal_selesai_kerja,
            status_pekerjaan: record.status_pekerjaan.clone(),
            deskripsi_pekerjaan: record.deskripsi_pekerjaan.clone(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
            alumni: None,
        };
        tables.employment.insert(id, created.clone());
        Ok(tables.join_employment(&created))
    }

    async fn update(&self, id: &RecordId, record: &EmploymentFields) -> Result<EmploymentRecord, AppError> {
        let seq = id.as_seq()?;
        let mut tables = self.tables.write();
        let existing = tables
            .employment
            .get_mut(&seq)
            .filter(|e| !e.is_trashed())
            .ok_or_else(|| AppError::NotFound("Employment record not found".into()))?;

        existing.alumni_id = record.alumni_id.clone();
        existing.nama_perusahaan = record.nama_perusahaan.clone();
        existing.posisi_jabatan = record.posisi_jabatan.clone();
        existing.bidang_industri = record.bidang_industri.clone();
        existing.lokasi_kerja = record.lokasi_kerja.clone();
        existing.gaji_range = record.gaji_range.clone();
        existing.tanggal_mulai_kerja = record.tanggal_mulai_kerja;
        existing.tanggal_selesai_kerja = record.tanggal_selesai_kerja;
        existing.status_pekerjaan = record.status_pekerjaan.clone();
        existing.deskripsi_pekerjaan = record.deskripsi_pekerjaan.clone();
        existing.updated_at = Utc::now();
        let updated = existing.clone();
        Ok(tables.join_employment(&updated))
    }

    async fn soft_delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        let mut tables = self.tables.write();
        let record = tables
            .employment
            .get_mut(&seq)
            .ok_or_else(|| AppError::NotFound("Employment record not found".into()))?;

        if record.is_trashed() {
            return Err(AppError::Conflict("Employment record is already deleted".into()));
        }
        let now = Utc::now();
        record.deleted_at = Some(now);
        record.updated_at = now;
        Ok(())
    }

    async fn soft_delete_by_owner(&self, alumni_id: &RecordId) -> Result<BatchReport, AppError> {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let mut report = BatchReport::default();

        for record in tables
            .employment
            .values_mut()
            .filter(|e| !e.is_trashed() && &e.alumni_id == alumni_id)
        {
            record.deleted_at = Some(now);
            record.updated_at = now;
            report.affected.push(record.id.clone());
        }
        Ok(report)
    }

    async fn restore(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        let mut tables = self.tables.write();
        let record = tables
            .employment
            .get_mut(&seq)
            .filter(|e| e.is_trashed())
            .ok_or_else(|| AppError::NotFound("Deleted employment record not found".into()))?;

        record.deleted_at = None;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn hard_delete(&self, id: &RecordId) -> Result<(), AppError> {
        let seq = id.as_seq()?;
        let mut tables = self.tables.write();
        let trashed = tables
            .employment
            .get(&seq)
            .map(EmploymentRecord::is_trashed)
            .ok_or_else(|| AppError::NotFound("Employment record not found".into()))?;

        if !trashed {
            return Err(AppError::PreconditionFailed(
                "Employment record must be soft-deleted first".into(),
            ));
        }
        tables.employment.remove(&seq);
        Ok(())
    }

    async fn list_deleted(&self, owner: Option<RecordId>) -> Result<Vec<EmploymentRecord>, AppError> {
        let tables = self.tables.read();
        let owned_alumni = match &owner {
            Some(user_id) => match tables.alumni_owned_by(user_id) {
                Some(alumni) => Some(alumni.id.clone()),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut rows: Vec<EmploymentRecord> = tables
            .employment
            .values()
            .filter(|e| e.is_trashed())
            .filter(|e| owned_alumni.as_ref().is_none_or(|aid| &e.alumni_id == aid))
            .map(|e| tables.join_employment(e))
            .collect();
        rows.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(rows)
    }

    async fn count_active(&self) -> Result<i64, AppError> {
        Ok(self.tables.read().employment.values().filter(|e| !e.is_trashed()).count() as i64)
    }

    async fn count_alumni_by_company(&self, company: &str) -> Result<i64, AppError> {
        let tables = self.tables.read();
        let mut alumni: Vec<String> = tables
            .employment
            .values()
            .filter(|e| !e.is_trashed() && e.nama_perusahaan == company)
            .map(|e| e.alumni_id.to_string())
            .collect();
        alumni.sort();
        alumni.dedup();
        Ok(alumni.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{pagination::PaginationRequest, employment::EMPLOYMENT_SORT_FIELDS};

    fn job(alumni_id: i64, company: &str) -> EmploymentFields {
        EmploymentFields {
            alumni_id: RecordId::Seq(alumni_id),
            nama_perusahaan: company.into(),
            posisi_jabatan: "Engineer".into(),
            bidang_industri: "Technology".into(),
            lokasi_kerja: "Bandung".into(),
            gaji_range: None,
            tanggal_mulai_kerja: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            tanggal_selesai_kerja: None,
            status_pekerjaan: "aktif".into(),
            deskripsi_pekerjaan: None,
        }
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let repo = MemoryStore::new().employment();
        let record = repo.create(&job(1, "Acme Corp")).await.unwrap();

        assert!(matches!(repo.hard_delete(&record.id).await, Err(AppError::PreconditionFailed(_))));
        assert!(matches!(repo.restore(&record.id).await, Err(AppError::NotFound(_))));

        repo.soft_delete(&record.id).await.unwrap();
        assert!(matches!(repo.soft_delete(&record.id).await, Err(AppError::Conflict(_))));
        assert!(matches!(repo.get_by_id(&record.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(repo.update(&record.id, &job(1, "X")).await, Err(AppError::NotFound(_))));

        repo.restore(&record.id).await.unwrap();
        assert!(matches!(repo.restore(&record.id).await, Err(AppError::NotFound(_))));

        repo.soft_delete(&record.id).await.unwrap();
        repo.hard_delete(&record.id).await.unwrap();
        assert!(matches!(repo.hard_delete(&record.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn bulk_soft_delete_skips_trashed_records() {
        let repo = MemoryStore::new().employment();
        let a = repo.create(&job(1, "Acme")).await.unwrap();
        let b = repo.create(&job(1, "Globex")).await.unwrap();
        repo.create(&job(2, "Initech")).await.unwrap();
        repo.soft_delete(&a.id).await.unwrap();

        let report = repo.soft_delete_by_owner(&RecordId::Seq(1)).await.unwrap();
        assert_eq!(report.affected, vec![b.id.clone()]);
        assert!(report.is_complete());

        let again = repo.soft_delete_by_owner(&RecordId::Seq(1)).await.unwrap();
        assert!(again.affected.is_empty());
        assert_eq!(repo.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let repo = MemoryStore::new().employment();
        for company in ["Acme Corp", "ACME Labs", "acme", "Globex", "Initech"] {
            repo.create(&job(1, company)).await.unwrap();
        }
        let query = PaginationRequest { search: Some("AcMe".into()), ..Default::default() }
            .normalize(EMPLOYMENT_SORT_FIELDS);

        let page = repo.list_paged(&query, Visibility::Active).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 3);
    }

    #[tokio::test]
    async fn sort_descending_by_company() {
        let repo = MemoryStore::new().employment();
        for company in ["Beta", "Alpha", "Gamma"] {
            repo.create(&job(1, company)).await.unwrap();
        }
        let query = PaginationRequest {
            sort_by: Some("nama_perusahaan".into()),
            sort_order: Some("desc".into()),
            ..Default::default()
        }
        .normalize(EMPLOYMENT_SORT_FIELDS);

        let names: Vec<String> = repo
            .list_paged(&query, Visibility::Active)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|e| e.nama_perusahaan)
            .collect();
        assert_eq!(names, ["Gamma", "Beta", "Alpha"]);
    }

    #[tokio::test]
    async fn dangling_alumni_reference_joins_to_none() {
        let store = MemoryStore::new();
        let record = store.employment().create(&job(99, "Acme")).await.unwrap();
        assert!(record.alumni.is_none());
    }

    #[tokio::test]
    async fn duplicate_user_email_conflicts() {
        let users = MemoryStore::new().users();
        let fields = UserFields {
            username: "rina".into(),
            email: "rina@example.com".into(),
            password_hash: "hash".into(),
            role: crate::entities::user::Role::User,
            is_active: true,
        };
        users.create(&fields).await.unwrap();
        let again = UserFields { username: "rina2".into(), ..fields };
        assert!(matches!(users.create(&again).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn company_count_is_distinct_per_alumni() {
        let repo = MemoryStore::new().employment();
        repo.create(&job(1, "Acme")).await.unwrap();
        repo.create(&job(1, "Acme")).await.unwrap();
        repo.create(&job(2, "Acme")).await.unwrap();
        let trashed = repo.create(&job(3, "Acme")).await.unwrap();
        repo.soft_delete(&trashed.id).await.unwrap();

        assert_eq!(repo.count_alumni_by_company("Acme").await.unwrap(), 2);
    }
}
