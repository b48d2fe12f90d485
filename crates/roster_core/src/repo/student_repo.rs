//! Student record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide add/read/page/count/delete/clear APIs over the two relations.
//! - Encode the exam map as a JSON object in `exams.exams_data`.
//!
//! # Invariants
//! - Multi-statement writes run in a single transaction.
//! - Reads inner-join `students` with `exams`; unpaired rows are invisible.
//! - Read paths reject corrupt exam blobs instead of masking them.

use crate::db::schema::ensure_student_tables;
use crate::db::DbError;
use crate::model::student::{Exams, NewStudent, Student, StudentId};
use log::{debug, info};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENT_SELECT_SQL: &str = "SELECT
    s.id AS id,
    s.fio AS fio,
    s.group_name AS group_name,
    e.exams_data AS exams_data
FROM students s
INNER JOIN exams e ON e.student_id = s.id";

pub type RepoResult<T> = Result<T, RepoError>;

/// Record store error for persistence and decoding failures.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Persisted row content cannot be decoded into a `Student`.
    InvalidData(String),
    /// Exam map cannot be encoded for persistence.
    Encode(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
            Self::Encode(message) => write!(f, "failed to encode exams: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::Encode(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the student record store.
pub trait StudentRepository {
    /// Persists one student (primary + dependent row) and returns its new id.
    fn add(&mut self, student: &NewStudent) -> RepoResult<StudentId>;
    /// Persists all students or none of them.
    fn add_batch(&mut self, students: &[NewStudent]) -> RepoResult<Vec<StudentId>>;
    /// Returns every joined student ordered by id.
    fn get_all(&self) -> RepoResult<Vec<Student>>;
    /// Returns at most `limit` joined students after skipping `offset`.
    fn get_page(&self, limit: u32, offset: u32) -> RepoResult<Vec<Student>>;
    /// Counts rows of the primary relation.
    fn get_total_count(&self) -> RepoResult<u64>;
    /// Deletes one student. Returns `false` when the id was absent.
    fn delete(&mut self, id: StudentId) -> RepoResult<bool>;
    /// Removes every row of both relations. Returns removed student count.
    fn clear(&mut self) -> RepoResult<u64>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Constructs a repository from a connection that already has the schema.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_student_tables(conn)?;
        Ok(Self { conn })
    }

    /// Read-only access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &*self.conn
    }

    /// Mutable access to the underlying connection, for dump import.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut *self.conn
    }

    fn query_students(&self, sql: &str, bind: &[i64]) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(bind.iter()))?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn add(&mut self, student: &NewStudent) -> RepoResult<StudentId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = insert_student_in_tx(&tx, student)?;
        tx.commit()?;

        debug!("event=student_add module=repo status=ok id={id}");
        Ok(id)
    }

    fn add_batch(&mut self, students: &[NewStudent]) -> RepoResult<Vec<StudentId>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ids = Vec::with_capacity(students.len());
        for student in students {
            ids.push(insert_student_in_tx(&tx, student)?);
        }
        tx.commit()?;

        info!(
            "event=student_add_batch module=repo status=ok count={}",
            ids.len()
        );
        Ok(ids)
    }

    fn get_all(&self) -> RepoResult<Vec<Student>> {
        self.query_students(&format!("{STUDENT_SELECT_SQL} ORDER BY s.id ASC;"), &[])
    }

    fn get_page(&self, limit: u32, offset: u32) -> RepoResult<Vec<Student>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.query_students(
            &format!("{STUDENT_SELECT_SQL} ORDER BY s.id ASC LIMIT ?1 OFFSET ?2;"),
            &[i64::from(limit), i64::from(offset)],
        )
    }

    fn get_total_count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative student count `{count}`")))
    }

    fn delete(&mut self, id: StudentId) -> RepoResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM exams WHERE student_id = ?1;", [id])?;
        let removed = tx.execute("DELETE FROM students WHERE id = ?1;", [id])?;
        tx.commit()?;

        debug!(
            "event=student_delete module=repo status=ok id={id} removed={}",
            removed > 0
        );
        Ok(removed > 0)
    }

    fn clear(&mut self) -> RepoResult<u64> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM exams;", [])?;
        let removed = tx.execute("DELETE FROM students;", [])?;
        tx.commit()?;

        info!("event=store_clear module=repo status=ok removed={removed}");
        Ok(removed as u64)
    }
}

/// Encodes an exam map into the `exams_data` column representation.
pub fn encode_exams(exams: &Exams) -> RepoResult<String> {
    serde_json::to_string(exams).map_err(|err| RepoError::Encode(err.to_string()))
}

/// Decodes an `exams_data` column value back into an exam map.
pub fn decode_exams(raw: &str) -> RepoResult<Exams> {
    serde_json::from_str(raw)
        .map_err(|err| RepoError::InvalidData(format!("invalid exams_data `{raw}`: {err}")))
}

fn insert_student_in_tx(tx: &Transaction<'_>, student: &NewStudent) -> RepoResult<StudentId> {
    let exams_data = encode_exams(&student.exams)?;
    tx.execute(
        "INSERT INTO students (fio, group_name) VALUES (?1, ?2);",
        params![student.fio.as_str(), student.group.as_str()],
    )?;
    let id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO exams (student_id, exams_data) VALUES (?1, ?2);",
        params![id, exams_data],
    )?;
    Ok(id)
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let raw_exams: String = row.get("exams_data")?;
    Ok(Student {
        id: row.get("id")?,
        fio: row.get("fio")?,
        group: row.get("group_name")?,
        exams: decode_exams(&raw_exams)?,
    })
}
