//! Student schema definition and readiness checks.
//!
//! # Responsibility
//! - Create the primary (`students`) and dependent (`exams`) relations.
//! - Answer table/column existence questions for repositories and importers.
//!
//! # Invariants
//! - `students.id` is AUTOINCREMENT, so ids are never reused after deletion.
//! - `exams.student_id` is unique: at most one exam blob per student.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

/// Primary relation holding `(id, fio, group_name)`.
pub const STUDENTS_TABLE: &str = "students";
/// Dependent relation holding `(student_id, exams_data)`.
pub const EXAMS_TABLE: &str = "exams";

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Creates both relations when they are missing. Safe to call repeatedly.
pub fn ensure_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Fails with [`DbError::MissingRequiredTable`] unless both relations exist.
pub fn ensure_student_tables(conn: &Connection) -> DbResult<()> {
    for table in [STUDENTS_TABLE, EXAMS_TABLE] {
        if !table_exists(conn, table)? {
            return Err(DbError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Returns whether a table with the given name exists.
pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
