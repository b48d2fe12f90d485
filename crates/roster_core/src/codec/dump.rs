//! Replayable SQL dump export and staged merge import.
//!
//! # Responsibility
//! - Write the schema and every row as a script that rebuilds the database.
//! - Replay a script into an isolated in-memory database, then merge its rows
//!   into the live store keyed by id, skipping ids that already exist.
//!
//! # Invariants
//! - The live store is never the target of the replayed script.
//! - The merge is one transaction: it commits fully or not at all.
//! - Foreign key enforcement is restored on every exit path.
//! - A merge never leaves a merged id with only one of its two rows.

use crate::codec::{CodecError, CodecResult};
use crate::db::schema::{table_exists, EXAMS_TABLE, STUDENTS_TABLE};
use crate::db::DbResult;
use crate::repo::student_repo::decode_exams;
use log::{error, info};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Transaction};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

const SEQUENCE_TABLE: &str = "sqlite_sequence";

/// Row counts of one dump merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub students_inserted: usize,
    /// Staged students whose id already existed in the live store.
    pub students_skipped: usize,
    pub exams_inserted: usize,
    /// Staged exam rows whose `student_id` already had exams in the live store.
    pub exams_skipped: usize,
}

/// Writes a full dump of `conn` to `path`. Returns the statement count.
pub fn export_dump(conn: &Connection, path: impl AsRef<Path>) -> CodecResult<usize> {
    let started_at = Instant::now();
    let file = File::create(path.as_ref())?;
    let mut sink = BufWriter::new(file);
    let statements = write_dump(conn, &mut sink)?;
    sink.flush()?;

    info!(
        "event=dump_export module=codec status=ok statements={statements} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(statements)
}

/// Writes the dump script to `sink`, one statement per line.
///
/// Layout: `BEGIN TRANSACTION;`, per table its `CREATE` statement followed by
/// its rows, indexes/triggers/views, the AUTOINCREMENT counters, `COMMIT;`.
pub fn write_dump<W: Write>(conn: &Connection, sink: &mut W) -> CodecResult<usize> {
    let mut statements = 0;
    let mut emit = |sink: &mut W, statement: &str| -> CodecResult<()> {
        writeln!(sink, "{statement}")?;
        statements += 1;
        Ok(())
    };

    emit(sink, "BEGIN TRANSACTION;")?;

    let mut has_sequence = false;
    for (name, sql) in schema_objects(conn, "table")? {
        if name == SEQUENCE_TABLE {
            has_sequence = true;
            continue;
        }
        if name.starts_with("sqlite_") {
            continue;
        }
        emit(sink, &format!("{sql};"))?;
        for insert in table_inserts(conn, &name)? {
            emit(sink, &insert)?;
        }
    }

    for kind in ["index", "trigger", "view"] {
        for (_, sql) in schema_objects(conn, kind)? {
            emit(sink, &format!("{sql};"))?;
        }
    }

    if has_sequence {
        emit(sink, &format!("DELETE FROM {};", quote_identifier(SEQUENCE_TABLE)))?;
        for insert in table_inserts(conn, SEQUENCE_TABLE)? {
            emit(sink, &insert)?;
        }
    }

    emit(sink, "COMMIT;")?;
    Ok(statements)
}

/// Reads the script at `path` and merges it into `conn`.
pub fn import_dump(conn: &mut Connection, path: impl AsRef<Path>) -> CodecResult<MergeSummary> {
    let script = std::fs::read_to_string(path.as_ref())?;
    import_dump_script(conn, &script)
}

/// Replays `script` into a staging database and merges it into `conn`.
pub fn import_dump_script(conn: &mut Connection, script: &str) -> CodecResult<MergeSummary> {
    let started_at = Instant::now();
    let result = stage_script(script).and_then(|staged| merge_staged(conn, &staged));

    match &result {
        Ok(summary) => info!(
            "event=dump_import module=codec status=ok students_inserted={} students_skipped={} exams_inserted={} exams_skipped={} duration_ms={}",
            summary.students_inserted,
            summary.students_skipped,
            summary.exams_inserted,
            summary.exams_skipped,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=dump_import module=codec status=error duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
    result
}

struct StagedStudent {
    id: i64,
    fio: String,
    group: String,
}

struct StagedExams {
    student_id: i64,
    exams_data: String,
}

struct StagedRows {
    students: Vec<StagedStudent>,
    exams: Vec<StagedExams>,
}

fn stage_script(script: &str) -> CodecResult<StagedRows> {
    let staging = Connection::open_in_memory()?;
    staging.execute_batch(script)?;

    for table in [STUDENTS_TABLE, EXAMS_TABLE] {
        if !table_exists(&staging, table)? {
            return Err(CodecError::MissingStagedTable(table));
        }
    }

    let mut students = Vec::new();
    let mut stmt = staging.prepare("SELECT id, fio, group_name FROM students ORDER BY id;")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        students.push(StagedStudent {
            id: row.get(0)?,
            fio: row.get(1)?,
            group: row.get(2)?,
        });
    }

    let mut exams = Vec::new();
    let mut stmt = staging.prepare("SELECT student_id, exams_data FROM exams;")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let staged = StagedExams {
            student_id: row.get(0)?,
            exams_data: row.get(1)?,
        };
        decode_exams(&staged.exams_data)?;
        exams.push(staged);
    }

    Ok(StagedRows { students, exams })
}

fn merge_staged(conn: &Connection, staged: &StagedRows) -> CodecResult<MergeSummary> {
    // Declared before the transaction so it drops after rollback/commit;
    // `PRAGMA foreign_keys` is a no-op inside an open transaction.
    let _foreign_keys = ForeignKeysSuspended::suspend(conn)?;
    let tx = conn.unchecked_transaction()?;
    let summary = merge_rows(&tx, staged)?;
    tx.commit()?;
    Ok(summary)
}

fn merge_rows(tx: &Transaction<'_>, staged: &StagedRows) -> CodecResult<MergeSummary> {
    let mut summary = MergeSummary::default();
    let mut merged_ids = BTreeSet::new();

    for student in &staged.students {
        if row_exists(tx, "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1);", student.id)? {
            summary.students_skipped += 1;
            continue;
        }
        tx.execute(
            "INSERT INTO students (id, fio, group_name) VALUES (?1, ?2, ?3);",
            params![student.id, student.fio, student.group],
        )?;
        merged_ids.insert(student.id);
        summary.students_inserted += 1;
    }

    for exams in &staged.exams {
        if row_exists(
            tx,
            "SELECT EXISTS(SELECT 1 FROM exams WHERE student_id = ?1);",
            exams.student_id,
        )? {
            summary.exams_skipped += 1;
            continue;
        }
        tx.execute(
            "INSERT INTO exams (student_id, exams_data) VALUES (?1, ?2);",
            params![exams.student_id, exams.exams_data],
        )?;
        merged_ids.insert(exams.student_id);
        summary.exams_inserted += 1;
    }

    ensure_paired(tx, &merged_ids)?;
    Ok(summary)
}

/// Every id touched by the merge must end with both a `students` and an `exams` row.
fn ensure_paired(tx: &Transaction<'_>, ids: &BTreeSet<i64>) -> CodecResult<()> {
    let mut stmt = tx.prepare(
        "SELECT
            EXISTS(SELECT 1 FROM students WHERE id = ?1),
            EXISTS(SELECT 1 FROM exams WHERE student_id = ?1);",
    )?;
    for &id in ids {
        let (has_student, has_exams): (i64, i64) =
            stmt.query_row([id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        if has_student == 0 {
            return Err(CodecError::ExamsWithoutStudent(id));
        }
        if has_exams == 0 {
            return Err(CodecError::StudentWithoutExams(id));
        }
    }
    Ok(())
}

fn row_exists(tx: &Transaction<'_>, sql: &str, id: i64) -> CodecResult<bool> {
    let exists: i64 = tx.query_row(sql, [id], |row| row.get(0))?;
    Ok(exists == 1)
}

/// Turns foreign key enforcement off until dropped.
struct ForeignKeysSuspended<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ForeignKeysSuspended<'conn> {
    fn suspend(conn: &'conn Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        Ok(Self { conn })
    }
}

impl Drop for ForeignKeysSuspended<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.conn.execute_batch("PRAGMA foreign_keys = ON;") {
            error!(
                "event=foreign_keys_restore module=codec status=error error_code=pragma_failed error={err}"
            );
        }
    }
}

fn schema_objects(conn: &Connection, kind: &str) -> DbResult<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT name, sql
         FROM sqlite_master
         WHERE type = ?1 AND sql NOT NULL
         ORDER BY name;",
    )?;
    let mut rows = stmt.query([kind])?;
    let mut objects = Vec::new();
    while let Some(row) = rows.next()? {
        objects.push((row.get(0)?, row.get(1)?));
    }
    Ok(objects)
}

fn table_inserts(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let quoted = quote_identifier(table);
    let mut stmt = conn.prepare(&format!("SELECT * FROM {quoted};"))?;
    let column_count = stmt.column_count();
    let mut rows = stmt.query([])?;
    let mut inserts = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for index in 0..column_count {
            values.push(sql_literal(row.get_ref(index)?));
        }
        inserts.push(format!("INSERT INTO {quoted} VALUES({});", values.join(",")));
    }
    Ok(inserts)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_literal(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) if value.is_infinite() => {
            let literal = if value > 0.0 { "9.0e999" } else { "-9.0e999" };
            literal.to_string()
        }
        ValueRef::Real(value) => format!("{value:?}"),
        ValueRef::Text(bytes) => {
            format!("'{}'", String::from_utf8_lossy(bytes).replace('\'', "''"))
        }
        ValueRef::Blob(bytes) => {
            let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}
