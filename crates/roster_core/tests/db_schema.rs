use roster_core::db::schema::{ensure_schema, EXAMS_TABLE, STUDENTS_TABLE};
use roster_core::db::{open_db, open_db_in_memory, DbError};
use roster_core::{NewStudent, RepoError, SqliteStudentRepository, StudentRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_both_relations() {
    let conn = open_db_in_memory().unwrap();

    assert_table_exists(&conn, STUDENTS_TABLE);
    assert_table_exists(&conn, EXAMS_TABLE);
    assert_eq!(foreign_keys(&conn), 1);
}

#[test]
fn reopening_file_database_keeps_rows_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.db");

    {
        let mut conn = open_db(&path).unwrap();
        let mut repo = SqliteStudentRepository::try_new(&mut conn).unwrap();
        repo.add(&NewStudent::new("Ivan Petrov", "123456").with_exam("Math", 8))
            .unwrap();
    }

    let mut conn = open_db(&path).unwrap();
    ensure_schema(&conn).unwrap();
    let repo = SqliteStudentRepository::try_new(&mut conn).unwrap();
    assert_eq!(repo.get_total_count().unwrap(), 1);
    assert_eq!(repo.get_all().unwrap()[0].fio, "Ivan Petrov");
}

#[test]
fn repository_rejects_connection_without_schema() {
    let mut conn = Connection::open_in_memory().unwrap();

    let err = SqliteStudentRepository::try_new(&mut conn)
        .err()
        .expect("bare connection must be rejected");
    assert!(matches!(
        err,
        RepoError::Db(DbError::MissingRequiredTable(table)) if table == STUDENTS_TABLE
    ));
}

fn foreign_keys(conn: &Connection) -> i64 {
    conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
