use roster_core::codec::dump::{import_dump_script, write_dump};
use roster_core::db::open_db_in_memory;
use roster_core::{
    export_dump, import_dump, CodecError, MergeSummary, NewStudent, SqliteStudentRepository,
    Student, StudentRepository,
};
use rusqlite::Connection;

fn seeded_connection() -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteStudentRepository::try_new(&mut conn).unwrap();
        repo.add(
            &NewStudent::new("Ivan Petrov", "123456")
                .with_exam("Math", 8)
                .with_exam("Physics", 6),
        )
        .unwrap();
        repo.add(&NewStudent::new("Anna O'Neil", "654321").with_exam("History", 9))
            .unwrap();
        repo.add(&NewStudent::new("Oleg Sidorov", "111111").with_exam("Chemistry", 4))
            .unwrap();
    }
    conn
}

fn all_students(conn: &mut Connection) -> Vec<Student> {
    SqliteStudentRepository::try_new(conn)
        .unwrap()
        .get_all()
        .unwrap()
}

fn foreign_keys(conn: &Connection) -> i64 {
    conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn dump_script_replays_schema_rows_and_sequence() {
    let conn = seeded_connection();
    let mut out = Vec::new();
    let statements = write_dump(&conn, &mut out).unwrap();
    let script = String::from_utf8(out).unwrap();

    // BEGIN, two CREATEs, six row INSERTs, sequence DELETE + INSERT, COMMIT.
    assert_eq!(statements, 12);
    assert_eq!(script.lines().next(), Some("BEGIN TRANSACTION;"));
    assert_eq!(script.lines().last(), Some("COMMIT;"));
    assert!(script.contains("CREATE TABLE students"));
    assert!(script.contains("CREATE TABLE exams"));
    assert!(script.contains(r#"INSERT INTO "students" VALUES(2,'Anna O''Neil','654321');"#));
    assert!(script.contains(r#"INSERT INTO "exams" VALUES(1,'{"Math":8,"Physics":6}');"#));
    assert!(script.contains(r#"INSERT INTO "sqlite_sequence" VALUES('students',3);"#));

    let replayed = Connection::open_in_memory().unwrap();
    replayed.execute_batch(&script).unwrap();
    let count: i64 = replayed
        .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 3);
}

#[test]
fn import_into_empty_store_reproduces_source_with_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.sql");
    let mut source = seeded_connection();
    export_dump(&source, &path).unwrap();

    let mut target = open_db_in_memory().unwrap();
    let summary = import_dump(&mut target, &path).unwrap();

    assert_eq!(
        summary,
        MergeSummary {
            students_inserted: 3,
            students_skipped: 0,
            exams_inserted: 3,
            exams_skipped: 0,
        }
    );
    assert_eq!(all_students(&mut target), all_students(&mut source));
    assert_eq!(foreign_keys(&target), 1);
}

#[test]
fn importing_same_dump_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.sql");
    export_dump(&seeded_connection(), &path).unwrap();

    let mut target = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteStudentRepository::try_new(&mut target).unwrap();
        repo.add(&NewStudent::new("Local Student", "222222").with_exam("Art", 7))
            .unwrap();
    }

    let first = import_dump(&mut target, &path).unwrap();
    assert_eq!(first.students_inserted, 2);
    let after_first = all_students(&mut target);

    let second = import_dump(&mut target, &path).unwrap();
    assert_eq!(second.students_inserted, 0);
    assert_eq!(second.exams_inserted, 0);
    assert_eq!(all_students(&mut target), after_first);
}

#[test]
fn conflicting_ids_keep_live_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.sql");
    export_dump(&seeded_connection(), &path).unwrap();

    let mut target = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteStudentRepository::try_new(&mut target).unwrap();
        repo.add(&NewStudent::new("Local Student", "222222").with_exam("Art", 7))
            .unwrap();
    }

    let summary = import_dump(&mut target, &path).unwrap();
    assert_eq!(summary.students_skipped, 1);
    assert_eq!(summary.exams_skipped, 1);
    assert_eq!(summary.students_inserted, 2);

    let students = all_students(&mut target);
    assert_eq!(students.len(), 3);
    assert_eq!(students[0].id, 1);
    assert_eq!(students[0].fio, "Local Student");
}

#[test]
fn failed_merge_rolls_back_and_restores_foreign_keys() {
    let mut target = open_db_in_memory().unwrap();
    target
        .execute_batch(
            "CREATE TRIGGER reject_chemistry BEFORE INSERT ON exams
             WHEN NEW.exams_data LIKE '%Chemistry%'
             BEGIN
                SELECT RAISE(ABORT, 'rejected');
             END;",
        )
        .unwrap();

    let mut out = Vec::new();
    write_dump(&seeded_connection(), &mut out).unwrap();
    let script = String::from_utf8(out).unwrap();

    let err = import_dump_script(&mut target, &script).unwrap_err();
    assert!(matches!(err, CodecError::Db(_)));

    let students: i64 = target
        .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(students, 0);
    assert_eq!(foreign_keys(&target), 1);
}

#[test]
fn corrupt_exam_blob_in_dump_is_rejected_before_merge() {
    let script = "CREATE TABLE students (id INTEGER PRIMARY KEY, fio TEXT NOT NULL, group_name TEXT NOT NULL);
                  CREATE TABLE exams (student_id INTEGER, exams_data TEXT NOT NULL);
                  INSERT INTO students VALUES (10, 'Ivan Petrov', '123456');
                  INSERT INTO exams VALUES (10, 'not json');";

    let mut target = open_db_in_memory().unwrap();
    let err = import_dump_script(&mut target, script).unwrap_err();

    assert!(matches!(err, CodecError::Repo(_)));
    assert!(all_students(&mut target).is_empty());
    assert_eq!(foreign_keys(&target), 1);
}

#[test]
fn dump_without_student_tables_is_rejected() {
    let mut target = open_db_in_memory().unwrap();
    let err = import_dump_script(&mut target, "CREATE TABLE notes (id INTEGER);").unwrap_err();
    assert!(matches!(err, CodecError::MissingStagedTable("students")));
}

#[test]
fn invalid_script_never_touches_live_store() {
    let mut target = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteStudentRepository::try_new(&mut target).unwrap();
        repo.add(&NewStudent::new("Local Student", "222222").with_exam("Art", 7))
            .unwrap();
    }

    let script = "DELETE FROM students; THIS IS NOT SQL;";
    assert!(import_dump_script(&mut target, script).is_err());
    assert_eq!(all_students(&mut target).len(), 1);
}

const BARE_TABLES: &str = "CREATE TABLE students (id INTEGER PRIMARY KEY, fio TEXT NOT NULL, group_name TEXT NOT NULL);
                           CREATE TABLE exams (student_id INTEGER PRIMARY KEY, exams_data TEXT NOT NULL);";

#[test]
fn exams_row_without_student_is_rejected_and_add_keeps_working() {
    let script = format!("{BARE_TABLES}\nINSERT INTO exams VALUES(1,'{{\"Math\":5}}');");

    let mut target = open_db_in_memory().unwrap();
    let err = import_dump_script(&mut target, &script).unwrap_err();
    assert!(matches!(err, CodecError::ExamsWithoutStudent(1)));
    assert_eq!(err.code(), "unpaired_rows");
    assert_eq!(foreign_keys(&target), 1);

    let mut repo = SqliteStudentRepository::try_new(&mut target).unwrap();
    let first = repo
        .add(&NewStudent::new("Ivan Petrov", "123456").with_exam("Math", 8))
        .unwrap();
    let second = repo
        .add(&NewStudent::new("Anna Smirnova", "654321").with_exam("Math", 9))
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(repo.get_all().unwrap().len(), 2);
}

#[test]
fn student_row_without_exams_is_rejected() {
    let script = format!("{BARE_TABLES}\nINSERT INTO students VALUES(4,'Ivan Petrov','123456');");

    let mut target = open_db_in_memory().unwrap();
    let err = import_dump_script(&mut target, &script).unwrap_err();
    assert!(matches!(err, CodecError::StudentWithoutExams(4)));

    let count: i64 = target
        .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn exams_for_existing_live_student_complete_the_pair() {
    let mut target = open_db_in_memory().unwrap();
    target
        .execute(
            "INSERT INTO students (id, fio, group_name) VALUES (7, 'Ghost Student', '123456');",
            [],
        )
        .unwrap();

    let script = format!("{BARE_TABLES}\nINSERT INTO exams VALUES(7,'{{\"Math\":6}}');");
    let summary = import_dump_script(&mut target, &script).unwrap();
    assert_eq!(summary.exams_inserted, 1);

    let students = all_students(&mut target);
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].id, 7);
    assert_eq!(students[0].grade_for("Math"), Some(6));
}
