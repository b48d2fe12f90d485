//! Import/export codecs for the student store.
//!
//! # Responsibility
//! - `xml`: nested-element markup format, streaming parse, atomic import.
//! - `dump`: replayable SQL script of the whole database, staged id-keyed merge.
//!
//! # Invariants
//! - A failed import leaves the live store unchanged.
//! - The two codecs are independent of each other.

use crate::db::DbError;
use crate::repo::student_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod dump;
pub mod xml;

pub type CodecResult<T> = Result<T, CodecError>;

/// Codec error for file access, parsing and store interaction.
#[derive(Debug)]
pub enum CodecError {
    Io(std::io::Error),
    Xml(quick_xml::Error),
    /// Well-formed markup that does not follow the student schema.
    Malformed { position: u64, message: String },
    Repo(RepoError),
    Db(DbError),
    /// The replayed dump did not create one of the student relations.
    MissingStagedTable(&'static str),
    /// A merged `exams` row has no `students` row with that id.
    ExamsWithoutStudent(i64),
    /// A merged `students` row has no `exams` row.
    StudentWithoutExams(i64),
}

impl CodecError {
    /// Stable code for log lines. Carries no record content.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io_failed",
            Self::Xml(_) => "xml_syntax",
            Self::Malformed { .. } => "malformed_markup",
            Self::Repo(_) => "store_failed",
            Self::Db(_) => "db_failed",
            Self::MissingStagedTable(_) => "missing_staged_table",
            Self::ExamsWithoutStudent(_) | Self::StudentWithoutExams(_) => "unpaired_rows",
        }
    }

    /// Byte offset of a markup structure error.
    pub fn position(&self) -> Option<u64> {
        match self {
            Self::Malformed { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Xml(err) => write!(f, "xml error: {err}"),
            Self::Malformed { position, message } => {
                write!(f, "malformed student markup at byte {position}: {message}")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingStagedTable(table) => {
                write!(f, "dump does not define required table `{table}`")
            }
            Self::ExamsWithoutStudent(id) => {
                write!(f, "dump leaves exams for student {id} without a student row")
            }
            Self::StudentWithoutExams(id) => {
                write!(f, "dump leaves student {id} without an exams row")
            }
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Xml(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Malformed { .. }
            | Self::MissingStagedTable(_)
            | Self::ExamsWithoutStudent(_)
            | Self::StudentWithoutExams(_) => None,
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Xml(value)
    }
}

impl From<RepoError> for CodecError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for CodecError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CodecError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
