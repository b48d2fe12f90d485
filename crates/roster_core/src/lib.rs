//! Core domain logic for the student roster.
//! This crate owns persistence, validation, search, paging and import/export;
//! shells only render what it returns.

pub mod codec;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use codec::dump::{export_dump, import_dump, MergeSummary};
pub use codec::xml::{export_markup, import_markup};
pub use codec::{CodecError, CodecResult};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::student::{Exams, NewStudent, RankedStudent, Student, StudentId};
pub use model::validation::{validate_student, ValidationError, ValidationErrors};
pub use repo::student_repo::{RepoError, RepoResult, SqliteStudentRepository, StudentRepository};
pub use search::student_search::{SearchOutcome, SearchQuery};
pub use service::pagination::{PaginationError, Paginator, DEFAULT_PAGE_SIZE, PAGE_SIZE_PRESETS};
pub use service::student_service::{DeleteSummary, ServiceError, ServiceResult, StudentService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
