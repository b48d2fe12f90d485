//! Student use-case service.
//!
//! # Responsibility
//! - Gate the create path behind validation.
//! - Run the three search modes over the record store.
//! - Delete search result sets and clear the store.
//!
//! # Invariants
//! - `create` never reaches the store when validation reports anything.
//! - Validation failures, storage failures and empty results stay distinct.

use crate::model::student::{NewStudent, RankedStudent, Student, StudentId};
use crate::model::validation::{validate_student, ValidationError, ValidationErrors};
use crate::repo::student_repo::{RepoError, StudentRepository};
use crate::search::student_search::{
    filter_by_average_grade, filter_by_exam_grade, filter_by_group, validate_average_query,
    validate_exam_query, validate_group_query, SearchOutcome, SearchQuery,
};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for student use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected; carries every violated rule.
    Validation(ValidationErrors),
    /// Record store failure.
    Storage(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "{errors}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// Per-id outcome counts of a bulk delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub deleted: usize,
    /// Ids that were absent or whose delete failed in storage.
    pub failed: usize,
}

/// Student service facade over repository implementations.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn into_repo(self) -> R {
        self.repo
    }

    /// Returns every violated create rule for `candidate`.
    pub fn validate(&self, candidate: &NewStudent) -> Vec<ValidationError> {
        validate_student(&candidate.normalized())
    }

    /// Validates and persists one student, returning its new id.
    ///
    /// Name, group and subjects are trimmed before validation and storage.
    pub fn create(&mut self, candidate: &NewStudent) -> ServiceResult<StudentId> {
        let candidate = candidate.normalized();
        if let Some(errors) = ValidationErrors::from_vec(validate_student(&candidate)) {
            info!(
                "event=student_create module=service status=rejected violations={}",
                errors.len()
            );
            return Err(errors.into());
        }

        let id = self.repo.add(&candidate)?;
        info!("event=student_create module=service status=ok id={id}");
        Ok(id)
    }

    /// Runs any search mode against the full store contents.
    pub fn search(&self, query: &SearchQuery) -> ServiceResult<SearchOutcome> {
        match query {
            SearchQuery::ByGroup { group } => {
                self.search_by_group(group).map(SearchOutcome::Students)
            }
            SearchQuery::ByAverageGrade { subject, min, max } => self
                .search_by_avg_grade(subject, *min, *max)
                .map(SearchOutcome::Ranked),
            SearchQuery::ByExamGrade { subject, min, max } => self
                .search_by_exam_grade(subject, *min, *max)
                .map(SearchOutcome::Students),
        }
    }

    /// Students whose group equals `group`.
    pub fn search_by_group(&self, group: &str) -> ServiceResult<Vec<Student>> {
        reject_invalid(validate_group_query(group))?;
        let matched = filter_by_group(self.repo.get_all()?, group);
        log_search("group", matched.len());
        Ok(matched)
    }

    /// Students having `subject` whose average of all grades is in `[min, max]`.
    pub fn search_by_avg_grade(
        &self,
        subject: &str,
        min: f64,
        max: f64,
    ) -> ServiceResult<Vec<RankedStudent>> {
        reject_invalid(validate_average_query(subject, min, max))?;
        let matched = filter_by_average_grade(self.repo.get_all()?, subject, min, max);
        log_search("avg_grade", matched.len());
        Ok(matched)
    }

    /// Students whose `subject` grade is in `[min, max]`.
    pub fn search_by_exam_grade(
        &self,
        subject: &str,
        min: f64,
        max: f64,
    ) -> ServiceResult<Vec<Student>> {
        reject_invalid(validate_exam_query(subject, min, max))?;
        let matched = filter_by_exam_grade(self.repo.get_all()?, subject, min, max);
        log_search("exam_grade", matched.len());
        Ok(matched)
    }

    /// Deletes each id independently and counts outcomes.
    ///
    /// One failing id does not stop the remaining deletes.
    pub fn delete_many(&mut self, ids: &[StudentId]) -> DeleteSummary {
        let mut summary = DeleteSummary::default();
        for &id in ids {
            match self.repo.delete(id) {
                Ok(true) => summary.deleted += 1,
                Ok(false) => summary.failed += 1,
                Err(err) => {
                    warn!(
                        "event=student_delete module=service status=error id={id} error={err}"
                    );
                    summary.failed += 1;
                }
            }
        }
        info!(
            "event=student_delete_many module=service status=ok deleted={} failed={}",
            summary.deleted, summary.failed
        );
        summary
    }

    /// Removes every student. Returns the removed count.
    pub fn clear(&mut self) -> ServiceResult<u64> {
        Ok(self.repo.clear()?)
    }
}

fn reject_invalid(errors: Vec<ValidationError>) -> ServiceResult<()> {
    match ValidationErrors::from_vec(errors) {
        Some(errors) => Err(errors.into()),
        None => Ok(()),
    }
}

fn log_search(mode: &str, matched: usize) {
    info!("event=student_search module=service status=ok mode={mode} matched={matched}");
}
