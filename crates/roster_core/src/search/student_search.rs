//! Predicate search over student records.
//!
//! # Responsibility
//! - Model the three search modes as one typed query.
//! - Keep predicates pure over slices so they are storage-independent.
//!
//! # Invariants
//! - A query with any validation error is never evaluated.
//! - Grade bounds are inclusive on both ends.
//! - Average-grade mode averages all of a student's grades, but only for
//!   students who have the filter subject.

use crate::model::student::{RankedStudent, Student};
use crate::model::validation::{
    is_all_digits, is_valid_bound, is_valid_subject, ValidationError, GROUP_LEN,
};
use std::cmp::Ordering;

/// One of the supported search modes with its raw inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Exact match on the group number.
    ByGroup { group: String },
    /// Students having `subject` whose overall average is in `[min, max]`.
    ByAverageGrade { subject: String, min: f64, max: f64 },
    /// Students whose `subject` grade alone is in `[min, max]`.
    ByExamGrade { subject: String, min: f64, max: f64 },
}

impl SearchQuery {
    /// Returns every violated input rule for this query.
    pub fn validate(&self) -> Vec<ValidationError> {
        match self {
            Self::ByGroup { group } => validate_group_query(group),
            Self::ByAverageGrade { subject, min, max } => {
                validate_average_query(subject, *min, *max)
            }
            Self::ByExamGrade { subject, min, max } => validate_exam_query(subject, *min, *max),
        }
    }
}

/// Search result. Only the average-grade mode carries computed averages.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Students(Vec<Student>),
    Ranked(Vec<RankedStudent>),
}

impl SearchOutcome {
    pub fn len(&self) -> usize {
        match self {
            Self::Students(students) => students.len(),
            Self::Ranked(ranked) => ranked.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every matched student, in result order.
    pub fn ids(&self) -> Vec<i64> {
        match self {
            Self::Students(students) => students.iter().map(|s| s.id).collect(),
            Self::Ranked(ranked) => ranked.iter().map(|r| r.student.id).collect(),
        }
    }
}

/// Group must be present, exactly [`GROUP_LEN`] long and all digits.
///
/// Length and digit violations are reported separately.
pub fn validate_group_query(group: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if group.chars().count() != GROUP_LEN {
        errors.push(ValidationError::GroupInvalid { len: GROUP_LEN });
    }
    if !is_all_digits(group) {
        errors.push(ValidationError::GroupNotDigits);
    }
    errors
}

/// Subject rule, both bounds in range, and `max > min`.
pub fn validate_average_query(subject: &str, min: f64, max: f64) -> Vec<ValidationError> {
    let mut errors = validate_subject_and_bounds(subject, min, max);
    if max.partial_cmp(&min) != Some(Ordering::Greater) {
        errors.push(ValidationError::UpperNotAboveLower);
    }
    errors
}

/// Subject rule, both bounds in range, and `max >= min`.
///
/// Equal bounds are allowed so a single grade can be matched exactly.
pub fn validate_exam_query(subject: &str, min: f64, max: f64) -> Vec<ValidationError> {
    let mut errors = validate_subject_and_bounds(subject, min, max);
    if matches!(max.partial_cmp(&min), Some(Ordering::Less) | None) {
        errors.push(ValidationError::UpperBelowLower);
    }
    errors
}

fn validate_subject_and_bounds(subject: &str, min: f64, max: f64) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if !is_valid_subject(subject) {
        errors.push(ValidationError::SubjectInvalid);
    }
    if !is_valid_bound(min) {
        errors.push(ValidationError::LowerBoundOutOfRange);
    }
    if !is_valid_bound(max) {
        errors.push(ValidationError::UpperBoundOutOfRange);
    }
    errors
}

/// Students whose group equals `group` exactly.
pub fn filter_by_group(students: Vec<Student>, group: &str) -> Vec<Student> {
    students
        .into_iter()
        .filter(|student| student.group == group)
        .collect()
}

/// Students having `subject` whose rounded average of all grades is in range.
pub fn filter_by_average_grade(
    students: Vec<Student>,
    subject: &str,
    min: f64,
    max: f64,
) -> Vec<RankedStudent> {
    students
        .into_iter()
        .filter(|student| student.has_exam(subject))
        .filter_map(|student| {
            let avg_grade = student.average_grade()?;
            (min <= avg_grade && avg_grade <= max).then_some(RankedStudent { student, avg_grade })
        })
        .collect()
}

/// Students whose `subject` grade is in range.
pub fn filter_by_exam_grade(
    students: Vec<Student>,
    subject: &str,
    min: f64,
    max: f64,
) -> Vec<Student> {
    students
        .into_iter()
        .filter(|student| {
            student.grade_for(subject).is_some_and(|grade| {
                let grade = grade as f64;
                min <= grade && grade <= max
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        filter_by_average_grade, filter_by_exam_grade, filter_by_group, validate_average_query,
        validate_exam_query, validate_group_query, SearchOutcome, SearchQuery,
    };
    use crate::model::student::Student;
    use crate::model::validation::{ValidationError, GROUP_LEN};

    fn student(id: i64, group: &str, exams: &[(&str, i64)]) -> Student {
        Student {
            id,
            fio: format!("Student Number {id}"),
            group: group.to_string(),
            exams: exams
                .iter()
                .map(|(subject, grade)| (subject.to_string(), *grade))
                .collect(),
        }
    }

    #[test]
    fn empty_group_reports_length_and_digit_errors() {
        assert_eq!(
            validate_group_query(""),
            vec![
                ValidationError::GroupInvalid { len: GROUP_LEN },
                ValidationError::GroupNotDigits,
            ]
        );
        assert_eq!(
            validate_group_query("12345x"),
            vec![ValidationError::GroupNotDigits]
        );
        assert!(validate_group_query("123456").is_empty());
    }

    #[test]
    fn average_query_collects_all_violations() {
        let errors = validate_average_query("Math 2", 0.0, 11.0);
        assert_eq!(
            errors,
            vec![
                ValidationError::SubjectInvalid,
                ValidationError::LowerBoundOutOfRange,
                ValidationError::UpperBoundOutOfRange,
            ]
        );
        assert_eq!(
            validate_average_query("Math", 7.0, 7.0),
            vec![ValidationError::UpperNotAboveLower]
        );
    }

    #[test]
    fn exam_query_allows_equal_bounds_and_rejects_inverted() {
        assert!(validate_exam_query("Math", 8.0, 8.0).is_empty());
        assert_eq!(
            validate_exam_query("Math", 9.0, 8.0),
            vec![ValidationError::UpperBelowLower]
        );
        assert!(validate_exam_query("Math", f64::NAN, 8.0)
            .contains(&ValidationError::UpperBelowLower));
    }

    #[test]
    fn average_search_requires_subject_and_averages_everything() {
        let students = vec![
            student(1, "123456", &[("Math", 8), ("Physics", 6)]),
            student(2, "123456", &[("Physics", 7)]),
            student(3, "123456", &[("Math", 10), ("Physics", 10)]),
        ];
        let ranked = filter_by_average_grade(students.clone(), "Math", 6.0, 8.0);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].student.id, 1);
        assert_eq!(ranked[0].avg_grade, 7.0);

        assert!(filter_by_average_grade(students, "Chemistry", 1.0, 10.0).is_empty());
    }

    #[test]
    fn exam_search_bounds_are_inclusive() {
        let students = vec![
            student(1, "123456", &[("Math", 8)]),
            student(2, "123456", &[("Math", 9)]),
            student(3, "123456", &[("Physics", 8)]),
        ];
        let matched = filter_by_exam_grade(students, "Math", 8.0, 8.0);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, 1);
    }

    #[test]
    fn query_validation_reports_mode_specific_rules() {
        let inverted = SearchQuery::ByExamGrade {
            subject: "Math".to_string(),
            min: 9.0,
            max: 8.0,
        };
        assert_eq!(inverted.validate(), vec![ValidationError::UpperBelowLower]);

        let students = vec![student(1, "123456", &[("Math", 8)])];
        let by_group = SearchQuery::ByGroup {
            group: "123456".to_string(),
        };
        assert!(by_group.validate().is_empty());
        let outcome = SearchOutcome::Students(filter_by_group(students, "123456"));
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.ids(), vec![1]);
    }
}
