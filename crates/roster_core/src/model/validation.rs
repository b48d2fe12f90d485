//! Create-path and search-input validation rules.
//!
//! # Responsibility
//! - Check student candidates before they reach the store.
//! - Provide the field checks shared with search query validation.
//!
//! # Invariants
//! - Every rule is evaluated; callers receive the full list of violations.
//! - "Letters" means Unicode alphabetic characters, so Cyrillic names pass.

use crate::model::student::NewStudent;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Required group number length.
pub const GROUP_LEN: usize = 6;
/// Minimum full name length after trimming.
pub const FIO_MIN_LEN: usize = 5;
/// Lowest accepted grade (inclusive).
pub const GRADE_MIN: i64 = 1;
/// Highest accepted grade (inclusive).
pub const GRADE_MAX: i64 = 10;

static LETTERS_AND_SPACES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Alphabetic}\s]*$").expect("valid letters regex"));
static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid digits regex"));

/// One violated validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    FioInvalidCharacters,
    FioTooShort { min: usize },
    /// Group is not exactly `len` decimal digits.
    GroupInvalid { len: usize },
    /// Group contains something other than decimal digits.
    GroupNotDigits,
    SubjectInvalid,
    GradeOutOfRange { subject: String },
    LowerBoundOutOfRange,
    UpperBoundOutOfRange,
    /// Upper bound must be strictly greater than the lower bound.
    UpperNotAboveLower,
    /// Upper bound must not be below the lower bound.
    UpperBelowLower,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FioInvalidCharacters => {
                write!(f, "full name must contain only letters and spaces")
            }
            Self::FioTooShort { min } => {
                write!(f, "full name is too short (minimum {min} characters)")
            }
            Self::GroupInvalid { len } => write!(f, "group number must consist of {len} digits"),
            Self::GroupNotDigits => write!(f, "group number must contain digits only"),
            Self::SubjectInvalid => write!(
                f,
                "subject name must be a non-empty string of letters and spaces"
            ),
            Self::GradeOutOfRange { subject } => write!(
                f,
                "grade for {subject} must be an integer from {GRADE_MIN} to {GRADE_MAX}"
            ),
            Self::LowerBoundOutOfRange => write!(
                f,
                "lower bound must be a number from {GRADE_MIN} to {GRADE_MAX}"
            ),
            Self::UpperBoundOutOfRange => write!(
                f,
                "upper bound must be a number from {GRADE_MIN} to {GRADE_MAX}"
            ),
            Self::UpperNotAboveLower => {
                write!(f, "upper bound must be greater than lower bound")
            }
            Self::UpperBelowLower => write!(f, "upper bound must not be less than lower bound"),
        }
    }
}

impl Error for ValidationError {}

/// Non-empty list of violations, rendered as one message at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Wraps `errors`, returning `None` when the list is empty.
    pub fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human-readable message per violation, in rule order.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl Error for ValidationErrors {}

/// Validates a create candidate against every field rule.
///
/// Returns an empty list when the candidate may be persisted.
pub fn validate_student(candidate: &NewStudent) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !is_letters_and_spaces(&candidate.fio) {
        errors.push(ValidationError::FioInvalidCharacters);
    }
    if candidate.fio.trim().chars().count() < FIO_MIN_LEN {
        errors.push(ValidationError::FioTooShort { min: FIO_MIN_LEN });
    }

    if !is_valid_group(&candidate.group) {
        errors.push(ValidationError::GroupInvalid { len: GROUP_LEN });
    }

    for (subject, grade) in &candidate.exams {
        if !is_valid_subject(subject) {
            errors.push(ValidationError::SubjectInvalid);
        }
        if !is_valid_grade(*grade) {
            errors.push(ValidationError::GradeOutOfRange {
                subject: subject.clone(),
            });
        }
    }

    errors
}

/// Exactly [`GROUP_LEN`] ASCII decimal digits.
pub fn is_valid_group(group: &str) -> bool {
    group.len() == GROUP_LEN && is_all_digits(group)
}

/// Non-empty (after trimming) and made of letters and spaces only.
pub fn is_valid_subject(subject: &str) -> bool {
    !subject.trim().is_empty() && is_letters_and_spaces(subject)
}

/// Grade within `[GRADE_MIN, GRADE_MAX]`.
pub fn is_valid_grade(grade: i64) -> bool {
    (GRADE_MIN..=GRADE_MAX).contains(&grade)
}

/// Search bound within `[GRADE_MIN, GRADE_MAX]`. NaN is never in range.
pub fn is_valid_bound(bound: f64) -> bool {
    (GRADE_MIN as f64..=GRADE_MAX as f64).contains(&bound)
}

pub(crate) fn is_all_digits(value: &str) -> bool {
    DIGITS_RE.is_match(value)
}

fn is_letters_and_spaces(value: &str) -> bool {
    LETTERS_AND_SPACES_RE.is_match(value)
}
