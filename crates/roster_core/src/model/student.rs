//! Student domain model.
//!
//! # Responsibility
//! - Define the persisted record (`Student`) and the create candidate
//!   (`NewStudent`).
//! - Provide grade helpers used by search and display.
//!
//! # Invariants
//! - `Student::id` is assigned by the store and never reused.
//! - Subject keys are unique per student; inserting a duplicate overwrites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Store-assigned identifier of a persisted student.
pub type StudentId = i64;

/// Exam subject -> grade mapping.
///
/// `BTreeMap` keeps iteration deterministic for export and display; order
/// carries no meaning.
pub type Exams = BTreeMap<String, i64>;

/// Persisted student record as returned by read operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// Full name.
    pub fio: String,
    /// Six-digit group number, kept as text.
    pub group: String,
    pub exams: Exams,
}

impl Student {
    /// Returns the grade recorded for `subject`, if any.
    pub fn grade_for(&self, subject: &str) -> Option<i64> {
        self.exams.get(subject).copied()
    }

    /// Whether this student has an exam entry for `subject`.
    pub fn has_exam(&self, subject: &str) -> bool {
        self.exams.contains_key(subject)
    }

    /// Mean of all exam grades rounded to two decimals.
    ///
    /// Returns `None` for a student without exam entries.
    pub fn average_grade(&self) -> Option<f64> {
        if self.exams.is_empty() {
            return None;
        }
        let sum: f64 = self.exams.values().map(|&grade| grade as f64).sum();
        let mean = sum / self.exams.len() as f64;
        Some(round_to_hundredths(mean))
    }

    /// Drops the id, producing a candidate suitable for re-insertion.
    pub fn to_new_student(&self) -> NewStudent {
        NewStudent {
            fio: self.fio.clone(),
            group: self.group.clone(),
            exams: self.exams.clone(),
        }
    }
}

/// Student candidate that has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub fio: String,
    pub group: String,
    pub exams: Exams,
}

impl NewStudent {
    /// Creates a candidate with an empty exam map.
    pub fn new(fio: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            fio: fio.into(),
            group: group.into(),
            exams: Exams::new(),
        }
    }

    /// Copy with surrounding whitespace removed from name, group and subjects.
    pub fn normalized(&self) -> Self {
        Self {
            fio: self.fio.trim().to_string(),
            group: self.group.trim().to_string(),
            exams: self
                .exams
                .iter()
                .map(|(subject, grade)| (subject.trim().to_string(), *grade))
                .collect(),
        }
    }

    /// Adds (or overwrites) one exam entry.
    pub fn with_exam(mut self, subject: impl Into<String>, grade: i64) -> Self {
        self.exams.insert(subject.into(), grade);
        self
    }
}

/// Student annotated with the average computed by the average-grade search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStudent {
    #[serde(flatten)]
    pub student: Student,
    /// Mean of all the student's grades, rounded to two decimals.
    pub avg_grade: f64,
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
