//! Student search entry points.
//!
//! # Responsibility
//! - Validate search inputs, collecting every violation.
//! - Evaluate the group, average-grade and exam-grade predicates.

pub mod student_search;
