//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store contract used by services, codecs and paging.
//! - Isolate SQLite query details from validation/search orchestration.
//!
//! # Invariants
//! - The store performs no field validation; callers own that boundary.
//! - Every write keeps `students` and `exams` rows paired.

pub mod student_repo;
