//! Student domain model and input validation.
//!
//! # Responsibility
//! - Define the canonical student record shared by store, search and codecs.
//! - Own the validation rules applied on the create path.
//!
//! # Invariants
//! - A persisted student is identified by a store-assigned `StudentId`.
//! - Validation reports every violated rule, never just the first.

pub mod student;
pub mod validation;
