//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, search and repository calls into use-case APIs.
//! - Keep shells decoupled from storage details.

pub mod pagination;
pub mod student_service;
