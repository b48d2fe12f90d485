//! Page cursor over the record store.
//!
//! # Responsibility
//! - Track page size, current page and the cached total count.
//! - Translate the cursor into `get_page(limit, offset)` calls.
//!
//! # Invariants
//! - `total_pages()` is at least 1, even for an empty store.
//! - `current_page` stays within `1..=total_pages()`.
//! - The cached count changes only through `refresh`.

use crate::model::student::Student;
use crate::repo::student_repo::{RepoResult, StudentRepository};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Page sizes an operator may pick from.
pub const PAGE_SIZE_PRESETS: &[u32] = &[1, 5, 10, 15, 20, 25, 50];
/// Page size used before the operator picks one.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationError {
    UnsupportedPageSize(u32),
}

impl Display for PaginationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPageSize(size) => write!(
                f,
                "unsupported page size `{size}`; expected one of {PAGE_SIZE_PRESETS:?}"
            ),
        }
    }
}

impl Error for PaginationError {}

/// Stateful page cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page_size: u32,
    current_page: u32,
    total_count: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 1,
            total_count: 0,
        }
    }
}

impl Paginator {
    /// Creates a cursor on page 1 with an empty cached count.
    pub fn new(page_size: u32) -> Result<Self, PaginationError> {
        ensure_preset(page_size)?;
        Ok(Self {
            page_size,
            ..Self::default()
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// 1-based current page.
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Total count as of the last `refresh`/`set_total_count`.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// `ceil(total_count / page_size)`, never less than 1.
    pub fn total_pages(&self) -> u32 {
        let pages = self.total_count.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    /// Row offset of the first record on the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.current_page - 1) * u64::from(self.page_size)
    }

    /// Re-reads the total count from `repo`.
    pub fn refresh<R: StudentRepository>(&mut self, repo: &R) -> RepoResult<()> {
        self.set_total_count(repo.get_total_count()?);
        Ok(())
    }

    /// Replaces the cached count and clamps the cursor into range.
    pub fn set_total_count(&mut self, total_count: u64) {
        self.total_count = total_count;
        self.current_page = self.current_page.clamp(1, self.total_pages());
    }

    /// Switches page size and resets to page 1.
    pub fn set_page_size(&mut self, page_size: u32) -> Result<(), PaginationError> {
        ensure_preset(page_size)?;
        self.page_size = page_size;
        self.current_page = 1;
        Ok(())
    }

    pub fn first(&mut self) {
        self.current_page = 1;
    }

    pub fn last(&mut self) {
        self.current_page = self.total_pages();
    }

    /// Moves back one page; no-op on page 1.
    pub fn prev(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    /// Moves forward one page; no-op on the last page.
    pub fn next(&mut self) {
        if self.current_page < self.total_pages() {
            self.current_page += 1;
        }
    }

    /// Jumps to `page`, clamped into `1..=total_pages()`.
    pub fn go_to(&mut self, page: u32) {
        self.current_page = page.clamp(1, self.total_pages());
    }

    /// Loads the students shown on the current page.
    pub fn page_slice<R: StudentRepository>(&self, repo: &R) -> RepoResult<Vec<Student>> {
        let offset = u32::try_from(self.offset()).unwrap_or(u32::MAX);
        repo.get_page(self.page_size, offset)
    }
}

fn ensure_preset(page_size: u32) -> Result<(), PaginationError> {
    if PAGE_SIZE_PRESETS.contains(&page_size) {
        Ok(())
    } else {
        Err(PaginationError::UnsupportedPageSize(page_size))
    }
}
