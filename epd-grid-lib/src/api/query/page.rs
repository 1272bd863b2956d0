//! Page type for query results.

use crate::model::Row;

/// A page of query results.
///
/// Carries the rows of one backend query along with the exact total count
/// of matching rows when it was requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    rows: Vec<Row>,
    /// Total row count (if requested with `Prefer: count=exact`).
    total_count: Option<usize>,
}

impl Page {
    /// Creates a new page with rows and no count.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            total_count: None,
        }
    }

    /// Sets the total row count.
    pub fn with_total_count(mut self, count: usize) -> Self {
        self.total_count = Some(count);
        self
    }

    /// Returns a reference to the rows in this page.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consumes the page and returns the rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns the total row count, if it was requested.
    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    /// Returns `true` if this page has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows in this page.
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
