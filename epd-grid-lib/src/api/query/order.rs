//! Ordering types for PostgREST queries.

use serde::Deserialize;
use serde::Serialize;

/// Sort direction for ordering results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending order (A-Z, 0-9), nulls last.
    Asc,
    /// Descending order (Z-A, 9-0), nulls first.
    Desc,
}

impl Direction {
    /// Returns the PostgREST keyword for this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Specifies the ordering of query results.
///
/// Multiple columns can be chained together for secondary, tertiary, etc. sorting.
///
/// # Example
///
/// ```
/// use epd_grid_lib::api::query::OrderBy;
///
/// let order = OrderBy::desc("\"GWP per Default Unit\"")
///     .then_asc("\"Product Name\"");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub(crate) fields: Vec<(String, Direction)>,
}

impl OrderBy {
    /// Creates an ascending order on a column.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::by(column, Direction::Asc)
    }

    /// Creates a descending order on a column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::by(column, Direction::Desc)
    }

    /// Creates an order on a column with an explicit direction.
    pub fn by(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            fields: vec![(column.into(), direction)],
        }
    }

    /// Adds a secondary ascending order on a column.
    pub fn then_asc(self, column: impl Into<String>) -> Self {
        self.then(column, Direction::Asc)
    }

    /// Adds a secondary descending order on a column.
    pub fn then_desc(self, column: impl Into<String>) -> Self {
        self.then(column, Direction::Desc)
    }

    /// Adds a secondary order with an explicit direction.
    pub fn then(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.fields.push((column.into(), direction));
        self
    }

    /// Returns the ordered columns with their directions.
    pub fn fields(&self) -> &[(String, Direction)] {
        &self.fields
    }
}
