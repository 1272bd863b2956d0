//! Query builder.

use super::Filter;
use super::OrderBy;
use super::Range;

/// A read query against one table.
///
/// Built up by the grid request handler and handed to a
/// [`Backend`](crate::Backend) for execution. The query is plain data, so
/// the same value can be rendered for PostgREST or evaluated in memory.
///
/// # Example
///
/// ```
/// use epd_grid_lib::api::query::{Filter, OrderBy, Query, Range};
///
/// let query = Query::new("EPD")
///     .filter(Filter::eq("\"Material Category\"", "Concrete"))
///     .order_by(OrderBy::desc("\"GWP per Default Unit\""))
///     .range(Range::half_open(0, 50))
///     .include_count();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    select: Vec<String>,
    filters: Vec<Filter>,
    order_by: Option<OrderBy>,
    range: Option<Range>,
    include_count: bool,
}

impl Query {
    /// Creates a query selecting every column of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: Vec::new(),
            filters: Vec::new(),
            order_by: None,
            range: None,
            include_count: false,
        }
    }

    /// Specifies which columns to select.
    ///
    /// If not called, all columns are returned.
    pub fn select<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.select = columns.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// Adds a filter condition. Conditions added this way are ANDed.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds several filter conditions.
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Sets the ordering of results.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    /// Limits the result to a window of rows.
    pub fn range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    /// Requests the exact number of matching rows alongside the page.
    pub fn include_count(mut self) -> Self {
        self.include_count = true;
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the selected columns; empty means all.
    pub fn selected(&self) -> &[String] {
        &self.select
    }

    /// Returns the filter conditions.
    pub fn filter_list(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the ordering, if set.
    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Returns the row window, if set.
    pub fn row_range(&self) -> Option<Range> {
        self.range
    }

    /// Returns `true` if an exact count was requested.
    pub fn counts(&self) -> bool {
        self.include_count
    }
}
