//! Filter types for PostgREST queries.

use crate::model::Value;

/// A filter condition for querying rows.
///
/// Column names are backend identifiers, already quoted where needed (see
/// [`ColumnMap`](crate::grid::ColumnMap)). Filters combine with `And`/`Or`
/// and negate with [`Filter::not()`]; PostgREST accepts `not.` in front of
/// every operator, so negation is part of the same type.
///
/// # Example
///
/// ```
/// use epd_grid_lib::api::query::Filter;
///
/// // Simple equality filter
/// let filter = Filter::eq("\"Country\"", "USA");
///
/// // Range as a conjunction
/// let filter = Filter::ge("\"GWP per Default Unit\"", 10.0)
///     .and_also(Filter::le("\"GWP per Default Unit\"", 20.0));
///
/// // Negated case-insensitive pattern
/// let filter = Filter::ilike("\"Country\"", "*usa*").not();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Equality: `col=eq.value`
    Eq(String, Value),
    /// Not equal: `col=neq.value`
    Ne(String, Value),
    /// Greater than: `col=gt.value`
    Gt(String, Value),
    /// Greater than or equal: `col=gte.value`
    Ge(String, Value),
    /// Less than: `col=lt.value`
    Lt(String, Value),
    /// Less than or equal: `col=lte.value`
    Le(String, Value),
    /// Case-insensitive pattern: `col=ilike.pattern` (`*` is the wildcard).
    ILike(String, String),
    /// Case-insensitive POSIX regex: `col=imatch.pattern` (`~*`).
    IMatch(String, String),
    /// Membership: `col=in.(a,b,c)`
    In(String, Vec<Value>),
    /// Is null: `col=is.null`
    IsNull(String),
    /// Negation of the inner filter.
    Not(Box<Filter>),
    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
}

impl Filter {
    /// Creates an equality filter.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    /// Creates a not-equal filter.
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(column.into(), value.into())
    }

    /// Creates a greater-than filter.
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt(column.into(), value.into())
    }

    /// Creates a greater-than-or-equal filter.
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ge(column.into(), value.into())
    }

    /// Creates a less-than filter.
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(column.into(), value.into())
    }

    /// Creates a less-than-or-equal filter.
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Le(column.into(), value.into())
    }

    /// Creates a case-insensitive pattern filter.
    ///
    /// `*` matches any sequence and `_` any single character; a backslash
    /// escapes the next character.
    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::ILike(column.into(), pattern.into())
    }

    /// Creates a case-insensitive regex filter.
    ///
    /// Used where a literal `*` must survive, since `ilike` cannot express
    /// one. Build the pattern with [`escape_regex`].
    pub fn imatch(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::IMatch(column.into(), pattern.into())
    }

    /// Creates a membership filter.
    pub fn is_in(column: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Filter::In(column.into(), values.into_iter().collect())
    }

    /// Creates an is-null filter.
    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into())
    }

    /// Creates an is-not-null filter.
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into()).not()
    }

    /// Creates a logical AND of multiple filters.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Creates a logical OR of multiple filters.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Combines this filter with another using logical AND.
    pub fn and_also(self, other: Filter) -> Self {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            _ => Filter::And(vec![self, other]),
        }
    }

    /// Combines this filter with another using logical OR.
    pub fn or_else(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut filters) => {
                filters.push(other);
                Filter::Or(filters)
            }
            _ => Filter::Or(vec![self, other]),
        }
    }

    /// Negates this filter. Double negation cancels out.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }

    /// Returns the column this filter tests, if it is a single-column condition.
    pub fn column(&self) -> Option<&str> {
        match self {
            Filter::Eq(c, _)
            | Filter::Ne(c, _)
            | Filter::Gt(c, _)
            | Filter::Ge(c, _)
            | Filter::Lt(c, _)
            | Filter::Le(c, _)
            | Filter::ILike(c, _)
            | Filter::IMatch(c, _)
            | Filter::In(c, _)
            | Filter::IsNull(c) => Some(c),
            Filter::Not(inner) => inner.column(),
            Filter::And(_) | Filter::Or(_) => None,
        }
    }
}

/// Escapes LIKE metacharacters so `text` matches itself literally inside an
/// `ilike` pattern.
///
/// PostgREST rewrites every `*` to `%` before the pattern reaches Postgres,
/// so a literal `*` cannot be expressed here. Text containing `*` goes
/// through [`Filter::imatch`] with [`escape_regex`] instead.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes POSIX regex metacharacters so `text` matches itself literally
/// inside an `imatch` pattern.
pub fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
