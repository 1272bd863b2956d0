//! In-memory backend

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;

use super::Backend;
use crate::api::query::url::unquote_ident;
use crate::api::query::Direction;
use crate::api::query::Filter;
use crate::api::query::Page;
use crate::api::query::Query;
use crate::api::RpcCall;
use crate::api::DISTINCT_GROUPS_FUNCTION;
use crate::api::GROUP_COLUMN_ARG;
use crate::api::GROUP_VALUE_FIELD;
use crate::api::PARENT_FILTERS_ARG;
use crate::error::ApiError;
use crate::error::ConfigError;
use crate::error::Error;
use crate::error::PostgrestErrorDetail;
use crate::model::Row;
use crate::model::Value;

/// A backend serving one table from rows held in memory.
///
/// Queries are evaluated with Postgres semantics where they matter to the
/// grid: comparisons against null are unknown (so negated predicates skip
/// null cells), ascending order puts nulls last and descending puts them
/// first, and unknown columns fail with SQLSTATE `42703` like PostgREST.
/// A counted request whose offset lies past the total fails with 416
/// `PGRST103`, as PostgREST does.
///
/// `imatch` patterns are limited to literal text with optional `^`/`$`
/// anchors; anything else is rejected with status 400.
///
/// The distinct-groups function is served under its default name.
///
/// # Example
///
/// ```
/// use epd_grid_lib::backend::MemoryBackend;
/// use epd_grid_lib::model::Row;
///
/// let backend = MemoryBackend::new("EPD", vec![
///     Row::new().set("Country", "USA").set("Material Category", "Concrete"),
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    table: String,
    columns: BTreeSet<String>,
    rows: Vec<Row>,
    groups_function: String,
}

impl MemoryBackend {
    /// Creates a backend for `table`; its columns are the union of the row keys.
    pub fn new(table: impl Into<String>, rows: Vec<Row>) -> Self {
        let columns = rows
            .iter()
            .flat_map(|row| row.fields().keys().cloned())
            .collect();
        Self {
            table: table.into(),
            columns,
            rows,
            groups_function: DISTINCT_GROUPS_FUNCTION.to_string(),
        }
    }

    /// Declares additional columns, e.g. ones that are null in every row.
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Serves the distinct-groups function under another name.
    pub fn with_groups_function(mut self, name: impl Into<String>) -> Self {
        self.groups_function = name.into();
        self
    }

    /// Loads rows from a JSON file holding an array of objects.
    pub fn from_json_file(table: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_error = |message: String| ConfigError::File {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let rows: Vec<Row> = serde_json::from_str(&text).map_err(|e| file_error(e.to_string()))?;
        Ok(Self::new(table, rows))
    }

    /// Returns the number of rows held.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no rows are held.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn check_table(&self, table: &str) -> Result<(), Error> {
        if table == self.table {
            return Ok(());
        }
        Err(postgrest_error(
            404,
            "PGRST205",
            format!("Could not find the table 'public.{}' in the schema cache", table),
        ))
    }

    /// Resolves a (possibly quoted) identifier to a known column name.
    fn column(&self, ident: &str) -> Result<String, Error> {
        let name = unquote_ident(ident);
        if self.columns.contains(&name) {
            return Ok(name);
        }
        Err(postgrest_error(
            400,
            "42703",
            format!("column {}.{} does not exist", self.table, name),
        ))
    }

    fn check_filter(&self, filter: &Filter) -> Result<(), Error> {
        match filter {
            Filter::And(filters) | Filter::Or(filters) => {
                filters.iter().try_for_each(|f| self.check_filter(f))
            }
            Filter::Not(inner) => self.check_filter(inner),
            Filter::IMatch(column, pattern) => {
                self.column(column)?;
                if regex_to_like(pattern).is_none() {
                    return Err(postgrest_error(
                        400,
                        "2201B",
                        format!("unsupported regular expression: {}", pattern),
                    ));
                }
                Ok(())
            }
            other => match other.column() {
                Some(column) => self.column(column).map(|_| ()),
                None => Ok(()),
            },
        }
    }

    fn distinct_groups(&self, call: &RpcCall) -> Result<Vec<Row>, Error> {
        let ident = call
            .get_arg(GROUP_COLUMN_ARG)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                postgrest_error(
                    404,
                    "PGRST202",
                    format!("Could not find the function public.{} without parameters", call.function()),
                )
            })?;
        let column = self.column(ident)?;

        let mut parents = Vec::new();
        if let Some(filters) = call.get_arg(PARENT_FILTERS_ARG).and_then(|v| v.as_object()) {
            for (ident, value) in filters {
                parents.push((self.column(ident)?, Value::from(value.clone())));
            }
        }

        let mut distinct: Vec<Value> = Vec::new();
        let matching = self.rows.iter().filter(|row| {
            parents
                .iter()
                .all(|(col, value)| cell(row, col).compare(value) == Some(Ordering::Equal))
        });
        for row in matching {
            let value = cell(row, &column).clone();
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        distinct.sort_by(|a, b| compare_cells(a, b, Direction::Asc));

        Ok(distinct
            .into_iter()
            .map(|value| Row::new().set(GROUP_VALUE_FIELD, value))
            .collect())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch(&self, query: &Query) -> Result<Page, Error> {
        self.check_table(query.table())?;

        let selected = query
            .selected()
            .iter()
            .filter(|s| s.as_str() != "*")
            .map(|s| self.column(s))
            .collect::<Result<Vec<_>, _>>()?;
        for filter in query.filter_list() {
            self.check_filter(filter)?;
        }
        let order = match query.ordering() {
            Some(order) => order
                .fields()
                .iter()
                .map(|(c, d)| self.column(c).map(|c| (c, *d)))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let mut rows: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| {
                query
                    .filter_list()
                    .iter()
                    .all(|f| evaluate(f, row) == Some(true))
            })
            .collect();

        if !order.is_empty() {
            rows.sort_by(|a, b| {
                order
                    .iter()
                    .map(|(column, direction)| compare_cells(cell(a, column), cell(b, column), *direction))
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let total = rows.len();
        if let Some(range) = query.row_range() {
            if query.counts() && range.offset > total {
                return Err(postgrest_error(
                    416,
                    "PGRST103",
                    format!(
                        "An offset of {} was requested, but there are only {} rows.",
                        range.offset, total
                    ),
                ));
            }
        }
        let window: Vec<Row> = match query.row_range() {
            Some(range) => rows
                .into_iter()
                .skip(range.offset)
                .take(range.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            None => rows.into_iter().cloned().collect(),
        };

        let window = if selected.is_empty() {
            window
        } else {
            window
                .into_iter()
                .map(|row| {
                    selected
                        .iter()
                        .map(|c| (c.clone(), cell(&row, c).clone()))
                        .collect::<Row>()
                })
                .collect::<Vec<_>>()
        };

        let page = Page::new(window);
        Ok(if query.counts() {
            page.with_total_count(total)
        } else {
            page
        })
    }

    async fn rpc(&self, call: &RpcCall) -> Result<Vec<Row>, Error> {
        if call.function() == self.groups_function {
            return self.distinct_groups(call);
        }
        Err(postgrest_error(
            404,
            "PGRST202",
            format!("Could not find the function public.{}", call.function()),
        ))
    }
}

fn postgrest_error(status: u16, code: &str, message: String) -> Error {
    Error::Api(ApiError::http_with_detail(
        status,
        PostgrestErrorDetail::new(code, message),
    ))
}

static NULL: Value = Value::Null;

fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

/// Evaluates a filter with SQL three-valued logic; `None` is unknown.
fn evaluate(filter: &Filter, row: &Row) -> Option<bool> {
    let compare = |column: &str, value: &Value| cell(row, &unquote_ident(column)).compare(value);

    match filter {
        Filter::Eq(c, v) => compare(c, v).map(|o| o == Ordering::Equal),
        Filter::Ne(c, v) => compare(c, v).map(|o| o != Ordering::Equal),
        Filter::Gt(c, v) => compare(c, v).map(|o| o == Ordering::Greater),
        Filter::Ge(c, v) => compare(c, v).map(|o| o != Ordering::Less),
        Filter::Lt(c, v) => compare(c, v).map(|o| o == Ordering::Less),
        Filter::Le(c, v) => compare(c, v).map(|o| o != Ordering::Greater),
        Filter::ILike(c, pattern) => match cell(row, &unquote_ident(c)) {
            Value::Null => None,
            value => Some(ilike(&value.to_string(), pattern)),
        },
        Filter::IMatch(c, pattern) => match cell(row, &unquote_ident(c)) {
            Value::Null => None,
            value => regex_to_like(pattern).map(|like| ilike(&value.to_string(), &like)),
        },
        Filter::In(c, values) => {
            let mut unknown = false;
            for value in values {
                match compare(c, value) {
                    Some(Ordering::Equal) => return Some(true),
                    Some(_) => {}
                    None => unknown = true,
                }
            }
            if unknown { None } else { Some(false) }
        }
        Filter::IsNull(c) => Some(cell(row, &unquote_ident(c)).is_null()),
        Filter::Not(inner) => evaluate(inner, row).map(|b| !b),
        Filter::And(filters) => {
            let mut result = Some(true);
            for f in filters {
                match evaluate(f, row) {
                    Some(false) => return Some(false),
                    None => result = None,
                    Some(true) => {}
                }
            }
            result
        }
        Filter::Or(filters) => {
            let mut result = Some(false);
            for f in filters {
                match evaluate(f, row) {
                    Some(true) => return Some(true),
                    None => result = None,
                    Some(false) => {}
                }
            }
            result
        }
    }
}

/// Orders two cells for `ORDER BY` with Postgres' default null placement.
fn compare_cells(a: &Value, b: &Value, direction: Direction) -> Ordering {
    match (a.is_null(), b.is_null(), direction) {
        (true, true, _) => Ordering::Equal,
        (true, false, Direction::Asc) | (false, true, Direction::Desc) => Ordering::Greater,
        (false, true, Direction::Asc) | (true, false, Direction::Desc) => Ordering::Less,
        (false, false, Direction::Asc) => a.compare(b).unwrap_or(Ordering::Equal),
        (false, false, Direction::Desc) => b.compare(a).unwrap_or(Ordering::Equal),
    }
}

/// Rewrites a regex made of literal text and optional `^`/`$` anchors as an
/// equivalent LIKE pattern. Other regex syntax yields `None`.
fn regex_to_like(pattern: &str) -> Option<String> {
    let (anchored_start, body) = match pattern.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };

    let mut like = String::with_capacity(body.len() + 2);
    if !anchored_start {
        like.push('*');
    }
    let mut anchored_end = false;
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if anchored_end {
            return None;
        }
        let literal = match c {
            '\\' => chars.next()?,
            '$' => {
                anchored_end = true;
                continue;
            }
            '.' | '^' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' => return None,
            c => c,
        };
        if matches!(literal, '\\' | '%' | '_' | '*') {
            like.push('\\');
        }
        like.push(literal);
    }
    if !anchored_end {
        like.push('*');
    }
    Some(like)
}

/// Case-insensitive LIKE: `*` and `%` match any run, `_` one character,
/// `\` escapes the next character.
fn ilike(text: &str, pattern: &str) -> bool {
    #[derive(PartialEq)]
    enum Token {
        Any,
        One,
        Char(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' | '%' => Token::Any,
            '_' => Token::One,
            '\\' => match chars.next() {
                Some(escaped) => Token::Char(escaped),
                None => Token::Char('\\'),
            },
            c => Token::Char(c),
        });
    }

    let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
    let lower = |c: &char| c.to_lowercase().next().unwrap_or(*c);

    // Iterative wildcard match with backtracking to the last `Any`.
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Any) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(Token::One) => {
                t += 1;
                p += 1;
            }
            Some(Token::Char(c)) if lower(c) == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((bp, bt)) => {
                    p = bp + 1;
                    t = bt + 1;
                    backtrack = Some((bp, bt + 1));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|token| *token == Token::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::OrderBy;
    use crate::api::query::Range;

    fn backend() -> MemoryBackend {
        MemoryBackend::new(
            "EPD",
            vec![
                Row::new().set("Country", "USA Plant").set("GWP", 10.0),
                Row::new().set("Country", "Canada").set("GWP", 30.0),
                Row::new().set("Country", Value::Null).set("GWP", 20.0),
                Row::new().set("Country", "usa").set("GWP", Value::Null),
            ],
        )
    }

    #[test]
    fn test_ilike() {
        assert!(ilike("USA Plant", "*usa*"));
        assert!(ilike("usa", "USA"));
        assert!(!ilike("Canada", "*usa*"));
        assert!(ilike("Plant USA", "*usa"));
        assert!(!ilike("USA Plant", "*usa"));
        assert!(ilike("a_b", "a\\_b"));
        assert!(!ilike("axb", "a\\_b"));
        assert!(ilike("axb", "a_b"));
        assert!(ilike("", "*"));
        assert!(ilike("abcabd", "*abd"));
    }

    #[tokio::test]
    async fn test_negation_skips_nulls() {
        let query = Query::new("EPD").filter(Filter::ilike("\"Country\"", "*usa*").not());
        let page = backend().fetch(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.rows()[0].get_str("Country").unwrap(), Some("Canada"));
    }

    #[tokio::test]
    async fn test_order_nulls_last_and_range() {
        let query = Query::new("EPD")
            .order_by(OrderBy::asc("\"GWP\""))
            .range(Range::half_open(2, 10))
            .include_count();
        let page = backend().fetch(&query).await.unwrap();
        assert_eq!(page.total_count(), Some(4));
        assert_eq!(page.len(), 2);
        assert_eq!(page.rows()[0].get_f64("GWP").unwrap(), Some(30.0));
        assert_eq!(page.rows()[1].get_f64("GWP").unwrap(), None);
    }

    #[test]
    fn test_regex_to_like() {
        assert_eq!(regex_to_like("^mix\\*a$").as_deref(), Some("mix\\*a"));
        assert_eq!(regex_to_like("mix\\*").as_deref(), Some("*mix\\**"));
        assert_eq!(regex_to_like("^50%$").as_deref(), Some("50\\%"));
        assert_eq!(regex_to_like("a.b"), None);
        assert_eq!(regex_to_like("a$b"), None);
    }

    #[tokio::test]
    async fn test_imatch_treats_star_literally() {
        let backend = MemoryBackend::new(
            "EPD",
            vec![
                Row::new().set("Name", "Mix*A"),
                Row::new().set("Name", "Mix-Grade-A"),
                Row::new().set("Name", Value::Null),
            ],
        );

        let exact = Query::new("EPD").filter(Filter::imatch("\"Name\"", "^mix\\*a$"));
        let page = backend.fetch(&exact).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.rows()[0].get_str("Name").unwrap(), Some("Mix*A"));

        let negated = Query::new("EPD").filter(Filter::imatch("\"Name\"", "^mix\\*a$").not());
        let page = backend.fetch(&negated).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.rows()[0].get_str("Name").unwrap(), Some("Mix-Grade-A"));

        let contains = Query::new("EPD").filter(Filter::imatch("\"Name\"", "x\\*"));
        assert_eq!(backend.fetch(&contains).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_regex_fails() {
        let query = Query::new("EPD").filter(Filter::imatch("\"Country\"", "u.a"));
        let err = backend().fetch(&query).await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::Http { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_counted_offset_past_total_fails() {
        let query = Query::new("EPD").range(Range::half_open(5, 10)).include_count();
        let err = backend().fetch(&query).await.unwrap_err();
        match err {
            Error::Api(api) => {
                assert_eq!(api.status_code(), Some(416));
                assert_eq!(api.error_code(), Some("PGRST103"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // An offset equal to the total is an empty page, and uncounted
        // requests never fail on range.
        let at_end = Query::new("EPD").range(Range::half_open(4, 10)).include_count();
        let page = backend().fetch(&at_end).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_count(), Some(4));

        let uncounted = Query::new("EPD").range(Range::half_open(5, 10));
        assert!(backend().fetch(&uncounted).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_column_fails() {
        let query = Query::new("EPD").filter(Filter::eq("\"Colour\"", "red"));
        let err = backend().fetch(&query).await.unwrap_err();
        match err {
            Error::Api(api) => assert_eq!(api.error_code(), Some("42703")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_select_projects_columns() {
        let query = Query::new("EPD").select(&["\"Country\""]).range(Range::half_open(0, 1));
        let page = backend().fetch(&query).await.unwrap();
        assert_eq!(page.rows()[0].len(), 1);
        assert!(page.rows()[0].contains("Country"));
    }

    #[tokio::test]
    async fn test_distinct_groups() {
        let call = RpcCall::new(DISTINCT_GROUPS_FUNCTION).arg(GROUP_COLUMN_ARG, "\"Country\"");
        let rows = backend().rpc(&call).await.unwrap();
        let values: Vec<_> = rows.iter().map(|r| r.get(GROUP_VALUE_FIELD).cloned().unwrap()).collect();
        assert_eq!(
            values,
            vec![
                Value::from("Canada"),
                Value::from("USA Plant"),
                Value::from("usa"),
                Value::Null,
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let err = backend().rpc(&RpcCall::new("nope")).await.unwrap_err();
        assert!(matches!(err, Error::Api(ref api) if api.error_code() == Some("PGRST202")));
    }
}
