//! PostgREST query string generation.

use super::Filter;
use super::OrderBy;
use super::Query;
use crate::model::Value;

/// Renders a query into PostgREST query parameters, in order.
///
/// Top-level conditions become one parameter each (`col=op.value`), nested
/// `and`/`or` trees use PostgREST's logic-tree syntax. Keys and values are
/// returned unencoded.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();

    let select = if query.selected().is_empty() {
        "*".to_string()
    } else {
        query.selected().join(",")
    };
    params.push(("select".to_string(), select));

    for filter in query.filter_list() {
        push_filter(&mut params, filter);
    }

    if let Some(order) = query.ordering() {
        params.push(("order".to_string(), order_to_postgrest(order)));
    }

    if let Some(range) = query.row_range() {
        params.push(("offset".to_string(), range.offset.to_string()));
        if let Some(limit) = range.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
    }

    params
}

/// Appends the parameters for one top-level filter.
///
/// A top-level `And` is flattened into separate parameters; empty `And`/`Or`
/// lists render nothing.
fn push_filter(params: &mut Vec<(String, String)>, filter: &Filter) {
    match filter {
        Filter::And(filters) => {
            for f in filters {
                push_filter(params, f);
            }
        }
        Filter::Or(filters) if !filters.is_empty() => {
            params.push(("or".to_string(), tree_list(filters)));
        }
        Filter::Or(_) => {}
        Filter::Not(inner) => match inner.as_ref() {
            Filter::And(filters) if !filters.is_empty() => {
                params.push(("not.and".to_string(), tree_list(filters)));
            }
            Filter::Or(filters) if !filters.is_empty() => {
                params.push(("not.or".to_string(), tree_list(filters)));
            }
            Filter::And(_) | Filter::Or(_) => {}
            condition => {
                if let Some((column, op)) = condition_parts(condition, false) {
                    params.push((column, format!("not.{}", op)));
                }
            }
        },
        condition => {
            if let Some((column, op)) = condition_parts(condition, false) {
                params.push((column, op));
            }
        }
    }
}

/// Splits a single-column condition into its column and `op.value` part.
///
/// `quoted` selects logic-tree quoting for the value.
fn condition_parts(filter: &Filter, quoted: bool) -> Option<(String, String)> {
    let literal = |value: &Value| {
        let raw = value.to_string();
        if quoted { quote_value(&raw) } else { raw }
    };

    let (column, op) = match filter {
        Filter::Eq(c, v) => (c, format!("eq.{}", literal(v))),
        Filter::Ne(c, v) => (c, format!("neq.{}", literal(v))),
        Filter::Gt(c, v) => (c, format!("gt.{}", literal(v))),
        Filter::Ge(c, v) => (c, format!("gte.{}", literal(v))),
        Filter::Lt(c, v) => (c, format!("lt.{}", literal(v))),
        Filter::Le(c, v) => (c, format!("lte.{}", literal(v))),
        Filter::ILike(c, pattern) | Filter::IMatch(c, pattern) => {
            let op = if matches!(filter, Filter::ILike(..)) { "ilike" } else { "imatch" };
            let pattern = if quoted {
                quote_value(pattern)
            } else {
                pattern.clone()
            };
            (c, format!("{}.{}", op, pattern))
        }
        Filter::In(c, values) => {
            let items: Vec<_> = values.iter().map(|v| quote_value(&v.to_string())).collect();
            (c, format!("in.({})", items.join(",")))
        }
        Filter::IsNull(c) => (c, "is.null".to_string()),
        Filter::Not(_) | Filter::And(_) | Filter::Or(_) => return None,
    };
    Some((column.clone(), op))
}

/// Renders a list of filters as the parenthesized body of a logic tree.
fn tree_list(filters: &[Filter]) -> String {
    let parts: Vec<_> = filters.iter().filter_map(tree_condition).collect();
    format!("({})", parts.join(","))
}

/// Renders one filter inside a logic tree: `col.op.value`, `and(...)`, etc.
fn tree_condition(filter: &Filter) -> Option<String> {
    match filter {
        Filter::And(filters) if !filters.is_empty() => Some(format!("and{}", tree_list(filters))),
        Filter::Or(filters) if !filters.is_empty() => Some(format!("or{}", tree_list(filters))),
        Filter::And(_) | Filter::Or(_) => None,
        Filter::Not(inner) => match inner.as_ref() {
            Filter::And(filters) if !filters.is_empty() => {
                Some(format!("not.and{}", tree_list(filters)))
            }
            Filter::Or(filters) if !filters.is_empty() => {
                Some(format!("not.or{}", tree_list(filters)))
            }
            Filter::And(_) | Filter::Or(_) => None,
            condition => condition_parts(condition, true)
                .map(|(column, op)| format!("{}.not.{}", column, op)),
        },
        condition => condition_parts(condition, true).map(|(column, op)| format!("{}.{}", column, op)),
    }
}

/// Converts an `OrderBy` to a PostgREST `order` value.
pub fn order_to_postgrest(order: &OrderBy) -> String {
    order
        .fields()
        .iter()
        .map(|(column, direction)| format!("{}.{}", column, direction.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quotes a value for use inside `in.(...)` lists and logic trees.
///
/// Values containing PostgREST's reserved characters are wrapped in double
/// quotes, with `"` and `\` backslash-escaped.
pub fn quote_value(raw: &str) -> String {
    let reserved = raw.is_empty()
        || raw
            .chars()
            .any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\') || c.is_whitespace());
    if !reserved {
        return raw.to_string();
    }

    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Quotes a column name as a Postgres identifier: `"name"`, inner `"` doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Reverses [`quote_ident`]; bare names are returned unchanged.
pub fn unquote_ident(ident: &str) -> String {
    match ident.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => ident.to_string(),
    }
}
