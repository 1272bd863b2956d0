//! Filter model to PostgREST filter translation.
//!
//! Translation is best-effort: every column filter that can be expressed is
//! applied, everything else is logged and reported as skipped. A skipped
//! filter widens the result; it never fails the request.

use serde_json::Value as JsonValue;

use super::filter_model::CombinedFilter;
use super::filter_model::JoinOperator;
use super::filter_model::NumberFilter;
use super::filter_model::NumberOperator;
use super::filter_model::SetFilter;
use super::filter_model::SimpleFilter;
use super::filter_model::TextFilter;
use super::filter_model::TextOperator;
use super::ColumnFilter;
use super::ColumnMap;
use super::FilterModel;
use crate::api::query::escape_like;
use crate::api::query::escape_regex;
use crate::api::query::Filter;
use crate::api::query::Query;
use crate::model::Value;

/// What to do with `AND`/`OR` combined column filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CombinedFilterPolicy {
    /// Log as unsupported and leave the column unfiltered.
    #[default]
    Drop,
    /// Translate each condition and join them with the connective.
    Translate,
}

impl std::str::FromStr for CombinedFilterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(CombinedFilterPolicy::Drop),
            "translate" => Ok(CombinedFilterPolicy::Translate),
            other => Err(other.to_string()),
        }
    }
}

/// Why a column filter was not applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("unsupported filter type '{0}'")]
    UnsupportedType(String),
    #[error("unsupported {kind} operator '{operator}'")]
    UnsupportedOperator { kind: &'static str, operator: String },
    #[error("combined {0:?} filters are not supported")]
    Combined(JoinOperator),
    #[error("missing operand")]
    MissingOperand,
    #[error("operand {0} is not numeric")]
    NotNumeric(String),
    #[error("set filter has no values")]
    EmptySet,
    #[error("set filter values are malformed: {0}")]
    MalformedSet(String),
    #[error("malformed filter: {0}")]
    Malformed(String),
}

/// A column filter that was left out of the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFilter {
    /// Field the filter was set on.
    pub field: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Result of translating a filter model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    /// Predicates to AND into the query, in field order.
    pub filters: Vec<Filter>,
    /// Column filters that were not applied.
    pub skipped: Vec<SkippedFilter>,
}

/// Translates grid filter models into PostgREST filters.
#[derive(Debug, Clone, Copy)]
pub struct FilterTranslator<'a> {
    columns: &'a ColumnMap,
    combined: CombinedFilterPolicy,
}

impl<'a> FilterTranslator<'a> {
    /// Creates a translator resolving fields through `columns`.
    pub fn new(columns: &'a ColumnMap) -> Self {
        Self {
            columns,
            combined: CombinedFilterPolicy::default(),
        }
    }

    /// Sets the policy for combined filters.
    pub fn combined_filters(mut self, policy: CombinedFilterPolicy) -> Self {
        self.combined = policy;
        self
    }

    /// Translates every entry of the model.
    pub fn translate(&self, model: &FilterModel) -> Translation {
        let mut translation = Translation::default();

        for (field, filter) in model {
            match self.translate_column(field, filter) {
                Ok(predicate) => translation.filters.push(predicate),
                Err(reason) => {
                    log::warn!("Skipping filter on '{}': {}", field, reason);
                    translation.skipped.push(SkippedFilter {
                        field: field.clone(),
                        reason,
                    });
                }
            }
        }

        translation
    }

    /// Applies the model to `query`, returning the query and what was skipped.
    ///
    /// An empty model returns the query unchanged.
    pub fn apply(&self, query: Query, model: &FilterModel) -> (Query, Vec<SkippedFilter>) {
        if model.is_empty() {
            return (query, Vec::new());
        }
        let translation = self.translate(model);
        (query.filters(translation.filters), translation.skipped)
    }

    fn translate_column(&self, field: &str, filter: &ColumnFilter) -> Result<Filter, SkipReason> {
        match filter {
            ColumnFilter::Text(text) => self.text(field, text),
            ColumnFilter::Number(number) => self.number(field, number),
            ColumnFilter::Set(set) => self.set(field, set),
            ColumnFilter::Combined(combined) => self.combined(field, combined),
            ColumnFilter::Unsupported { filter_type } => {
                Err(SkipReason::UnsupportedType(filter_type.clone()))
            }
            ColumnFilter::Malformed { reason } => Err(SkipReason::Malformed(reason.clone())),
        }
    }

    fn simple(&self, field: &str, filter: &SimpleFilter) -> Result<Filter, SkipReason> {
        match filter {
            SimpleFilter::Text(text) => self.text(field, text),
            SimpleFilter::Number(number) => self.number(field, number),
            SimpleFilter::Set(set) => self.set(field, set),
            SimpleFilter::Unsupported(filter_type) => Err(SkipReason::UnsupportedType(filter_type.clone())),
        }
    }

    fn text(&self, field: &str, filter: &TextFilter) -> Result<Filter, SkipReason> {
        let column = self.columns.resolve(field);
        let operand = || filter.filter.as_deref().ok_or(SkipReason::MissingOperand);

        Ok(match &filter.operator {
            TextOperator::Contains => text_pattern(column, operand()?, false, false),
            TextOperator::NotContains => text_pattern(column, operand()?, false, false).not(),
            TextOperator::Equals => text_pattern(column, operand()?, true, true),
            TextOperator::NotEqual => text_pattern(column, operand()?, true, true).not(),
            TextOperator::StartsWith => text_pattern(column, operand()?, true, false),
            TextOperator::EndsWith => text_pattern(column, operand()?, false, true),
            TextOperator::Blank => Filter::is_null(column),
            TextOperator::NotBlank => Filter::is_not_null(column),
            TextOperator::Other(operator) => {
                return Err(SkipReason::UnsupportedOperator {
                    kind: "text",
                    operator: operator.clone(),
                });
            }
        })
    }

    fn number(&self, field: &str, filter: &NumberFilter) -> Result<Filter, SkipReason> {
        let column = self.columns.resolve(field);
        let from = || numeric_operand(filter.filter.as_ref());

        Ok(match &filter.operator {
            NumberOperator::Equals => Filter::eq(column, from()?),
            NumberOperator::NotEqual => Filter::ne(column, from()?),
            NumberOperator::LessThan => Filter::lt(column, from()?),
            NumberOperator::LessThanOrEqual => Filter::le(column, from()?),
            NumberOperator::GreaterThan => Filter::gt(column, from()?),
            NumberOperator::GreaterThanOrEqual => Filter::ge(column, from()?),
            NumberOperator::InRange => {
                let low = from()?;
                let high = numeric_operand(filter.filter_to.as_ref())?;
                Filter::and([Filter::ge(column.clone(), low), Filter::le(column, high)])
            }
            NumberOperator::Blank => Filter::is_null(column),
            NumberOperator::NotBlank => Filter::is_not_null(column),
            NumberOperator::Other(operator) => {
                return Err(SkipReason::UnsupportedOperator {
                    kind: "number",
                    operator: operator.clone(),
                });
            }
        })
    }

    fn set(&self, field: &str, filter: &SetFilter) -> Result<Filter, SkipReason> {
        let items = match &filter.values {
            None | Some(JsonValue::Null) => return Err(SkipReason::EmptySet),
            Some(JsonValue::Array(items)) => items,
            Some(other) => return Err(SkipReason::MalformedSet(other.to_string())),
        };
        if items.is_empty() {
            return Err(SkipReason::EmptySet);
        }

        let mut values = Vec::with_capacity(items.len());
        let mut includes_null = false;
        for item in items {
            match item {
                JsonValue::Null => includes_null = true,
                JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_) => {
                    values.push(Value::from(item.clone()));
                }
                other => return Err(SkipReason::MalformedSet(other.to_string())),
            }
        }

        let column = self.columns.resolve(field);
        Ok(match (values.is_empty(), includes_null) {
            (true, _) => Filter::is_null(column),
            (false, false) => Filter::is_in(column, values),
            (false, true) => Filter::or([Filter::is_in(column.clone(), values), Filter::is_null(column)]),
        })
    }

    fn combined(&self, field: &str, filter: &CombinedFilter) -> Result<Filter, SkipReason> {
        if self.combined == CombinedFilterPolicy::Drop {
            return Err(SkipReason::Combined(filter.operator));
        }

        let conditions = filter
            .all_conditions()
            .into_iter()
            .map(|condition| self.simple(field, condition))
            .collect::<Result<Vec<_>, _>>()?;
        if conditions.is_empty() {
            return Err(SkipReason::MissingOperand);
        }

        Ok(match filter.operator {
            JoinOperator::And => Filter::and(conditions),
            JoinOperator::Or => Filter::or(conditions),
        })
    }
}

/// Builds a case-insensitive match of `operand` as literal text, anchored
/// at the start and/or end of the cell.
///
/// `ilike` cannot express a literal `*`, so such operands become an
/// escaped `imatch` regex instead.
fn text_pattern(column: String, operand: &str, anchor_start: bool, anchor_end: bool) -> Filter {
    let edge = |anchored: bool, marker: &'static str, wildcard: &'static str| {
        if anchored { marker } else { wildcard }
    };

    if operand.contains('*') {
        let pattern = format!(
            "{}{}{}",
            edge(anchor_start, "^", ""),
            escape_regex(operand),
            edge(anchor_end, "$", "")
        );
        Filter::imatch(column, pattern)
    } else {
        let pattern = format!(
            "{}{}{}",
            edge(anchor_start, "", "*"),
            escape_like(operand),
            edge(anchor_end, "", "*")
        );
        Filter::ilike(column, pattern)
    }
}

/// Coerces a number-filter operand: JSON numbers and numeric strings pass.
fn numeric_operand(operand: Option<&JsonValue>) -> Result<f64, SkipReason> {
    match operand {
        None | Some(JsonValue::Null) => Err(SkipReason::MissingOperand),
        Some(JsonValue::Number(n)) => n.as_f64().ok_or_else(|| SkipReason::NotNumeric(n.to_string())),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| SkipReason::NotNumeric(format!("'{}'", s))),
        Some(other) => Err(SkipReason::NotNumeric(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(value: JsonValue) -> FilterModel {
        serde_json::from_value(value).unwrap()
    }

    fn translate(value: JsonValue) -> Translation {
        FilterTranslator::new(&ColumnMap::epd()).translate(&model(value))
    }

    #[test]
    fn test_text_contains() {
        let t = translate(json!({
            "Country": { "filterType": "text", "type": "contains", "filter": "usa" }
        }));
        assert_eq!(t.filters, vec![Filter::ilike("\"Country\"", "*usa*")]);
        assert!(t.skipped.is_empty());
    }

    #[test]
    fn test_text_operators() {
        let cases = [
            ("notContains", Filter::ilike("\"Country\"", "*us*").not()),
            ("equals", Filter::ilike("\"Country\"", "us")),
            ("notEqual", Filter::ilike("\"Country\"", "us").not()),
            ("startsWith", Filter::ilike("\"Country\"", "us*")),
            ("endsWith", Filter::ilike("\"Country\"", "*us")),
            ("blank", Filter::is_null("\"Country\"")),
            ("notBlank", Filter::is_not_null("\"Country\"")),
        ];
        for (operator, expected) in cases {
            let t = translate(json!({
                "Country": { "filterType": "text", "type": operator, "filter": "us" }
            }));
            assert_eq!(t.filters, vec![expected], "operator {}", operator);
        }
    }

    #[test]
    fn test_text_operand_is_escaped() {
        let t = translate(json!({
            "Product Name": { "filterType": "text", "type": "contains", "filter": "100%_recycled" }
        }));
        assert_eq!(
            t.filters,
            vec![Filter::ilike("\"Product Name\"", "*100\\%\\_recycled*")]
        );
    }

    #[test]
    fn test_text_operand_with_star_matches_literally() {
        let cases = [
            ("equals", Filter::imatch("\"Product Name\"", "^mix\\*a$")),
            ("notEqual", Filter::imatch("\"Product Name\"", "^mix\\*a$").not()),
            ("contains", Filter::imatch("\"Product Name\"", "mix\\*a")),
            ("notContains", Filter::imatch("\"Product Name\"", "mix\\*a").not()),
            ("startsWith", Filter::imatch("\"Product Name\"", "^mix\\*a")),
            ("endsWith", Filter::imatch("\"Product Name\"", "mix\\*a$")),
        ];
        for (operator, expected) in cases {
            let t = translate(json!({
                "Product Name": { "filterType": "text", "type": operator, "filter": "mix*a" }
            }));
            assert_eq!(t.filters, vec![expected], "operator {}", operator);
        }
    }

    #[test]
    fn test_number_operators() {
        let column = "\"GWP per Default Unit\"";
        let cases = [
            ("equals", Filter::eq(column, 5.0)),
            ("notEqual", Filter::ne(column, 5.0)),
            ("lessThan", Filter::lt(column, 5.0)),
            ("lessThanOrEqual", Filter::le(column, 5.0)),
            ("greaterThan", Filter::gt(column, 5.0)),
            ("greaterThanOrEqual", Filter::ge(column, 5.0)),
        ];
        for (operator, expected) in cases {
            let t = translate(json!({
                "GWP per Default Unit": { "filterType": "number", "type": operator, "filter": 5 }
            }));
            assert_eq!(t.filters, vec![expected], "operator {}", operator);
        }
    }

    #[test]
    fn test_number_in_range_and_string_operand() {
        let column = "\"GWP per Default Unit\"";
        let t = translate(json!({
            "GWP per Default Unit": { "filterType": "number", "type": "inRange", "filter": "10", "filterTo": 20.5 }
        }));
        assert_eq!(
            t.filters,
            vec![Filter::and([Filter::ge(column, 10.0), Filter::le(column, 20.5)])]
        );
    }

    #[test]
    fn test_non_numeric_operand_is_skipped() {
        let t = translate(json!({
            "GWP per Default Unit": { "filterType": "number", "type": "greaterThan", "filter": "lots" },
            "Country": { "filterType": "text", "type": "equals", "filter": "USA" }
        }));
        assert_eq!(t.filters, vec![Filter::ilike("\"Country\"", "USA")]);
        assert_eq!(t.skipped.len(), 1);
        assert_eq!(t.skipped[0].field, "GWP per Default Unit");
        assert!(matches!(t.skipped[0].reason, SkipReason::NotNumeric(_)));
    }

    #[test]
    fn test_in_range_missing_upper_bound() {
        let t = translate(json!({
            "GWP per Default Unit": { "filterType": "number", "type": "inRange", "filter": 1 }
        }));
        assert!(t.filters.is_empty());
        assert_eq!(t.skipped[0].reason, SkipReason::MissingOperand);
    }

    #[test]
    fn test_set_filter() {
        let t = translate(json!({
            "Country": { "filterType": "set", "values": ["USA", "Canada"] },
            "Manufacturer": { "filterType": "set", "values": ["Acme", null] },
            "Plant Name": { "filterType": "set", "values": [] },
            "Product Name": { "filterType": "set", "values": "Acme" }
        }));
        assert_eq!(
            t.filters,
            vec![
                Filter::is_in("\"Country\"", [Value::from("USA"), Value::from("Canada")]),
                Filter::or([
                    Filter::is_in("\"Manufacturer\"", [Value::from("Acme")]),
                    Filter::is_null("\"Manufacturer\""),
                ]),
            ]
        );
        let reasons: Vec<_> = t.skipped.iter().map(|s| (s.field.as_str(), &s.reason)).collect();
        assert_eq!(reasons[0], ("Plant Name", &SkipReason::EmptySet));
        assert!(matches!(reasons[1], ("Product Name", SkipReason::MalformedSet(_))));
    }

    #[test]
    fn test_combined_filter_dropped_by_default() {
        let t = translate(json!({
            "Country": {
                "filterType": "text",
                "operator": "AND",
                "conditions": [
                    { "filterType": "text", "type": "contains", "filter": "us" },
                    { "filterType": "text", "type": "endsWith", "filter": "a" }
                ]
            }
        }));
        assert!(t.filters.is_empty());
        assert_eq!(t.skipped[0].reason, SkipReason::Combined(JoinOperator::And));
    }

    #[test]
    fn test_combined_filter_translated_when_enabled() {
        let columns = ColumnMap::epd();
        let translator = FilterTranslator::new(&columns).combined_filters(CombinedFilterPolicy::Translate);
        let t = translator.translate(&model(json!({
            "GWP per Default Unit": {
                "filterType": "number",
                "operator": "OR",
                "conditions": [
                    { "filterType": "number", "type": "lessThan", "filter": 5 },
                    { "filterType": "number", "type": "greaterThan", "filter": 50 }
                ]
            }
        })));
        let column = "\"GWP per Default Unit\"";
        assert_eq!(
            t.filters,
            vec![Filter::or([Filter::lt(column, 5.0), Filter::gt(column, 50.0)])]
        );
    }

    #[test]
    fn test_unknown_type_and_operator_skipped() {
        let t = translate(json!({
            "Country": { "filterType": "text", "type": "soundsLike", "filter": "usa" },
            "Manufacturer": { "filterType": "date", "type": "equals", "dateFrom": "2024-01-01" }
        }));
        assert!(t.filters.is_empty());
        assert_eq!(t.skipped.len(), 2);
    }

    #[test]
    fn test_apply_empty_model_leaves_query() {
        let columns = ColumnMap::epd();
        let query = Query::new("EPD");
        let (applied, skipped) = FilterTranslator::new(&columns).apply(query.clone(), &FilterModel::new());
        assert_eq!(applied, query);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Translate".parse(), Ok(CombinedFilterPolicy::Translate));
        assert_eq!("drop".parse(), Ok(CombinedFilterPolicy::Drop));
        assert!("maybe".parse::<CombinedFilterPolicy>().is_err());
    }
}
