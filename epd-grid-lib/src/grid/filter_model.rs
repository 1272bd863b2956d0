//! The grid's filter model.
//!
//! The grid sends one filter descriptor per filtered column, keyed by field
//! name. Each descriptor is parsed into a [`ColumnFilter`] variant; entries
//! that cannot be parsed become [`ColumnFilter::Malformed`] instead of
//! failing the whole request, so one bad column never hides the rest.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Filter descriptors keyed by field name, applied in field order.
pub type FilterModel = BTreeMap<String, ColumnFilter>;

/// One column's filter descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    /// `filterType: "text"`
    Text(TextFilter),
    /// `filterType: "number"`
    Number(NumberFilter),
    /// `filterType: "set"`
    Set(SetFilter),
    /// Two or more conditions joined by `AND`/`OR`.
    Combined(CombinedFilter),
    /// A filter type this handler does not know (e.g. `date`).
    Unsupported {
        /// The `filterType` that was sent.
        filter_type: String,
    },
    /// A descriptor that does not have the expected shape.
    Malformed {
        /// Why parsing failed.
        reason: String,
    },
}

impl ColumnFilter {
    /// Parses a descriptor from its JSON form. Never fails.
    pub fn from_json(value: JsonValue) -> Self {
        let is_combined = value.get("operator").is_some()
            && (value.get("conditions").is_some() || value.get("condition1").is_some());

        if is_combined {
            return match serde_json::from_value::<CombinedFilter>(value) {
                Ok(combined) => ColumnFilter::Combined(combined),
                Err(e) => ColumnFilter::Malformed { reason: e.to_string() },
            };
        }

        match SimpleFilter::from_json(value) {
            Ok(simple) => simple.into(),
            Err(reason) => ColumnFilter::Malformed { reason },
        }
    }
}

impl<'de> Deserialize<'de> for ColumnFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(ColumnFilter::from_json(value))
    }
}

/// A single-condition filter, the building block of combined filters.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleFilter {
    /// Text condition.
    Text(TextFilter),
    /// Number condition.
    Number(NumberFilter),
    /// Set membership.
    Set(SetFilter),
    /// Unknown filter type.
    Unsupported(String),
}

impl SimpleFilter {
    /// Parses a single condition, dispatching on `filterType`.
    pub fn from_json(value: JsonValue) -> Result<Self, String> {
        let filter_type = match value.get("filterType") {
            Some(JsonValue::String(t)) => t.clone(),
            Some(other) => return Err(format!("filterType must be a string, got {}", other)),
            None => return Err("missing filterType".to_string()),
        };

        let parsed = match filter_type.as_str() {
            "text" => serde_json::from_value(value).map(SimpleFilter::Text),
            "number" => serde_json::from_value(value).map(SimpleFilter::Number),
            "set" => serde_json::from_value(value).map(SimpleFilter::Set),
            _ => return Ok(SimpleFilter::Unsupported(filter_type)),
        };
        parsed.map_err(|e| e.to_string())
    }
}

impl From<SimpleFilter> for ColumnFilter {
    fn from(filter: SimpleFilter) -> Self {
        match filter {
            SimpleFilter::Text(f) => ColumnFilter::Text(f),
            SimpleFilter::Number(f) => ColumnFilter::Number(f),
            SimpleFilter::Set(f) => ColumnFilter::Set(f),
            SimpleFilter::Unsupported(filter_type) => ColumnFilter::Unsupported { filter_type },
        }
    }
}

impl<'de> Deserialize<'de> for SimpleFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        SimpleFilter::from_json(value).map_err(serde::de::Error::custom)
    }
}

/// Text filter operators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TextOperator {
    Contains,
    NotContains,
    Equals,
    NotEqual,
    StartsWith,
    EndsWith,
    Blank,
    NotBlank,
    /// Any operator name not listed above.
    Other(String),
}

impl From<String> for TextOperator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "contains" => TextOperator::Contains,
            "notContains" => TextOperator::NotContains,
            "equals" => TextOperator::Equals,
            "notEqual" => TextOperator::NotEqual,
            "startsWith" => TextOperator::StartsWith,
            "endsWith" => TextOperator::EndsWith,
            "blank" => TextOperator::Blank,
            "notBlank" => TextOperator::NotBlank,
            _ => TextOperator::Other(name),
        }
    }
}

/// `{ filterType: "text", type, filter }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextFilter {
    #[serde(rename = "type")]
    pub operator: TextOperator,
    #[serde(default)]
    pub filter: Option<String>,
}

/// Number filter operators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NumberOperator {
    Equals,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    InRange,
    Blank,
    NotBlank,
    /// Any operator name not listed above.
    Other(String),
}

impl From<String> for NumberOperator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "equals" => NumberOperator::Equals,
            "notEqual" => NumberOperator::NotEqual,
            "lessThan" => NumberOperator::LessThan,
            "lessThanOrEqual" => NumberOperator::LessThanOrEqual,
            "greaterThan" => NumberOperator::GreaterThan,
            "greaterThanOrEqual" => NumberOperator::GreaterThanOrEqual,
            "inRange" => NumberOperator::InRange,
            "blank" => NumberOperator::Blank,
            "notBlank" => NumberOperator::NotBlank,
            _ => NumberOperator::Other(name),
        }
    }
}

/// `{ filterType: "number", type, filter, filterTo }`
///
/// Operands are kept as raw JSON; the grid sends numbers, but hand-written
/// clients send strings too, and coercion happens at translation time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberFilter {
    #[serde(rename = "type")]
    pub operator: NumberOperator,
    #[serde(default)]
    pub filter: Option<JsonValue>,
    #[serde(default)]
    pub filter_to: Option<JsonValue>,
}

/// `{ filterType: "set", values }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetFilter {
    #[serde(default)]
    pub values: Option<JsonValue>,
}

/// Logical connective of a combined filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinOperator {
    And,
    Or,
}

/// `{ filterType, operator: "AND" | "OR", conditions: [...] }`
///
/// Older grid versions send `condition1`/`condition2` instead of a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedFilter {
    #[serde(default)]
    pub filter_type: Option<String>,
    pub operator: JoinOperator,
    #[serde(default)]
    pub conditions: Vec<SimpleFilter>,
    #[serde(default)]
    pub condition1: Option<SimpleFilter>,
    #[serde(default)]
    pub condition2: Option<SimpleFilter>,
}

impl CombinedFilter {
    /// Returns every condition, whichever form the grid used.
    pub fn all_conditions(&self) -> Vec<&SimpleFilter> {
        if !self.conditions.is_empty() {
            return self.conditions.iter().collect();
        }
        self.condition1.iter().chain(self.condition2.iter()).collect()
    }
}
