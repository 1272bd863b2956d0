//! Dynamic table row

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use super::Value;
use crate::error::FieldError;

/// One row of the EPD table.
///
/// Rows hold cell values keyed by column name and serialize to a flat JSON
/// object, which is the shape the grid expects in `rowData`.
///
/// # Example
///
/// ```
/// use epd_grid_lib::model::Row;
///
/// let row = Row::new()
///     .set("Country", "USA")
///     .set("GWP per Default Unit", 412.5);
///
/// assert_eq!(row.get_str("Country").unwrap(), Some("USA"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: HashMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the cell value, if the column exists.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Returns `true` if the row contains the given column.
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Returns a reference to all cells.
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    /// Returns the number of cells.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sets a cell value (builder pattern).
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Inserts a cell value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Removes a cell and returns its value.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.fields.remove(column)
    }

    // Typed getters return Err if the column is missing or has the wrong
    // type, and Ok(None) only when the cell is null.

    /// Gets a text cell.
    pub fn get_str(&self, column: &str) -> Result<Option<&str>, FieldError> {
        match self.fields.get(column) {
            None => Err(FieldError::missing(column)),
            Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(FieldError::type_mismatch(column, "string", other.type_name())),
        }
    }

    /// Gets a numeric cell, parsing text cells that hold a number.
    pub fn get_f64(&self, column: &str) -> Result<Option<f64>, FieldError> {
        match self.fields.get(column) {
            None => Err(FieldError::missing(column)),
            Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(Some(*n)),
            Some(value @ Value::String(s)) => value
                .as_number()
                .map(Some)
                .ok_or_else(|| FieldError::not_numeric(column, s.as_str())),
            Some(other) => Err(FieldError::type_mismatch(column, "number", other.type_name())),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_json() {
        let row: Row = serde_json::from_str(
            r#"{"Country": "USA", "GWP per Default Unit": 412.5, "Plant Name": null}"#,
        )
        .unwrap();

        assert_eq!(row.get_str("Country").unwrap(), Some("USA"));
        assert_eq!(row.get_f64("GWP per Default Unit").unwrap(), Some(412.5));
        assert_eq!(row.get_str("Plant Name").unwrap(), None);
        assert!(matches!(
            row.get_str("Manufacturer"),
            Err(FieldError::Missing { .. })
        ));
    }

    #[test]
    fn test_get_f64_parses_text() {
        let row = Row::new().set("a", "12.5").set("b", "n/a");
        assert_eq!(row.get_f64("a").unwrap(), Some(12.5));
        assert!(matches!(row.get_f64("b"), Err(FieldError::NotNumeric { .. })));
    }

    #[test]
    fn test_type_mismatch() {
        let row = Row::new().set("Country", 1.0);
        assert!(matches!(
            row.get_str("Country"),
            Err(FieldError::TypeMismatch { expected: "string", actual: "number", .. })
        ));
    }
}
