//! Grid request and response shapes.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use super::FilterModel;
use crate::api::query::Direction;
use crate::model::Row;

/// Row count sent when more rows exist beyond the returned page.
pub const MORE_ROWS: i64 = -1;

/// One request from the grid for rows.
///
/// Describes either a page of leaf rows inside a fully expanded group path,
/// or the next level of group values, depending on how many `group_keys`
/// are set relative to `row_group_cols`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRequest {
    /// First row requested (inclusive).
    #[serde(default)]
    pub start_row: usize,
    /// Last row requested (exclusive). Absent means "all remaining rows".
    #[serde(default)]
    pub end_row: Option<usize>,
    /// Requested ordering, highest priority first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sort_model: Vec<SortModelItem>,
    /// Active column filters.
    #[serde(default, deserialize_with = "null_as_default")]
    pub filter_model: FilterModel,
    /// Columns the grid is grouped by, outermost first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub row_group_cols: Vec<RowGroupColumn>,
    /// Values of the groups already expanded, outermost first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_keys: Vec<String>,
}

impl GridRequest {
    /// Creates a request for rows `[start, end)`.
    pub fn rows(start: usize, end: usize) -> Self {
        Self {
            start_row: start,
            end_row: Some(end),
            ..Self::default()
        }
    }

    /// Returns `true` when every grouping level has a key, i.e. the grid
    /// wants leaf rows.
    pub fn is_leaf_request(&self) -> bool {
        self.group_keys.len() == self.row_group_cols.len()
    }

    /// Returns every field name the request refers to.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        fields.extend(self.row_group_cols.iter().map(RowGroupColumn::field_name));
        fields.extend(self.sort_model.iter().map(|s| s.col_id.as_str()));
        fields.extend(self.filter_model.keys().map(String::as_str));
        fields
    }
}

/// One entry of the sort model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortModelItem {
    /// Field to sort by.
    pub col_id: String,
    /// Sort direction.
    pub sort: Direction,
}

/// A column the grid groups by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowGroupColumn {
    /// Column id.
    pub id: String,
    /// Header text.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Field name; falls back to `id` when absent.
    #[serde(default)]
    pub field: Option<String>,
}

impl RowGroupColumn {
    /// Creates a group column whose id and field are both `field`.
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            id: field.clone(),
            display_name: None,
            field: Some(field),
        }
    }

    /// Returns the field name used for mapping and for the row key.
    pub fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.id)
    }
}

/// Rows for the grid plus the row-count hint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResponse {
    /// Rows of the requested page or group level.
    pub row_data: Vec<Row>,
    /// Exact total, or [`MORE_ROWS`] when the page is not the last.
    pub row_count: i64,
}

impl GridResponse {
    /// Returns `true` if the grid can stop paginating.
    pub fn is_last_page(&self) -> bool {
        self.row_count != MORE_ROWS
    }
}

/// Computes the row-count hint for a leaf page.
///
/// With an exact count the page is closed once `end_row` reaches it. Without
/// one, a short page means the end was reached.
pub fn last_row(start_row: usize, end_row: Option<usize>, total: Option<usize>, returned: usize) -> i64 {
    match (total, end_row) {
        (Some(total), Some(end)) if end >= total => to_i64(total),
        (Some(total), None) => to_i64(total),
        (Some(_), Some(_)) => MORE_ROWS,
        (None, Some(end)) if returned < end.saturating_sub(start_row) => to_i64(start_row + returned),
        (None, None) => to_i64(start_row + returned),
        (None, Some(_)) => MORE_ROWS,
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_grid_request() {
        let request: GridRequest = serde_json::from_value(json!({
            "startRow": 0,
            "endRow": 50,
            "sortModel": [{ "colId": "GWP per Default Unit", "sort": "desc" }],
            "filterModel": { "Country": { "filterType": "text", "type": "contains", "filter": "usa" } },
            "rowGroupCols": [
                { "id": "Material Category", "displayName": "Material Category", "field": "Material Category" },
                { "id": "Country" }
            ],
            "groupKeys": ["Concrete"],
            "valueCols": [],
            "pivotMode": false
        }))
        .unwrap();

        assert_eq!(request.end_row, Some(50));
        assert_eq!(request.sort_model[0].sort, Direction::Desc);
        assert_eq!(request.row_group_cols[1].field_name(), "Country");
        assert!(!request.is_leaf_request());
        assert_eq!(
            request.referenced_fields(),
            vec!["Material Category", "Country", "GWP per Default Unit", "Country"]
        );
    }

    #[test]
    fn test_null_filter_model() {
        let request: GridRequest =
            serde_json::from_value(json!({ "startRow": 0, "endRow": 100, "filterModel": null })).unwrap();
        assert!(request.filter_model.is_empty());
        assert!(request.is_leaf_request());
    }

    #[test]
    fn test_last_row_with_count() {
        assert_eq!(last_row(0, Some(50), Some(120), 50), MORE_ROWS);
        assert_eq!(last_row(100, Some(150), Some(120), 20), 120);
        assert_eq!(last_row(0, Some(50), Some(50), 50), 50);
        assert_eq!(last_row(0, None, Some(7), 7), 7);
    }

    #[test]
    fn test_last_row_without_count() {
        assert_eq!(last_row(0, Some(50), None, 50), MORE_ROWS);
        assert_eq!(last_row(50, Some(100), None, 12), 62);
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = GridResponse {
            row_data: vec![Row::new().set("Country", "USA")],
            row_count: 1,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "rowData": [{ "Country": "USA" }], "rowCount": 1 })
        );
    }
}
