//! Server-side row model datasource.

use serde_json::Map;
use serde_json::Value as JsonValue;

use super::last_row;
use super::translate::CombinedFilterPolicy;
use super::translate::FilterTranslator;
use super::ColumnMap;
use super::GridRequest;
use super::GridResponse;
use crate::api::query::Filter;
use crate::api::query::OrderBy;
use crate::api::query::Query;
use crate::api::query::Range;
use crate::api::RpcCall;
use crate::api::DISTINCT_GROUPS_FUNCTION;
use crate::api::GROUP_COLUMN_ARG;
use crate::api::GROUP_VALUE_FIELD;
use crate::api::PARENT_FILTERS_ARG;
use crate::backend::Backend;
use crate::error::Error;
use crate::model::Row;

/// Knobs for [`ServerSideDatasource`].
#[derive(Debug, Clone, PartialEq)]
pub struct DatasourceOptions {
    /// Function returning the distinct values of one column.
    pub groups_function: String,
    /// Send ancestor group keys to the groups function as `parent_filters`.
    pub send_parent_filters: bool,
    /// Reject requests naming unmapped fields instead of quoting them.
    pub strict_columns: bool,
    /// How combined column filters are handled.
    pub combined_filters: CombinedFilterPolicy,
}

impl Default for DatasourceOptions {
    fn default() -> Self {
        Self {
            groups_function: DISTINCT_GROUPS_FUNCTION.to_string(),
            send_parent_filters: false,
            strict_columns: false,
            combined_filters: CombinedFilterPolicy::default(),
        }
    }
}

impl DatasourceOptions {
    pub fn with_groups_function(mut self, name: impl Into<String>) -> Self {
        self.groups_function = name.into();
        self
    }

    pub fn with_parent_filters(mut self, enabled: bool) -> Self {
        self.send_parent_filters = enabled;
        self
    }

    pub fn with_strict_columns(mut self, enabled: bool) -> Self {
        self.strict_columns = enabled;
        self
    }

    pub fn with_combined_filters(mut self, policy: CombinedFilterPolicy) -> Self {
        self.combined_filters = policy;
        self
    }
}

/// Answers grid requests from a [`Backend`].
///
/// A request whose group keys cover every grouping column gets a page of
/// leaf rows; any other request gets the distinct values of the next
/// grouping column.
///
/// # Example
///
/// ```no_run
/// use epd_grid_lib::grid::{ColumnMap, GridRequest, ServerSideDatasource};
/// use epd_grid_lib::PostgrestClient;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PostgrestClient::builder()
///     .url("https://project.supabase.co")
///     .api_key("anon-key")
///     .build()?;
///
/// let datasource = ServerSideDatasource::new(client, "EPD", ColumnMap::epd());
/// let response = datasource.get_rows(&GridRequest::rows(0, 100)).await?;
/// println!("{} rows, last row {}", response.row_data.len(), response.row_count);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ServerSideDatasource<B> {
    backend: B,
    table: String,
    columns: ColumnMap,
    options: DatasourceOptions,
}

impl<B: Backend> ServerSideDatasource<B> {
    pub fn new(backend: B, table: impl Into<String>, columns: ColumnMap) -> Self {
        Self {
            backend,
            table: table.into(),
            columns,
            options: DatasourceOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DatasourceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    pub fn options(&self) -> &DatasourceOptions {
        &self.options
    }

    /// Answers one grid request.
    ///
    /// Any backend error fails the whole request; nothing is retried.
    pub async fn get_rows(&self, request: &GridRequest) -> Result<GridResponse, Error> {
        if self.options.strict_columns {
            self.columns.check_fields(request.referenced_fields())?;
        }
        if request.group_keys.len() > request.row_group_cols.len() {
            return Err(Error::invalid_request(format!(
                "{} group keys for {} grouping columns",
                request.group_keys.len(),
                request.row_group_cols.len()
            )));
        }

        let result = if request.is_leaf_request() {
            self.leaf_rows(request).await
        } else {
            self.group_rows(request).await
        };

        if let Err(e) = &result {
            log::error!("Error fetching rows from {}: {}", self.table, e);
        }
        result
    }

    async fn group_rows(&self, request: &GridRequest) -> Result<GridResponse, Error> {
        let depth = request.group_keys.len();
        let field = request.row_group_cols[depth].field_name();
        let column = self.columns.resolve(field);

        let mut call = RpcCall::new(&self.options.groups_function).arg(GROUP_COLUMN_ARG, column);
        if self.options.send_parent_filters && depth > 0 {
            let parents: Map<String, JsonValue> = self
                .parent_keys(request)
                .map(|(column, key)| (column, JsonValue::String(key.to_string())))
                .collect();
            call = call.arg(PARENT_FILTERS_ARG, parents);
        }

        log::debug!("Fetching groups of '{}' at depth {}", field, depth);
        let rows = self.backend.rpc(&call).await?;

        let row_data: Vec<Row> = rows
            .into_iter()
            .filter_map(|mut row| row.remove(GROUP_VALUE_FIELD))
            .filter(|value| !value.is_null())
            .map(|value| Row::new().set(field, value))
            .collect();

        let row_count = i64::try_from(row_data.len()).unwrap_or(i64::MAX);
        Ok(GridResponse { row_data, row_count })
    }

    async fn leaf_rows(&self, request: &GridRequest) -> Result<GridResponse, Error> {
        let mut query = Query::new(&self.table)
            .include_count()
            .filters(self.parent_keys(request).map(|(column, key)| Filter::eq(column, key)));

        let translator =
            FilterTranslator::new(&self.columns).combined_filters(self.options.combined_filters);
        let (filtered, skipped) = translator.apply(query, &request.filter_model);
        query = filtered;
        if !skipped.is_empty() {
            log::debug!("{} filter(s) not applied", skipped.len());
        }

        if !request.sort_model.is_empty() {
            let order = OrderBy {
                fields: request
                    .sort_model
                    .iter()
                    .map(|item| (self.columns.resolve(&item.col_id), item.sort))
                    .collect(),
            };
            query = query.order_by(order);
        }

        if let Some(end) = request.end_row {
            query = query.range(Range::half_open(request.start_row, end));
        } else if request.start_row > 0 {
            query = query.range(Range::starting_at(request.start_row));
        }

        let page = self.backend.fetch(&query).await?;
        let row_count = last_row(request.start_row, request.end_row, page.total_count(), page.len());

        Ok(GridResponse {
            row_data: page.into_rows(),
            row_count,
        })
    }

    /// Pairs each expanded group's column identifier with its key.
    fn parent_keys<'r>(&'r self, request: &'r GridRequest) -> impl Iterator<Item = (String, &'r str)> + 'r {
        request
            .row_group_cols
            .iter()
            .zip(&request.group_keys)
            .map(|(col, key)| (self.columns.resolve(col.field_name()), key.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::Direction;
    use crate::backend::MemoryBackend;
    use crate::grid::RowGroupColumn;
    use crate::grid::SortModelItem;
    use crate::model::Value;
    use serde_json::json;

    fn epd(category: &str, country: Option<&str>, product: &str, gwp: f64) -> Row {
        Row::new()
            .set("Material Category", category)
            .set("Country", country)
            .set("Product Name", product)
            .set("GWP per Default Unit", gwp)
    }

    fn datasource() -> ServerSideDatasource<MemoryBackend> {
        let rows = vec![
            epd("Concrete", Some("USA"), "Mix A", 310.0),
            epd("Concrete", Some("Canada"), "Mix B", 280.0),
            epd("Concrete", None, "Mix C", 295.0),
            epd("Steel", Some("USA"), "Rebar", 1200.0),
            epd("Wood", Some("Canada"), "CLT", 120.0),
        ];
        let backend = MemoryBackend::new("EPD", rows).with_columns(crate::grid::EPD_COLUMNS);
        ServerSideDatasource::new(backend, "EPD", ColumnMap::epd())
    }

    fn strings(rows: &[Row], field: &str) -> Vec<String> {
        rows.iter()
            .map(|r| r.get_str(field).unwrap().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_top_level_groups() {
        let mut request = GridRequest::rows(0, 100);
        request.row_group_cols = vec![RowGroupColumn::new("Material Category")];

        let response = datasource().get_rows(&request).await.unwrap();
        assert_eq!(strings(&response.row_data, "Material Category"), ["Concrete", "Steel", "Wood"]);
        assert_eq!(response.row_count, 3);
    }

    #[tokio::test]
    async fn test_group_level_drops_null_values() {
        let mut request = GridRequest::rows(0, 100);
        request.row_group_cols = vec![RowGroupColumn::new("Country")];

        let response = datasource().get_rows(&request).await.unwrap();
        assert_eq!(strings(&response.row_data, "Country"), ["Canada", "USA"]);
        assert_eq!(response.row_count, 2);
    }

    #[tokio::test]
    async fn test_nested_groups_with_parent_filters() {
        let mut request = GridRequest::rows(0, 100);
        request.row_group_cols = vec![RowGroupColumn::new("Material Category"), RowGroupColumn::new("Country")];
        request.group_keys = vec!["Steel".to_string()];

        let unfiltered = datasource().get_rows(&request).await.unwrap();
        assert_eq!(unfiltered.row_count, 2);

        let filtered = datasource()
            .with_options(DatasourceOptions::default().with_parent_filters(true))
            .get_rows(&request)
            .await
            .unwrap();
        assert_eq!(strings(&filtered.row_data, "Country"), ["USA"]);
    }

    #[tokio::test]
    async fn test_leaf_rows_under_group_key() {
        let mut request = GridRequest::rows(0, 50);
        request.row_group_cols = vec![RowGroupColumn::new("Material Category")];
        request.group_keys = vec!["Concrete".to_string()];
        request.sort_model = vec![SortModelItem {
            col_id: "GWP per Default Unit".to_string(),
            sort: Direction::Desc,
        }];

        let response = datasource().get_rows(&request).await.unwrap();
        assert_eq!(strings(&response.row_data, "Product Name"), ["Mix A", "Mix C", "Mix B"]);
        assert_eq!(response.row_count, 3);
    }

    #[tokio::test]
    async fn test_leaf_page_reports_more_rows() {
        let mut request = GridRequest::rows(0, 2);
        request.sort_model = vec![SortModelItem {
            col_id: "Product Name".to_string(),
            sort: Direction::Asc,
        }];

        let first = datasource().get_rows(&request).await.unwrap();
        assert_eq!(strings(&first.row_data, "Product Name"), ["CLT", "Mix A"]);
        assert_eq!(first.row_count, crate::grid::MORE_ROWS);

        request.start_row = 4;
        request.end_row = Some(6);
        let last = datasource().get_rows(&request).await.unwrap();
        assert_eq!(strings(&last.row_data, "Product Name"), ["Rebar"]);
        assert_eq!(last.row_count, 5);
    }

    #[tokio::test]
    async fn test_leaf_filters_applied() {
        let mut request = GridRequest::rows(0, 50);
        request.filter_model = serde_json::from_value(json!({
            "Country": { "filterType": "text", "type": "contains", "filter": "usa" },
            "GWP per Default Unit": { "filterType": "number", "type": "lessThan", "filter": "1000" }
        }))
        .unwrap();

        let response = datasource().get_rows(&request).await.unwrap();
        assert_eq!(strings(&response.row_data, "Product Name"), ["Mix A"]);
        assert_eq!(response.row_count, 1);
    }

    #[tokio::test]
    async fn test_combined_filter_does_not_fail() {
        let mut request = GridRequest::rows(0, 50);
        request.filter_model = serde_json::from_value(json!({
            "Country": {
                "filterType": "text",
                "operator": "AND",
                "conditions": [
                    { "filterType": "text", "type": "contains", "filter": "us" },
                    { "filterType": "text", "type": "endsWith", "filter": "a" }
                ]
            }
        }))
        .unwrap();

        let response = datasource().get_rows(&request).await.unwrap();
        assert_eq!(response.row_count, 5);
    }

    #[tokio::test]
    async fn test_strict_columns_rejects_unmapped_field() {
        let mut request = GridRequest::rows(0, 50);
        request.sort_model = vec![SortModelItem {
            col_id: "Colour".to_string(),
            sort: Direction::Asc,
        }];

        let strict = datasource().with_options(DatasourceOptions::default().with_strict_columns(true));
        let err = strict.get_rows(&request).await.unwrap_err();
        assert!(matches!(err, Error::Config(crate::error::ConfigError::UnmappedField(ref f)) if f == "Colour"));
    }

    #[tokio::test]
    async fn test_backend_error_fails_request() {
        let mut request = GridRequest::rows(0, 50);
        request.sort_model = vec![SortModelItem {
            col_id: "Colour".to_string(),
            sort: Direction::Asc,
        }];

        let err = datasource().get_rows(&request).await.unwrap_err();
        assert!(matches!(err, Error::Api(crate::error::ApiError::Http { status: 400, .. })));
        assert!(err.to_string().contains("Colour"));
    }

    #[tokio::test]
    async fn test_group_backend_error_fails_request() {
        let options = DatasourceOptions::default().with_groups_function("missing");
        let datasource = datasource().with_options(options);
        let mut request = GridRequest::rows(0, 100);
        request.row_group_cols = vec![RowGroupColumn::new("Material Category")];

        let err = datasource.get_rows(&request).await.unwrap_err();
        match err {
            Error::Api(api) => {
                assert_eq!(api.status_code(), Some(404));
                assert_eq!(api.error_code(), Some("PGRST202"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_too_many_group_keys() {
        let mut request = GridRequest::rows(0, 50);
        request.group_keys = vec!["Concrete".to_string()];

        let err = datasource().get_rows(&request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_numeric_group_keys() {
        let mut request = GridRequest::rows(0, 50);
        request.row_group_cols = vec![RowGroupColumn::new("GWP per Default Unit")];
        request.group_keys = vec!["120".to_string()];

        let response = datasource().get_rows(&request).await.unwrap();
        assert_eq!(response.row_data.len(), 1);
        assert_eq!(response.row_data[0].get("GWP per Default Unit"), Some(&Value::Number(120.0)));
    }
}
