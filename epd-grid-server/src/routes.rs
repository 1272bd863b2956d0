//! Request routing.

use std::sync::Arc;

use epd_grid_lib::grid::fetch_all;
use epd_grid_lib::grid::GridRequest;
use epd_grid_lib::grid::GridResponse;
use epd_grid_lib::grid::ServerSideDatasource;
use epd_grid_lib::model::Row;
use epd_grid_lib::Backend;
use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::header::CONTENT_TYPE;
use hyper::Method;
use hyper::Request;
use hyper::Response;
use hyper::StatusCode;
use serde::Serialize;

/// Shared by every connection.
pub struct AppState {
    datasource: ServerSideDatasource<Arc<dyn Backend>>,
}

impl AppState {
    pub fn new(datasource: ServerSideDatasource<Arc<dyn Backend>>) -> Self {
        Self { datasource }
    }
}

/// `POST /rows` success body.
#[derive(Serialize)]
struct RowsReply {
    success: bool,
    #[serde(flatten)]
    response: GridResponse,
}

/// `GET /rows` success body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReply {
    row_data: Vec<Row>,
    row_count: usize,
}

pub async fn handle(state: &AppState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            log::warn!("Failed to read request body: {}", e);
            return json(StatusCode::BAD_REQUEST, &serde_json::json!({ "success": false }));
        }
    };

    route(state, &method, &path, body).await
}

pub async fn route(state: &AppState, method: &Method, path: &str, body: Bytes) -> Response<Full<Bytes>> {
    log::debug!("{} {}", method, path);

    match (method, path) {
        (&Method::POST, "/rows") => server_side_rows(state, &body).await,
        (&Method::GET, "/rows") => all_rows(state).await,
        _ => json(StatusCode::NOT_FOUND, &serde_json::json!({ "error": "Not found" })),
    }
}

async fn server_side_rows(state: &AppState, body: &[u8]) -> Response<Full<Bytes>> {
    let failure = serde_json::json!({ "success": false });

    let request: GridRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Malformed grid request: {}", e);
            return json(StatusCode::BAD_REQUEST, &failure);
        }
    };

    match state.datasource.get_rows(&request).await {
        Ok(response) => json(
            StatusCode::OK,
            &RowsReply {
                success: true,
                response,
            },
        ),
        Err(epd_grid_lib::error::Error::Api(_)) => json(StatusCode::BAD_GATEWAY, &failure),
        Err(_) => json(StatusCode::BAD_REQUEST, &failure),
    }
}

async fn all_rows(state: &AppState) -> Response<Full<Bytes>> {
    match fetch_all(state.datasource.backend(), state.datasource.table()).await {
        Ok(page) => {
            let row_count = page.total_count().unwrap_or(page.len());
            json(
                StatusCode::OK,
                &TableReply {
                    row_data: page.into_rows(),
                    row_count,
                },
            )
        }
        Err(e) => json(
            StatusCode::BAD_GATEWAY,
            &serde_json::json!({ "error": format!("Failed to load data: {}", e) }),
        ),
    }
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            log::error!("Failed to serialize response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, b"{}".to_vec())
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use epd_grid_lib::backend::MemoryBackend;
    use epd_grid_lib::grid::ColumnMap;
    use epd_grid_lib::grid::DatasourceOptions;
    use serde_json::json;
    use serde_json::Value as JsonValue;

    fn state() -> AppState {
        state_with(DatasourceOptions::default())
    }

    fn state_with(options: DatasourceOptions) -> AppState {
        let rows = vec![
            Row::new()
                .set("Material Category", "Concrete")
                .set("Country", "USA Plant")
                .set("GWP per Default Unit", 310.0),
            Row::new()
                .set("Material Category", "Concrete")
                .set("Country", "Canada")
                .set("GWP per Default Unit", 280.0),
            Row::new()
                .set("Material Category", "Steel")
                .set("Country", "USA")
                .set("GWP per Default Unit", 1200.0),
        ];
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new("EPD", rows));
        AppState::new(ServerSideDatasource::new(backend, "EPD", ColumnMap::epd()).with_options(options))
    }

    async fn call(state: &AppState, method: Method, path: &str, body: JsonValue) -> (StatusCode, JsonValue) {
        let response = route(state, &method, path, Bytes::from(body.to_string())).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_post_rows_leaf_page() {
        let (status, body) = call(
            &state(),
            Method::POST,
            "/rows",
            json!({
                "startRow": 0,
                "endRow": 50,
                "filterModel": { "Country": { "filterType": "text", "type": "contains", "filter": "usa" } },
                "sortModel": [{ "colId": "GWP per Default Unit", "sort": "asc" }],
                "rowGroupCols": [],
                "groupKeys": []
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["rowCount"], 2);
        assert_eq!(body["rowData"][0]["Country"], "USA Plant");
        assert_eq!(body["rowData"][1]["Country"], "USA");
    }

    #[tokio::test]
    async fn test_post_rows_group_level() {
        let (status, body) = call(
            &state(),
            Method::POST,
            "/rows",
            json!({
                "startRow": 0,
                "endRow": 100,
                "rowGroupCols": [{ "id": "Material Category", "displayName": "Material Category", "field": "Material Category" }],
                "groupKeys": []
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "rowData": [{ "Material Category": "Concrete" }, { "Material Category": "Steel" }],
                "rowCount": 2
            })
        );
    }

    #[tokio::test]
    async fn test_post_rows_backend_failure() {
        let (status, body) = call(
            &state(),
            Method::POST,
            "/rows",
            json!({ "startRow": 0, "endRow": 50, "sortModel": [{ "colId": "Colour", "sort": "desc" }] }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "success": false }));
    }

    #[tokio::test]
    async fn test_post_rows_group_failure() {
        let state = state_with(DatasourceOptions::default().with_groups_function("missing"));
        let (status, body) = call(
            &state,
            Method::POST,
            "/rows",
            json!({
                "startRow": 0,
                "endRow": 100,
                "rowGroupCols": [{ "id": "Material Category", "field": "Material Category" }],
                "groupKeys": []
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "success": false }));
    }

    #[tokio::test]
    async fn test_post_rows_malformed_body() {
        let response = route(&state(), &Method::POST, "/rows", Bytes::from_static(b"not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_rows_full_fetch() {
        let (status, body) = call(&state(), Method::GET, "/rows", JsonValue::Null).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rowCount"], 3);
        assert_eq!(body["rowData"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_rows_failure_message() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new("EPD", Vec::new()));
        let state = AppState::new(ServerSideDatasource::new(backend, "epd_v2", ColumnMap::epd()));

        let (status, body) = call(&state, Method::GET, "/rows", JsonValue::Null).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().starts_with("Failed to load data: "));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = call(&state(), Method::GET, "/columns", JsonValue::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
