//! Request execution against PostgREST.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_RANGE;
use reqwest::Method;
use url::Url;

use super::query::url::query_params;
use super::query::Page;
use super::query::Query;
use super::RpcCall;
use crate::backend::Backend;
use crate::error::ApiError;
use crate::error::Error;
use crate::error::PostgrestErrorDetail;
use crate::model::Row;
use crate::PostgrestClient;

impl PostgrestClient {
    /// Builds the URL for a read query, parameters included.
    pub fn query_url(&self, query: &Query) -> Result<Url, ApiError> {
        let mut url = self.endpoint_url(&urlencoding::encode(query.table()))?;
        url.query_pairs_mut().extend_pairs(query_params(query));
        Ok(url)
    }

    /// Builds the URL for a remote procedure call.
    pub fn rpc_url(&self, function: &str) -> Result<Url, ApiError> {
        self.endpoint_url(&format!("rpc/{}", urlencoding::encode(function)))
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.rest_url(), path);
        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    /// Headers sent with every request: key, bearer token, JSON accept and
    /// the schema profile.
    fn default_headers(&self, method: &Method) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let key = header_value(&self.inner.api_key)?;
        headers.insert("apikey", key);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", self.inner.api_key))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(schema) = &self.inner.schema {
            let profile = if *method == Method::GET {
                "Accept-Profile"
            } else {
                "Content-Profile"
            };
            headers.insert(profile, header_value(schema)?);
        }

        Ok(headers)
    }

    /// Sends a request and returns the response if the status is a success.
    ///
    /// Error statuses are turned into [`ApiError::Http`], with the PostgREST
    /// error body attached when it parses.
    pub(crate) async fn request(
        &self,
        method: Method,
        url: Url,
        headers: impl Into<Option<HeaderMap>>,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, Error> {
        let mut all_headers = self.default_headers(&method)?;
        if let Some(extra) = headers.into() {
            all_headers.extend(extra);
        }

        log::debug!("{} {}", method, url);

        let mut request = self
            .inner
            .http_client
            .request(method, url)
            .headers(all_headers);

        if let Some(body) = &body {
            request = request.json(body);
        }

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let error = match serde_json::from_str::<PostgrestErrorDetail>(&body) {
            Ok(detail) => ApiError::http_with_detail(status, detail),
            Err(_) => ApiError::http(status, body),
        };
        Err(Error::Api(error))
    }

    fn map_send_error(&self, error: reqwest::Error) -> ApiError {
        match self.inner.timeout {
            Some(timeout) if error.is_timeout() => ApiError::Timeout(timeout),
            _ => ApiError::Network(error),
        }
    }
}

#[async_trait]
impl Backend for PostgrestClient {
    async fn fetch(&self, query: &Query) -> Result<Page, Error> {
        let url = self.query_url(query)?;

        let mut headers = HeaderMap::new();
        if query.counts() {
            headers.insert("Prefer", HeaderValue::from_static("count=exact"));
        }

        let response = self.request(Method::GET, url, headers, None).await?;

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        let body = response.text().await.map_err(ApiError::from)?;
        let rows: Vec<Row> = serde_json::from_str(&body)
            .map_err(|e| ApiError::parse_with_body(format!("Invalid rows: {}", e), body))?;

        let page = Page::new(rows);
        Ok(match total {
            Some(count) if query.counts() => page.with_total_count(count),
            _ => page,
        })
    }

    async fn rpc(&self, call: &RpcCall) -> Result<Vec<Row>, Error> {
        let url = self.rpc_url(call.function())?;
        let body = serde_json::Value::Object(call.args().clone());

        let response = self.request(Method::POST, url, None, Some(body)).await?;

        let text = response.text().await.map_err(ApiError::from)?;
        let rows: Vec<Row> = serde_json::from_str(&text).map_err(|e| {
            ApiError::parse_with_body(
                format!("Invalid result from {}: {}", call.function(), e),
                text,
            )
        })?;
        Ok(rows)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::parse(format!("Invalid header value: {}", e)))
}

/// Extracts the total from a `Content-Range` header (`0-49/1234`, `*/0`).
///
/// Returns `None` when the total is unknown (`0-49/*`) or the header is
/// malformed.
pub fn parse_content_range(header: &str) -> Option<usize> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}
