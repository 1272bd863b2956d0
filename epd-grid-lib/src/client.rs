//! Main PostgrestClient

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::error::ApiError;

/// Client for a PostgREST endpoint such as Supabase's `/rest/v1`.
///
/// This client is cheap to clone (uses `Arc` internally) and can be shared
/// across concurrent grid requests.
///
/// # Example
///
/// ```ignore
/// use epd_grid_lib::PostgrestClient;
///
/// let client = PostgrestClient::builder()
///     .url("https://project.supabase.co")
///     .api_key(std::env::var("SUPABASE_ANON_KEY")?)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct PostgrestClient {
    pub(crate) inner: Arc<PostgrestClientInner>,
}

pub(crate) struct PostgrestClientInner {
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) schema: Option<String>,
    pub(crate) http_client: Client,
    pub(crate) timeout: Option<Duration>,
}

impl PostgrestClient {
    /// Creates a new builder for constructing a client.
    pub fn builder() -> PostgrestClientBuilder<Missing, Missing> {
        PostgrestClientBuilder::new()
    }

    /// Returns the project URL.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Returns the REST endpoint root, e.g. `https://project.supabase.co/rest/v1`.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url().trim_end_matches('/'))
    }

    /// Returns the Postgres schema sent as a profile header, if set.
    pub fn schema(&self) -> Option<&str> {
        self.inner.schema.as_deref()
    }
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.inner.base_url)
            .field("schema", &self.inner.schema)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing a [`PostgrestClient`].
///
/// Uses the typestate pattern to ensure required fields are set at compile time.
///
/// # Required Fields
///
/// - `url` - The project URL
/// - `api_key` - The anon (or service) key, sent as `apikey` and bearer token
///
/// # Example
///
/// ```ignore
/// let client = PostgrestClient::builder()
///     .url("https://project.supabase.co")
///     .api_key(key)
///     .schema("public")
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub struct PostgrestClientBuilder<Url, Key> {
    url: Url,
    api_key: Key,
    schema: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    http_client: Option<Client>,
}

impl PostgrestClientBuilder<Missing, Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: Missing,
            api_key: Missing,
            schema: None,
            timeout: None,
            connect_timeout: None,
            http_client: None,
        }
    }
}

impl Default for PostgrestClientBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> PostgrestClientBuilder<Missing, K> {
    /// Sets the project URL.
    pub fn url(self, url: impl Into<String>) -> PostgrestClientBuilder<Set<String>, K> {
        PostgrestClientBuilder {
            url: Set(url.into()),
            api_key: self.api_key,
            schema: self.schema,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            http_client: self.http_client,
        }
    }
}

impl<U> PostgrestClientBuilder<U, Missing> {
    /// Sets the API key.
    pub fn api_key(self, key: impl Into<String>) -> PostgrestClientBuilder<U, Set<String>> {
        PostgrestClientBuilder {
            url: self.url,
            api_key: Set(key.into()),
            schema: self.schema,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            http_client: self.http_client,
        }
    }
}

impl<U, K> PostgrestClientBuilder<U, K> {
    /// Sets the Postgres schema (`Accept-Profile` / `Content-Profile`).
    ///
    /// Defaults to the schema PostgREST exposes first, usually `public`.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the request timeout.
    ///
    /// Unset by default: a hung backend call hangs the grid request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// This is applied when building the HTTP client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets a custom HTTP client.
    ///
    /// If not set, a default client will be created.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl PostgrestClientBuilder<Set<String>, Set<String>> {
    /// Builds the [`PostgrestClient`].
    ///
    /// This method is only available when both `url` and `api_key` have been set.
    pub fn build(self) -> Result<PostgrestClient, ApiError> {
        let url = self.url.0;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(url));
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(PostgrestClient {
            inner: Arc::new(PostgrestClientInner {
                base_url: url,
                api_key: self.api_key.0,
                schema: self.schema,
                http_client,
                timeout: self.timeout,
            }),
        })
    }
}
