//! Grid configuration
//!
//! Everything the grid handler needs to know about its deployment: where
//! the rows come from, which table and function to use, and how strictly
//! to treat unmapped fields. Credentials are read from the environment and
//! never compiled in.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::DISTINCT_GROUPS_FUNCTION;
use crate::backend::Backend;
use crate::backend::MemoryBackend;
use crate::client::PostgrestClient;
use crate::error::ConfigError;
use crate::error::Error;
use crate::grid::ColumnMap;
use crate::grid::CombinedFilterPolicy;
use crate::grid::DatasourceOptions;
use crate::grid::ServerSideDatasource;

/// Default table name.
pub const DEFAULT_TABLE: &str = "EPD";

/// Where rows are read from.
#[derive(Clone, PartialEq)]
pub enum BackendSource {
    /// A Supabase/PostgREST project.
    Postgrest {
        /// Project URL, e.g. `https://project.supabase.co`.
        url: String,
        /// Anonymous API key.
        api_key: String,
    },
    /// A JSON array of rows served from memory.
    Fixture(PathBuf),
}

impl std::fmt::Debug for BackendSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendSource::Postgrest { url, .. } => f
                .debug_struct("Postgrest")
                .field("url", url)
                .field("api_key", &"[redacted]")
                .finish(),
            BackendSource::Fixture(path) => f.debug_tuple("Fixture").field(path).finish(),
        }
    }
}

/// Configuration for the grid handler.
///
/// # Example
///
/// ```
/// use epd_grid_lib::config::{BackendSource, GridConfig};
/// use epd_grid_lib::grid::CombinedFilterPolicy;
///
/// let config = GridConfig::new(BackendSource::Fixture("epd.json".into()))
///     .with_table("EPD")
///     .with_parent_filters(true)
///     .with_combined_filters(CombinedFilterPolicy::Translate);
/// ```
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Row source.
    pub source: BackendSource,

    /// Table the grid reads.
    ///
    /// Default: `EPD`
    pub table: String,

    /// Postgres schema sent as a profile header. Default: none (`public`).
    pub schema: Option<String>,

    /// Function returning distinct group values.
    ///
    /// Default: `get_distinct_groups_v1`
    pub groups_function: String,

    /// Field to column mapping. Default: the EPD columns.
    pub column_map: ColumnMap,

    /// Reject unmapped fields and validate the map at startup.
    ///
    /// Default: false
    pub strict_columns: bool,

    /// Send ancestor group keys to the groups function.
    ///
    /// Default: false
    pub send_parent_filters: bool,

    /// Handling of combined column filters.
    ///
    /// Default: [`CombinedFilterPolicy::Drop`]
    pub combined_filters: CombinedFilterPolicy,

    /// Per-request timeout. Default: none
    pub timeout: Option<Duration>,
}

impl GridConfig {
    /// Creates a config reading from `source` with default values.
    pub fn new(source: BackendSource) -> Self {
        Self {
            source,
            table: DEFAULT_TABLE.to_string(),
            schema: None,
            groups_function: DISTINCT_GROUPS_FUNCTION.to_string(),
            column_map: ColumnMap::epd(),
            strict_columns: false,
            send_parent_filters: false,
            combined_filters: CombinedFilterPolicy::Drop,
            timeout: None,
        }
    }

    /// Reads the config from the process environment.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `SUPABASE_URL`, `SUPABASE_ANON_KEY` | PostgREST project (required unless `EPD_FIXTURE` is set) |
    /// | `EPD_FIXTURE` | JSON file of rows to serve instead |
    /// | `EPD_TABLE` | Table name |
    /// | `EPD_SCHEMA` | Postgres schema |
    /// | `EPD_GROUPS_RPC` | Distinct-groups function |
    /// | `EPD_COLUMN_MAP` | JSON file `{ "field": "column" }` |
    /// | `EPD_STRICT_COLUMNS` | `true`/`false` |
    /// | `EPD_SEND_PARENT_FILTERS` | `true`/`false` |
    /// | `EPD_COMBINED_FILTERS` | `drop`/`translate` |
    /// | `EPD_TIMEOUT_SECS` | Request timeout in seconds |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the config through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let source = match var("EPD_FIXTURE") {
            Some(path) => BackendSource::Fixture(PathBuf::from(path)),
            None => BackendSource::Postgrest {
                url: var("SUPABASE_URL").ok_or(ConfigError::MissingVar("SUPABASE_URL"))?,
                api_key: var("SUPABASE_ANON_KEY").ok_or(ConfigError::MissingVar("SUPABASE_ANON_KEY"))?,
            },
        };

        let mut config = Self::new(source);
        if let Some(table) = var("EPD_TABLE") {
            config.table = table;
        }
        config.schema = var("EPD_SCHEMA");
        if let Some(function) = var("EPD_GROUPS_RPC") {
            config.groups_function = function;
        }
        if let Some(path) = var("EPD_COLUMN_MAP") {
            config.column_map = ColumnMap::from_json_file(path)?;
        }
        if let Some(value) = var("EPD_STRICT_COLUMNS") {
            config.strict_columns = parse_bool("EPD_STRICT_COLUMNS", &value)?;
        }
        if let Some(value) = var("EPD_SEND_PARENT_FILTERS") {
            config.send_parent_filters = parse_bool("EPD_SEND_PARENT_FILTERS", &value)?;
        }
        if let Some(value) = var("EPD_COMBINED_FILTERS") {
            config.combined_filters = value.parse().map_err(|_| ConfigError::InvalidVar {
                name: "EPD_COMBINED_FILTERS",
                value: value.clone(),
            })?;
        }
        if let Some(value) = var("EPD_TIMEOUT_SECS") {
            let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidVar {
                name: "EPD_TIMEOUT_SECS",
                value: value.clone(),
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_groups_function(mut self, name: impl Into<String>) -> Self {
        self.groups_function = name.into();
        self
    }

    pub fn with_column_map(mut self, columns: ColumnMap) -> Self {
        self.column_map = columns;
        self
    }

    pub fn with_strict_columns(mut self, enabled: bool) -> Self {
        self.strict_columns = enabled;
        self
    }

    pub fn with_parent_filters(mut self, enabled: bool) -> Self {
        self.send_parent_filters = enabled;
        self
    }

    pub fn with_combined_filters(mut self, policy: CombinedFilterPolicy) -> Self {
        self.combined_filters = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the datasource options derived from this config.
    pub fn datasource_options(&self) -> DatasourceOptions {
        DatasourceOptions::default()
            .with_groups_function(&self.groups_function)
            .with_parent_filters(self.send_parent_filters)
            .with_strict_columns(self.strict_columns)
            .with_combined_filters(self.combined_filters)
    }

    /// Builds the backend for [`source`](Self::source).
    pub fn backend(&self) -> Result<Arc<dyn Backend>, Error> {
        match &self.source {
            BackendSource::Postgrest { url, api_key } => {
                let mut builder = PostgrestClient::builder().url(url).api_key(api_key);
                if let Some(schema) = &self.schema {
                    builder = builder.schema(schema);
                }
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                Ok(Arc::new(builder.build()?))
            }
            BackendSource::Fixture(path) => {
                let backend = MemoryBackend::from_json_file(&self.table, path)?
                    .with_columns(self.column_map.column_names())
                    .with_groups_function(&self.groups_function);
                Ok(Arc::new(backend))
            }
        }
    }

    /// Builds the server-side datasource over `backend`.
    pub fn datasource<B: Backend>(&self, backend: B) -> ServerSideDatasource<B> {
        ServerSideDatasource::new(backend, &self.table, self.column_map.clone())
            .with_options(self.datasource_options())
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidVar {
            name,
            value: value.to_string(),
        }),
    }
}
