//! Display field to backend column mapping.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;

use crate::api::query::url::quote_ident;
use crate::api::query::url::unquote_ident;
use crate::api::query::Query;
use crate::api::query::Range;
use crate::backend::Backend;
use crate::error::ConfigError;
use crate::error::Error;

/// Columns of the EPD table, as shown in the grid and stored in Postgres.
pub const EPD_COLUMNS: [&str; 14] = [
    "Masterformat",
    "Material Category",
    "Material Subcategory",
    "Country",
    "Datapoint Type",
    "Plant Name",
    "Manufacturer",
    "Default Unit",
    "Product Name",
    "Product Description",
    "EC3 Uncertainty Factor (%)",
    "GWP Fossil + Biogenic (kgCO2e)",
    "GWP per Default Unit",
    "GWPbio per Default Unit",
];

/// Maps grid field names to quoted backend column identifiers.
///
/// The mapping is a bijection: two fields never share a column. Column
/// names with spaces and punctuation are stored quoted (`"Plant Name"`) so
/// they can be dropped straight into filters, ordering and RPC arguments.
///
/// # Example
///
/// ```
/// use epd_grid_lib::grid::ColumnMap;
///
/// let columns = ColumnMap::epd();
/// assert_eq!(columns.resolve("Plant Name"), "\"Plant Name\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<String, String>,
}

impl ColumnMap {
    /// Creates a map from `(field, column)` pairs.
    ///
    /// Bare column names are quoted; names already wrapped in double quotes
    /// are kept as they are.
    pub fn from_pairs<F, C>(pairs: impl IntoIterator<Item = (F, C)>) -> Result<Self, ConfigError>
    where
        F: Into<String>,
        C: AsRef<str>,
    {
        let mut columns = BTreeMap::new();
        let mut owners: HashMap<String, String> = HashMap::new();

        for (field, column) in pairs {
            let field = field.into();
            let column = column.as_ref();
            let ident = if column.len() >= 2 && column.starts_with('"') && column.ends_with('"') {
                column.to_string()
            } else {
                quote_ident(column)
            };

            if let Some(first) = owners.get(&ident) {
                if *first != field {
                    return Err(ConfigError::DuplicateColumn {
                        first: first.clone(),
                        second: field,
                        column: ident,
                    });
                }
            }
            owners.insert(ident.clone(), field.clone());
            columns.insert(field, ident);
        }

        Ok(Self { columns })
    }

    /// The default mapping for the EPD table: every field maps to the
    /// column of the same name.
    pub fn epd() -> Self {
        Self {
            columns: EPD_COLUMNS
                .iter()
                .map(|name| (name.to_string(), quote_ident(name)))
                .collect(),
        }
    }

    /// Loads a mapping from a JSON object `{ "field": "column", ... }`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_error = |message: String| ConfigError::File {
            path: path.display().to_string(),
            message,
        };

        let text = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let pairs: BTreeMap<String, String> =
            serde_json::from_str(&text).map_err(|e| file_error(e.to_string()))?;
        Self::from_pairs(pairs)
    }

    /// Returns the mapped identifier for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.columns.get(field).map(String::as_str)
    }

    /// Returns the backend identifier for `field`.
    ///
    /// Unmapped fields are quoted as-is and logged; the result may still be
    /// rejected by the backend if the column does not exist.
    pub fn resolve(&self, field: &str) -> String {
        match self.columns.get(field) {
            Some(column) => column.clone(),
            None => {
                let fallback = quote_ident(field);
                log::warn!(
                    "No column mapping for field '{}', falling back to {}",
                    field,
                    fallback
                );
                fallback
            }
        }
    }

    /// Returns the mapped column names, unquoted.
    pub fn column_names(&self) -> impl Iterator<Item = String> + '_ {
        self.columns.values().map(String::as_str).map(unquote_ident)
    }

    /// Fails on the first field without a mapping.
    pub fn check_fields<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Result<(), ConfigError> {
        for field in fields {
            if !self.columns.contains_key(field) {
                return Err(ConfigError::UnmappedField(field.to_string()));
            }
        }
        Ok(())
    }

    /// Returns the number of mapped fields.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if no field is mapped.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks every mapped column against the backend table.
    ///
    /// Issues a zero-row select of all mapped columns; the backend rejects
    /// it if any column is missing.
    pub async fn validate<B: Backend + ?Sized>(&self, backend: &B, table: &str) -> Result<(), Error> {
        let columns: Vec<&str> = self.columns.values().map(String::as_str).collect();
        let query = Query::new(table).select(&columns).range(Range::half_open(0, 0));

        match backend.fetch(&query).await {
            Ok(_) => {
                log::info!("Column map validated against table '{}' ({} columns)", table, columns.len());
                Ok(())
            }
            Err(Error::Api(e)) => Err(Error::Config(ConfigError::Schema {
                table: table.to_string(),
                message: e.to_string(),
            })),
            Err(other) => Err(other),
        }
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::epd()
    }
}
