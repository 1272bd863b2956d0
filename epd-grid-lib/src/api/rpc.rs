//! Remote procedure calls.

use serde_json::Map;
use serde_json::Value as JsonValue;

/// Default name of the function returning the distinct values of a column.
pub const DISTINCT_GROUPS_FUNCTION: &str = "get_distinct_groups_v1";

/// Argument carrying the grouping column identifier.
pub const GROUP_COLUMN_ARG: &str = "group_column_name";

/// Argument carrying the `{ column: value }` filters of ancestor groups.
pub const PARENT_FILTERS_ARG: &str = "parent_filters";

/// Field of each returned row holding one distinct value.
pub const GROUP_VALUE_FIELD: &str = "group_value";

/// A call to a named Postgres function exposed by PostgREST.
///
/// # Example
///
/// ```
/// use epd_grid_lib::api::RpcCall;
///
/// let call = RpcCall::new("get_distinct_groups_v1")
///     .arg("group_column_name", "\"Material Category\"");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    function: String,
    args: Map<String, JsonValue>,
}

impl RpcCall {
    /// Creates a call to `function` with no arguments.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Map::new(),
        }
    }

    /// Adds a named argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Returns the function name.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Returns the named arguments.
    pub fn args(&self) -> &Map<String, JsonValue> {
        &self.args
    }

    /// Returns one argument, if present.
    pub fn get_arg(&self, name: &str) -> Option<&JsonValue> {
        self.args.get(name)
    }
}
