//! PostgREST-specific error types

use serde::Deserialize;

/// Error body returned by PostgREST.
///
/// PostgREST reports both its own failures (`PGRST*` codes) and Postgres
/// errors (SQLSTATE codes such as `42703` for an undefined column) in this
/// shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostgrestErrorDetail {
    /// The error code (e.g. `PGRST202`, `42703`).
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, if any.
    #[serde(default)]
    pub details: Option<String>,
    /// A hint for fixing the request, if any.
    #[serde(default)]
    pub hint: Option<String>,
}

impl PostgrestErrorDetail {
    /// Creates a new error detail with the given code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Sets the hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Checks if this error has the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl std::fmt::Display for PostgrestErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_postgrest_body() {
        let body = r#"{"code":"42703","details":null,"hint":null,"message":"column EPD.Foo does not exist"}"#;
        let detail: PostgrestErrorDetail = serde_json::from_str(body).unwrap();
        assert!(detail.has_code("42703"));
        assert_eq!(detail.to_string(), "[42703] column EPD.Foo does not exist");
    }

    #[test]
    fn test_display_with_hint() {
        let detail = PostgrestErrorDetail::new("PGRST202", "Could not find the function")
            .with_hint("Perhaps you meant get_distinct_groups_v2");
        assert_eq!(
            detail.to_string(),
            "[PGRST202] Could not find the function (hint: Perhaps you meant get_distinct_groups_v2)"
        );
    }
}
