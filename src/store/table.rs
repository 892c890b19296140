//! Quoted Postgres identifiers for the movies table.

use std::fmt;

use crate::error::StoreError;

/// Fully-qualified Postgres table name (schema + table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Builds a new table identifier.
    pub fn new<S, T>(schema: S, table: T) -> Result<Self, StoreError>
    where
        S: Into<String>,
        T: Into<String>,
    {
        let schema = schema.into();
        let table = table.into();
        for (kind, ident) in [("schema", &schema), ("table", &table)] {
            if ident.trim().is_empty() {
                return Err(StoreError::Config(format!("{kind} name is required")));
            }
            if ident.contains('\0') {
                return Err(StoreError::Config(format!(
                    "{kind} name contains a NUL byte"
                )));
            }
        }
        Ok(Self { schema, table })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            table: "movies".to_string(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}
