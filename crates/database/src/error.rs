use crate::diagnostics::ConnectionDiagnostics;
use crate::executor::SqlParam;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// The pool could not hand out a connection: exhausted, timed out, unreachable or rejected.
    #[error("Database connection failed for {diagnostics}: {source}")]
    Connection {
        #[source]
        source: sqlx::Error,
        diagnostics: Box<ConnectionDiagnostics>,
    },

    /// The backend rejected a statement.
    #[error("Query failed: {source}")]
    Query {
        statement: String,
        params: Vec<SqlParam>,
        #[source]
        source: sqlx::Error,
        diagnostics: Box<ConnectionDiagnostics>,
    },

    #[error("Invalid schema definition: {0}")]
    Schema(String),

    #[error("Failed to decode a result row: {0}")]
    Decode(#[source] sqlx::Error),

    #[error("The requested data was not found in the database.")]
    NotFound,
}

impl DbError {
    pub fn is_connection(&self) -> bool {
        matches!(self, DbError::Connection { .. })
    }

    /// The redacted snapshot carried by connection and query errors.
    pub fn diagnostics(&self) -> Option<&ConnectionDiagnostics> {
        match self {
            DbError::Connection { diagnostics, .. } | DbError::Query { diagnostics, .. } => {
                Some(&**diagnostics)
            }
            _ => None,
        }
    }
}
