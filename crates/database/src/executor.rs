//! Single-statement execution with scoped connection use and enriched failures.

use crate::connection::ConnectionPool;
use crate::error::DbError;
use serde::Serialize;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, Postgres};
use std::fmt;

/// A positional statement parameter.
///
/// Values are always sent as bind parameters, never spliced into the statement text.
/// Each variant is nullable so `NULL` keeps the column's type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Text(Option<String>),
    Int(Option<i32>),
    BigInt(Option<i64>),
    Float(Option<f64>),
    Bool(Option<bool>),
    IntList(Option<Vec<i32>>),
    TextList(Option<Vec<String>>),
}

impl SqlParam {
    fn bind<'q>(
        &'q self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlParam::Text(v) => query.bind(v.as_deref()),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::BigInt(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::IntList(v) => query.bind(v.as_deref()),
            SqlParam::TextList(v) => query.bind(v.as_deref()),
        }
    }
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Debug>(f: &mut fmt::Formatter<'_>, v: &Option<T>) -> fmt::Result {
            match v {
                Some(v) => write!(f, "{v:?}"),
                None => f.write_str("NULL"),
            }
        }
        match self {
            SqlParam::Text(v) => opt(f, v),
            SqlParam::Int(v) => opt(f, v),
            SqlParam::BigInt(v) => opt(f, v),
            SqlParam::Float(v) => opt(f, v),
            SqlParam::Bool(v) => opt(f, v),
            SqlParam::IntList(v) => opt(f, v),
            SqlParam::TextList(v) => opt(f, v),
        }
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(Some(v))
    }
}

impl From<Option<&str>> for SqlParam {
    fn from(v: Option<&str>) -> Self {
        SqlParam::Text(v.map(str::to_string))
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(Some(v))
    }
}

impl From<Option<i32>> for SqlParam {
    fn from(v: Option<i32>) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::BigInt(Some(v))
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(Some(v))
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(Some(v))
    }
}

/// Runs one parameterized statement per call on a pooled connection.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: ConnectionPool,
}

impl QueryExecutor {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Executes `statement` with positional `params` (`$1`, `$2`, ...) and returns all rows.
    ///
    /// The connection is released before this returns, whatever the outcome. Failures
    /// to obtain or keep a connection surface as [`DbError::Connection`]; a statement
    /// the backend rejects surfaces as [`DbError::Query`] carrying the statement, its
    /// parameters and the redacted diagnostics.
    pub async fn execute(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> Result<Vec<PgRow>, DbError> {
        let mut conn = self.pool.acquire().await?;

        let query = params
            .iter()
            .fold(sqlx::query::<Postgres>(statement), |query, param| param.bind(query));
        let result = query.fetch_all(&mut *conn).await;

        self.pool.release(conn);

        match result {
            Ok(rows) => {
                tracing::debug!(
                    statement = %preview(statement),
                    rows = rows.len(),
                    "Statement executed."
                );
                Ok(rows)
            }
            Err(source) if is_connection_failure(&source) => {
                tracing::error!(
                    error = %source,
                    statement = %preview(statement),
                    "Connection lost while executing statement."
                );
                Err(self.pool.connection_error(source))
            }
            Err(source) => {
                tracing::error!(
                    error = %source,
                    statement = %statement,
                    params = ?params,
                    diagnostics = %self.pool.diagnostics(),
                    "Statement failed."
                );
                Err(DbError::Query {
                    statement: statement.to_string(),
                    params: params.to_vec(),
                    source,
                    diagnostics: Box::new(self.pool.diagnostics().clone()),
                })
            }
        }
    }

    /// Executes a statement and maps every row into `T`.
    pub async fn execute_as<T>(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> Result<Vec<T>, DbError>
    where
        T: for<'r> FromRow<'r, PgRow>,
    {
        let rows = self.execute(statement, params).await?;
        rows.iter()
            .map(T::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::Decode)
    }
}

/// Errors that mean the connection itself is gone rather than the statement being wrong.
fn is_connection_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// First line of a statement, trimmed, for log lines.
fn preview(statement: &str) -> String {
    let line = statement.trim().lines().next().unwrap_or_default().trim();
    if line.chars().count() > 60 {
        format!("{}...", line.chars().take(60).collect::<String>())
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_display_without_interpolation_markers() {
        assert_eq!(SqlParam::from("Panda").to_string(), "\"Panda\"");
        assert_eq!(SqlParam::from(Option::<i32>::None).to_string(), "NULL");
        assert_eq!(SqlParam::from(7_i32).to_string(), "7");
        assert_eq!(SqlParam::IntList(Some(vec![1, 2])).to_string(), "[1, 2]");
    }

    #[test]
    fn params_serialize_as_plain_values() {
        let params = vec![SqlParam::from("x"), SqlParam::Int(None), SqlParam::from(true)];
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"["x",null,true]"#);
    }

    #[test]
    fn preview_keeps_first_line_only() {
        assert_eq!(preview("\n  SELECT id\n  FROM tags\n"), "SELECT id");
        let long = format!("SELECT {}", "x".repeat(100));
        assert!(preview(&long).ends_with("..."));
    }

    #[test]
    fn io_errors_count_as_connection_failures() {
        let io = sqlx::Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert!(is_connection_failure(&io));
        assert!(is_connection_failure(&sqlx::Error::PoolTimedOut));
        assert!(!is_connection_failure(&sqlx::Error::RowNotFound));
    }
}
