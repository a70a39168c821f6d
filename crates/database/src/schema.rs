//! Idempotent table creation.

use crate::error::DbError;
use crate::executor::{QueryExecutor, SqlParam};
use serde::Serialize;
use sqlx::Row;

/// One `CREATE TABLE IF NOT EXISTS` statement and the tables it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub name: &'static str,
    #[serde(skip)]
    pub ddl: &'static str,
    pub depends_on: &'static [&'static str],
}

/// Orders specs so that every table comes after the tables it references.
///
/// The ordering is stable: among tables that are ready, input order wins.
pub fn order_by_dependencies(specs: &[TableSpec]) -> Result<Vec<TableSpec>, DbError> {
    for spec in specs {
        if let Some(missing) = spec
            .depends_on
            .iter()
            .find(|dep| !specs.iter().any(|s| s.name == **dep))
        {
            return Err(DbError::Schema(format!(
                "table '{}' references unknown table '{}'",
                spec.name, missing
            )));
        }
    }

    let mut ordered: Vec<TableSpec> = Vec::with_capacity(specs.len());
    let mut pending: Vec<TableSpec> = specs.to_vec();
    while !pending.is_empty() {
        let ready = pending.iter().position(|spec| {
            spec.depends_on
                .iter()
                .all(|dep| *dep == spec.name || ordered.iter().any(|done| done.name == *dep))
        });
        match ready {
            Some(index) => ordered.push(pending.remove(index)),
            None => {
                let names: Vec<&str> = pending.iter().map(|s| s.name).collect();
                return Err(DbError::Schema(format!(
                    "circular table dependencies among: {}",
                    names.join(", ")
                )));
            }
        }
    }
    Ok(ordered)
}

/// Creates tables when absent. Safe to call any number of times.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    executor: QueryExecutor,
}

impl SchemaManager {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Issues each spec's DDL in dependency order and returns the table names in that order.
    ///
    /// Stops at the first failing statement; tables created before it remain.
    pub async fn ensure_schema(&self, specs: &[TableSpec]) -> Result<Vec<&'static str>, DbError> {
        let ordered = order_by_dependencies(specs)?;
        for spec in &ordered {
            self.executor.execute(spec.ddl, &[]).await?;
            tracing::info!(table = spec.name, "Table ensured.");
        }
        Ok(ordered.iter().map(|spec| spec.name).collect())
    }

    /// Names (from `specs`) of the tables that do not exist in the current schema.
    pub async fn missing_tables(&self, specs: &[TableSpec]) -> Result<Vec<&'static str>, DbError> {
        let existing = self.existing_tables(specs).await?;
        Ok(specs
            .iter()
            .map(|spec| spec.name)
            .filter(|name| !existing.iter().any(|e| e == name))
            .collect())
    }

    /// Names (from `specs`) of the tables that exist in the current schema, sorted.
    pub async fn existing_tables(&self, specs: &[TableSpec]) -> Result<Vec<String>, DbError> {
        let names: Vec<String> = specs.iter().map(|spec| spec.name.to_string()).collect();
        let rows = self
            .executor
            .execute(
                r#"
                SELECT table_name::text AS table_name
                FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = ANY($1)
                ORDER BY table_name
                "#,
                &[SqlParam::TextList(Some(names))],
            )
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{Family, CATEGORY_SYSTEM, TAG_SYSTEM};

    const fn spec(name: &'static str, depends_on: &'static [&'static str]) -> TableSpec {
        TableSpec {
            name,
            ddl: "",
            depends_on,
        }
    }

    #[test]
    fn relation_tables_come_after_their_parents() {
        let specs = [
            spec("snippet_tags", &["snippets", "tags"]),
            spec("tags", &[]),
            spec("snippets", &[]),
        ];
        let ordered: Vec<&str> = order_by_dependencies(&specs)
            .unwrap()
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(ordered, vec!["tags", "snippets", "snippet_tags"]);
    }

    #[test]
    fn already_ordered_input_is_unchanged() {
        for family in [&TAG_SYSTEM, &CATEGORY_SYSTEM] {
            let ordered = order_by_dependencies(&family.tables).unwrap();
            assert_eq!(ordered, family.tables.to_vec());
        }
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let specs = [spec("snippet_tags", &["snippets"])];
        let err = order_by_dependencies(&specs).unwrap_err();
        assert!(err.to_string().contains("unknown table 'snippets'"));
    }

    #[test]
    fn cycles_are_rejected() {
        let specs = [spec("a", &["b"]), spec("b", &["a"])];
        assert!(matches!(order_by_dependencies(&specs), Err(DbError::Schema(_))));
    }

    #[test]
    fn every_ddl_is_idempotent() {
        for family in Family::all() {
            for table in &family.tables {
                assert!(
                    table.ddl.trim_start().starts_with("CREATE TABLE IF NOT EXISTS"),
                    "{}",
                    table.name
                );
            }
        }
    }

    // Integration tests require a real database:
    // DB_HOST=... DB_USER=... cargo test -p database -- --ignored --test-threads=1

    #[tokio::test]
    #[ignore = "requires database"]
    async fn ensuring_twice_changes_nothing() {
        let settings = configuration::load_settings().expect("settings");
        let pool = crate::connection::ConnectionPool::connect(&settings)
            .await
            .expect("pool");
        let schema = SchemaManager::new(QueryExecutor::new(pool));

        for family in Family::all() {
            let first = schema.ensure_schema(&family.tables).await.unwrap();
            let before = schema.existing_tables(&family.tables).await.unwrap();
            let second = schema.ensure_schema(&family.tables).await.unwrap();
            let after = schema.existing_tables(&family.tables).await.unwrap();

            assert_eq!(first, second);
            assert_eq!(before, after);
            assert_eq!(after.len(), 3);
            assert!(schema.missing_tables(&family.tables).await.unwrap().is_empty());
        }
    }
}
