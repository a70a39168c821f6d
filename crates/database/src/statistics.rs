use crate::error::DbError;
use crate::executor::{QueryExecutor, SqlParam};
use crate::family::Family;
use core_types::{round_to_tenth, RatedChild, StatisticsSummary};
use sqlx::Row;

/// Read-only rollups over one family. Issues no writes.
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    executor: QueryExecutor,
    family: &'static Family,
}

impl StatisticsAggregator {
    pub fn new(executor: QueryExecutor, family: &'static Family) -> Self {
        Self { executor, family }
    }

    /// Parent count, child count, average and maximum rating.
    pub async fn summary(&self) -> Result<StatisticsSummary, DbError> {
        let parents = self
            .executor
            .execute(&format!("SELECT COUNT(*) AS total FROM {}", self.family.parent_table), &[])
            .await?;
        let children = self
            .executor
            .execute(
                &format!(
                    "SELECT COUNT(*) AS total, AVG({r})::float8 AS average, \
                     MAX({r}) AS maximum FROM {t}",
                    r = self.family.child_columns.rating,
                    t = self.family.child_table
                ),
                &[],
            )
            .await?;

        let parents = parents.first().ok_or(DbError::NotFound)?;
        let children = children.first().ok_or(DbError::NotFound)?;
        Ok(StatisticsSummary {
            total_parents: parents.try_get("total").map_err(DbError::Decode)?,
            total_children: children.try_get("total").map_err(DbError::Decode)?,
            average_rating: children
                .try_get::<Option<f64>, _>("average")
                .map_err(DbError::Decode)?
                .map(round_to_tenth),
            max_rating: children.try_get("maximum").map_err(DbError::Decode)?,
        })
    }

    /// The `limit` highest-rated children; ties go to the lower id.
    pub async fn top_rated(&self, limit: i64) -> Result<Vec<RatedChild>, DbError> {
        let c = &self.family.child_columns;
        let statement = format!(
            "SELECT id, {title} AS title, {image} AS image, {rating} AS rating FROM {table} \
             ORDER BY {rating} DESC NULLS LAST, id ASC LIMIT $1",
            title = c.title,
            image = c.image,
            rating = c.rating,
            table = self.family.child_table
        );
        self.executor
            .execute_as(&statement, &[SqlParam::from(limit)])
            .await
    }
}
