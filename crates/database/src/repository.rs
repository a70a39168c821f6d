//! Read queries over seeded data.

use crate::error::DbError;
use crate::executor::{QueryExecutor, SqlParam};
use crate::family::Family;
use core_types::{ChildView, ParentWithCount};

/// Filters for [`CatalogRepository::list_children`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChildFilter {
    /// Keep children linked to any of these parents.
    pub parent_ids: Vec<i32>,
    /// Case-insensitive substring match on title or body.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ChildFilter {
    fn default() -> Self {
        Self {
            parent_ids: Vec::new(),
            search: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl ChildFilter {
    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }
}

/// Escapes `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Provides the listing queries behind the read endpoints.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    executor: QueryExecutor,
    family: &'static Family,
}

impl CatalogRepository {
    pub fn new(executor: QueryExecutor, family: &'static Family) -> Self {
        Self { executor, family }
    }

    /// All parents with the number of children linked to each, ordered by name.
    pub async fn list_parents(&self) -> Result<Vec<ParentWithCount>, DbError> {
        let f = self.family;
        let statement = format!(
            "SELECT p.id, p.name, p.description, p.icon, p.color, \
             COUNT(r.{child_key}) AS child_count \
             FROM {parents} p LEFT JOIN {relations} r ON p.id = r.{parent_key} \
             GROUP BY p.id ORDER BY p.name",
            child_key = f.child_key,
            parent_key = f.parent_key,
            parents = f.parent_table,
            relations = f.relation_table,
        );
        self.executor.execute_as(&statement, &[]).await
    }

    /// Children with their parent names, highest rating first, then by id.
    pub async fn list_children(&self, filter: &ChildFilter) -> Result<Vec<ChildView>, DbError> {
        let f = self.family;
        let c = &f.child_columns;
        let statement = format!(
            "SELECT {projection}, \
             COALESCE(array_agg(p.name::text ORDER BY p.name) \
             FILTER (WHERE p.name IS NOT NULL), ARRAY[]::text[]) AS parents \
             FROM {children} c \
             LEFT JOIN {relations} r ON c.id = r.{child_key} \
             LEFT JOIN {parents} p ON r.{parent_key} = p.id \
             WHERE ($1::int[] IS NULL OR c.id IN \
             (SELECT {child_key} FROM {relations} WHERE {parent_key} = ANY($1))) \
             AND ($2::text IS NULL OR c.{title} ILIKE $2 OR c.{body} ILIKE $2) \
             GROUP BY c.id \
             ORDER BY c.{rating} DESC NULLS LAST, c.id \
             LIMIT $3 OFFSET $4",
            projection = f.child_projection("c"),
            children = f.child_table,
            relations = f.relation_table,
            parents = f.parent_table,
            child_key = f.child_key,
            parent_key = f.parent_key,
            title = c.title,
            body = c.body,
            rating = c.rating,
        );
        let parent_ids = (!filter.parent_ids.is_empty()).then(|| filter.parent_ids.clone());
        self.executor
            .execute_as(
                &statement,
                &[
                    SqlParam::IntList(parent_ids),
                    SqlParam::Text(filter.search_pattern()),
                    SqlParam::from(filter.limit.clamp(1, 500)),
                    SqlParam::from(filter.offset.max(0)),
                ],
            )
            .await
    }

    /// Up to `limit` random children linked to any of the named parents, one row per link.
    pub async fn recommended(
        &self,
        parent_names: &[String],
        limit: i64,
    ) -> Result<Vec<ChildView>, DbError> {
        let f = self.family;
        let statement = format!(
            "SELECT {projection}, ARRAY[p.name::text] AS parents \
             FROM {children} c \
             JOIN {relations} r ON c.id = r.{child_key} \
             JOIN {parents} p ON r.{parent_key} = p.id \
             WHERE p.name = ANY($1) \
             ORDER BY random() \
             LIMIT $2",
            projection = f.child_projection("c"),
            children = f.child_table,
            relations = f.relation_table,
            parents = f.parent_table,
            child_key = f.child_key,
            parent_key = f.parent_key,
        );
        self.executor
            .execute_as(
                &statement,
                &[SqlParam::TextList(Some(parent_names.to_vec())), SqlParam::from(limit)],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_pattern_escapes_wildcards() {
        let filter = ChildFilter {
            search: Some(" 100%_done ".to_string()),
            ..ChildFilter::default()
        };
        assert_eq!(filter.search_pattern().as_deref(), Some("%100\\%\\_done%"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = ChildFilter {
            search: Some("   ".to_string()),
            ..ChildFilter::default()
        };
        assert_eq!(filter.search_pattern(), None);
    }
}
