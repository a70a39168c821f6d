use crate::{
    error::{AppError, Failure},
    response::success,
    AppState,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use core_types::{Catalog, SeedOptions};
use database::{
    database_info, ping, probe, CatalogRepository, ChildFilter, DbError, Family, SchemaManager,
    SeedManager, StatisticsAggregator, CATEGORY_SYSTEM, PROBE_TIMEOUT, TAG_SYSTEM,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

type ApiResult = Result<Json<Value>, AppError>;

/// Tags whose snippets are offered as recommendations.
const RECOMMENDED_TAGS: [&str; 4] = ["Subject", "Style", "Environment", "Lighting"];
const RECOMMENDED_LIMIT: i64 = 20;
const TOP_RATED_LIMIT: i64 = 3;
const VIEW_EXAMPLES_LIMIT: i64 = 8;

#[derive(Debug, Deserialize)]
pub struct ChildQuery {
    /// Comma-separated parent ids; entries that are not integers are ignored.
    #[serde(default, alias = "tag_ids", alias = "category_ids")]
    pub parent_ids: Option<String>,
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    50
}

impl ChildQuery {
    fn filter(&self) -> ChildFilter {
        let parent_ids = self
            .parent_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|id| id.trim().parse::<i32>().ok())
            .collect();
        ChildFilter {
            parent_ids,
            search: self.search.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

// ---------------------------------------------------------------------------
// Operator endpoints
// ---------------------------------------------------------------------------

/// # GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    success(
        "Server is running",
        json!({
            "environment": state.settings.server.environment,
            "pool": state.executor.pool().status(),
        }),
    )
}

/// # GET /api/test/env-check
/// Redacted view of the resolved configuration and the variables that fed it.
pub async fn env_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let db = &state.settings.database;
    success(
        "Environment check",
        json!({
            "data": {
                "database": state.executor.pool().diagnostics(),
                "timeouts": {
                    "acquire_ms": db.acquire_timeout.as_millis(),
                    "statement_ms": db.statement_timeout.as_millis(),
                    "idle_ms": db.idle_timeout.as_millis(),
                },
                "charset": db.charset,
                "server": {
                    "port": state.settings.server.port,
                    "environment": state.settings.server.environment,
                },
            }
        }),
    )
}

/// # GET /api/test/db-test
pub async fn db_test(State(state): State<Arc<AppState>>) -> ApiResult {
    let started = Instant::now();
    let connection_test = ping(&state.executor)
        .await
        .map_err(|err| state.fail("Database connection test failed", err))?;
    let elapsed_ms = started.elapsed().as_millis();
    let info = database_info(&state.executor).await;

    Ok(success(
        "Database connection test succeeded",
        json!({
            "data": {
                "connection_test": connection_test,
                "elapsed_ms": elapsed_ms,
                "server": info,
                "pool": state.executor.pool().status(),
            }
        }),
    ))
}

/// # GET /api/test/network-test
/// Raw TCP reachability of the configured database host.
pub async fn network_test(State(state): State<Arc<AppState>>) -> ApiResult {
    let db = &state.settings.database;
    let reached = probe(&db.host, db.port, PROBE_TIMEOUT)
        .await
        .map_err(|err| state.fail("Network connectivity test failed", err))?;
    Ok(success("Network connectivity test succeeded", json!({ "data": reached })))
}

// ---------------------------------------------------------------------------
// Schema and seeding, shared by both families
// ---------------------------------------------------------------------------

async fn create_tables(state: &AppState, family: &'static Family) -> ApiResult {
    let created = SchemaManager::new(state.executor.clone())
        .ensure_schema(&family.tables)
        .await
        .map_err(|err| state.fail(format!("Failed to create {} tables", family.kind), err))?;
    Ok(success(
        format!("Created {} tables for {}", created.len(), family.kind),
        json!({ "data": { "tables": created } }),
    ))
}

const INVALID_SEED_BODY: &str = "Request body must be a JSON object like {\"clearExisting\": true}";

/// An empty body means the defaults; anything else must parse as [`SeedOptions`].
fn seed_options(body: &[u8]) -> Result<SeedOptions, Failure> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SeedOptions::default());
    }
    serde_json::from_slice(body).map_err(Failure::InvalidBody)
}

async fn insert_data(
    state: &AppState,
    family: &'static Family,
    options: SeedOptions,
) -> ApiResult {
    let missing = SchemaManager::new(state.executor.clone())
        .missing_tables(&family.tables)
        .await
        .map_err(|err| state.fail("Failed to inspect the schema", err))?;
    if !missing.is_empty() {
        return Err(state.fail(
            "Tables are incomplete, create them first",
            Failure::MissingTables(missing),
        ));
    }

    let catalog = Catalog::builtin(family.kind)
        .map_err(|err| state.fail("Built-in catalog is invalid", err))?;
    let report = SeedManager::new(state.executor.clone(), family)
        .seed(&catalog, options)
        .await
        .map_err(|err| state.fail(format!("Failed to insert {} data", family.kind), err))?;

    Ok(success(
        format!(
            "Inserted {} of {} records",
            report.children_succeeded, report.children_total
        ),
        json!({ "data": report }),
    ))
}

/// # POST /api/test/create-tables
pub async fn create_tag_tables(State(state): State<Arc<AppState>>) -> ApiResult {
    create_tables(&state, &TAG_SYSTEM).await
}

/// # POST /api/test/insert-test-data
/// Accepts an optional `{ "clearExisting": bool }` body.
pub async fn insert_tag_data(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let options = seed_options(&body).map_err(|err| state.fail(INVALID_SEED_BODY, err))?;
    insert_data(&state, &TAG_SYSTEM, options).await
}

/// # POST /api/demo/create-tables
pub async fn create_category_tables(State(state): State<Arc<AppState>>) -> ApiResult {
    create_tables(&state, &CATEGORY_SYSTEM).await
}

/// # POST /api/demo/insert-data
pub async fn insert_category_data(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let options = seed_options(&body).map_err(|err| state.fail(INVALID_SEED_BODY, err))?;
    insert_data(&state, &CATEGORY_SYSTEM, options).await
}

// ---------------------------------------------------------------------------
// Read endpoints
// ---------------------------------------------------------------------------

async fn list_parents(state: &AppState, family: &'static Family) -> ApiResult {
    let parents = CatalogRepository::new(state.executor.clone(), family)
        .list_parents()
        .await
        .map_err(|err| state.fail(format!("Failed to load {}", family.parent_table), err))?;
    Ok(success(
        format!("Loaded {} {}", parents.len(), family.parent_table),
        json!({ "data": parents, "total": parents.len() }),
    ))
}

async fn list_children(state: &AppState, family: &'static Family, query: &ChildQuery) -> ApiResult {
    let filter = query.filter();
    let children = CatalogRepository::new(state.executor.clone(), family)
        .list_children(&filter)
        .await
        .map_err(|err| state.fail(format!("Failed to load {}", family.child_table), err))?;
    Ok(success(
        format!("Loaded {} {}", children.len(), family.child_table),
        json!({
            "data": children,
            "total": children.len(),
            "pagination": { "limit": filter.limit, "offset": filter.offset },
        }),
    ))
}

/// # GET /api/tags
pub async fn get_tags(State(state): State<Arc<AppState>>) -> ApiResult {
    list_parents(&state, &TAG_SYSTEM).await
}

/// # GET /api/snippets
pub async fn get_snippets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChildQuery>,
) -> ApiResult {
    list_children(&state, &TAG_SYSTEM, &query).await
}

/// # GET /api/snippets/recommended
pub async fn get_recommended_snippets(State(state): State<Arc<AppState>>) -> ApiResult {
    let names: Vec<String> = RECOMMENDED_TAGS.iter().map(|n| n.to_string()).collect();
    let snippets = CatalogRepository::new(state.executor.clone(), &TAG_SYSTEM)
        .recommended(&names, RECOMMENDED_LIMIT)
        .await
        .map_err(|err| state.fail("Failed to load recommended snippets", err))?;
    Ok(success("Recommended snippets", json!({ "data": snippets })))
}

/// # GET /api/demo/categories
pub async fn get_categories(State(state): State<Arc<AppState>>) -> ApiResult {
    list_parents(&state, &CATEGORY_SYSTEM).await
}

/// # GET /api/demo/animals
pub async fn get_animals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChildQuery>,
) -> ApiResult {
    list_children(&state, &CATEGORY_SYSTEM, &query).await
}

/// # GET /api/demo/statistics
/// Summary plus the top three animals by rating.
pub async fn get_statistics(State(state): State<Arc<AppState>>) -> ApiResult {
    let stats = StatisticsAggregator::new(state.executor.clone(), &CATEGORY_SYSTEM);
    let summary = stats
        .summary()
        .await
        .map_err(|err| state.fail("Failed to compute statistics", err))?;
    let top = stats
        .top_rated(TOP_RATED_LIMIT)
        .await
        .map_err(|err| state.fail("Failed to compute statistics", err))?;
    Ok(success("Statistics", json!({ "statistics": summary, "data": top })))
}

/// # GET /api/demo/view-data
/// Everything the demo page shows in one round trip.
pub async fn view_data(State(state): State<Arc<AppState>>) -> ApiResult {
    let fail = |err: DbError| state.fail("Failed to load demo data", err);
    let summary = StatisticsAggregator::new(state.executor.clone(), &CATEGORY_SYSTEM)
        .summary()
        .await
        .map_err(fail)?;
    let repo = CatalogRepository::new(state.executor.clone(), &CATEGORY_SYSTEM);
    let categories = repo.list_parents().await.map_err(fail)?;
    let examples = repo
        .list_children(&ChildFilter {
            limit: VIEW_EXAMPLES_LIMIT,
            ..ChildFilter::default()
        })
        .await
        .map_err(fail)?;

    Ok(success(
        "Demo data loaded",
        json!({
            "statistics": summary,
            "categories": categories,
            "examples": examples,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(parent_ids: Option<&str>) -> ChildQuery {
        ChildQuery {
            parent_ids: parent_ids.map(str::to_string),
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }

    #[test]
    fn parent_ids_skip_non_numeric_entries() {
        let filter = query(Some("1, 2,x,,7")).filter();
        assert_eq!(filter.parent_ids, vec![1, 2, 7]);
    }

    #[test]
    fn empty_seed_body_uses_defaults() {
        assert_eq!(seed_options(b"").unwrap(), SeedOptions::default());
        assert_eq!(seed_options(b"  \n").unwrap(), SeedOptions::default());
        let keep = seed_options(br#"{"clearExisting": false}"#).unwrap();
        assert!(!keep.clear_existing);
    }

    #[test]
    fn malformed_seed_body_is_rejected() {
        assert!(matches!(
            seed_options(b"{clearExisting: false"),
            Err(Failure::InvalidBody(_))
        ));
        assert!(matches!(
            seed_options(br#"{"clearExisting": "no"}"#),
            Err(Failure::InvalidBody(_))
        ));
    }

    #[test]
    fn missing_parent_ids_means_no_filter() {
        assert!(query(None).filter().parent_ids.is_empty());
    }
}
