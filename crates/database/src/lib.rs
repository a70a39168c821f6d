//! # Playground Database Crate
//!
//! The data-access layer of the playground backend. Everything that talks to
//! PostgreSQL lives here; callers see typed records and structured errors.
//!
//! ## Architectural Principles
//!
//! - **Single Choke Point:** Every statement runs through [`QueryExecutor`], which
//!   acquires a pooled connection, binds positional parameters and always hands the
//!   connection back. Failures carry the statement, its parameters and a redacted
//!   snapshot of the connection settings.
//! - **Constant Identifiers:** Table and column names come from the static
//!   [`Family`] descriptors. Only values are bound at runtime.
//! - **Isolated Rows:** Seeding records a per-row outcome instead of aborting the
//!   batch, so one malformed record never hides the rest.
//!
//! ## Public API
//!
//! - `ConnectionPool`: bounded pool built from `configuration::Settings`.
//! - `QueryExecutor`: runs parameterized SQL and attaches diagnostics on failure.
//! - `SchemaManager`: idempotent, dependency-ordered table creation.
//! - `SeedManager`: clear, upsert parents, insert children and relations.
//! - `StatisticsAggregator` / `CatalogRepository`: read-only rollups and listings.
//! - `probe`, `ping`, `database_info`: connectivity checks for the operator surfaces.

pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod family;
pub mod probe;
pub mod repository;
pub mod schema;
pub mod seed;
pub mod statistics;

pub use connection::{connect_options, ConnectionPool, PoolStatus};
pub use diagnostics::{database_info, ping, ConnectionDiagnostics, DatabaseInfo};
pub use error::DbError;
pub use executor::{QueryExecutor, SqlParam};
pub use family::{Family, CATEGORY_SYSTEM, TAG_SYSTEM};
pub use probe::{probe, ProbeFailure, ProbeSuccess, PROBE_TIMEOUT};
pub use repository::{CatalogRepository, ChildFilter};
pub use schema::{order_by_dependencies, SchemaManager, TableSpec};
pub use seed::SeedManager;
pub use statistics::StatisticsAggregator;
