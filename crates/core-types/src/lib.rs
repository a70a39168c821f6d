//! # Playground Core Types
//!
//! The shared vocabulary of the playground backend. Every other crate speaks in
//! these types: the seed payloads handed to the seeding engine, the per-record
//! outcomes it produces, and the read models returned by the query layer.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** No knowledge of configuration, HTTP or the database driver
//!   beyond the `FromRow` derive on read models.
//! - **Two isomorphic families:** the tag/snippet system and the category/item
//!   system share one data model. [`FamilyKind`] selects between them.

pub mod catalog;
pub mod error;
pub mod family;
pub mod records;
pub mod seed;
pub mod stats;

// Re-export the core types to provide a clean public API.
pub use catalog::{Catalog, ChildRecord, ParentRecord};
pub use error::CoreError;
pub use family::FamilyKind;
pub use records::{ChildView, ParentWithCount, RatedChild};
pub use seed::{RowOutcome, SeedOptions, SeedReport, DEFAULT_SAMPLE_LIMIT};
pub use stats::{average_rating, round_to_tenth, StatisticsSummary};
