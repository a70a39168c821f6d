//! Read models returned by the query layer.
//!
//! Column names are normalised in SQL (`AS title`, `AS body`, ...) so one set of
//! structs serves both families.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tag or category along with the number of children linked to it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ParentWithCount {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub child_count: i64,
}

/// A snippet or item joined with the names of its parents.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ChildView {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub attribute: Option<String>,
    pub fact: Option<String>,
    pub rating: Option<i32>,
    pub parents: Vec<String>,
}

/// The slim projection used by top-N listings.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct RatedChild {
    pub id: i32,
    pub title: String,
    pub image: Option<String>,
    pub rating: Option<i32>,
}
