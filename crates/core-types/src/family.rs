use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selects one of the two parallel hierarchical datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyKind {
    /// `tags` / `snippets` / `snippet_tags`
    Tags,
    /// `categories` / `items` / `item_categories`
    Categories,
}

impl FamilyKind {
    pub const ALL: [FamilyKind; 2] = [FamilyKind::Tags, FamilyKind::Categories];

    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyKind::Tags => "tags",
            FamilyKind::Categories => "categories",
        }
    }
}

impl fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FamilyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tags" | "tag" | "snippets" => Ok(FamilyKind::Tags),
            "categories" | "category" | "items" | "animals" => Ok(FamilyKind::Categories),
            other => Err(CoreError::InvalidInput(
                "family".to_string(),
                format!("unknown family '{other}', expected 'tags' or 'categories'"),
            )),
        }
    }
}
