//! Seed payloads.
//!
//! A [`Catalog`] is an opaque bundle of parent records and child records with
//! declared parent-name associations. The two built-in catalogs are embedded at
//! compile time; callers may also supply their own.

use crate::error::CoreError;
use crate::family::FamilyKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const TAG_CATALOG: &str = include_str!("../catalogs/tag_catalog.json");
const ANIMAL_CATALOG: &str = include_str!("../catalogs/animal_catalog.json");

/// A tag or category to upsert by unique name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "emoji")]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// A snippet or item, together with the names of the parents it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRecord {
    #[serde(alias = "name")]
    pub title: String,
    #[serde(alias = "content", alias = "description")]
    pub body: String,
    #[serde(default, alias = "emoji", alias = "image_url")]
    pub image: Option<String>,
    /// Free-form domain attribute (a habitat, a target model, ...).
    #[serde(default, alias = "habitat", alias = "model_hint")]
    pub attribute: Option<String>,
    #[serde(default, alias = "fun_fact", alias = "usage_note")]
    pub fact: Option<String>,
    /// Expected to lie in 1..=10; the storage layer rejects anything else.
    #[serde(default, alias = "cuteness_level")]
    pub rating: Option<i32>,
    #[serde(default, alias = "tags", alias = "categories")]
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(alias = "tags", alias = "categories")]
    pub parents: Vec<ParentRecord>,
    #[serde(alias = "snippets", alias = "items", alias = "animals")]
    pub children: Vec<ChildRecord>,
}

impl Catalog {
    pub fn new(parents: Vec<ParentRecord>, children: Vec<ChildRecord>) -> Self {
        Self { parents, children }
    }

    /// Parses a catalog from its JSON representation.
    pub fn from_json(name: &str, json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|source| CoreError::CatalogParse {
            name: name.to_string(),
            source,
        })
    }

    /// Returns the demo catalog shipped for the given family.
    pub fn builtin(kind: FamilyKind) -> Result<Self, CoreError> {
        match kind {
            FamilyKind::Tags => Self::from_json("tag_catalog", TAG_CATALOG),
            FamilyKind::Categories => Self::from_json("animal_catalog", ANIMAL_CATALOG),
        }
    }

    /// Lists `(child title, parent name)` pairs whose parent has no record in this catalog.
    pub fn unresolved_associations(&self) -> Vec<(String, String)> {
        let known: HashSet<&str> = self.parents.iter().map(|p| p.name.as_str()).collect();
        self.children
            .iter()
            .flat_map(|child| {
                child
                    .parents
                    .iter()
                    .filter(|name| !known.contains(name.as_str()))
                    .map(|name| (child.title.clone(), name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogs_parse() {
        let tags = Catalog::builtin(FamilyKind::Tags).unwrap();
        assert_eq!(tags.parents.len(), 10);
        assert_eq!(tags.children.len(), 40);

        let animals = Catalog::builtin(FamilyKind::Categories).unwrap();
        assert_eq!(animals.parents.len(), 8);
        assert_eq!(animals.children.len(), 12);
    }

    #[test]
    fn builtin_catalogs_have_no_dangling_associations() {
        for kind in FamilyKind::ALL {
            let catalog = Catalog::builtin(kind).unwrap();
            assert!(catalog.unresolved_associations().is_empty(), "{kind}");
        }
    }

    #[test]
    fn builtin_ratings_stay_in_range() {
        let animals = Catalog::builtin(FamilyKind::Categories).unwrap();
        assert!(animals
            .children
            .iter()
            .filter_map(|c| c.rating)
            .all(|r| (1..=10).contains(&r)));
    }

    #[test]
    fn accepts_source_field_names() {
        let json = r#"{
            "categories": [{ "name": "Farm", "description": "Friendly", "emoji": "🚜" }],
            "animals": [{
                "name": "Duckling",
                "description": "Yellow and fluffy",
                "emoji": "🐤",
                "habitat": "Pond",
                "fun_fact": "Imprints on the first thing it sees",
                "cuteness_level": 9,
                "categories": ["Farm", "Pond Life"]
            }]
        }"#;
        let catalog = Catalog::from_json("inline", json).unwrap();
        assert_eq!(catalog.parents[0].icon.as_deref(), Some("🚜"));
        let child = &catalog.children[0];
        assert_eq!(child.title, "Duckling");
        assert_eq!(child.attribute.as_deref(), Some("Pond"));
        assert_eq!(child.rating, Some(9));
        assert_eq!(
            catalog.unresolved_associations(),
            vec![("Duckling".to_string(), "Pond Life".to_string())]
        );
    }

    #[test]
    fn malformed_json_names_the_catalog() {
        let err = Catalog::from_json("broken", "{ not json").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
