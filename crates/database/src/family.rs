//! Static descriptions of the two table families.
//!
//! Both families share one logical shape: a parent table with unique names, a
//! child table, and an existence-only relation table whose rows cascade away with
//! either side. Only identifiers differ, so statements are rendered from the
//! descriptor. Identifiers are compile-time constants; values are always bound.

use crate::schema::TableSpec;
use core_types::FamilyKind;

/// Child-table column names, in the order used by inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildColumns {
    pub title: &'static str,
    pub body: &'static str,
    pub image: &'static str,
    pub attribute: &'static str,
    pub fact: &'static str,
    pub rating: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Family {
    pub kind: FamilyKind,
    pub parent_table: &'static str,
    pub child_table: &'static str,
    pub relation_table: &'static str,
    /// Relation column referencing the child table.
    pub child_key: &'static str,
    /// Relation column referencing the parent table.
    pub parent_key: &'static str,
    pub child_columns: ChildColumns,
    /// Parents first, relation table last.
    pub tables: [TableSpec; 3],
}

pub const TAG_SYSTEM: Family = Family {
    kind: FamilyKind::Tags,
    parent_table: "tags",
    child_table: "snippets",
    relation_table: "snippet_tags",
    child_key: "snippet_id",
    parent_key: "tag_id",
    child_columns: ChildColumns {
        title: "title",
        body: "content",
        image: "image_url",
        attribute: "model_hint",
        fact: "usage_note",
        rating: "rating",
    },
    tables: [
        TableSpec {
            name: "tags",
            ddl: r#"
CREATE TABLE IF NOT EXISTS tags (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL UNIQUE,
    description VARCHAR(255),
    icon VARCHAR(16),
    color VARCHAR(20),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
            depends_on: &[],
        },
        TableSpec {
            name: "snippets",
            ddl: r#"
CREATE TABLE IF NOT EXISTS snippets (
    id SERIAL PRIMARY KEY,
    title VARCHAR(200) NOT NULL CHECK (char_length(title) > 0),
    content TEXT NOT NULL,
    image_url VARCHAR(500),
    model_hint VARCHAR(100),
    usage_note TEXT,
    rating INT CHECK (rating BETWEEN 1 AND 10),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
            depends_on: &[],
        },
        TableSpec {
            name: "snippet_tags",
            ddl: r#"
CREATE TABLE IF NOT EXISTS snippet_tags (
    snippet_id INT NOT NULL REFERENCES snippets(id) ON DELETE CASCADE,
    tag_id INT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (snippet_id, tag_id)
)"#,
            depends_on: &["snippets", "tags"],
        },
    ],
};

pub const CATEGORY_SYSTEM: Family = Family {
    kind: FamilyKind::Categories,
    parent_table: "categories",
    child_table: "items",
    relation_table: "item_categories",
    child_key: "item_id",
    parent_key: "category_id",
    child_columns: ChildColumns {
        title: "name",
        body: "description",
        image: "emoji",
        attribute: "habitat",
        fact: "fun_fact",
        rating: "rating",
    },
    tables: [
        TableSpec {
            name: "categories",
            ddl: r#"
CREATE TABLE IF NOT EXISTS categories (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL UNIQUE,
    description VARCHAR(255),
    icon VARCHAR(16),
    color VARCHAR(20),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
            depends_on: &[],
        },
        TableSpec {
            name: "items",
            ddl: r#"
CREATE TABLE IF NOT EXISTS items (
    id SERIAL PRIMARY KEY,
    name VARCHAR(200) NOT NULL CHECK (char_length(name) > 0),
    description TEXT NOT NULL,
    emoji VARCHAR(16),
    habitat VARCHAR(100),
    fun_fact TEXT,
    rating INT CHECK (rating BETWEEN 1 AND 10),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
            depends_on: &[],
        },
        TableSpec {
            name: "item_categories",
            ddl: r#"
CREATE TABLE IF NOT EXISTS item_categories (
    item_id INT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    category_id INT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    PRIMARY KEY (item_id, category_id)
)"#,
            depends_on: &["items", "categories"],
        },
    ],
};

impl Family {
    pub fn of(kind: FamilyKind) -> &'static Family {
        match kind {
            FamilyKind::Tags => &TAG_SYSTEM,
            FamilyKind::Categories => &CATEGORY_SYSTEM,
        }
    }

    pub fn all() -> [&'static Family; 2] {
        [&TAG_SYSTEM, &CATEGORY_SYSTEM]
    }

    /// Deletes relation rows, then children, then parents.
    pub fn clear_statements(&self) -> [String; 3] {
        [
            format!("DELETE FROM {}", self.relation_table),
            format!("DELETE FROM {}", self.child_table),
            format!("DELETE FROM {}", self.parent_table),
        ]
    }

    /// `$1` name, `$2` description, `$3` icon, `$4` color. Yields the row's `id`
    /// whether it was inserted or updated.
    pub fn upsert_parent_sql(&self) -> String {
        format!(
            "INSERT INTO {t} (name, description, icon, color) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description, \
             icon = COALESCE(EXCLUDED.icon, {t}.icon), color = COALESCE(EXCLUDED.color, {t}.color) \
             RETURNING id",
            t = self.parent_table
        )
    }

    /// `$1` title .. `$6` rating, in [`ChildColumns`] order. Yields the new `id`.
    pub fn insert_child_sql(&self) -> String {
        let c = &self.child_columns;
        format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            self.child_table, c.title, c.body, c.image, c.attribute, c.fact, c.rating
        )
    }

    /// `$1` child id, `$2` parent id. Re-linking an existing pair is a no-op.
    pub fn insert_relation_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            self.relation_table, self.child_key, self.parent_key
        )
    }

    /// Child columns under their normalised names, for use in `SELECT` lists.
    pub fn child_projection(&self, alias: &str) -> String {
        let c = &self.child_columns;
        format!(
            "{a}.id, {a}.{} AS title, {a}.{} AS body, {a}.{} AS image, \
             {a}.{} AS attribute, {a}.{} AS fact, {a}.{} AS rating",
            c.title,
            c.body,
            c.image,
            c.attribute,
            c.fact,
            c.rating,
            a = alias
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_runs_child_before_parent() {
        let [relation, child, parent] = TAG_SYSTEM.clear_statements();
        assert_eq!(relation, "DELETE FROM snippet_tags");
        assert_eq!(child, "DELETE FROM snippets");
        assert_eq!(parent, "DELETE FROM tags");
    }

    #[test]
    fn insert_statements_use_placeholders_only() {
        let sql = CATEGORY_SYSTEM.insert_child_sql();
        assert_eq!(
            sql,
            "INSERT INTO items (name, description, emoji, habitat, fun_fact, rating) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id"
        );
        assert!(CATEGORY_SYSTEM.upsert_parent_sql().contains("ON CONFLICT (name)"));
        assert!(CATEGORY_SYSTEM.upsert_parent_sql().ends_with("RETURNING id"));
        assert_eq!(
            TAG_SYSTEM.insert_relation_sql(),
            "INSERT INTO snippet_tags (snippet_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn projection_normalises_column_names() {
        let projection = TAG_SYSTEM.child_projection("s");
        assert!(projection.starts_with("s.id, s.title AS title, s.content AS body"));
        assert!(projection.ends_with("s.rating AS rating"));
    }

    #[test]
    fn lookup_by_kind() {
        assert_eq!(Family::of(FamilyKind::Tags).parent_table, "tags");
        assert_eq!(Family::of(FamilyKind::Categories).relation_table, "item_categories");
        for family in Family::all() {
            assert_eq!(family.tables[2].name, family.relation_table);
        }
    }
}
