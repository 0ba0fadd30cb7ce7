//! Entity metadata and model access traits.
//!
//! `Entity` describes a table (name, keys, relations, scopes) and is the
//! anchor type for query builders, following SeaORM's entity/model split:
//! the entity is a unit struct carrying metadata, the model is a mapped
//! row instance.
//!
//! Models expose an explicit accessor layer: dynamic field reads go through
//! [`ModelTrait::field`], and relation data loaded by `with_` lands in a
//! [`LoadedRelations`] set whose accessor distinguishes "never loaded" from
//! "loaded but empty".

use crate::query::{AggregateBuilder, QueryBuilder};
use crate::relation::RelationDef;
use crate::row::{FromRow, Row};
use crate::scope::GlobalScope;

/// Trait describing a queryable entity (a table)
///
/// # Example
///
/// ```
/// use riptide::{Entity, FromRow, LoadedRelations, ModelTrait, RiptideError, Row};
///
/// #[derive(Default)]
/// struct User;
///
/// #[derive(Debug, Clone)]
/// struct UserModel {
///     id: i64,
///     name: String,
///     relations: LoadedRelations,
/// }
///
/// impl FromRow for UserModel {
///     fn from_row(row: &Row) -> Result<Self, RiptideError> {
///         Ok(UserModel {
///             id: row.get_i64("id").ok_or_else(|| RiptideError::Parse("missing id".into()))?,
///             name: row.get_str("name").unwrap_or_default().to_string(),
///             relations: LoadedRelations::default(),
///         })
///     }
/// }
///
/// impl ModelTrait for UserModel {
///     fn field(&self, name: &str) -> Option<serde_json::Value> {
///         match name {
///             "id" => Some(self.id.into()),
///             "name" => Some(self.name.clone().into()),
///             _ => None,
///         }
///     }
///     fn primary_key_value(&self) -> serde_json::Value {
///         self.id.into()
///     }
///     fn relations(&self) -> &LoadedRelations {
///         &self.relations
///     }
///     fn relations_mut(&mut self) -> &mut LoadedRelations {
///         &mut self.relations
///     }
/// }
///
/// impl Entity for User {
///     type Model = UserModel;
///     fn table_name(&self) -> &'static str {
///         "users"
///     }
/// }
/// ```
pub trait Entity: Default + Sized {
    /// The mapped row type returned by terminal read operations
    type Model: ModelTrait + FromRow;

    /// The entity's table name
    fn table_name(&self) -> &'static str;

    /// The primary key column
    fn primary_key(&self) -> &'static str {
        "id"
    }

    /// The soft-delete timestamp column, when the entity soft-deletes
    ///
    /// Returning `Some` makes compiled queries exclude soft-deleted rows by
    /// default and makes `delete()` write a timestamp instead of removing
    /// rows.
    fn soft_delete_column(&self) -> Option<&'static str> {
        None
    }

    /// Relations this entity declares, referenced by name in `with_` and
    /// `where_has`
    fn relations(&self) -> Vec<RelationDef> {
        Vec::new()
    }

    /// Global scopes applied to every query unless excluded per chain
    fn global_scopes(&self) -> Vec<GlobalScope> {
        Vec::new()
    }

    /// Look up a declared relation by name
    fn relation(&self, name: &str) -> Option<RelationDef> {
        self.relations().into_iter().find(|def| def.name == name)
    }

    /// Start a query builder chain for this entity
    fn query() -> QueryBuilder<Self> {
        QueryBuilder::new()
    }

    /// Start an aggregate builder chain for this entity
    fn aggregate() -> AggregateBuilder<Self> {
        AggregateBuilder::new()
    }
}

/// Trait for model-level data access
pub trait ModelTrait: Clone + std::fmt::Debug {
    /// Get a field value by name; `None` for unknown fields (no magic
    /// fallback lookup)
    fn field(&self, name: &str) -> Option<serde_json::Value>;

    /// The primary key value
    fn primary_key_value(&self) -> serde_json::Value;

    /// Relations loaded onto this instance
    fn relations(&self) -> &LoadedRelations;

    /// Mutable access for the eager loader
    fn relations_mut(&mut self) -> &mut LoadedRelations;
}

/// Result of reading a relation from a model
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue<'a> {
    /// The relation was never fetched for this instance
    NotLoaded,
    /// The relation was eagerly fetched; the slice may be empty
    Loaded(&'a [Row]),
}

impl<'a> RelationValue<'a> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, RelationValue::Loaded(_))
    }

    /// The loaded rows, or `None` when not loaded
    pub fn rows(&self) -> Option<&'a [Row]> {
        match self {
            RelationValue::Loaded(rows) => Some(rows),
            RelationValue::NotLoaded => None,
        }
    }
}

/// Per-model set of eagerly loaded relations
///
/// Inserting a relation marks it loaded even when the row set is empty,
/// which is what lets callers tell "no related rows" apart from "relation
/// was not requested".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRelations {
    loaded: std::collections::BTreeMap<String, Vec<Row>>,
}

impl LoadedRelations {
    /// Record rows for a relation, marking it loaded
    pub fn insert(&mut self, relation: impl Into<String>, rows: Vec<Row>) {
        self.loaded.insert(relation.into(), rows);
    }

    /// Read a relation's load state
    pub fn get(&self, relation: &str) -> RelationValue<'_> {
        match self.loaded.get(relation) {
            Some(rows) => RelationValue::Loaded(rows),
            None => RelationValue::NotLoaded,
        }
    }

    /// True when the relation was eagerly fetched
    pub fn is_loaded(&self, relation: &str) -> bool {
        self.loaded.contains_key(relation)
    }

    /// Names of all loaded relations
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loaded_relations_distinguishes_empty_from_missing() {
        let mut relations = LoadedRelations::default();
        assert_eq!(relations.get("posts"), RelationValue::NotLoaded);
        assert!(!relations.is_loaded("posts"));

        relations.insert("posts", Vec::new());
        assert!(relations.is_loaded("posts"));
        assert_eq!(relations.get("posts").rows(), Some(&[][..]));
    }

    #[test]
    fn test_loaded_relations_returns_rows() {
        let mut relations = LoadedRelations::default();
        let row = Row::from_pairs([("id", json!(1))]);
        relations.insert("posts", vec![row.clone()]);
        match relations.get("posts") {
            RelationValue::Loaded(rows) => assert_eq!(rows, &[row]),
            RelationValue::NotLoaded => panic!("relation should be loaded"),
        }
    }
}
