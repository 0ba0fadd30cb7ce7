//! Relation metadata definitions.
//!
//! A `RelationDef` carries everything the builder needs to join or
//! correlate a related table: key columns, and for many-to-many relations
//! the pivot table and its key columns.

/// Type of relationship between entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// One-to-one relationship
    HasOne,
    /// One-to-many relationship
    HasMany,
    /// Many-to-one relationship (`belongs_to`)
    BelongsTo,
    /// Many-to-many relationship through a pivot table
    ManyToMany,
}

/// Defines a named relationship from a parent entity to a related table
///
/// Key column semantics by kind:
/// - `HasOne` / `HasMany`: `foreign_key` lives on the related table and
///   references the parent's `local_key`.
/// - `BelongsTo`: `foreign_key` lives on the parent and references the
///   related table's `local_key` (the owner key).
/// - `ManyToMany`: `foreign_key` and `related_pivot_key` live on the pivot
///   table, referencing the parent's `local_key` and the related table's
///   `related_key` respectively.
///
/// # Example
///
/// ```
/// use riptide::RelationDef;
///
/// // users 1-N posts (posts.user_id = users.id)
/// let posts = RelationDef::has_many("posts", "posts", "user_id");
///
/// // users N-N roles through role_user
/// let roles = RelationDef::many_to_many("roles", "roles", "role_user", "user_id", "role_id");
/// assert_eq!(roles.pivot_table, Some("role_user"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Name used in `with_` / `where_has` lookups
    pub name: &'static str,
    /// Type of relationship
    pub kind: RelationKind,
    /// The related table
    pub related_table: &'static str,
    /// Foreign key column (see kind semantics above)
    pub foreign_key: &'static str,
    /// Parent-side key column (owner key on the related table for
    /// `BelongsTo`)
    pub local_key: &'static str,
    /// Pivot table, many-to-many only
    pub pivot_table: Option<&'static str>,
    /// Pivot column referencing the related table, many-to-many only
    pub related_pivot_key: Option<&'static str>,
    /// Related-side key column joined by the pivot
    pub related_key: &'static str,
}

impl RelationDef {
    /// One-to-one: `related.foreign_key = parent.id`
    pub fn has_one(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::HasOne,
            related_table,
            foreign_key,
            local_key: "id",
            pivot_table: None,
            related_pivot_key: None,
            related_key: "id",
        }
    }

    /// One-to-many: `related.foreign_key = parent.id`
    pub fn has_many(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            kind: RelationKind::HasMany,
            ..Self::has_one(name, related_table, foreign_key)
        }
    }

    /// Many-to-one: `parent.foreign_key = related.id`
    pub fn belongs_to(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            kind: RelationKind::BelongsTo,
            ..Self::has_one(name, related_table, foreign_key)
        }
    }

    /// Many-to-many through `pivot_table`
    ///
    /// `foreign_pivot_key` references the parent, `related_pivot_key` the
    /// related table.
    pub fn many_to_many(
        name: &'static str,
        related_table: &'static str,
        pivot_table: &'static str,
        foreign_pivot_key: &'static str,
        related_pivot_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::ManyToMany,
            related_table,
            foreign_key: foreign_pivot_key,
            local_key: "id",
            pivot_table: Some(pivot_table),
            related_pivot_key: Some(related_pivot_key),
            related_key: "id",
        }
    }

    /// Override the parent-side key column (default `id`)
    pub fn with_local_key(mut self, local_key: &'static str) -> Self {
        self.local_key = local_key;
        self
    }

    /// Override the related-side key column (default `id`)
    pub fn with_related_key(mut self, related_key: &'static str) -> Self {
        self.related_key = related_key;
        self
    }

    /// True for pivot-mediated relations
    pub fn is_many_to_many(&self) -> bool {
        self.kind == RelationKind::ManyToMany
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_many_defaults() {
        let def = RelationDef::has_many("posts", "posts", "user_id");
        assert_eq!(def.kind, RelationKind::HasMany);
        assert_eq!(def.local_key, "id");
        assert_eq!(def.pivot_table, None);
        assert!(!def.is_many_to_many());
    }

    #[test]
    fn test_many_to_many_keys() {
        let def = RelationDef::many_to_many("roles", "roles", "role_user", "user_id", "role_id");
        assert_eq!(def.foreign_key, "user_id");
        assert_eq!(def.related_pivot_key, Some("role_id"));
        assert_eq!(def.related_key, "id");
        assert!(def.is_many_to_many());
    }

    #[test]
    fn test_key_overrides() {
        let def = RelationDef::belongs_to("author", "users", "author_id")
            .with_local_key("uuid")
            .with_related_key("uuid");
        assert_eq!(def.local_key, "uuid");
        assert_eq!(def.related_key, "uuid");
    }
}
