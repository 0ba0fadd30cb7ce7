//! Relation-scoped query builder.
//!
//! A `RelationBuilder` wraps a [`QueryBuilder`] over the related entity and
//! injects the base join for a concrete parent row: a direct foreign-key
//! predicate for one-to-one/one-to-many, a pivot join for many-to-many.
//! Pivot-scoped predicates and ordering resolve against the pivot table's
//! namespace rather than the related entity's.

use sea_query::{Expr, ExprTrait, JoinType, Query, SelectStatement};

use crate::error::RiptideError;
use crate::executor::Executor;
use crate::filter::{FilterCondition, Operator};
use crate::model::Entity;
use crate::query::builder::{pivot_keys, QueryBuilder, SortDirection, SortSpec};
use crate::query::compile::{condition_expr, join_condition, Ident};
use crate::query::value_conversion::json_to_value;
use crate::relation::def::{RelationDef, RelationKind};

/// Query builder scoped to one parent row's relation
///
/// `E` is the *related* entity. Typical usage wraps construction in an
/// accessor on the parent model:
///
/// ```no_run
/// # use riptide::{Entity, Executor, RelationBuilder, RelationDef, RiptideError};
/// # use serde_json::json;
/// # #[derive(Default)]
/// # struct Role;
/// # impl Entity for Role {
/// #     type Model = RoleModel;
/// #     fn table_name(&self) -> &'static str { "roles" }
/// # }
/// # #[derive(Debug, Clone)]
/// # struct RoleModel;
/// # impl riptide::FromRow for RoleModel {
/// #     fn from_row(_row: &riptide::Row) -> Result<Self, RiptideError> { todo!() }
/// # }
/// # impl riptide::ModelTrait for RoleModel {
/// #     fn field(&self, _name: &str) -> Option<serde_json::Value> { None }
/// #     fn primary_key_value(&self) -> serde_json::Value { serde_json::Value::Null }
/// #     fn relations(&self) -> &riptide::LoadedRelations { todo!() }
/// #     fn relations_mut(&mut self) -> &mut riptide::LoadedRelations { todo!() }
/// # }
/// struct User {
///     id: i64,
/// }
///
/// impl User {
///     fn roles(&self) -> RelationBuilder<Role> {
///         let def = RelationDef::many_to_many("roles", "roles", "role_user", "user_id", "role_id");
///         RelationBuilder::new(def, json!(self.id))
///     }
/// }
///
/// # fn run(user: &User, executor: &dyn Executor) -> Result<(), RiptideError> {
/// let mut roles = user.roles();
/// roles.where_pivot("expires_at", riptide::Operator::NotNull, json!(null))?;
/// let active = roles.get(executor)?;
/// # Ok(())
/// # }
/// ```
pub struct RelationBuilder<E: Entity> {
    pub(crate) query: QueryBuilder<E>,
    pub(crate) def: RelationDef,
    pub(crate) parent_key: serde_json::Value,
    pivot_columns: Vec<String>,
    pivot_wheres: Vec<FilterCondition>,
    pivot_orders: Vec<SortSpec>,
}

impl<E: Entity> Clone for RelationBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            def: self.def.clone(),
            parent_key: self.parent_key.clone(),
            pivot_columns: self.pivot_columns.clone(),
            pivot_wheres: self.pivot_wheres.clone(),
            pivot_orders: self.pivot_orders.clone(),
        }
    }
}

impl<E: Entity> RelationBuilder<E> {
    /// Build a relation query for the parent row identified by
    /// `parent_key` (the parent's local-key value; for `BelongsTo`, the
    /// parent's foreign-key value)
    pub fn new(def: RelationDef, parent_key: serde_json::Value) -> Self {
        Self {
            query: QueryBuilder::new(),
            def,
            parent_key,
            pivot_columns: Vec::new(),
            pivot_wheres: Vec::new(),
            pivot_orders: Vec::new(),
        }
    }

    /// The wrapped builder over the related entity, for predicates, shape,
    /// eager loads, and soft-delete/scope control
    pub fn query(&mut self) -> &mut QueryBuilder<E> {
        &mut self.query
    }

    /// The relation definition this builder was created from
    pub fn def(&self) -> &RelationDef {
        &self.def
    }

    /// Project pivot columns into the result rows as `pivot_<column>`
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for non-pivot relations.
    pub fn with_pivot<I, S>(&mut self, columns: I) -> Result<&mut Self, RiptideError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        pivot_keys(&self.def)?;
        self.pivot_columns
            .extend(columns.into_iter().map(Into::into));
        Ok(self)
    }

    /// Add a WHERE condition resolved against the pivot table
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for non-pivot relations, plus
    /// the usual condition validation.
    pub fn where_pivot(
        &mut self,
        column: impl Into<String>,
        operator: Operator,
        value: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        pivot_keys(&self.def)?;
        let condition = FilterCondition::new(column, operator, value)?;
        self.pivot_wheres.push(condition);
        Ok(self)
    }

    /// Add a sort key resolved against the pivot table
    ///
    /// Pivot sort keys apply after the related-entity sort keys.
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for non-pivot relations or bad
    /// directions.
    pub fn order_by_pivot(
        &mut self,
        column: impl Into<String>,
        direction: &str,
    ) -> Result<&mut Self, RiptideError> {
        pivot_keys(&self.def)?;
        let direction = SortDirection::parse(direction)?;
        self.pivot_orders.push(SortSpec {
            column: column.into(),
            direction,
        });
        Ok(self)
    }

    /// Compile the relation query, join injected before predicates
    pub fn build_select(&self) -> Result<SelectStatement, RiptideError> {
        self.build_select_internal(true)
    }

    fn build_select_internal(&self, with_shape: bool) -> Result<SelectStatement, RiptideError> {
        let related = self.def.related_table;
        let mut stmt = Query::select();

        match self.def.kind {
            RelationKind::HasOne | RelationKind::HasMany => {
                stmt.column(sea_query::Asterisk).from(Ident::new(related));
                stmt.cond_where(
                    Expr::col(Ident::new(self.def.foreign_key))
                        .eq(json_to_value(&self.parent_key)),
                );
            }
            RelationKind::BelongsTo => {
                stmt.column(sea_query::Asterisk).from(Ident::new(related));
                stmt.cond_where(
                    Expr::col(Ident::new(self.def.local_key))
                        .eq(json_to_value(&self.parent_key)),
                );
            }
            RelationKind::ManyToMany => {
                let (pivot, related_pivot_key) = pivot_keys(&self.def)?;
                stmt.column((Ident::new(related), sea_query::Asterisk));
                for column in &self.pivot_columns {
                    stmt.expr_as(
                        Expr::col((Ident::new(pivot), Ident::new(column))),
                        Ident::new(format!("pivot_{column}")),
                    );
                }
                stmt.from(Ident::new(related)).join(
                    JoinType::InnerJoin,
                    Ident::new(pivot),
                    join_condition(related, self.def.related_key, pivot, related_pivot_key),
                );
                stmt.cond_where(
                    Expr::col((Ident::new(pivot), Ident::new(self.def.foreign_key)))
                        .eq(json_to_value(&self.parent_key)),
                );
            }
        }

        stmt.cond_where(self.query.where_condition());
        if let Some(pivot) = self.def.pivot_table {
            for condition in &self.pivot_wheres {
                stmt.cond_where(condition_expr(condition, Some(pivot)));
            }
        }

        if with_shape {
            self.query.apply_shape(&mut stmt);
            if let Some(pivot) = self.def.pivot_table {
                for order in &self.pivot_orders {
                    stmt.order_by(
                        (Ident::new(pivot), Ident::new(&order.column)),
                        order.direction.to_order(),
                    );
                }
            }
        }
        Ok(stmt)
    }

    /// Execute and return all related models
    pub fn get(&self, executor: &dyn Executor) -> Result<Vec<E::Model>, RiptideError> {
        let stmt = self.build_select()?;
        log::debug!(
            "executing relation select '{}' on {}",
            self.def.name,
            self.def.related_table
        );
        let rows = executor.fetch(&stmt)?;
        self.query.finish_rows(rows, executor)
    }

    /// Execute and return the first related model, or `None`
    pub fn first(&self, executor: &dyn Executor) -> Result<Option<E::Model>, RiptideError> {
        let mut scoped = self.clone();
        scoped.query.take(1)?;
        Ok(scoped.get(executor)?.into_iter().next())
    }

    /// Find a related model by primary key within the relation
    pub fn find(
        &self,
        executor: &dyn Executor,
        id: impl Into<serde_json::Value>,
    ) -> Result<Option<E::Model>, RiptideError> {
        let mut scoped = self.clone();
        scoped
            .query
            .where_eq(E::default().primary_key(), id.into())?;
        scoped.first(executor)
    }

    /// Count related rows, ignoring limit/offset/order
    pub fn count(&self, executor: &dyn Executor) -> Result<u64, RiptideError> {
        let inner = self.build_select_internal(false)?;
        let mut outer = Query::select();
        outer.expr_as(Expr::cust("COUNT(*)"), Ident::new("count"));
        outer.from_subquery(inner, Ident::new("count_subquery"));
        let rows = executor.fetch(&outer)?;
        Ok(rows
            .first()
            .and_then(|row| row.get_u64("count"))
            .unwrap_or(0))
    }

    /// True when the relation has at least one row
    pub fn exists(&self, executor: &dyn Executor) -> Result<bool, RiptideError> {
        let mut stmt = self.build_select_internal(false)?;
        stmt.limit(1);
        let rows = executor.fetch(&stmt)?;
        Ok(!rows.is_empty())
    }

    /// Update all related rows, returning the affected-row count
    pub fn update(
        &self,
        executor: &dyn Executor,
        values: serde_json::Map<String, serde_json::Value>,
    ) -> Result<u64, RiptideError> {
        let mut scoped = self.query.clone();
        self.scope_to_parent(&mut scoped)?;
        scoped.update(executor, values)
    }

    /// Delete all related rows (soft-delete aware), returning the count
    pub fn delete(&self, executor: &dyn Executor) -> Result<u64, RiptideError> {
        let mut scoped = self.query.clone();
        self.scope_to_parent(&mut scoped)?;
        scoped.delete(executor)
    }

    /// Narrow a plain builder over the related entity to this parent's rows
    ///
    /// Mutations cannot carry the pivot join, so many-to-many relations
    /// scope through an `IN` subquery over the pivot instead.
    fn scope_to_parent(&self, query: &mut QueryBuilder<E>) -> Result<(), RiptideError> {
        match self.def.kind {
            RelationKind::HasOne | RelationKind::HasMany => {
                query.where_eq(self.def.foreign_key, self.parent_key.clone())?;
            }
            RelationKind::BelongsTo => {
                query.where_eq(self.def.local_key, self.parent_key.clone())?;
            }
            RelationKind::ManyToMany => {
                let (pivot, related_pivot_key) = pivot_keys(&self.def)?;
                let mut sub = Query::select();
                sub.column(Ident::new(related_pivot_key))
                    .from(Ident::new(pivot));
                sub.cond_where(
                    Expr::col(Ident::new(self.def.foreign_key))
                        .eq(json_to_value(&self.parent_key)),
                );
                query.relation_filters.push(
                    sea_query::Condition::all().add(
                        Expr::col(Ident::new(self.def.related_key)).in_subquery(sub),
                    ),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entity;
    use crate::tests_cfg::{MockExecutor, Post, Role};
    use crate::row::Row;
    use serde_json::json;

    fn posts_of_user(id: i64) -> RelationBuilder<Post> {
        let def = crate::tests_cfg::User::default().relation("posts").unwrap();
        RelationBuilder::new(def, json!(id))
    }

    fn roles_of_user(id: i64) -> RelationBuilder<Role> {
        let def = crate::tests_cfg::User::default().relation("roles").unwrap();
        RelationBuilder::new(def, json!(id))
    }

    #[test]
    fn test_has_many_join_predicate() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        posts_of_user(7).get(&executor).unwrap();
        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#"FROM "posts""#), "{sql}");
        assert!(sql.contains(r#""user_id" = 7"#), "{sql}");
    }

    #[test]
    fn test_relation_query_composes_with_filters() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        let mut posts = posts_of_user(7);
        posts
            .query()
            .where_eq("published", json!(true))
            .unwrap()
            .order_by("views", "desc")
            .unwrap();
        posts.get(&executor).unwrap();
        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#""user_id" = 7"#), "{sql}");
        assert!(sql.contains(r#""published" = TRUE"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "views" DESC"#), "{sql}");
    }

    #[test]
    fn test_many_to_many_pivot_join_and_projection() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        let mut roles = roles_of_user(1);
        roles.with_pivot(["expires_at"]).unwrap();
        roles.get(&executor).unwrap();
        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#"INNER JOIN "role_user""#), "{sql}");
        assert!(sql.contains("roles.id = role_user.role_id"), "{sql}");
        assert!(sql.contains(r#""role_user"."user_id" = 1"#), "{sql}");
        assert!(
            sql.contains(r#""role_user"."expires_at" AS "pivot_expires_at""#),
            "{sql}"
        );
    }

    #[test]
    fn test_pivot_where_and_order_resolve_against_pivot() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        let mut roles = roles_of_user(1);
        roles
            .where_pivot("expires_at", Operator::NotNull, json!(null))
            .unwrap()
            .order_by_pivot("created_at", "desc")
            .unwrap();
        roles.get(&executor).unwrap();
        let sql = executor.fetched()[0].clone();
        assert!(
            sql.contains(r#""role_user"."expires_at" IS NOT NULL"#),
            "{sql}"
        );
        assert!(
            sql.contains(r#"ORDER BY "role_user"."created_at" DESC"#),
            "{sql}"
        );
    }

    #[test]
    fn test_pivot_methods_rejected_without_pivot() {
        let mut posts = posts_of_user(1);
        assert!(posts.with_pivot(["x"]).is_err());
        assert!(posts
            .where_pivot("x", Operator::Equal, json!(1))
            .is_err());
        assert!(posts.order_by_pivot("x", "asc").is_err());
    }

    #[test]
    fn test_count_wraps_relation_query() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![Row::from_pairs([("count", json!(3))])]);
        let count = posts_of_user(7).count(&executor).unwrap();
        assert_eq!(count, 3);
        let sql = executor.fetched()[0].clone();
        assert!(sql.contains("COUNT(*)"), "{sql}");
        assert!(sql.contains(r#""user_id" = 7"#), "{sql}");
    }

    #[test]
    fn test_relation_update_scopes_to_parent() {
        let executor = MockExecutor::new();
        executor.push_affected(2);
        let mut values = serde_json::Map::new();
        values.insert("published".to_string(), json!(true));
        let affected = posts_of_user(7).update(&executor, values).unwrap();
        assert_eq!(affected, 2);
        let sql = executor.executed()[0].clone();
        assert!(sql.starts_with("UPDATE"), "{sql}");
        assert!(sql.contains(r#""user_id" = 7"#), "{sql}");
    }

    #[test]
    fn test_many_to_many_delete_scopes_through_pivot_subquery() {
        let executor = MockExecutor::new();
        executor.push_affected(1);
        roles_of_user(1).delete(&executor).unwrap();
        let sql = executor.executed()[0].clone();
        assert!(sql.starts_with("DELETE FROM \"roles\""), "{sql}");
        assert!(sql.contains(r#""id" IN (SELECT "role_id" FROM "role_user""#), "{sql}");
    }
}
