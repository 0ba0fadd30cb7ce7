//! Fluent query builder.
//!
//! A `QueryBuilder` is a per-chain scratch object: created by
//! [`Entity::query`], mutated through the fluent chain, then consumed by a
//! terminal operation. It is single-owner and not meant to be shared across
//! threads mid-chain.
//!
//! Mutators follow the SeaQuery idiom the crate is built on: `&mut self ->
//! &mut Self` for chaining, with fallible mutators returning
//! `Result<&mut Self, RiptideError>`. A rejected call fails fast and leaves
//! the builder untouched.
//!
//! # Example
//!
//! ```no_run
//! use riptide::{Entity, Executor, Operator, RiptideError};
//! use serde_json::json;
//!
//! # #[derive(Default)]
//! # struct User;
//! # impl Entity for User {
//! #     type Model = UserModel;
//! #     fn table_name(&self) -> &'static str { "users" }
//! # }
//! # #[derive(Debug, Clone)]
//! # struct UserModel;
//! # impl riptide::FromRow for UserModel {
//! #     fn from_row(_row: &riptide::Row) -> Result<Self, RiptideError> { todo!() }
//! # }
//! # impl riptide::ModelTrait for UserModel {
//! #     fn field(&self, _name: &str) -> Option<serde_json::Value> { None }
//! #     fn primary_key_value(&self) -> serde_json::Value { serde_json::Value::Null }
//! #     fn relations(&self) -> &riptide::LoadedRelations { todo!() }
//! #     fn relations_mut(&mut self) -> &mut riptide::LoadedRelations { todo!() }
//! # }
//! # fn run(executor: &dyn Executor) -> Result<(), RiptideError> {
//! let mut query = User::query();
//! query
//!     .where_("age", Operator::GreaterThanOrEqual, json!(18))?
//!     .where_eq("status", json!("active"))?
//!     .order_by("created_at", "desc")?
//!     .take(10)?;
//! let users = query.get(executor)?;
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use sea_query::{Condition, Expr, ExprTrait, JoinType, Order, Query};

use crate::error::RiptideError;
use crate::filter::{FilterCondition, FilterGroup, LogicalOperator, Operator};
use crate::model::Entity;
use crate::query::compile::{group_condition, join_condition, Ident};
use crate::relation::{RelationDef, RelationKind};

/// Sort direction for `order_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse `asc`/`desc` (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for any other input.
    pub fn parse(direction: &str) -> Result<Self, RiptideError> {
        match direction.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(RiptideError::InvalidQuery(format!(
                "invalid sort direction: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub(crate) fn to_order(self) -> Order {
        match self {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

/// Soft-delete visibility for a query chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashedMode {
    /// Exclude soft-deleted rows (the default)
    #[default]
    Exclude,
    /// Include soft-deleted rows alongside live ones
    With,
    /// Only soft-deleted rows
    Only,
}

/// Cursor window recorded by `cursor_paginate`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CursorSpec {
    pub(crate) field: String,
    pub(crate) after: Option<serde_json::Value>,
    pub(crate) before: Option<serde_json::Value>,
}

/// Which global scopes are suppressed for this chain
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum ScopeExclusion {
    #[default]
    None,
    Named(Vec<String>),
    All,
}

/// Constraint callback for eager loads and relation-presence filters
pub type ConstraintFn = Arc<dyn Fn(&mut FilterGroup) + Send + Sync>;

type AfterLoadFn<M> = Arc<dyn Fn(&mut M) + Send + Sync>;

/// Mutable, fluent accumulator of query state for entity `E`
///
/// See the [module docs](self) for the chaining style and the
/// [`compile`](crate::query::compile) module for how accumulated state
/// becomes a statement.
pub struct QueryBuilder<E: Entity> {
    pub(crate) filters: Vec<FilterCondition>,
    pub(crate) or_filters: Vec<FilterGroup>,
    pub(crate) relation_filters: Vec<Condition>,
    pub(crate) eager_loads: Vec<(String, Option<ConstraintFn>)>,
    pub(crate) orders: Vec<SortSpec>,
    pub(crate) groups: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) cursor: Option<CursorSpec>,
    pub(crate) trashed: TrashedMode,
    pub(crate) scope_exclusion: ScopeExclusion,
    pub(crate) after_load: Vec<AfterLoadFn<E::Model>>,
    _entity: PhantomData<E>,
}

impl<E: Entity> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> std::fmt::Debug for QueryBuilder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("filters", &self.filters)
            .field("or_filters", &self.or_filters)
            .field("relation_filters", &self.relation_filters)
            .field("eager_loads", &self.eager_loads.len())
            .field("orders", &self.orders)
            .field("groups", &self.groups)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("cursor", &self.cursor)
            .field("trashed", &self.trashed)
            .field("scope_exclusion", &self.scope_exclusion)
            .field("after_load", &self.after_load.len())
            .finish()
    }
}

impl<E: Entity> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        // Deep copy of every list; callbacks are shared through Arc but are
        // immutable, so mutating the clone never aliases the original.
        Self {
            filters: self.filters.clone(),
            or_filters: self.or_filters.clone(),
            relation_filters: self.relation_filters.clone(),
            eager_loads: self.eager_loads.clone(),
            orders: self.orders.clone(),
            groups: self.groups.clone(),
            limit: self.limit,
            offset: self.offset,
            cursor: self.cursor.clone(),
            trashed: self.trashed,
            scope_exclusion: self.scope_exclusion.clone(),
            after_load: self.after_load.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> QueryBuilder<E> {
    /// Create an empty builder; prefer [`Entity::query`]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            or_filters: Vec::new(),
            relation_filters: Vec::new(),
            eager_loads: Vec::new(),
            orders: Vec::new(),
            groups: Vec::new(),
            limit: None,
            offset: None,
            cursor: None,
            trashed: TrashedMode::Exclude,
            scope_exclusion: ScopeExclusion::None,
            after_load: Vec::new(),
            _entity: PhantomData,
        }
    }

    // --- predicates ---------------------------------------------------

    /// Add a WHERE condition
    ///
    /// # Errors
    ///
    /// Propagates [`FilterCondition::new`] validation failures.
    pub fn where_(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        let condition = FilterCondition::new(field, operator, value)?;
        self.filters.push(condition);
        Ok(self)
    }

    /// Add a WHERE condition with a runtime operator token
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` when the token is not a known
    /// operator, plus the usual value validation.
    pub fn where_str(
        &mut self,
        field: impl Into<String>,
        operator: &str,
        value: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        let operator = Operator::parse(operator).ok_or_else(|| {
            RiptideError::InvalidQuery(format!("unknown operator: {operator}"))
        })?;
        self.where_(field, operator, value)
    }

    /// Add a WHERE equality condition
    pub fn where_eq(
        &mut self,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        self.where_(field, Operator::Equal, value)
    }

    /// Add an OR WHERE condition
    ///
    /// Each `or_where` call contributes one group to the OR fold; the fold
    /// is combined with the top-level AND conditions via AND.
    pub fn or_where(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        let condition = FilterCondition::new(field, operator, value)?;
        let mut group = FilterGroup::new(LogicalOperator::And);
        group.add(condition);
        self.or_filters.push(group);
        Ok(self)
    }

    /// Add a pre-built group to the OR fold (supports arbitrary nesting)
    pub fn or_where_group(&mut self, group: FilterGroup) -> &mut Self {
        self.or_filters.push(group);
        self
    }

    /// WHERE `field` IN `values`
    pub fn where_in<I, V>(
        &mut self,
        field: impl Into<String>,
        values: I,
    ) -> Result<&mut Self, RiptideError>
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        let values: Vec<serde_json::Value> = values.into_iter().map(Into::into).collect();
        self.where_(field, Operator::In, serde_json::Value::Array(values))
    }

    /// WHERE `field` NOT IN `values`
    pub fn where_not_in<I, V>(
        &mut self,
        field: impl Into<String>,
        values: I,
    ) -> Result<&mut Self, RiptideError>
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        let values: Vec<serde_json::Value> = values.into_iter().map(Into::into).collect();
        self.where_(field, Operator::NotIn, serde_json::Value::Array(values))
    }

    /// WHERE `field` IS NULL
    pub fn where_null(&mut self, field: impl Into<String>) -> &mut Self {
        // IS NULL carries no value; construction cannot fail
        if let Ok(condition) = FilterCondition::new(field, Operator::Null, serde_json::Value::Null)
        {
            self.filters.push(condition);
        }
        self
    }

    /// WHERE `field` IS NOT NULL
    pub fn where_not_null(&mut self, field: impl Into<String>) -> &mut Self {
        if let Ok(condition) =
            FilterCondition::new(field, Operator::NotNull, serde_json::Value::Null)
        {
            self.filters.push(condition);
        }
        self
    }

    /// WHERE `field` BETWEEN `low` AND `high`
    pub fn where_between(
        &mut self,
        field: impl Into<String>,
        low: serde_json::Value,
        high: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        self.where_(field, Operator::Between, serde_json::json!([low, high]))
    }

    /// WHERE `field` NOT BETWEEN `low` AND `high`
    pub fn where_not_between(
        &mut self,
        field: impl Into<String>,
        low: serde_json::Value,
        high: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        self.where_(field, Operator::NotBetween, serde_json::json!([low, high]))
    }

    /// WHERE `field` LIKE `pattern`
    pub fn where_like(
        &mut self,
        field: impl Into<String>,
        pattern: impl Into<String>,
    ) -> &mut Self {
        if let Ok(condition) = FilterCondition::new(
            field,
            Operator::Like,
            serde_json::Value::String(pattern.into()),
        ) {
            self.filters.push(condition);
        }
        self
    }

    /// WHERE `field` ILIKE `pattern`
    pub fn where_ilike(
        &mut self,
        field: impl Into<String>,
        pattern: impl Into<String>,
    ) -> &mut Self {
        if let Ok(condition) = FilterCondition::new(
            field,
            Operator::ILike,
            serde_json::Value::String(pattern.into()),
        ) {
            self.filters.push(condition);
        }
        self
    }

    // --- relations ----------------------------------------------------

    /// Request an eager load of `relation` alongside the parent query
    ///
    /// Loaded entities are marked so downstream code can distinguish
    /// "relation not loaded" from "relation loaded but empty" (see
    /// [`LoadedRelations`](crate::LoadedRelations)).
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::RelationNotFound` when the entity does not
    /// declare `relation`.
    pub fn with_(&mut self, relation: &str) -> Result<&mut Self, RiptideError> {
        self.resolve_relation(relation)?;
        self.eager_loads.push((relation.to_string(), None));
        Ok(self)
    }

    /// Request an eager load with extra constraints on the related rows
    pub fn with_filtered(
        &mut self,
        relation: &str,
        constraint: impl Fn(&mut FilterGroup) + Send + Sync + 'static,
    ) -> Result<&mut Self, RiptideError> {
        self.resolve_relation(relation)?;
        self.eager_loads
            .push((relation.to_string(), Some(Arc::new(constraint))));
        Ok(self)
    }

    /// Filter parents by the existence of at least one related row
    ///
    /// Compiles to an EXISTS correlated subquery over the related table.
    pub fn where_has(&mut self, relation: &str) -> Result<&mut Self, RiptideError> {
        let constraints = FilterGroup::default();
        self.push_relation_exists(relation, &constraints, false)
    }

    /// `where_has` with extra constraints on the related rows
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use riptide::{Entity, Operator, RiptideError};
    /// # use serde_json::json;
    /// # fn demo<E: Entity>(query: &mut riptide::QueryBuilder<E>) -> Result<(), RiptideError> {
    /// query.where_has_filtered("posts", |q| {
    ///     let _ = q.add_condition("views", Operator::GreaterThan, json!(1000));
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn where_has_filtered(
        &mut self,
        relation: &str,
        constrain: impl FnOnce(&mut FilterGroup),
    ) -> Result<&mut Self, RiptideError> {
        let mut constraints = FilterGroup::default();
        constrain(&mut constraints);
        self.push_relation_exists(relation, &constraints, false)
    }

    /// Filter parents by the absence of related rows (NOT EXISTS)
    pub fn where_doesnt_have(&mut self, relation: &str) -> Result<&mut Self, RiptideError> {
        let constraints = FilterGroup::default();
        self.push_relation_exists(relation, &constraints, true)
    }

    /// `where_doesnt_have` with extra constraints on the related rows
    pub fn where_doesnt_have_filtered(
        &mut self,
        relation: &str,
        constrain: impl FnOnce(&mut FilterGroup),
    ) -> Result<&mut Self, RiptideError> {
        let mut constraints = FilterGroup::default();
        constrain(&mut constraints);
        self.push_relation_exists(relation, &constraints, true)
    }

    fn resolve_relation(&self, relation: &str) -> Result<RelationDef, RiptideError> {
        let entity = E::default();
        entity
            .relation(relation)
            .ok_or_else(|| RiptideError::RelationNotFound {
                model: entity.table_name(),
                relation: relation.to_string(),
            })
    }

    fn push_relation_exists(
        &mut self,
        relation: &str,
        constraints: &FilterGroup,
        negate: bool,
    ) -> Result<&mut Self, RiptideError> {
        let def = self.resolve_relation(relation)?;
        let entity = E::default();
        let parent_table = entity.table_name();

        let mut sub = Query::select();
        sub.expr(Expr::val(1));
        match def.kind {
            RelationKind::HasOne | RelationKind::HasMany => {
                sub.from(Ident::new(def.related_table));
                sub.cond_where(join_condition(
                    def.related_table,
                    def.foreign_key,
                    parent_table,
                    def.local_key,
                ));
            }
            RelationKind::BelongsTo => {
                sub.from(Ident::new(def.related_table));
                sub.cond_where(join_condition(
                    def.related_table,
                    def.local_key,
                    parent_table,
                    def.foreign_key,
                ));
            }
            RelationKind::ManyToMany => {
                let (pivot, related_pivot_key) = pivot_keys(&def)?;
                sub.from(Ident::new(pivot));
                sub.join(
                    JoinType::InnerJoin,
                    Ident::new(def.related_table),
                    join_condition(def.related_table, def.related_key, pivot, related_pivot_key),
                );
                sub.cond_where(join_condition(
                    pivot,
                    def.foreign_key,
                    parent_table,
                    def.local_key,
                ));
            }
        }
        if !constraints.is_empty() {
            sub.cond_where(group_condition(constraints, Some(def.related_table)));
        }

        let exists = Expr::exists(sub);
        let predicate = if negate { exists.not() } else { exists };
        self.relation_filters.push(Condition::all().add(predicate));
        Ok(self)
    }

    // --- shape --------------------------------------------------------

    /// Add a sort key; multiple calls compose primary/secondary/… keys
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` unless `direction` is
    /// `asc`/`desc` (case-insensitive).
    pub fn order_by(
        &mut self,
        column: impl Into<String>,
        direction: &str,
    ) -> Result<&mut Self, RiptideError> {
        let direction = SortDirection::parse(direction)?;
        self.orders.push(SortSpec {
            column: column.into(),
            direction,
        });
        Ok(self)
    }

    /// Add a descending sort key
    pub fn order_by_desc(&mut self, column: impl Into<String>) -> &mut Self {
        self.orders.push(SortSpec {
            column: column.into(),
            direction: SortDirection::Desc,
        });
        self
    }

    /// Add GROUP BY columns
    pub fn group_by<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Limit the number of rows
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for negative limits; the stored
    /// limit is unchanged on error.
    pub fn take(&mut self, limit: i64) -> Result<&mut Self, RiptideError> {
        if limit < 0 {
            return Err(RiptideError::InvalidQuery(format!(
                "limit must be positive, got {limit}"
            )));
        }
        self.limit = Some(limit as u64);
        Ok(self)
    }

    /// Skip a number of rows
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for negative offsets; the
    /// stored offset is unchanged on error.
    pub fn skip(&mut self, offset: i64) -> Result<&mut Self, RiptideError> {
        if offset < 0 {
            return Err(RiptideError::InvalidQuery(format!(
                "offset must be positive, got {offset}"
            )));
        }
        self.offset = Some(offset as u64);
        Ok(self)
    }

    /// The current limit, if any
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// The current offset, if any
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    // --- soft deletes -------------------------------------------------

    /// Include soft-deleted rows in results
    pub fn with_trashed(&mut self) -> &mut Self {
        self.trashed = TrashedMode::With;
        self
    }

    /// Return only soft-deleted rows
    pub fn only_trashed(&mut self) -> &mut Self {
        self.trashed = TrashedMode::Only;
        self
    }

    // --- scopes -------------------------------------------------------

    /// Suppress one global scope for this chain
    pub fn without_global_scope(&mut self, scope: impl Into<String>) -> &mut Self {
        match &mut self.scope_exclusion {
            ScopeExclusion::All => {}
            ScopeExclusion::Named(names) => names.push(scope.into()),
            ScopeExclusion::None => {
                self.scope_exclusion = ScopeExclusion::Named(vec![scope.into()]);
            }
        }
        self
    }

    /// Suppress all global scopes for this chain
    pub fn without_global_scopes(&mut self) -> &mut Self {
        self.scope_exclusion = ScopeExclusion::All;
        self
    }

    // --- utilities ----------------------------------------------------

    /// Register a callback to run on each model after loading
    pub fn after_load(
        &mut self,
        callback: impl Fn(&mut E::Model) + Send + Sync + 'static,
    ) -> &mut Self {
        self.after_load.push(Arc::new(callback));
        self
    }

    /// Inspect the builder mid-chain without mutating it
    pub fn tap(&mut self, inspect: impl FnOnce(&Self)) -> &mut Self {
        inspect(self);
        self
    }

    /// Apply a mutation branch when `condition` holds
    pub fn when(
        &mut self,
        condition: bool,
        then: impl FnOnce(&mut Self),
    ) -> &mut Self {
        if condition {
            then(self);
        }
        self
    }

    /// Apply one of two mutation branches depending on `condition`
    pub fn when_else(
        &mut self,
        condition: bool,
        then: impl FnOnce(&mut Self),
        otherwise: impl FnOnce(&mut Self),
    ) -> &mut Self {
        if condition {
            then(self);
        } else {
            otherwise(self);
        }
        self
    }
}

/// The pivot table and related pivot key of a many-to-many relation
///
/// # Errors
///
/// Returns `RiptideError::InvalidQuery` for relations without a pivot.
pub(crate) fn pivot_keys(def: &RelationDef) -> Result<(&'static str, &'static str), RiptideError> {
    match (def.pivot_table, def.related_pivot_key) {
        (Some(pivot), Some(related_pivot_key)) => Ok((pivot, related_pivot_key)),
        _ => Err(RiptideError::InvalidQuery(format!(
            "relation '{}' has no pivot table",
            def.name
        ))),
    }
}
