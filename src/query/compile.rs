//! Compilation of accumulated builder state into SeaQuery statements.
//!
//! Compilation is deterministic: the same builder state always yields the
//! same statement. Predicates fold in a fixed order — global scopes, the
//! soft-delete predicate, top-level AND conditions, relation-presence
//! predicates, then the OR-group fold — and shape clauses (order, group,
//! limit, offset) apply last. AND/OR combination is associative, so the
//! fold order only affects the rendered text, never the result set.

use sea_query::{
    Condition, DeleteStatement, Expr, ExprTrait, Iden, Query, SelectStatement, UpdateStatement,
};

use crate::error::RiptideError;
use crate::filter::{FilterCondition, FilterGroup, FilterNode, LogicalOperator, Operator};
use crate::model::Entity;
use crate::query::builder::{QueryBuilder, ScopeExclusion, TrashedMode};
use crate::query::value_conversion::{json_array_to_values, json_to_value, like_pattern};

/// Dynamic identifier for table and column names
#[derive(Debug, Clone)]
pub(crate) struct Ident(String);

impl Ident {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Iden for Ident {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

/// Join condition between two table-qualified columns:
/// `from_table.from_column = to_table.to_column`
pub(crate) fn join_condition(
    from_table: &str,
    from_column: &str,
    to_table: &str,
    to_column: &str,
) -> Expr {
    Expr::cust(format!(
        "{}.{} = {}.{}",
        from_table, from_column, to_table, to_column
    ))
}

/// Compile a single condition into an expression, optionally qualified by a
/// table name (used for pivot predicates and correlated subqueries)
pub(crate) fn condition_expr(condition: &FilterCondition, table: Option<&str>) -> Expr {
    use sea_query::extension::postgres::PgExpr;
    let col = match table {
        Some(table) => Expr::col((Ident::new(table), Ident::new(condition.field()))),
        None => Expr::col(Ident::new(condition.field())),
    };
    let value = condition.value();
    match condition.operator() {
        Operator::Equal => col.eq(json_to_value(value)),
        Operator::NotEqual => col.ne(json_to_value(value)),
        Operator::GreaterThan => col.gt(json_to_value(value)),
        Operator::GreaterThanOrEqual => col.gte(json_to_value(value)),
        Operator::LessThan => col.lt(json_to_value(value)),
        Operator::LessThanOrEqual => col.lte(json_to_value(value)),
        Operator::Like => col.like(like_pattern(value)),
        Operator::ILike => col.ilike(like_pattern(value)),
        Operator::In => col.is_in(json_array_to_values(value)),
        Operator::NotIn => col.is_not_in(json_array_to_values(value)),
        Operator::Null => col.is_null(),
        Operator::NotNull => col.is_not_null(),
        Operator::Between | Operator::NotBetween => {
            // Arity was validated at construction
            let bounds = json_array_to_values(value);
            let low = bounds.first().cloned().unwrap_or(sea_query::Value::String(None));
            let high = bounds.get(1).cloned().unwrap_or(sea_query::Value::String(None));
            if condition.operator() == Operator::Between {
                col.between(low, high)
            } else {
                col.not_between(low, high)
            }
        }
    }
}

/// Recursively fold a filter group into one boolean condition
///
/// AND groups combine children with `Condition::all`, OR groups with
/// `Condition::any`. An empty group compiles to a tautology so a vacuous
/// filter never invalidates the statement.
pub(crate) fn group_condition(group: &FilterGroup, table: Option<&str>) -> Condition {
    let mut cond = match group.operator() {
        LogicalOperator::And => Condition::all(),
        LogicalOperator::Or => Condition::any(),
    };
    if group.is_empty() {
        return cond.add(Expr::val(true));
    }
    for node in group.conditions() {
        match node {
            FilterNode::Condition(c) => cond = cond.add(condition_expr(c, table)),
            FilterNode::Group(g) => cond = cond.add(group_condition(g, table)),
        }
    }
    cond
}

impl<E: Entity> QueryBuilder<E> {
    /// Fold all predicate state into a single WHERE condition
    pub(crate) fn where_condition(&self) -> Condition {
        let entity = E::default();
        let mut cond = Condition::all();

        match &self.scope_exclusion {
            ScopeExclusion::All => {}
            exclusion => {
                for scope in entity.global_scopes() {
                    if let ScopeExclusion::Named(names) = exclusion {
                        if names.iter().any(|n| n == scope.name()) {
                            continue;
                        }
                    }
                    cond = cond.add(group_condition(scope.filter(), None));
                }
            }
        }

        if let Some(column) = entity.soft_delete_column() {
            match self.trashed {
                TrashedMode::Exclude => {
                    cond = cond.add(Expr::col(Ident::new(column)).is_null());
                }
                TrashedMode::Only => {
                    cond = cond.add(Expr::col(Ident::new(column)).is_not_null());
                }
                TrashedMode::With => {}
            }
        }

        for filter in &self.filters {
            cond = cond.add(condition_expr(filter, None));
        }

        for relation_filter in &self.relation_filters {
            cond = cond.add(relation_filter.clone());
        }

        if !self.or_filters.is_empty() {
            let mut any = Condition::any();
            for group in &self.or_filters {
                any = any.add(group_condition(group, None));
            }
            cond = cond.add(any);
        }

        cond
    }

    /// Apply order, group-by, limit, and offset to a statement
    ///
    /// Orders apply in declaration order: the first `order_by` is the
    /// primary sort key, later calls add secondary keys, never overwrite.
    pub(crate) fn apply_shape(&self, stmt: &mut SelectStatement) {
        for order in &self.orders {
            stmt.order_by(Ident::new(&order.column), order.direction.to_order());
        }
        for column in &self.groups {
            stmt.group_by_col(Ident::new(column));
        }
        if let Some(limit) = self.limit {
            stmt.limit(limit);
        }
        if let Some(offset) = self.offset {
            stmt.offset(offset);
        }
    }

    /// Compile the accumulated state into a select statement
    pub fn build_select(&self) -> SelectStatement {
        let entity = E::default();
        let mut stmt = Query::select();
        stmt.column(sea_query::Asterisk)
            .from(Ident::new(entity.table_name()));
        stmt.cond_where(self.where_condition());
        self.apply_shape(&mut stmt);
        stmt
    }

    /// Compile a counting statement over the current filters
    ///
    /// Order, limit, and offset are ignored; the filtered (and grouped)
    /// query is wrapped in a subquery so `COUNT(*)` sees all matching rows.
    pub fn build_count(&self) -> SelectStatement {
        let entity = E::default();
        let mut inner = Query::select();
        inner
            .column(sea_query::Asterisk)
            .from(Ident::new(entity.table_name()));
        inner.cond_where(self.where_condition());
        for column in &self.groups {
            inner.group_by_col(Ident::new(column));
        }

        let mut outer = Query::select();
        outer.expr_as(Expr::cust("COUNT(*)"), Ident::new("count"));
        outer.from_subquery(inner, Ident::new("count_subquery"));
        outer
    }

    /// Compile an update statement carrying the current predicate set
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` when `values` is empty.
    pub fn build_update(
        &self,
        values: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<UpdateStatement, RiptideError> {
        if values.is_empty() {
            return Err(RiptideError::InvalidQuery(
                "update requires at least one column".to_string(),
            ));
        }
        let entity = E::default();
        let mut stmt = Query::update();
        stmt.table(Ident::new(entity.table_name()));
        for (column, value) in values {
            stmt.value(Ident::new(column), Expr::val(json_to_value(value)));
        }
        stmt.cond_where(self.where_condition());
        Ok(stmt)
    }

    /// Compile a hard-delete statement carrying the current predicate set
    pub fn build_delete(&self) -> DeleteStatement {
        let entity = E::default();
        let mut stmt = Query::delete();
        stmt.from_table(Ident::new(entity.table_name()));
        stmt.cond_where(self.where_condition());
        stmt
    }
}
