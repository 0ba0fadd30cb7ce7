//! Aggregate query builder.
//!
//! Accumulates aggregate expressions (count/sum/avg/min/max), passthrough
//! columns, filters, groupings, and HAVING conditions, then compiles one
//! select whose result rows are keyed by aggregate alias. Compiling with
//! zero accumulated expressions is an error — an aggregate query with
//! nothing to select is always a caller bug.

use std::marker::PhantomData;

use sea_query::{Condition, Expr, Query, SelectStatement};

use crate::error::RiptideError;
use crate::executor::Executor;
use crate::filter::{FilterCondition, Operator};
use crate::model::Entity;
use crate::query::builder::{SortDirection, SortSpec};
use crate::query::compile::{condition_expr, Ident};
use crate::row::Row;

/// Aggregate function selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    fn as_str(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }

    fn default_alias(&self, column: &str) -> String {
        format!("{}_{column}", self.as_str().to_ascii_lowercase())
    }
}

#[derive(Debug, Clone)]
struct AggregateSpec {
    func: Option<AggregateFunc>,
    column: String,
    alias: String,
}

/// Builder for aggregation queries over entity `E`
///
/// # Example
///
/// ```no_run
/// use riptide::{AggregateFunc, Entity, Executor, Operator, RiptideError};
/// use serde_json::json;
///
/// # #[derive(Default)]
/// # struct Order;
/// # impl Entity for Order {
/// #     type Model = OrderModel;
/// #     fn table_name(&self) -> &'static str { "orders" }
/// # }
/// # #[derive(Debug, Clone)]
/// # struct OrderModel;
/// # impl riptide::FromRow for OrderModel {
/// #     fn from_row(_row: &riptide::Row) -> Result<Self, RiptideError> { todo!() }
/// # }
/// # impl riptide::ModelTrait for OrderModel {
/// #     fn field(&self, _name: &str) -> Option<serde_json::Value> { None }
/// #     fn primary_key_value(&self) -> serde_json::Value { serde_json::Value::Null }
/// #     fn relations(&self) -> &riptide::LoadedRelations { todo!() }
/// #     fn relations_mut(&mut self) -> &mut riptide::LoadedRelations { todo!() }
/// # }
/// # fn run(executor: &dyn Executor) -> Result<(), RiptideError> {
/// let mut stats = Order::aggregate();
/// stats
///     .count("id")
///     .sum("amount")
///     .group_by(["status"])
///     .having("count_id", Operator::GreaterThan, json!(10))?;
/// let rows = stats.get(executor)?;
/// for row in rows {
///     println!("{:?} orders: {:?}", row.get("status"), row.get("count_id"));
/// }
/// # Ok(())
/// # }
/// ```
pub struct AggregateBuilder<E: Entity> {
    aggregates: Vec<AggregateSpec>,
    filters: Vec<FilterCondition>,
    groups: Vec<String>,
    havings: Vec<FilterCondition>,
    orders: Vec<SortSpec>,
    limit: Option<u64>,
    offset: Option<u64>,
    _entity: PhantomData<E>,
}

impl<E: Entity> Default for AggregateBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> AggregateBuilder<E> {
    /// Create an empty aggregate builder; prefer [`Entity::aggregate`]
    pub fn new() -> Self {
        Self {
            aggregates: Vec::new(),
            filters: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// Select passthrough columns alongside the aggregates
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            self.aggregates.push(AggregateSpec {
                func: None,
                alias: column.clone(),
                column,
            });
        }
        self
    }

    /// COUNT(`column`) aliased `count_<column>`
    pub fn count(&mut self, column: impl Into<String>) -> &mut Self {
        self.aggregate_as(AggregateFunc::Count, column, None)
    }

    /// SUM(`column`) aliased `sum_<column>`
    pub fn sum(&mut self, column: impl Into<String>) -> &mut Self {
        self.aggregate_as(AggregateFunc::Sum, column, None)
    }

    /// AVG(`column`) aliased `avg_<column>`
    pub fn avg(&mut self, column: impl Into<String>) -> &mut Self {
        self.aggregate_as(AggregateFunc::Avg, column, None)
    }

    /// MIN(`column`) aliased `min_<column>`
    pub fn min(&mut self, column: impl Into<String>) -> &mut Self {
        self.aggregate_as(AggregateFunc::Min, column, None)
    }

    /// MAX(`column`) aliased `max_<column>`
    pub fn max(&mut self, column: impl Into<String>) -> &mut Self {
        self.aggregate_as(AggregateFunc::Max, column, None)
    }

    /// Add an aggregate with an explicit alias
    pub fn aggregate_as(
        &mut self,
        func: AggregateFunc,
        column: impl Into<String>,
        alias: Option<&str>,
    ) -> &mut Self {
        let column = column.into();
        let alias = alias
            .map(str::to_string)
            .unwrap_or_else(|| func.default_alias(&column));
        self.aggregates.push(AggregateSpec {
            func: Some(func),
            column,
            alias,
        });
        self
    }

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
        self.filters.push(FilterCondition::new(field, operator, value)?);
        Ok(self)
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

    /// Add a HAVING condition on an aggregate alias
    ///
    /// # Errors
    ///
    /// Propagates [`FilterCondition::new`] validation failures.
    pub fn having(
        &mut self,
        alias: impl Into<String>,
        operator: Operator,
        value: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        self.havings.push(FilterCondition::new(alias, operator, value)?);
        Ok(self)
    }

    /// Add a sort key (usually on an aggregate alias)
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for bad directions.
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

    /// Limit the number of result rows
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for negative limits.
    pub fn take(&mut self, limit: i64) -> Result<&mut Self, RiptideError> {
        if limit < 0 {
            return Err(RiptideError::InvalidQuery(format!(
                "limit must be positive, got {limit}"
            )));
        }
        self.limit = Some(limit as u64);
        Ok(self)
    }

    /// Skip a number of result rows
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for negative offsets.
    pub fn skip(&mut self, offset: i64) -> Result<&mut Self, RiptideError> {
        if offset < 0 {
            return Err(RiptideError::InvalidQuery(format!(
                "offset must be positive, got {offset}"
            )));
        }
        self.offset = Some(offset as u64);
        Ok(self)
    }

    /// Compile the accumulated state into a select statement
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` when no aggregates or columns
    /// were accumulated.
    pub fn build(&self) -> Result<SelectStatement, RiptideError> {
        if self.aggregates.is_empty() {
            return Err(RiptideError::InvalidQuery(
                "no aggregates defined".to_string(),
            ));
        }

        let entity = E::default();
        let mut stmt = Query::select();
        for spec in &self.aggregates {
            match spec.func {
                Some(func) => {
                    stmt.expr_as(
                        Expr::cust(format!("{}({})", func.as_str(), spec.column)),
                        Ident::new(&spec.alias),
                    );
                }
                None => {
                    stmt.column(Ident::new(&spec.column));
                }
            }
        }
        stmt.from(Ident::new(entity.table_name()));

        if !self.filters.is_empty() {
            let mut cond = Condition::all();
            for filter in &self.filters {
                cond = cond.add(condition_expr(filter, None));
            }
            stmt.cond_where(cond);
        }

        for column in &self.groups {
            stmt.group_by_col(Ident::new(column));
        }
        for having in &self.havings {
            stmt.and_having(condition_expr(having, None));
        }
        for order in &self.orders {
            stmt.order_by(Ident::new(&order.column), order.direction.to_order());
        }
        if let Some(limit) = self.limit {
            stmt.limit(limit);
        }
        if let Some(offset) = self.offset {
            stmt.offset(offset);
        }
        Ok(stmt)
    }

    /// Execute and return all result rows, keyed by aggregate alias
    pub fn get(&self, executor: &dyn Executor) -> Result<Vec<Row>, RiptideError> {
        let stmt = self.build()?;
        executor.fetch(&stmt)
    }

    /// Execute and return the first result row, if any
    pub fn one(&self, executor: &dyn Executor) -> Result<Option<Row>, RiptideError> {
        Ok(self.get(executor)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entity;
    use crate::tests_cfg::{MockExecutor, Post};
    use sea_query::PostgresQueryBuilder;
    use serde_json::json;

    #[test]
    fn test_zero_aggregates_fails_at_compile() {
        let stats = Post::aggregate();
        let err = stats.build().unwrap_err();
        assert!(matches!(err, RiptideError::InvalidQuery(_)));
    }

    #[test]
    fn test_aggregates_with_aliases() {
        let mut stats = Post::aggregate();
        stats
            .count("id")
            .max("views")
            .aggregate_as(AggregateFunc::Sum, "views", Some("total_views"));
        let sql = stats.build().unwrap().to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"COUNT(id) AS "count_id""#), "{sql}");
        assert!(sql.contains(r#"MAX(views) AS "max_views""#), "{sql}");
        assert!(sql.contains(r#"SUM(views) AS "total_views""#), "{sql}");
    }

    #[test]
    fn test_group_by_having_order() {
        let mut stats = Post::aggregate();
        stats
            .select(["status"])
            .count("id")
            .group_by(["status"])
            .having("count_id", Operator::GreaterThan, json!(5))
            .unwrap()
            .order_by("count_id", "desc")
            .unwrap();
        let sql = stats.build().unwrap().to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#"GROUP BY "status""#), "{sql}");
        assert!(sql.contains(r#"HAVING "count_id" > 5"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "count_id" DESC"#), "{sql}");
    }

    #[test]
    fn test_filters_compile_into_where() {
        let mut stats = Post::aggregate();
        stats
            .count("id")
            .where_("published", Operator::Equal, json!(true))
            .unwrap();
        let sql = stats.build().unwrap().to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""published" = TRUE"#), "{sql}");
    }

    #[test]
    fn test_get_returns_alias_keyed_rows() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![crate::Row::from_pairs([
            ("count_id", json!(12)),
            ("max_views", json!(500)),
        ])]);
        let mut stats = Post::aggregate();
        stats.count("id").max("views");
        let row = stats.one(&executor).unwrap().unwrap();
        assert_eq!(row.get_i64("count_id"), Some(12));
        assert_eq!(row.get_i64("max_views"), Some(500));
    }
}
