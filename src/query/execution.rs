//! Terminal operations for `QueryBuilder`.
//!
//! Query building methods live in the builder module; everything that
//! actually talks to an [`Executor`] is here. Each terminal operation
//! compiles the accumulated state exactly once and never caches the
//! compiled statement.

use sea_query::{Expr, Query};

use crate::error::RiptideError;
use crate::executor::{Executor, MutationStatement};
use crate::model::Entity;
use crate::query::builder::{QueryBuilder, TrashedMode};
use crate::query::compile::Ident;
use crate::relation::eager::load_related;
use crate::row::{FromRow, Row};

impl<E: Entity> QueryBuilder<E> {
    /// Execute the query and return all results
    ///
    /// Rows are mapped through [`FromRow`], requested relations are eagerly
    /// loaded (one batched query per relation, in declaration order), and
    /// after-load callbacks run on each model.
    pub fn get(&self, executor: &dyn Executor) -> Result<Vec<E::Model>, RiptideError> {
        let stmt = self.build_select();
        log::debug!("executing select on {}", E::default().table_name());
        let rows = executor.fetch(&stmt)?;
        self.finish_rows(rows, executor)
    }

    /// Map fetched rows into models, run eager loads and callbacks
    pub(crate) fn finish_rows(
        &self,
        rows: Vec<Row>,
        executor: &dyn Executor,
    ) -> Result<Vec<E::Model>, RiptideError> {
        let mut models = rows
            .iter()
            .map(E::Model::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let entity = E::default();
        for (name, constraint) in &self.eager_loads {
            // Relation names were validated when `with_` recorded them
            let def = entity
                .relation(name)
                .ok_or_else(|| RiptideError::RelationNotFound {
                    model: entity.table_name(),
                    relation: name.clone(),
                })?;
            load_related(&def, constraint.as_ref(), &mut models, executor)?;
        }

        for model in &mut models {
            for callback in &self.after_load {
                callback(model);
            }
        }
        Ok(models)
    }

    /// Execute the query and return the first result, or `None`
    pub fn first(&self, executor: &dyn Executor) -> Result<Option<E::Model>, RiptideError> {
        let mut query = self.clone();
        query.limit = Some(1);
        Ok(query.get(executor)?.into_iter().next())
    }

    /// Find a model by primary key
    pub fn find(
        &self,
        executor: &dyn Executor,
        id: impl Into<serde_json::Value>,
    ) -> Result<Option<E::Model>, RiptideError> {
        let entity = E::default();
        let mut query = self.clone();
        query.where_eq(entity.primary_key(), id.into())?;
        query.first(executor)
    }

    /// Find a model by primary key, failing when no row matches
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::ModelNotFound` carrying the entity name and
    /// the id that missed.
    pub fn find_or_fail(
        &self,
        executor: &dyn Executor,
        id: impl Into<serde_json::Value>,
    ) -> Result<E::Model, RiptideError> {
        let id = id.into();
        self.find(executor, id.clone())?
            .ok_or(RiptideError::ModelNotFound {
                model: E::default().table_name(),
                id,
            })
    }

    /// Count rows matching the current filters
    ///
    /// Limit, offset, and ordering are ignored; filters, scopes, and the
    /// soft-delete mode all apply.
    pub fn count(&self, executor: &dyn Executor) -> Result<u64, RiptideError> {
        let rows = executor.fetch(&self.build_count())?;
        Ok(rows
            .first()
            .and_then(|row| row.get_u64("count"))
            .unwrap_or(0))
    }

    /// True when at least one row matches
    ///
    /// Fetches at most one raw row; related data is never loaded.
    pub fn exists(&self, executor: &dyn Executor) -> Result<bool, RiptideError> {
        let mut query = self.clone();
        query.limit = Some(1);
        let rows = executor.fetch(&query.build_select())?;
        Ok(!rows.is_empty())
    }

    /// Update matching rows, returning the affected-row count
    ///
    /// The update carries the same predicate set as reads: filters, global
    /// scopes, and the soft-delete mode.
    pub fn update(
        &self,
        executor: &dyn Executor,
        values: serde_json::Map<String, serde_json::Value>,
    ) -> Result<u64, RiptideError> {
        let stmt = self.build_update(&values)?;
        executor.execute(&MutationStatement::Update(stmt))
    }

    /// Delete matching rows, returning the affected-row count
    ///
    /// Soft-delete aware: when the entity declares a soft-delete column the
    /// rows are stamped with the current time instead of being removed.
    /// Use [`force_delete`](Self::force_delete) to bypass that entirely.
    pub fn delete(&self, executor: &dyn Executor) -> Result<u64, RiptideError> {
        if let Some(column) = E::default().soft_delete_column() {
            let mut values = serde_json::Map::new();
            values.insert(
                column.to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
            return self.update(executor, values);
        }
        executor.execute(&MutationStatement::Delete(self.build_delete()))
    }

    /// Physically delete matching rows, ignoring soft-delete semantics
    pub fn force_delete(&self, executor: &dyn Executor) -> Result<u64, RiptideError> {
        executor.execute(&MutationStatement::Delete(self.build_delete()))
    }

    /// Restore soft-deleted rows by clearing the soft-delete column
    ///
    /// Trashed rows are included in the predicate regardless of the current
    /// mode, so `only_trashed().restore()` and a bare `restore()` converge.
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` when the entity does not
    /// soft-delete.
    pub fn restore(&self, executor: &dyn Executor) -> Result<u64, RiptideError> {
        let entity = E::default();
        let Some(column) = entity.soft_delete_column() else {
            return Err(RiptideError::InvalidQuery(format!(
                "{} does not soft-delete",
                entity.table_name()
            )));
        };
        let mut query = self.clone();
        if query.trashed == TrashedMode::Exclude {
            query.trashed = TrashedMode::With;
        }
        let mut values = serde_json::Map::new();
        values.insert(column.to_string(), serde_json::Value::Null);
        query.update(executor, values)
    }

    /// Process results in pages of `size`, bounding peak memory
    ///
    /// Pages are fetched with skip/take until a short page is returned.
    /// The callback may return `Ok(false)` to stop after the current page —
    /// the page-boundary cancellation point. Returns `Ok(true)` when the
    /// traversal ran to completion, `Ok(false)` when the callback stopped
    /// it. Zero matching rows means zero callback invocations.
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` for a zero chunk size;
    /// propagates callback and executor errors.
    pub fn chunk(
        &self,
        executor: &dyn Executor,
        size: u64,
        mut callback: impl FnMut(&[E::Model]) -> Result<bool, RiptideError>,
    ) -> Result<bool, RiptideError> {
        if size == 0 {
            return Err(RiptideError::InvalidQuery(
                "chunk size must be positive".to_string(),
            ));
        }
        let mut page: u64 = 1;
        loop {
            let mut query = self.clone();
            query.offset = Some((page - 1) * size);
            query.limit = Some(size);
            let results = query.get(executor)?;
            if results.is_empty() {
                break;
            }
            if !callback(&results)? {
                return Ok(false);
            }
            if (results.len() as u64) < size {
                break;
            }
            page += 1;
        }
        Ok(true)
    }

    /// `chunk` unrolled to one callback invocation per model
    pub fn each(
        &self,
        executor: &dyn Executor,
        size: u64,
        mut callback: impl FnMut(&E::Model) -> Result<bool, RiptideError>,
    ) -> Result<bool, RiptideError> {
        self.chunk(executor, size, |models| {
            for model in models {
                if !callback(model)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Maximum value of `column` among matching rows
    pub fn max(
        &self,
        executor: &dyn Executor,
        column: &str,
    ) -> Result<Option<serde_json::Value>, RiptideError> {
        self.scalar_aggregate(executor, "MAX", column)
    }

    /// Minimum value of `column` among matching rows
    pub fn min(
        &self,
        executor: &dyn Executor,
        column: &str,
    ) -> Result<Option<serde_json::Value>, RiptideError> {
        self.scalar_aggregate(executor, "MIN", column)
    }

    /// Sum of `column` over matching rows
    pub fn sum(
        &self,
        executor: &dyn Executor,
        column: &str,
    ) -> Result<Option<serde_json::Value>, RiptideError> {
        self.scalar_aggregate(executor, "SUM", column)
    }

    /// Average of `column` over matching rows
    pub fn avg(
        &self,
        executor: &dyn Executor,
        column: &str,
    ) -> Result<Option<serde_json::Value>, RiptideError> {
        self.scalar_aggregate(executor, "AVG", column)
    }

    fn scalar_aggregate(
        &self,
        executor: &dyn Executor,
        function: &str,
        column: &str,
    ) -> Result<Option<serde_json::Value>, RiptideError> {
        let entity = E::default();
        let mut stmt = Query::select();
        stmt.expr_as(
            Expr::cust(format!("{function}({column})")),
            Ident::new("aggregate"),
        )
        .from(Ident::new(entity.table_name()));
        stmt.cond_where(self.where_condition());
        let rows = executor.fetch(&stmt)?;
        Ok(rows
            .first()
            .and_then(|row| row.get("aggregate"))
            .filter(|value| !value.is_null())
            .cloned())
    }
}
