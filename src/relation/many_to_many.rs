//! Pivot-row mutations for many-to-many relations.
//!
//! `attach`/`detach`/`sync` operate on the pivot table of a
//! [`RelationBuilder`] whose relation is many-to-many; calling them on any
//! other relation kind fails with `InvalidQuery`.

use sea_query::{Condition, Expr, ExprTrait, Query};

use crate::error::RiptideError;
use crate::executor::{Executor, MutationStatement};
use crate::model::Entity;
use crate::query::builder::pivot_keys;
use crate::query::compile::Ident;
use crate::query::value_conversion::json_to_value;
use crate::relation::builder::RelationBuilder;

/// Outcome of a [`sync`](RelationBuilder::sync): the minimal change set
/// that was applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncResult {
    /// Ids newly attached
    pub attached: Vec<serde_json::Value>,
    /// Ids detached because they were no longer desired
    pub detached: Vec<serde_json::Value>,
}

impl<E: Entity> RelationBuilder<E> {
    /// Attach related ids to the parent through the pivot table
    ///
    /// `attributes` are extra pivot columns written on every inserted row.
    /// Attaching an empty id list is a no-op.
    ///
    /// # Errors
    ///
    /// `RiptideError::InvalidQuery` for non-pivot relations; executor
    /// failures pass through.
    pub fn attach(
        &self,
        executor: &dyn Executor,
        ids: &[serde_json::Value],
        attributes: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<u64, RiptideError> {
        let (pivot, related_pivot_key) = pivot_keys(self.def())?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut stmt = Query::insert();
        stmt.into_table(Ident::new(pivot));

        let mut columns = vec![
            Ident::new(self.def.foreign_key),
            Ident::new(related_pivot_key),
        ];
        if let Some(attributes) = attributes {
            for column in attributes.keys() {
                columns.push(Ident::new(column));
            }
        }
        stmt.columns(columns);

        for id in ids {
            let mut row: Vec<Expr> = vec![
                Expr::val(json_to_value(&self.parent_key)),
                Expr::val(json_to_value(id)),
            ];
            if let Some(attributes) = attributes {
                for value in attributes.values() {
                    row.push(Expr::val(json_to_value(value)));
                }
            }
            stmt.values(row)
                .map_err(|e| RiptideError::InvalidQuery(e.to_string()))?;
        }

        executor.execute(&MutationStatement::Insert(stmt))
    }

    /// Detach related ids from the parent; detaches all when `ids` is
    /// `None`
    ///
    /// # Errors
    ///
    /// `RiptideError::InvalidQuery` for non-pivot relations.
    pub fn detach(
        &self,
        executor: &dyn Executor,
        ids: Option<&[serde_json::Value]>,
    ) -> Result<u64, RiptideError> {
        let (pivot, related_pivot_key) = pivot_keys(self.def())?;

        let mut stmt = Query::delete();
        stmt.from_table(Ident::new(pivot));
        let mut cond = Condition::all().add(
            Expr::col(Ident::new(self.def.foreign_key)).eq(json_to_value(&self.parent_key)),
        );
        if let Some(ids) = ids {
            cond = cond.add(
                Expr::col(Ident::new(related_pivot_key)).is_in(ids.iter().map(json_to_value)),
            );
        }
        stmt.cond_where(cond);

        executor.execute(&MutationStatement::Delete(stmt))
    }

    /// Converge the pivot rows to exactly the desired id set
    ///
    /// Reads the current pivot ids, diffs against `ids`, and issues the
    /// minimal detach + attach: unchanged ids are never touched, stale ids
    /// never survive. Returns the applied change set.
    ///
    /// # Errors
    ///
    /// `RiptideError::InvalidQuery` for non-pivot relations.
    pub fn sync(
        &self,
        executor: &dyn Executor,
        ids: &[serde_json::Value],
        attributes: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<SyncResult, RiptideError> {
        let (pivot, related_pivot_key) = pivot_keys(self.def())?;

        let mut current_query = Query::select();
        current_query
            .column(Ident::new(related_pivot_key))
            .from(Ident::new(pivot));
        current_query.cond_where(
            Expr::col(Ident::new(self.def.foreign_key)).eq(json_to_value(&self.parent_key)),
        );
        let rows = executor.fetch(&current_query)?;
        let current: Vec<serde_json::Value> = rows
            .iter()
            .filter_map(|row| row.get(related_pivot_key).cloned())
            .collect();

        let mut detached: Vec<serde_json::Value> = Vec::new();
        for id in &current {
            if !ids.contains(id) && !detached.contains(id) {
                detached.push(id.clone());
            }
        }
        let mut attached: Vec<serde_json::Value> = Vec::new();
        for id in ids {
            if !current.contains(id) && !attached.contains(id) {
                attached.push(id.clone());
            }
        }

        log::debug!(
            "sync '{}': {} current, {} to attach, {} to detach",
            self.def.name,
            current.len(),
            attached.len(),
            detached.len()
        );

        if !detached.is_empty() {
            self.detach(executor, Some(&detached))?;
        }
        if !attached.is_empty() {
            self.attach(executor, &attached, attributes)?;
        }

        Ok(SyncResult { attached, detached })
    }
}
