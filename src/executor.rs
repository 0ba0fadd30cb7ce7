//! `Executor` trait abstracting query execution.
//!
//! The builder compiles accumulated state into `sea_query` statements; an
//! `Executor` implementation owns rendering those statements to SQL text,
//! binding values, and talking to the data source. This keeps connection,
//! session, and transaction management entirely outside the core: pooled
//! connections, transactions, and test doubles all implement the same trait
//! and interchange freely.

use sea_query::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};

use crate::error::RiptideError;
use crate::row::Row;

/// A compiled write statement handed to an [`Executor`]
#[derive(Debug, Clone)]
pub enum MutationStatement {
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

/// Trait for executing compiled queries
///
/// One terminal builder operation triggers exactly one `fetch` or `execute`
/// call, except `paginate` (a count plus a fetch) and `cursor_paginate` /
/// `chunk` (a bounded sequence of fetches). The core never caches compiled
/// statements across calls.
///
/// # Example
///
/// ```no_run
/// use riptide::{Executor, MutationStatement, RiptideError, Row};
/// use sea_query::SelectStatement;
///
/// struct PgExecutor;
///
/// impl Executor for PgExecutor {
///     fn fetch(&self, query: &SelectStatement) -> Result<Vec<Row>, RiptideError> {
///         // Render with the backend of your choice, bind values, run, and
///         // convert driver rows into `Row` maps.
///         todo!()
///     }
///
///     fn execute(&self, statement: &MutationStatement) -> Result<u64, RiptideError> {
///         todo!()
///     }
/// }
/// ```
pub trait Executor {
    /// Run a compiled select and return all rows
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::Database` for data-source failures. The core
    /// surfaces these unmodified and never retries.
    fn fetch(&self, query: &SelectStatement) -> Result<Vec<Row>, RiptideError>;

    /// Run a compiled insert/update/delete and return the affected-row count
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::Database` for data-source failures.
    fn execute(&self, statement: &MutationStatement) -> Result<u64, RiptideError>;
}
