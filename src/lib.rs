//! # Riptide
//!
//! Active-Record style query composition engine built on `sea_query`.
//!
//! Entities declare table metadata, relations, and global scopes; a fluent
//! [`QueryBuilder`] accumulates typed predicates, eager-load requests, and
//! ordering/pagination state; terminal operations compile that state into
//! one statement and hand it to an [`Executor`]. Execution, row mapping,
//! and connection management stay behind traits — the engine owns query
//! composition, nothing else.

pub mod error;
#[doc(inline)]
pub use error::RiptideError;

pub mod executor;
#[doc(inline)]
pub use executor::{Executor, MutationStatement};

pub mod row;
#[doc(inline)]
pub use row::{FromRow, Row};

pub mod model;
#[doc(inline)]
pub use model::{Entity, LoadedRelations, ModelTrait, RelationValue};

pub mod scope;
#[doc(inline)]
pub use scope::GlobalScope;

pub mod filter;
#[doc(inline)]
pub use filter::{FilterCondition, FilterGroup, FilterNode, LogicalOperator, Operator};

pub mod query;
#[doc(inline)]
pub use query::{
    AggregateBuilder, AggregateFunc, CursorPaginator, Paginator, QueryBuilder, SortDirection,
    SortSpec, TrashedMode,
};

pub mod relation;
#[doc(inline)]
pub use relation::{RelationBuilder, RelationDef, RelationKind, SyncResult};

#[cfg(test)]
mod tests_cfg;
