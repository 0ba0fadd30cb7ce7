//! Query building and execution.
//!
//! The builder accumulates typed predicates, eager-load requests, and
//! shape state, then compiles deterministically into `sea_query`
//! statements handed to an [`Executor`](crate::Executor):
//!
//! - **Builder**: fluent mutators over accumulated state (`builder`)
//! - **Compile**: state-to-statement translation (`compile`)
//! - **Execution**: terminal operations — get/first/find/count/exists,
//!   writes, and batched traversal (`execution`)
//! - **Pagination**: offset and cursor strategies (`pagination`)
//! - **Aggregate**: aggregate-only builder variant (`aggregate`)
//! - **Value conversion**: JSON to SeaQuery value mapping
//!   (`value_conversion`)

pub mod builder;
#[doc(inline)]
pub use builder::{ConstraintFn, QueryBuilder, SortDirection, SortSpec, TrashedMode};

pub mod compile;

pub mod execution;

pub mod pagination;
#[doc(inline)]
pub use pagination::{CursorPaginator, Paginator};

pub mod aggregate;
#[doc(inline)]
pub use aggregate::{AggregateBuilder, AggregateFunc};

pub(crate) mod value_conversion;
