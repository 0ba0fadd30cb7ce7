//! Relation definitions and relation-aware query augmentation.
//!
//! - **Definitions**: `RelationDef`/`RelationKind` metadata consumed by
//!   join injection and `where_has` subqueries (`def`)
//! - **Builder**: relation-scoped queries for a concrete parent row,
//!   including pivot projection and pivot-scoped predicates (`builder`)
//! - **Many-to-many**: idempotent pivot mutations — attach, detach, and
//!   diff-and-converge sync (`many_to_many`)
//! - **Eager**: batched loading of related rows for `with_` requests
//!   (`eager`)

pub mod def;
#[doc(inline)]
pub use def::{RelationDef, RelationKind};

pub mod builder;
#[doc(inline)]
pub use builder::RelationBuilder;

pub mod many_to_many;
#[doc(inline)]
pub use many_to_many::SyncResult;

pub(crate) mod eager;
