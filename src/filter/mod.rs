//! Filter model: operator catalog, single predicates, and recursive
//! condition trees.
//!
//! These types are pure data. Compilation into `sea_query` conditions is
//! the query module's job, which keeps (de)serialized filter trees usable
//! on their own — e.g. for accepting filter payloads over an API boundary.

pub mod operator;
#[doc(inline)]
pub use operator::Operator;

pub mod condition;
#[doc(inline)]
pub use condition::FilterCondition;

pub mod group;
#[doc(inline)]
pub use group::{FilterGroup, FilterNode, LogicalOperator};
