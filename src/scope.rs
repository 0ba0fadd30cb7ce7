//! Named global scopes.
//!
//! A global scope is a predicate applied to every compiled query for an
//! entity unless the chain opts out via
//! [`without_global_scope`](crate::QueryBuilder::without_global_scope).
//! Scopes are declared on the entity itself
//! ([`Entity::global_scopes`](crate::Entity::global_scopes)) — an explicit
//! per-entity registry, not a process-wide mutable one.

use crate::filter::FilterGroup;

/// A named, automatically-applied filter group
///
/// # Example
///
/// ```
/// use riptide::{FilterGroup, GlobalScope, LogicalOperator, Operator};
/// use serde_json::json;
///
/// let mut filter = FilterGroup::new(LogicalOperator::And);
/// filter.add_condition("published", Operator::Equal, json!(true)).unwrap();
/// let scope = GlobalScope::new("published", filter);
/// assert_eq!(scope.name(), "published");
/// ```
#[derive(Debug, Clone)]
pub struct GlobalScope {
    name: &'static str,
    filter: FilterGroup,
}

impl GlobalScope {
    pub fn new(name: &'static str, filter: FilterGroup) -> Self {
        Self { name, filter }
    }

    /// The name used by `without_global_scope` to suppress this scope
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The predicate applied to every compiled query
    pub fn filter(&self) -> &FilterGroup {
        &self.filter
    }
}
