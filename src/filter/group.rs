//! Recursive AND/OR tree of filter conditions.
//!
//! A group exclusively owns its children; there is no sharing between
//! trees, which keeps the recursive compiler free of cycles.

use serde::Serialize;

use crate::error::RiptideError;
use crate::filter::condition::FilterCondition;
use crate::filter::operator::Operator;

/// How a group's children combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// A node in a filter tree: either a leaf condition or a nested group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterNode {
    Condition(FilterCondition),
    Group(FilterGroup),
}

/// Ordered tree of conditions and sub-groups combined with AND or OR
///
/// # Example
///
/// ```
/// use riptide::{FilterGroup, LogicalOperator, Operator};
/// use serde_json::json;
///
/// let mut group = FilterGroup::new(LogicalOperator::And);
/// group.add_condition("age", Operator::GreaterThanOrEqual, json!(18)).unwrap();
///
/// let roles = group.add_group(LogicalOperator::Or);
/// roles.add_condition("role", Operator::Equal, json!("admin")).unwrap();
/// roles.add_condition("role", Operator::Equal, json!("moderator")).unwrap();
///
/// let rebuilt = FilterGroup::from_dict(&group.to_dict()).unwrap();
/// assert_eq!(rebuilt, group);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterGroup {
    operator: LogicalOperator,
    conditions: Vec<FilterNode>,
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self::new(LogicalOperator::And)
    }
}

impl FilterGroup {
    /// Create an empty group
    pub fn new(operator: LogicalOperator) -> Self {
        Self {
            operator,
            conditions: Vec::new(),
        }
    }

    /// The group's logical operator
    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    /// The group's children, in insertion order
    pub fn conditions(&self) -> &[FilterNode] {
        &self.conditions
    }

    /// True when the group carries no children (compiles to a tautology)
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append a condition or sub-group, preserving order
    pub fn add(&mut self, node: impl Into<FilterNode>) -> &mut Self {
        self.conditions.push(node.into());
        self
    }

    /// Build and append a condition
    ///
    /// # Errors
    ///
    /// Propagates [`FilterCondition::new`] validation failures; the group
    /// is unchanged on error.
    pub fn add_condition(
        &mut self,
        field: impl Into<String>,
        operator: Operator,
        value: serde_json::Value,
    ) -> Result<&mut Self, RiptideError> {
        let condition = FilterCondition::new(field, operator, value)?;
        self.conditions.push(FilterNode::Condition(condition));
        Ok(self)
    }

    /// Create, attach, and return a new child group for continued building
    ///
    /// Supports arbitrary nesting depth:
    ///
    /// ```
    /// use riptide::{FilterGroup, LogicalOperator, Operator};
    /// use serde_json::json;
    ///
    /// let mut root = FilterGroup::default();
    /// let inner = root.add_group(LogicalOperator::Or);
    /// let deepest = inner.add_group(LogicalOperator::And);
    /// deepest.add_condition("views", Operator::GreaterThan, json!(1000)).unwrap();
    /// ```
    pub fn add_group(&mut self, operator: LogicalOperator) -> &mut FilterGroup {
        self.conditions.push(FilterNode::Group(FilterGroup::new(operator)));
        match self.conditions.last_mut() {
            Some(FilterNode::Group(group)) => group,
            _ => unreachable!("group was just pushed"),
        }
    }

    /// Serialize as an `{operator, conditions}` dictionary
    pub fn to_dict(&self) -> serde_json::Value {
        let conditions: Vec<serde_json::Value> = self
            .conditions
            .iter()
            .map(|node| match node {
                FilterNode::Condition(c) => c.to_dict(),
                FilterNode::Group(g) => g.to_dict(),
            })
            .collect();
        serde_json::json!({
            "operator": self.operator.as_str(),
            "conditions": conditions,
        })
    }

    /// Rebuild a group tree from its dictionary form
    ///
    /// Dispatch is by shape: a node with a `field` key is a leaf condition,
    /// a node with `operator` + `conditions` keys is a nested group.
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` on unknown logical operators,
    /// malformed nodes, or condition validation failures.
    pub fn from_dict(data: &serde_json::Value) -> Result<Self, RiptideError> {
        let obj = data.as_object().ok_or_else(|| {
            RiptideError::InvalidQuery("filter group must be an object".to_string())
        })?;
        let operator = match obj.get("operator").and_then(|o| o.as_str()) {
            Some("AND") => LogicalOperator::And,
            Some("OR") => LogicalOperator::Or,
            Some(other) => {
                return Err(RiptideError::InvalidQuery(format!(
                    "unknown logical operator: {other}"
                )))
            }
            None => {
                return Err(RiptideError::InvalidQuery(
                    "filter group requires an 'operator' key".to_string(),
                ))
            }
        };
        let children = obj
            .get("conditions")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                RiptideError::InvalidQuery(
                    "filter group requires a 'conditions' array".to_string(),
                )
            })?;

        let mut group = FilterGroup::new(operator);
        for child in children {
            if child.get("field").is_some() {
                group.add(FilterCondition::from_dict(child)?);
            } else {
                group.add(FilterGroup::from_dict(child)?);
            }
        }
        Ok(group)
    }
}

impl From<FilterCondition> for FilterNode {
    fn from(condition: FilterCondition) -> Self {
        FilterNode::Condition(condition)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        FilterNode::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> FilterGroup {
        let mut root = FilterGroup::new(LogicalOperator::And);
        root.add_condition("age", Operator::GreaterThanOrEqual, json!(18))
            .unwrap();
        root.add_condition("status", Operator::Equal, json!("active"))
            .unwrap();
        let sub = root.add_group(LogicalOperator::Or);
        sub.add_condition("role", Operator::Equal, json!("admin"))
            .unwrap();
        sub.add_condition("role", Operator::Equal, json!("moderator"))
            .unwrap();
        root
    }

    #[test]
    fn test_add_preserves_order() {
        let group = sample_tree();
        assert_eq!(group.conditions().len(), 3);
        assert!(matches!(group.conditions()[0], FilterNode::Condition(_)));
        assert!(matches!(group.conditions()[2], FilterNode::Group(_)));
    }

    #[test]
    fn test_dict_round_trip() {
        let group = sample_tree();
        let rebuilt = FilterGroup::from_dict(&group.to_dict()).unwrap();
        assert_eq!(rebuilt, group);
    }

    #[test]
    fn test_deeply_nested_round_trip() {
        // Build a depth-N chain with a varying shape at each level and make
        // sure deserialization reconstructs it identically.
        let mut root = FilterGroup::new(LogicalOperator::And);
        {
            let mut current = &mut root;
            for depth in 0..8 {
                let op = if depth % 2 == 0 {
                    LogicalOperator::Or
                } else {
                    LogicalOperator::And
                };
                current
                    .add_condition(format!("f{depth}"), Operator::Equal, json!(depth))
                    .unwrap();
                current = current.add_group(op);
            }
            current
                .add_condition("leaf", Operator::Null, json!(null))
                .unwrap();
        }
        let rebuilt = FilterGroup::from_dict(&root.to_dict()).unwrap();
        assert_eq!(rebuilt, root);
    }

    #[test]
    fn test_empty_group_round_trip() {
        let group = FilterGroup::new(LogicalOperator::Or);
        let rebuilt = FilterGroup::from_dict(&group.to_dict()).unwrap();
        assert_eq!(rebuilt, group);
        assert!(rebuilt.is_empty());
    }

    #[test]
    fn test_from_dict_dispatches_on_shape() {
        // A leaf has `field`; a group has `operator` + `conditions`. A leaf
        // whose dict also carries `operator` (they all do) must still be
        // parsed as a leaf.
        let data = json!({
            "operator": "AND",
            "conditions": [
                {"field": "a", "operator": "=", "value": 1},
                {"operator": "OR", "conditions": []},
            ],
        });
        let group = FilterGroup::from_dict(&data).unwrap();
        assert!(matches!(group.conditions()[0], FilterNode::Condition(_)));
        assert!(matches!(group.conditions()[1], FilterNode::Group(_)));
    }

    #[test]
    fn test_from_dict_rejects_unknown_logical_operator() {
        let data = json!({"operator": "XOR", "conditions": []});
        assert!(FilterGroup::from_dict(&data).is_err());
    }

    #[test]
    fn test_failed_add_condition_leaves_group_unchanged() {
        let mut group = FilterGroup::default();
        assert!(group
            .add_condition("id", Operator::Between, json!([1]))
            .is_err());
        assert!(group.is_empty());
    }
}
