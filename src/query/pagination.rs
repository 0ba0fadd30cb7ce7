//! Pagination strategies layered on builder compilation.
//!
//! Two strategies with an explicit trade-off:
//!
//! - [`Paginator`] (offset-based, total-count-aware): answers "how many
//!   pages" in O(1) and supports arbitrary page jumps, at the cost of a
//!   count query up front — two round-trips per page.
//! - [`CursorPaginator`]: no count query and O(limit) work regardless of
//!   depth, but only forward/backward sequential traversal.
//!
//! Both produce stable output for unchanged underlying data: re-running the
//! same page or cursor window yields the same items.

use serde::Serialize;

use crate::error::RiptideError;
use crate::executor::Executor;
use crate::filter::{FilterCondition, Operator};
use crate::model::{Entity, ModelTrait};
use crate::query::builder::{CursorSpec, QueryBuilder, SortDirection, SortSpec};

/// Offset-based paginator with total-count awareness
///
/// # Example
///
/// ```
/// use riptide::Paginator;
///
/// let page = Paginator::new(vec!["a", "b", "c"], 45, 2, 15);
/// assert_eq!(page.last_page(), 3);
/// assert!(page.has_more_pages());
/// assert_eq!(page.previous_page(), Some(1));
/// assert_eq!(page.next_page(), Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct Paginator<M> {
    items: Vec<M>,
    total: u64,
    current_page: u64,
    per_page: u64,
}

impl<M> Paginator<M> {
    pub fn new(items: Vec<M>, total: u64, current_page: u64, per_page: u64) -> Self {
        Self {
            items,
            total,
            current_page,
            per_page,
        }
    }

    /// Items of the current page
    pub fn items(&self) -> &[M] {
        &self.items
    }

    /// Consume the paginator, returning the items
    pub fn into_items(self) -> Vec<M> {
        self.items
    }

    /// Total number of matching items across all pages
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of items in the current page
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Last page number; 0 when there are no items
    pub fn last_page(&self) -> u64 {
        if self.total == 0 || self.per_page == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    /// True when the result spans more than one page
    pub fn has_pages(&self) -> bool {
        self.last_page() > 1
    }

    /// True when pages exist beyond the current one
    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    pub fn previous_page(&self) -> Option<u64> {
        (self.current_page > 1).then(|| self.current_page - 1)
    }

    pub fn next_page(&self) -> Option<u64> {
        self.has_more_pages().then(|| self.current_page + 1)
    }

    /// 1-based index of the first item of the page; 0 when empty
    pub fn from_item(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            (self.current_page - 1) * self.per_page + 1
        }
    }

    /// 1-based index of the last item of the page; 0 when empty
    pub fn to_item(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            (self.from_item() + self.items.len() as u64 - 1).min(self.total)
        }
    }
}

impl<M: Serialize> Paginator<M> {
    /// Serialize as a `{data, meta}` envelope
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "data": self.items,
            "meta": {
                "current_page": self.current_page,
                "per_page": self.per_page,
                "total": self.total,
                "total_pages": self.last_page(),
                "count": self.count(),
                "from": self.from_item(),
                "to": self.to_item(),
                "has_more": self.has_more_pages(),
                "next_page": self.next_page(),
                "previous_page": self.previous_page(),
            },
        })
    }
}

/// Cursor-based paginator keyed on a monotonic field
#[derive(Debug, Clone)]
pub struct CursorPaginator<M> {
    items: Vec<M>,
    has_more: bool,
    cursor_field: String,
    limit: u64,
    next_cursor: Option<serde_json::Value>,
    previous_cursor: Option<serde_json::Value>,
}

impl<M> CursorPaginator<M> {
    /// Items of the current window (at most `limit`)
    pub fn items(&self) -> &[M] {
        &self.items
    }

    pub fn into_items(self) -> Vec<M> {
        self.items
    }

    /// True when rows exist beyond this window
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn cursor_field(&self) -> &str {
        &self.cursor_field
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Cursor for the next window: the cursor-field value of the last
    /// returned item, present only when `has_more`
    pub fn next_cursor(&self) -> Option<&serde_json::Value> {
        self.next_cursor.as_ref()
    }

    /// Cursor for the previous window: the cursor-field value of the first
    /// returned item, present whenever the window is non-empty
    pub fn previous_cursor(&self) -> Option<&serde_json::Value> {
        self.previous_cursor.as_ref()
    }
}

impl<M: Serialize> CursorPaginator<M> {
    /// Serialize as a `{data, meta}` envelope
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "data": self.items,
            "meta": {
                "has_more": self.has_more,
                "next_cursor": self.next_cursor,
                "previous_cursor": self.previous_cursor,
            },
        })
    }
}

impl<E: Entity> QueryBuilder<E> {
    /// Paginate results with a total count
    ///
    /// Issues a count query and then one page fetch.
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` when `page` or `per_page` is
    /// less than 1.
    pub fn paginate(
        &self,
        executor: &dyn Executor,
        page: u64,
        per_page: u64,
    ) -> Result<Paginator<E::Model>, RiptideError> {
        if page < 1 {
            return Err(RiptideError::InvalidQuery(
                "page number must be positive".to_string(),
            ));
        }
        if per_page < 1 {
            return Err(RiptideError::InvalidQuery(
                "per_page must be positive".to_string(),
            ));
        }

        let total = self.count(executor)?;
        let mut query = self.clone();
        query.offset = Some((page - 1) * per_page);
        query.limit = Some(per_page);
        let items = query.get(executor)?;

        Ok(Paginator::new(items, total, page, per_page))
    }

    /// Paginate results with a cursor window
    ///
    /// Fetches `limit + 1` rows filtered by `cursor_field > after` (or
    /// `< before`) to detect whether more rows exist, then trims to
    /// `limit`. When the builder carries no explicit ordering, rows are
    /// ordered by the cursor field ascending so repeated windows are
    /// stable.
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` when `limit` is less than 1.
    pub fn cursor_paginate(
        &self,
        executor: &dyn Executor,
        cursor_field: &str,
        limit: u64,
        after: Option<serde_json::Value>,
        before: Option<serde_json::Value>,
    ) -> Result<CursorPaginator<E::Model>, RiptideError> {
        if limit < 1 {
            return Err(RiptideError::InvalidQuery(
                "cursor limit must be positive".to_string(),
            ));
        }

        let mut query = self.clone();
        query.cursor = Some(CursorSpec {
            field: cursor_field.to_string(),
            after: after.clone(),
            before: before.clone(),
        });

        if let Some(after) = after {
            query
                .filters
                .push(FilterCondition::new(cursor_field, Operator::GreaterThan, after)?);
        } else if let Some(before) = before {
            query
                .filters
                .push(FilterCondition::new(cursor_field, Operator::LessThan, before)?);
        }

        if query.orders.is_empty() {
            query.orders.push(SortSpec {
                column: cursor_field.to_string(),
                direction: SortDirection::Asc,
            });
        }
        query.limit = Some(limit + 1);

        let mut items = query.get(executor)?;
        let has_more = items.len() as u64 > limit;
        if has_more {
            items.truncate(limit as usize);
        }

        let next_cursor = if has_more {
            items.last().and_then(|model| model.field(cursor_field))
        } else {
            None
        };
        let previous_cursor = items.first().and_then(|model| model.field(cursor_field));

        Ok(CursorPaginator {
            items,
            has_more,
            cursor_field: cursor_field.to_string(),
            limit,
            next_cursor,
            previous_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_cfg::{MockExecutor, Post};
    use crate::row::Row;
    use crate::RiptideError;
    use serde_json::json;

    fn post_row(id: i64) -> Row {
        Row::from_pairs([
            ("id", json!(id)),
            ("user_id", json!(1)),
            ("title", json!(format!("post {id}"))),
            ("views", json!(id * 10)),
            ("published", json!(true)),
        ])
    }

    #[test]
    fn test_paginator_arithmetic() {
        let page: Paginator<i32> = Paginator::new(vec![0; 15], 45, 2, 15);
        assert_eq!(page.last_page(), 3);
        assert!(page.has_more_pages());
        assert_eq!(page.previous_page(), Some(1));
        assert_eq!(page.next_page(), Some(3));
        assert_eq!(page.from_item(), 16);
        assert_eq!(page.to_item(), 30);
    }

    #[test]
    fn test_paginator_empty() {
        let page: Paginator<i32> = Paginator::new(vec![], 0, 1, 15);
        assert_eq!(page.last_page(), 0);
        assert!(!page.has_more_pages());
        assert_eq!(page.previous_page(), None);
        assert_eq!(page.next_page(), None);
        assert_eq!(page.from_item(), 0);
        assert_eq!(page.to_item(), 0);
    }

    #[test]
    fn test_paginate_rejects_page_zero() {
        let executor = MockExecutor::new();
        let err = Post::query().paginate(&executor, 0, 15).unwrap_err();
        assert!(matches!(err, RiptideError::InvalidQuery(_)));
        assert!(executor.fetched().is_empty());
    }

    #[test]
    fn test_paginate_counts_then_fetches() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![Row::from_pairs([("count", json!(45))])]);
        executor.push_rows((16..=30).map(post_row).collect());

        let page = Post::query().paginate(&executor, 2, 15).unwrap();
        assert_eq!(page.total(), 45);
        assert_eq!(page.count(), 15);
        assert_eq!(page.current_page(), 2);
        assert_eq!(page.last_page(), 3);
        assert!(page.has_more_pages());
        assert_eq!(page.previous_page(), Some(1));
        assert_eq!(page.next_page(), Some(3));

        let fetched = executor.fetched();
        assert_eq!(fetched.len(), 2);
        assert!(fetched[0].contains("COUNT(*)"), "{}", fetched[0]);
        assert!(fetched[1].contains("LIMIT 15"), "{}", fetched[1]);
        assert!(fetched[1].contains("OFFSET 15"), "{}", fetched[1]);
    }

    #[test]
    fn test_paginator_to_json_meta() {
        let page = Paginator::new(vec![json!({"id": 1})], 1, 1, 15);
        let envelope = page.to_json();
        assert_eq!(envelope["meta"]["total"], json!(1));
        assert_eq!(envelope["meta"]["total_pages"], json!(1));
        assert_eq!(envelope["meta"]["has_more"], json!(false));
        assert_eq!(envelope["data"][0]["id"], json!(1));
    }

    #[test]
    fn test_cursor_paginate_over_limit_detects_more() {
        let executor = MockExecutor::new();
        // 21 matching rows for a limit of 20
        executor.push_rows((1..=21).map(post_row).collect());

        let window = Post::query()
            .cursor_paginate(&executor, "id", 20, None, None)
            .unwrap();
        assert_eq!(window.items().len(), 20);
        assert!(window.has_more());
        assert_eq!(window.next_cursor(), Some(&json!(20)));
        assert_eq!(window.previous_cursor(), Some(&json!(1)));

        let sql = executor.fetched()[0].clone();
        assert!(sql.contains("LIMIT 21"), "{sql}");
        assert!(sql.contains(r#"ORDER BY "id" ASC"#), "{sql}");
    }

    #[test]
    fn test_cursor_paginate_exact_limit_has_no_more() {
        let executor = MockExecutor::new();
        executor.push_rows((1..=20).map(post_row).collect());

        let window = Post::query()
            .cursor_paginate(&executor, "id", 20, None, None)
            .unwrap();
        assert_eq!(window.items().len(), 20);
        assert!(!window.has_more());
        assert_eq!(window.next_cursor(), None);
        assert_eq!(window.previous_cursor(), Some(&json!(1)));
    }

    #[test]
    fn test_cursor_paginate_after_filters_forward() {
        let executor = MockExecutor::new();
        executor.push_rows((21..=25).map(post_row).collect());

        let window = Post::query()
            .cursor_paginate(&executor, "id", 20, Some(json!(20)), None)
            .unwrap();
        assert!(!window.has_more());
        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#""id" > 20"#), "{sql}");
    }

    #[test]
    fn test_cursor_paginate_before_filters_backward() {
        let executor = MockExecutor::new();
        executor.push_rows((1..=5).map(post_row).collect());

        Post::query()
            .cursor_paginate(&executor, "id", 20, None, Some(json!(6)))
            .unwrap();
        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#""id" < 6"#), "{sql}");
    }

    #[test]
    fn test_cursor_paginate_empty_window() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        let window = Post::query()
            .cursor_paginate(&executor, "id", 20, None, None)
            .unwrap();
        assert!(window.items().is_empty());
        assert!(!window.has_more());
        assert_eq!(window.next_cursor(), None);
        assert_eq!(window.previous_cursor(), None);
    }

    #[test]
    fn test_cursor_paginate_keeps_caller_ordering() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![]);
        let mut query = Post::query();
        query.order_by("views", "desc").unwrap();
        query
            .cursor_paginate(&executor, "id", 10, None, None)
            .unwrap();
        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#"ORDER BY "views" DESC"#), "{sql}");
        assert!(!sql.contains(r#""id" ASC"#), "{sql}");
    }
}
