//! Eager loading of related rows.
//!
//! Related rows are fetched in a separate batched query after the parent
//! query resolves, similar to SeaORM's `selectinload` strategy:
//!
//! 1. Fetch parent models
//! 2. Collect their key values
//! 3. Run one query for all related rows (`fk IN (keys)`, pivot join for
//!    many-to-many)
//! 4. Group related rows by parent key and attach them to each model
//!
//! One query per requested relation, never one per parent row. Every parent
//! is marked loaded afterwards — an empty row set means "loaded, nothing
//! related", which is distinct from "never requested".

use sea_query::{Expr, ExprTrait, JoinType, Query};

use crate::error::RiptideError;
use crate::executor::Executor;
use crate::filter::FilterGroup;
use crate::model::ModelTrait;
use crate::query::builder::{pivot_keys, ConstraintFn};
use crate::query::compile::{group_condition, join_condition, Ident};
use crate::query::value_conversion::json_to_value;
use crate::relation::def::{RelationDef, RelationKind};
use crate::row::Row;

/// Fetch one relation for a batch of parent models and attach the rows
pub(crate) fn load_related<M: ModelTrait>(
    def: &RelationDef,
    constraint: Option<&ConstraintFn>,
    models: &mut [M],
    executor: &dyn Executor,
) -> Result<(), RiptideError> {
    if models.is_empty() {
        return Ok(());
    }

    // The parent-side column whose values drive the batch filter
    let parent_key_column = match def.kind {
        RelationKind::BelongsTo => def.foreign_key,
        _ => def.local_key,
    };

    let mut keys: Vec<serde_json::Value> = Vec::new();
    for model in models.iter() {
        if let Some(key) = model.field(parent_key_column) {
            if !serde_json::Value::is_null(&key) && !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut stmt = Query::select();
    // Column of the fetched rows used to group them back onto parents
    let group_column: String;
    match def.kind {
        RelationKind::HasOne | RelationKind::HasMany => {
            stmt.column(sea_query::Asterisk)
                .from(Ident::new(def.related_table));
            stmt.cond_where(
                Expr::col(Ident::new(def.foreign_key))
                    .is_in(keys.iter().map(json_to_value)),
            );
            group_column = def.foreign_key.to_string();
        }
        RelationKind::BelongsTo => {
            stmt.column(sea_query::Asterisk)
                .from(Ident::new(def.related_table));
            stmt.cond_where(
                Expr::col(Ident::new(def.local_key)).is_in(keys.iter().map(json_to_value)),
            );
            group_column = def.local_key.to_string();
        }
        RelationKind::ManyToMany => {
            let (pivot, related_pivot_key) = pivot_keys(def)?;
            group_column = format!("pivot_{}", def.foreign_key);
            stmt.column((Ident::new(def.related_table), sea_query::Asterisk))
                .expr_as(
                    Expr::col((Ident::new(pivot), Ident::new(def.foreign_key))),
                    Ident::new(&group_column),
                )
                .from(Ident::new(def.related_table))
                .join(
                    JoinType::InnerJoin,
                    Ident::new(pivot),
                    join_condition(def.related_table, def.related_key, pivot, related_pivot_key),
                );
            stmt.cond_where(
                Expr::col((Ident::new(pivot), Ident::new(def.foreign_key)))
                    .is_in(keys.iter().map(json_to_value)),
            );
        }
    }

    if let Some(constraint) = constraint {
        let mut extra = FilterGroup::default();
        constraint(&mut extra);
        if !extra.is_empty() {
            // Qualify constraint columns only when the pivot join makes
            // bare column names ambiguous
            let qualifier = def.is_many_to_many().then_some(def.related_table);
            stmt.cond_where(group_condition(&extra, qualifier));
        }
    }

    log::debug!(
        "eager loading '{}' for {} distinct parent keys",
        def.name,
        keys.len()
    );
    let rows = executor.fetch(&stmt)?;

    for model in models.iter_mut() {
        let related: Vec<Row> = match model.field(parent_key_column) {
            Some(key) if !serde_json::Value::is_null(&key) => rows
                .iter()
                .filter(|row| row.get(&group_column) == Some(&key))
                .cloned()
                .collect(),
            _ => Vec::new(),
        };
        model.relations_mut().insert(def.name, related);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, RelationValue};
    use crate::row::FromRow;
    use crate::tests_cfg::{MockExecutor, Post, User};
    use serde_json::json;

    fn users(rows: &[Row]) -> Vec<<User as Entity>::Model> {
        rows.iter()
            .map(|row| <User as Entity>::Model::from_row(row).unwrap())
            .collect()
    }

    #[test]
    fn test_has_many_groups_rows_by_foreign_key() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![
            Row::from_pairs([("id", json!(10)), ("user_id", json!(1)), ("title", json!("a"))]),
            Row::from_pairs([("id", json!(11)), ("user_id", json!(2)), ("title", json!("b"))]),
            Row::from_pairs([("id", json!(12)), ("user_id", json!(1)), ("title", json!("c"))]),
        ]);

        let mut models = users(&[
            Row::from_pairs([("id", json!(1)), ("name", json!("u1"))]),
            Row::from_pairs([("id", json!(2)), ("name", json!("u2"))]),
            Row::from_pairs([("id", json!(3)), ("name", json!("u3"))]),
        ]);

        let def = User::default().relation("posts").unwrap();
        load_related(&def, None, &mut models, &executor).unwrap();

        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#""user_id" IN (1, 2, 3)"#), "{sql}");

        match models[0].relations().get("posts") {
            RelationValue::Loaded(rows) => assert_eq!(rows.len(), 2),
            RelationValue::NotLoaded => panic!("posts should be loaded"),
        }
        assert_eq!(models[1].relations().get("posts").rows().map(<[Row]>::len), Some(1));
        // Loaded-but-empty, not NotLoaded
        assert!(models[2].relations().is_loaded("posts"));
        assert_eq!(models[2].relations().get("posts").rows(), Some(&[][..]));
    }

    #[test]
    fn test_many_to_many_joins_pivot_and_groups_by_pivot_key() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![
            Row::from_pairs([
                ("id", json!(5)),
                ("name", json!("admin")),
                ("pivot_user_id", json!(1)),
            ]),
        ]);

        let mut models = users(&[Row::from_pairs([("id", json!(1)), ("name", json!("u1"))])]);
        let def = User::default().relation("roles").unwrap();
        load_related(&def, None, &mut models, &executor).unwrap();

        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#"INNER JOIN "role_user""#), "{sql}");
        assert!(sql.contains("roles.id = role_user.role_id"), "{sql}");
        assert!(sql.contains(r#"AS "pivot_user_id""#), "{sql}");

        let rows = models[0].relations().get("roles").rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("name"), Some("admin"));
    }

    #[test]
    fn test_belongs_to_matches_owner_key() {
        let executor = MockExecutor::new();
        executor.push_rows(vec![Row::from_pairs([("id", json!(7)), ("name", json!("author"))])]);

        let post_rows = [Row::from_pairs([
            ("id", json!(1)),
            ("user_id", json!(7)),
            ("title", json!("t")),
            ("views", json!(0)),
            ("published", json!(true)),
        ])];
        let mut models: Vec<<Post as Entity>::Model> = post_rows
            .iter()
            .map(|row| <Post as Entity>::Model::from_row(row).unwrap())
            .collect();

        let def = Post::default().relation("author").unwrap();
        load_related(&def, None, &mut models, &executor).unwrap();

        let sql = executor.fetched()[0].clone();
        assert!(sql.contains(r#""id" IN (7)"#), "{sql}");
        let rows = models[0].relations().get("author").rows().unwrap();
        assert_eq!(rows[0].get_str("name"), Some("author"));
    }

    #[test]
    fn test_empty_parent_batch_issues_no_query() {
        let executor = MockExecutor::new();
        let mut models: Vec<<User as Entity>::Model> = Vec::new();
        let def = User::default().relation("posts").unwrap();
        load_related(&def, None, &mut models, &executor).unwrap();
        assert!(executor.fetched().is_empty());
    }
}
