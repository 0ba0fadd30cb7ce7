//! Shared entities and a scripted executor for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use sea_query::{PostgresQueryBuilder, SelectStatement};
use serde_json::json;

use crate::error::RiptideError;
use crate::executor::{Executor, MutationStatement};
use crate::filter::{FilterGroup, LogicalOperator, Operator};
use crate::model::{Entity, LoadedRelations, ModelTrait};
use crate::relation::RelationDef;
use crate::row::{FromRow, Row};
use crate::scope::GlobalScope;

/// Executor double: records rendered SQL and replays scripted results.
///
/// `fetch` pops the next scripted row batch (empty when the script runs
/// dry); `execute` pops the next scripted affected count. Statements are
/// rendered through `PostgresQueryBuilder` so tests can assert on SQL
/// text.
pub struct MockExecutor {
    fetched: RefCell<Vec<String>>,
    executed: RefCell<Vec<String>>,
    fetch_results: RefCell<VecDeque<Vec<Row>>>,
    execute_results: RefCell<VecDeque<u64>>,
    fail_message: RefCell<Option<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            fetched: RefCell::new(Vec::new()),
            executed: RefCell::new(Vec::new()),
            fetch_results: RefCell::new(VecDeque::new()),
            execute_results: RefCell::new(VecDeque::new()),
            fail_message: RefCell::new(None),
        }
    }

    /// Script the next `fetch` result
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.fetch_results.borrow_mut().push_back(rows);
    }

    /// Script the next `execute` result
    pub fn push_affected(&self, affected: u64) {
        self.execute_results.borrow_mut().push_back(affected);
    }

    /// Make the next call fail with a database error
    pub fn fail_next(&self, message: &str) {
        *self.fail_message.borrow_mut() = Some(message.to_string());
    }

    /// SQL of every fetched select, in call order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }

    /// SQL of every executed mutation, in call order
    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    fn take_failure(&self) -> Option<RiptideError> {
        self.fail_message
            .borrow_mut()
            .take()
            .map(RiptideError::Database)
    }
}

impl Executor for MockExecutor {
    fn fetch(&self, query: &SelectStatement) -> Result<Vec<Row>, RiptideError> {
        self.fetched
            .borrow_mut()
            .push(query.to_string(PostgresQueryBuilder));
        if let Some(failure) = self.take_failure() {
            return Err(failure);
        }
        Ok(self.fetch_results.borrow_mut().pop_front().unwrap_or_default())
    }

    fn execute(&self, statement: &MutationStatement) -> Result<u64, RiptideError> {
        let sql = match statement {
            MutationStatement::Insert(stmt) => stmt.to_string(PostgresQueryBuilder),
            MutationStatement::Update(stmt) => stmt.to_string(PostgresQueryBuilder),
            MutationStatement::Delete(stmt) => stmt.to_string(PostgresQueryBuilder),
        };
        self.executed.borrow_mut().push(sql);
        if let Some(failure) = self.take_failure() {
            return Err(failure);
        }
        Ok(self.execute_results.borrow_mut().pop_front().unwrap_or(0))
    }
}

// --- users: soft deletes, has_many posts, many_to_many roles -----------

#[derive(Default, Debug, Clone, Copy)]
pub struct User;

#[derive(Debug, Clone)]
pub struct UserModel {
    pub id: i64,
    pub name: String,
    pub relations: LoadedRelations,
}

impl FromRow for UserModel {
    fn from_row(row: &Row) -> Result<Self, RiptideError> {
        Ok(UserModel {
            id: row
                .get_i64("id")
                .ok_or_else(|| RiptideError::Parse("users row missing id".to_string()))?,
            name: row.get_str("name").unwrap_or_default().to_string(),
            relations: LoadedRelations::default(),
        })
    }
}

impl ModelTrait for UserModel {
    fn field(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "id" => Some(json!(self.id)),
            "name" => Some(json!(self.name)),
            _ => None,
        }
    }

    fn primary_key_value(&self) -> serde_json::Value {
        json!(self.id)
    }

    fn relations(&self) -> &LoadedRelations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut LoadedRelations {
        &mut self.relations
    }
}

impl Entity for User {
    type Model = UserModel;

    fn table_name(&self) -> &'static str {
        "users"
    }

    fn soft_delete_column(&self) -> Option<&'static str> {
        Some("deleted_at")
    }

    fn relations(&self) -> Vec<RelationDef> {
        vec![
            RelationDef::has_many("posts", "posts", "user_id"),
            RelationDef::many_to_many("roles", "roles", "role_user", "user_id", "role_id"),
        ]
    }
}

// --- posts: plain entity, belongs_to author ----------------------------

#[derive(Default, Debug, Clone, Copy)]
pub struct Post;

#[derive(Debug, Clone)]
pub struct PostModel {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub views: i64,
    pub relations: LoadedRelations,
}

impl FromRow for PostModel {
    fn from_row(row: &Row) -> Result<Self, RiptideError> {
        Ok(PostModel {
            id: row
                .get_i64("id")
                .ok_or_else(|| RiptideError::Parse("posts row missing id".to_string()))?,
            user_id: row.get_i64("user_id").unwrap_or_default(),
            title: row.get_str("title").unwrap_or_default().to_string(),
            views: row.get_i64("views").unwrap_or_default(),
            relations: LoadedRelations::default(),
        })
    }
}

impl ModelTrait for PostModel {
    fn field(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "id" => Some(json!(self.id)),
            "user_id" => Some(json!(self.user_id)),
            "title" => Some(json!(self.title)),
            "views" => Some(json!(self.views)),
            _ => None,
        }
    }

    fn primary_key_value(&self) -> serde_json::Value {
        json!(self.id)
    }

    fn relations(&self) -> &LoadedRelations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut LoadedRelations {
        &mut self.relations
    }
}

impl Entity for Post {
    type Model = PostModel;

    fn table_name(&self) -> &'static str {
        "posts"
    }

    fn relations(&self) -> Vec<RelationDef> {
        vec![RelationDef::belongs_to("author", "users", "user_id")]
    }
}

// --- roles: related side of the pivot ----------------------------------

#[derive(Default, Debug, Clone, Copy)]
pub struct Role;

#[derive(Debug, Clone)]
pub struct RoleModel {
    pub id: i64,
    pub name: String,
    pub relations: LoadedRelations,
}

impl FromRow for RoleModel {
    fn from_row(row: &Row) -> Result<Self, RiptideError> {
        Ok(RoleModel {
            id: row
                .get_i64("id")
                .ok_or_else(|| RiptideError::Parse("roles row missing id".to_string()))?,
            name: row.get_str("name").unwrap_or_default().to_string(),
            relations: LoadedRelations::default(),
        })
    }
}

impl ModelTrait for RoleModel {
    fn field(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "id" => Some(json!(self.id)),
            "name" => Some(json!(self.name)),
            _ => None,
        }
    }

    fn primary_key_value(&self) -> serde_json::Value {
        json!(self.id)
    }

    fn relations(&self) -> &LoadedRelations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut LoadedRelations {
        &mut self.relations
    }
}

impl Entity for Role {
    type Model = RoleModel;

    fn table_name(&self) -> &'static str {
        "roles"
    }
}

// --- articles: global scope carrier ------------------------------------

#[derive(Default, Debug, Clone, Copy)]
pub struct Article;

#[derive(Debug, Clone)]
pub struct ArticleModel {
    pub id: i64,
    pub relations: LoadedRelations,
}

impl FromRow for ArticleModel {
    fn from_row(row: &Row) -> Result<Self, RiptideError> {
        Ok(ArticleModel {
            id: row
                .get_i64("id")
                .ok_or_else(|| RiptideError::Parse("articles row missing id".to_string()))?,
            relations: LoadedRelations::default(),
        })
    }
}

impl ModelTrait for ArticleModel {
    fn field(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "id" => Some(json!(self.id)),
            _ => None,
        }
    }

    fn primary_key_value(&self) -> serde_json::Value {
        json!(self.id)
    }

    fn relations(&self) -> &LoadedRelations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut LoadedRelations {
        &mut self.relations
    }
}

impl Entity for Article {
    type Model = ArticleModel;

    fn table_name(&self) -> &'static str {
        "articles"
    }

    fn global_scopes(&self) -> Vec<GlobalScope> {
        let mut filter = FilterGroup::new(LogicalOperator::And);
        let _ = filter.add_condition("published", Operator::Equal, json!(true));
        vec![GlobalScope::new("published", filter)]
    }
}
