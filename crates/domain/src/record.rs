//! Storage-collaborator view of todos, diaries and saved AI output.
//!
//! Only the fields the AI operations read are modeled here; CRUD over
//! these records lives elsewhere.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque caller identity supplied by the edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    Pending,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub user_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diary {
    pub id: u64,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub content: String,
    #[serde(default)]
    pub mood: Option<String>,
}

/// Saved AI output. One row per `(user_id, record_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRecord {
    pub id: u64,
    pub user_id: UserId,
    pub record_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collaborator traits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
pub trait TodoStore: Send + Sync {
    /// Todos whose `start_time` falls within `[from, to]`.
    async fn todos_scheduled_between(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Todo>>;

    /// Todos created within `[from, to]`, newest first, at most `limit`.
    async fn todos_created_between(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Todo>>;
}

#[async_trait::async_trait]
pub trait DiaryStore: Send + Sync {
    /// Diaries dated within `[from, to]` inclusive, oldest first.
    async fn diaries_between(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Diary>>;
}

#[async_trait::async_trait]
pub trait AiRecordStore: Send + Sync {
    async fn get(&self, user: &UserId, record_type: &str) -> Result<Option<AiRecord>>;

    /// Insert or overwrite the record for `(user, record_type)`.
    async fn upsert(&self, user: &UserId, record_type: &str, content: &str) -> Result<AiRecord>;
}
