use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use iw_domain::error::Result;
use iw_domain::record::{AiRecord, AiRecordStore, Diary, DiaryStore, Todo, TodoStore, UserId};
use parking_lot::RwLock;

/// Process-local todo, diary and AI-record storage. Contents are lost on
/// restart.
#[derive(Default)]
pub struct InMemoryStore {
    todos: RwLock<Vec<Todo>>,
    diaries: RwLock<Vec<Diary>>,
    records: RwLock<Vec<AiRecord>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Store `todo`, assigning a fresh id.
    pub fn add_todo(&self, mut todo: Todo) -> u64 {
        todo.id = self.allocate_id();
        let id = todo.id;
        self.todos.write().push(todo);
        id
    }

    pub fn add_diary(&self, mut diary: Diary) -> u64 {
        diary.id = self.allocate_id();
        let id = diary.id;
        self.diaries.write().push(diary);
        id
    }
}

#[async_trait::async_trait]
impl TodoStore for InMemoryStore {
    async fn todos_scheduled_between(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Todo>> {
        let mut hits: Vec<Todo> = self
            .todos
            .read()
            .iter()
            .filter(|t| &t.user_id == user)
            .filter(|t| t.start_time.is_some_and(|s| s >= from && s <= to))
            .cloned()
            .collect();
        hits.sort_by_key(|t| t.start_time);
        Ok(hits)
    }

    async fn todos_created_between(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Todo>> {
        let mut hits: Vec<Todo> = self
            .todos
            .read()
            .iter()
            .filter(|t| &t.user_id == user && t.created_at >= from && t.created_at <= to)
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait::async_trait]
impl DiaryStore for InMemoryStore {
    async fn diaries_between(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Diary>> {
        let mut hits: Vec<Diary> = self
            .diaries
            .read()
            .iter()
            .filter(|d| &d.user_id == user && d.date >= from && d.date <= to)
            .cloned()
            .collect();
        hits.sort_by_key(|d| d.date);
        Ok(hits)
    }
}

#[async_trait::async_trait]
impl AiRecordStore for InMemoryStore {
    async fn get(&self, user: &UserId, record_type: &str) -> Result<Option<AiRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| &r.user_id == user && r.record_type == record_type)
            .cloned())
    }

    async fn upsert(&self, user: &UserId, record_type: &str, content: &str) -> Result<AiRecord> {
        let now = Utc::now();
        let mut records = self.records.write();
        if let Some(existing) = records
            .iter_mut()
            .find(|r| &r.user_id == user && r.record_type == record_type)
        {
            existing.content = content.to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let record = AiRecord {
            id: self.allocate_id(),
            user_id: user.clone(),
            record_type: record_type.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use iw_domain::record::{Priority, TodoStatus};

    use super::*;

    fn user(id: &str) -> UserId {
        UserId(id.into())
    }

    fn todo(owner: &str, title: &str, created_at: DateTime<Utc>) -> Todo {
        Todo {
            id: 0,
            user_id: user(owner),
            title: title.into(),
            description: None,
            status: TodoStatus::Pending,
            priority: Priority::Medium,
            category: None,
            start_time: Some(created_at),
            end_time: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_per_user_and_type() {
        let store = InMemoryStore::new();
        let first = store.upsert(&user("a"), "suggest", "v1").await.unwrap();
        let second = store.upsert(&user("a"), "suggest", "v2").await.unwrap();
        store.upsert(&user("b"), "suggest", "other").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "v2");
        assert!(second.updated_at >= first.updated_at);

        let got = store.get(&user("a"), "suggest").await.unwrap().unwrap();
        assert_eq!(got.content, "v2");
        assert!(store.get(&user("a"), "summary_daily").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn created_between_is_newest_first_and_limited() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for i in 0..5 {
            store.add_todo(todo("a", &format!("t{i}"), now - TimeDelta::hours(i)));
        }
        store.add_todo(todo("b", "not mine", now));
        store.add_todo(todo("a", "too old", now - TimeDelta::days(30)));

        let hits = store
            .todos_created_between(&user("a"), now - TimeDelta::days(1), now, 3)
            .await
            .unwrap();
        let titles: Vec<&str> = hits.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["t0", "t1", "t2"]);
    }

    #[tokio::test]
    async fn scheduled_between_skips_unscheduled() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut unscheduled = todo("a", "someday", now);
        unscheduled.start_time = None;
        store.add_todo(unscheduled);
        store.add_todo(todo("a", "today", now));

        let hits = store
            .todos_scheduled_between(&user("a"), now - TimeDelta::hours(1), now + TimeDelta::hours(1))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "today");
    }
}
