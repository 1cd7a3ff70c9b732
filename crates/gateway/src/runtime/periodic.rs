//! Periodic todo review: build a structured context from the caller's
//! todos and diaries, ask the model for a report, persist it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use iw_domain::error::{Error, Result};
use iw_domain::record::{
    AiRecord, AiRecordStore, Diary, DiaryStore, Priority, Todo, TodoStatus, TodoStore, UserId,
};

use super::transforms::{truncate_chars, TransformKind, TransformService};

/// Days covered by the suggestion context, today included.
const SUGGEST_WINDOW_DAYS: u64 = 14;
const SUGGEST_TODO_LIMIT: usize = 50;
const DIARY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "daily" => Ok(PeriodKind::Daily),
            "weekly" => Ok(PeriodKind::Weekly),
            "monthly" => Ok(PeriodKind::Monthly),
            other => Err(Error::validation(format!(
                "未知的总结类型: {other}（可选 daily、weekly、monthly）"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodKind::Daily => "daily",
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
        }
    }

    fn label(self) -> &'static str {
        match self {
            PeriodKind::Daily => "日",
            PeriodKind::Weekly => "周",
            PeriodKind::Monthly => "月",
        }
    }

    /// AI record type the report is saved under.
    pub fn record_type(self) -> String {
        format!("summary_{}", self.as_str())
    }

    /// Inclusive date range ending on `today`.
    pub fn range(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self {
            PeriodKind::Daily => today,
            PeriodKind::Weekly => today.checked_sub_days(Days::new(6)).unwrap_or(today),
            PeriodKind::Monthly => {
                NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today)
            }
        };
        (start, today)
    }
}

pub const SUGGEST_RECORD_TYPE: &str = "suggest";

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    match date.checked_add_days(Days::new(1)) {
        Some(next) => day_start(next) - TimeDelta::nanoseconds(1),
        None => day_start(date),
    }
}

// ── Context rendering ──────────────────────────────────────────────

fn summary_context(from: NaiveDate, to: NaiveDate, todos: &[Todo], diaries: &[Diary]) -> String {
    let mut ctx = format!("时间范围: {from} ~ {to}\n\n== 代办事项 ==\n");
    if todos.is_empty() {
        ctx.push_str("无代办记录。\n");
    }
    for todo in todos {
        let status = match todo.status {
            TodoStatus::Done => "已完成",
            TodoStatus::Pending => "未完成",
        };
        ctx.push_str(&format!("- [{status}] {}", todo.title));
        if let Some(category) = &todo.category {
            ctx.push_str(&format!(" ({category})"));
        }
        ctx.push('\n');
    }

    ctx.push_str("\n== 日记 ==\n");
    if diaries.is_empty() {
        ctx.push_str("无日记记录。\n");
    }
    for diary in diaries {
        ctx.push_str(&format!("[{}] ", diary.date));
        if let Some(mood) = &diary.mood {
            ctx.push_str(&format!("心情:{mood} "));
        }
        let excerpt = truncate_chars(&diary.content, DIARY_EXCERPT_CHARS);
        let ellipsis = if excerpt.len() < diary.content.len() { "..." } else { "" };
        ctx.push_str(&format!("{excerpt}{ellipsis}\n"));
    }
    ctx
}

fn suggest_context(todos: &[Todo]) -> String {
    let mut ctx = String::from("最近两周代办事项：\n");
    if todos.is_empty() {
        ctx.push_str("无代办记录。\n");
    }
    for todo in todos {
        let status = match todo.status {
            TodoStatus::Done => "完成",
            TodoStatus::Pending => "待办",
        };
        let priority = match todo.priority {
            Priority::Low => "低",
            Priority::Medium => "中",
            Priority::High => "高",
        };
        let category = todo.category.as_deref().unwrap_or("");
        ctx.push_str(&format!(
            "- [{status}] {} 优先级:{priority} 分类:{category}\n",
            todo.title
        ));
    }
    ctx
}

// ── Service ────────────────────────────────────────────────────────

pub struct PeriodicReview {
    transforms: Arc<TransformService>,
    todos: Arc<dyn TodoStore>,
    diaries: Arc<dyn DiaryStore>,
    records: Arc<dyn AiRecordStore>,
}

impl PeriodicReview {
    pub fn new(
        transforms: Arc<TransformService>,
        todos: Arc<dyn TodoStore>,
        diaries: Arc<dyn DiaryStore>,
        records: Arc<dyn AiRecordStore>,
    ) -> Self {
        Self {
            transforms,
            todos,
            diaries,
            records,
        }
    }

    pub async fn summarize(&self, user: &UserId, period: PeriodKind) -> Result<AiRecord> {
        self.summarize_on(user, period, Utc::now().date_naive()).await
    }

    pub async fn summarize_on(
        &self,
        user: &UserId,
        period: PeriodKind,
        today: NaiveDate,
    ) -> Result<AiRecord> {
        let (from, to) = period.range(today);
        let (start, end) = (day_start(from), day_end(to));
        // Scheduled in the period, then anything created in it that was
        // not already picked up.
        let mut todos = self.todos.todos_scheduled_between(user, start, end).await?;
        let created = self
            .todos
            .todos_created_between(user, start, end, usize::MAX)
            .await?;
        let seen: HashSet<_> = todos.iter().map(|t| t.id).collect();
        todos.extend(created.into_iter().filter(|t| !seen.contains(&t.id)));
        let diaries = self.diaries.diaries_between(user, from, to).await?;

        tracing::info!(
            user = %user,
            period = period.as_str(),
            todos = todos.len(),
            diaries = diaries.len(),
            "generating periodic summary"
        );

        let prompt = TransformKind::PeriodicSummary
            .spec()
            .system_prompt
            .replace("{period}", period.label());
        let context = summary_context(from, to, &todos, &diaries);
        let report = self
            .transforms
            .complete_with(TransformKind::PeriodicSummary, &prompt, &context)
            .await?;

        self.records.upsert(user, &period.record_type(), &report).await
    }

    pub async fn suggest(&self, user: &UserId) -> Result<AiRecord> {
        self.suggest_on(user, Utc::now().date_naive()).await
    }

    pub async fn suggest_on(&self, user: &UserId, today: NaiveDate) -> Result<AiRecord> {
        let from = today
            .checked_sub_days(Days::new(SUGGEST_WINDOW_DAYS - 1))
            .unwrap_or(today);
        let todos = self
            .todos
            .todos_created_between(user, day_start(from), day_end(today), SUGGEST_TODO_LIMIT)
            .await?;

        tracing::info!(user = %user, todos = todos.len(), "generating improvement suggestions");

        let prompt = TransformKind::Suggest.spec().system_prompt;
        let report = self
            .transforms
            .complete_with(TransformKind::Suggest, prompt, &suggest_context(&todos))
            .await?;

        self.records.upsert(user, SUGGEST_RECORD_TYPE, &report).await
    }

    pub async fn record(&self, user: &UserId, record_type: &str) -> Result<Option<AiRecord>> {
        self.records.get(user, record_type).await
    }

    pub async fn save_record(
        &self,
        user: &UserId,
        record_type: &str,
        content: &str,
    ) -> Result<AiRecord> {
        if record_type.trim().is_empty() {
            return Err(Error::validation("recordType 不能为空"));
        }
        self.records.upsert(user, record_type.trim(), content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn todo(title: &str, status: TodoStatus, priority: Priority, category: Option<&str>) -> Todo {
        Todo {
            id: 1,
            user_id: UserId("u1".into()),
            title: title.into(),
            description: None,
            status,
            priority,
            category: category.map(String::from),
            start_time: None,
            end_time: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn period_names() {
        assert_eq!(PeriodKind::parse("weekly").unwrap(), PeriodKind::Weekly);
        assert_eq!(PeriodKind::Monthly.record_type(), "summary_monthly");
        assert!(matches!(PeriodKind::parse("yearly"), Err(Error::Validation(_))));
    }

    #[test]
    fn ranges_end_today() {
        let today = date(2026, 3, 18);
        assert_eq!(PeriodKind::Daily.range(today), (today, today));
        assert_eq!(PeriodKind::Weekly.range(today), (date(2026, 3, 12), today));
        assert_eq!(PeriodKind::Monthly.range(today), (date(2026, 3, 1), today));
    }

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let d = date(2026, 3, 18);
        assert_eq!(day_start(d).to_rfc3339(), "2026-03-18T00:00:00+00:00");
        assert!(day_end(d) < day_start(date(2026, 3, 19)));
        assert!(day_end(d) > day_start(d) + TimeDelta::hours(23));
    }

    #[test]
    fn summary_context_layout() {
        let todos = vec![
            todo("写周报", TodoStatus::Done, Priority::High, Some("工作")),
            todo("读书", TodoStatus::Pending, Priority::Low, None),
        ];
        let diaries = vec![Diary {
            id: 1,
            user_id: UserId("u1".into()),
            date: date(2026, 3, 18),
            content: "好".repeat(250),
            mood: Some("开心".into()),
        }];
        let ctx = summary_context(date(2026, 3, 12), date(2026, 3, 18), &todos, &diaries);

        assert!(ctx.starts_with("时间范围: 2026-03-12 ~ 2026-03-18\n\n== 代办事项 ==\n"));
        assert!(ctx.contains("- [已完成] 写周报 (工作)\n"));
        assert!(ctx.contains("- [未完成] 读书\n"));
        let expected = format!("[2026-03-18] 心情:开心 {}...\n", "好".repeat(200));
        assert!(ctx.ends_with(&expected));
    }

    #[test]
    fn diary_without_mood_has_no_mood_label() {
        let diaries = vec![Diary {
            id: 2,
            user_id: UserId("u1".into()),
            date: date(2026, 3, 18),
            content: "平静的一天".into(),
            mood: None,
        }];
        let ctx = summary_context(date(2026, 3, 18), date(2026, 3, 18), &[], &diaries);
        assert!(ctx.ends_with("== 日记 ==\n[2026-03-18] 平静的一天\n"));
        assert!(!ctx.contains("心情"));
    }

    #[test]
    fn empty_summary_context_says_so() {
        let ctx = summary_context(date(2026, 3, 18), date(2026, 3, 18), &[], &[]);
        assert!(ctx.contains("无代办记录。\n"));
        assert!(ctx.ends_with("== 日记 ==\n无日记记录。\n"));
    }

    #[test]
    fn suggest_context_layout() {
        let ctx = suggest_context(&[todo("刷题", TodoStatus::Pending, Priority::Medium, Some("学习"))]);
        assert_eq!(ctx, "最近两周代办事项：\n- [待办] 刷题 优先级:中 分类:学习\n");
    }
}
