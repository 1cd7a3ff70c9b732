//! The catalog of AI operations and the service that runs them.
//!
//! Every operation is a [`TransformSpec`] row: which engine it uses, how
//! much of the input it keeps, the sampling settings and the
//! post-processing applied to the answer.

use std::sync::Arc;
use std::time::Duration;

use iw_domain::config::AiConfig;
use iw_domain::error::{Error, Result};
use iw_domain::message::{ChatMessage, Role};
use iw_providers::{CompletionEngine, CompletionParams, RelayEngine, RelayHandle, RelayParams};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Catalog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Completion,
    Relay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    None,
    /// Hard cut of the answer to at most this many characters.
    Truncate(usize),
    /// Remove surrounding quote or bracket pairs.
    StripWrapping,
    /// Split into at most this many tags.
    SplitTags(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Standard,
    LongForm,
}

#[derive(Debug)]
pub struct TransformSpec {
    pub name: &'static str,
    pub engine: Engine,
    /// Empty for chat, which uses the configured default prompt.
    pub system_prompt: &'static str,
    /// Input prefix kept, in characters. `None` keeps everything.
    pub truncate_to: Option<usize>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub post_process: PostProcess,
    pub timeout: TimeoutClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Chat,
    Summary,
    QuickRead,
    Title,
    Category,
    Tags,
    Optimize,
    PeriodicSummary,
    Suggest,
}

impl TransformKind {
    pub const ALL: [TransformKind; 9] = [
        TransformKind::Chat,
        TransformKind::Summary,
        TransformKind::QuickRead,
        TransformKind::Title,
        TransformKind::Category,
        TransformKind::Tags,
        TransformKind::Optimize,
        TransformKind::PeriodicSummary,
        TransformKind::Suggest,
    ];

    pub fn spec(self) -> &'static TransformSpec {
        match self {
            TransformKind::Chat => &CHAT,
            TransformKind::Summary => &SUMMARY,
            TransformKind::QuickRead => &QUICK_READ,
            TransformKind::Title => &TITLE,
            TransformKind::Category => &CATEGORY,
            TransformKind::Tags => &TAGS,
            TransformKind::Optimize => &OPTIMIZE,
            TransformKind::PeriodicSummary => &PERIODIC_SUMMARY,
            TransformKind::Suggest => &SUGGEST,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

static CHAT: TransformSpec = TransformSpec {
    name: "chat",
    engine: Engine::Relay,
    system_prompt: "",
    truncate_to: None,
    temperature: 0.7,
    max_tokens: 2048,
    post_process: PostProcess::None,
    timeout: TimeoutClass::Standard,
};

static SUMMARY: TransformSpec = TransformSpec {
    name: "summary",
    engine: Engine::Completion,
    system_prompt: "你是一位专业的技术博客编辑。请为用户提供的文章生成一段不超过100字的中文摘要，\
                    概括文章的主题和核心观点。直接输出摘要内容，不要添加标题、前缀或引号。",
    truncate_to: Some(3000),
    temperature: 0.5,
    max_tokens: 300,
    post_process: PostProcess::Truncate(100),
    timeout: TimeoutClass::Standard,
};

static QUICK_READ: TransformSpec = TransformSpec {
    name: "quick-read",
    engine: Engine::Completion,
    system_prompt: "你是一位技术博客导读助手。请阅读用户提供的文章，用200字左右概括文章要解决的问题、\
                    核心思路和关键结论，帮助读者快速判断是否值得细读。直接输出导读内容。",
    truncate_to: Some(4000),
    temperature: 0.5,
    max_tokens: 500,
    post_process: PostProcess::None,
    timeout: TimeoutClass::Standard,
};

static TITLE: TransformSpec = TransformSpec {
    name: "title",
    engine: Engine::Completion,
    system_prompt: "你是一位技术博客编辑。请根据用户提供的文章内容，拟定一个准确且有吸引力的中文标题，\
                    不超过30字。只输出标题本身，不要添加引号、书名号或任何解释。",
    truncate_to: Some(3000),
    temperature: 0.7,
    max_tokens: 100,
    post_process: PostProcess::StripWrapping,
    timeout: TimeoutClass::Standard,
};

static CATEGORY: TransformSpec = TransformSpec {
    name: "category",
    engine: Engine::Completion,
    system_prompt: "你是一位技术博客分类助手。请根据文章内容，从已有分类中选出最合适的一个；\
                    如果都不合适，给出一个简短的新分类名。只输出分类名称，不要任何解释。",
    truncate_to: Some(2000),
    temperature: 0.3,
    max_tokens: 50,
    post_process: PostProcess::None,
    timeout: TimeoutClass::Standard,
};

static TAGS: TransformSpec = TransformSpec {
    name: "tags",
    engine: Engine::Completion,
    system_prompt: "你是一位技术博客标签助手。请根据文章内容给出3个最相关的标签，优先复用已有标签。\
                    只输出标签，用英文逗号分隔，不要编号或任何解释。",
    truncate_to: Some(2000),
    temperature: 0.3,
    max_tokens: 100,
    post_process: PostProcess::SplitTags(3),
    timeout: TimeoutClass::Standard,
};

static OPTIMIZE: TransformSpec = TransformSpec {
    name: "optimize",
    engine: Engine::Relay,
    system_prompt: "你是一位资深技术写作编辑。请在保持原意和 Markdown 结构不变的前提下优化用户提供的文章：\
                    修正错别字和语病，理顺段落逻辑，让表达更专业流畅。直接输出优化后的完整文章。",
    truncate_to: Some(8000),
    temperature: 0.7,
    max_tokens: 4096,
    post_process: PostProcess::None,
    timeout: TimeoutClass::LongForm,
};

static PERIODIC_SUMMARY: TransformSpec = TransformSpec {
    name: "periodic-summary",
    engine: Engine::Completion,
    system_prompt: "你是一位专注于个人能力提升的导师。请根据用户提供的代办事项和日记，生成一份{period}度总结报告。\n\
                    报告要求：\n\
                    1. 先总结本时段完成了什么、未完成什么\n\
                    2. 分析时间利用效率和工作重点\n\
                    3. 以「个人能力提升」为核心目标，给出 2-3 条具体的改进建议\n\
                    4. 语气亲切专业，像一位关心你成长的导师\n\
                    5. 使用 Markdown 格式，结构清晰",
    truncate_to: None,
    temperature: 0.7,
    max_tokens: 2000,
    post_process: PostProcess::None,
    timeout: TimeoutClass::Standard,
};

static SUGGEST: TransformSpec = TransformSpec {
    name: "suggest",
    engine: Engine::Completion,
    system_prompt: "你是一位个人能力提升导师，请根据用户近两周的代办完成情况，从以下维度给出具体的改进建议：\n\
                    1. 时间管理：是否有拖延、优先级分配是否合理\n\
                    2. 技能提升：根据代办内容推测用户的发展方向，建议学习路径\n\
                    3. 习惯养成：推荐有助于效率提升的小习惯\n\
                    4. 目标设定：建议短期（1周）和中期（1月）目标\n\
                    要求：语气亲切，建议具体可操作，使用 Markdown 格式",
    truncate_to: None,
    temperature: 0.7,
    max_tokens: 2000,
    post_process: PostProcess::None,
    timeout: TimeoutClass::Standard,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pure helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

const WRAPPING_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('`', '`'),
    ('“', '”'),
    ('‘', '’'),
    ('「', '」'),
    ('『', '』'),
    ('《', '》'),
    ('【', '】'),
    ('[', ']'),
    ('(', ')'),
    ('（', '）'),
    ('<', '>'),
];

/// Peel matching quote or bracket pairs off both ends.
pub fn strip_wrapping(text: &str) -> String {
    let mut s = text.trim();
    loop {
        let mut chars = s.chars();
        let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
            break;
        };
        if !WRAPPING_PAIRS.contains(&(first, last)) {
            break;
        }
        s = s[first.len_utf8()..s.len() - last.len_utf8()].trim();
    }
    s.to_string()
}

/// Split on ASCII comma, full-width comma and the enumeration comma.
pub fn split_tags(text: &str, max: usize) -> Vec<String> {
    text.split([',', '，', '、'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(max)
        .map(String::from)
        .collect()
}

/// Result of a one-shot transform after post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutput {
    Text(String),
    Tags(Vec<String>),
}

impl TransformOutput {
    pub fn into_text(self) -> String {
        match self {
            TransformOutput::Text(t) => t,
            TransformOutput::Tags(tags) => tags.join(","),
        }
    }

    pub fn into_tags(self) -> Vec<String> {
        match self {
            TransformOutput::Text(t) => split_tags(&t, usize::MAX),
            TransformOutput::Tags(tags) => tags,
        }
    }
}

pub fn post_process(step: PostProcess, raw: String) -> TransformOutput {
    match step {
        PostProcess::None => TransformOutput::Text(raw),
        PostProcess::Truncate(max) => TransformOutput::Text(truncate_chars(&raw, max).to_string()),
        PostProcess::StripWrapping => TransformOutput::Text(strip_wrapping(&raw)),
        PostProcess::SplitTags(max) => TransformOutput::Tags(split_tags(&raw, max)),
    }
}

fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::validation("内容不能为空"));
    }
    Ok(())
}

/// Caller-supplied chat history: non-empty, no system turns, ending in a
/// non-blank user turn.
pub fn validate_history(history: &[ChatMessage]) -> Result<()> {
    let Some(last) = history.last() else {
        return Err(Error::validation("消息列表不能为空"));
    };
    if history.iter().any(|m| m.role == Role::System) {
        return Err(Error::validation("不允许提交 system 角色的消息"));
    }
    if last.role != Role::User || last.content.trim().is_empty() {
        return Err(Error::validation("最后一条消息必须是非空的用户消息"));
    }
    Ok(())
}

fn with_existing(label: &str, existing: &[String], content: &str) -> String {
    let names: Vec<&str> = existing
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let listed = if names.is_empty() {
        "无".to_string()
    } else {
        names.join("、")
    };
    format!("{label}：{listed}\n\n文章内容：\n{content}")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct TransformService {
    completion: Arc<CompletionEngine>,
    relay: Arc<RelayEngine>,
    chat_prompt: String,
    read_timeout: Duration,
    long_read_timeout: Duration,
    chat_session_timeout: Duration,
    long_session_timeout: Duration,
}

impl TransformService {
    pub fn new(completion: Arc<CompletionEngine>, relay: Arc<RelayEngine>, ai: &AiConfig) -> Self {
        Self {
            completion,
            relay,
            chat_prompt: ai.system_prompt.clone(),
            read_timeout: ai.read_timeout(),
            long_read_timeout: ai.long_read_timeout(),
            chat_session_timeout: ai.chat_session_timeout(),
            long_session_timeout: ai.long_session_timeout(),
        }
    }

    fn completion_params(&self, spec: &TransformSpec) -> CompletionParams {
        let read_timeout = match spec.timeout {
            TimeoutClass::Standard => self.read_timeout,
            TimeoutClass::LongForm => self.long_read_timeout,
        };
        CompletionParams {
            temperature: spec.temperature,
            max_tokens: spec.max_tokens,
            read_timeout,
        }
    }

    fn relay_params(&self, spec: &TransformSpec) -> RelayParams {
        let (read_timeout, session_timeout) = match spec.timeout {
            TimeoutClass::Standard => (self.read_timeout, self.chat_session_timeout),
            TimeoutClass::LongForm => (self.long_read_timeout, self.long_session_timeout),
        };
        RelayParams {
            temperature: spec.temperature,
            max_tokens: spec.max_tokens,
            read_timeout,
            session_timeout,
        }
    }

    /// Run a one-shot article transform. `existing` is only read by
    /// category and tags.
    pub async fn run(
        &self,
        kind: TransformKind,
        content: &str,
        existing: &[String],
    ) -> Result<TransformOutput> {
        let spec = kind.spec();
        if spec.engine != Engine::Completion {
            return Err(Error::validation(format!("{} is a streaming operation", spec.name)));
        }
        require_content(content)?;

        let kept = match spec.truncate_to {
            Some(max) => truncate_chars(content, max),
            None => content,
        };
        let user_message = match kind {
            TransformKind::Category => with_existing("已有分类", existing, kept),
            TransformKind::Tags => with_existing("已有标签", existing, kept),
            _ => kept.to_string(),
        };

        tracing::debug!(
            operation = spec.name,
            input_chars = content.chars().count(),
            kept_chars = kept.chars().count(),
            "running transform"
        );

        let raw = self
            .completion
            .complete(spec.system_prompt, &user_message, self.completion_params(spec))
            .await?;
        Ok(post_process(spec.post_process, raw))
    }

    /// Completion over a prepared context with an explicit system prompt.
    /// Used by the periodic review, whose prompts depend on the period.
    pub async fn complete_with(
        &self,
        kind: TransformKind,
        system_prompt: &str,
        context: &str,
    ) -> Result<String> {
        let spec = kind.spec();
        require_content(context)?;
        let raw = self
            .completion
            .complete(system_prompt, context, self.completion_params(spec))
            .await?;
        Ok(post_process(spec.post_process, raw).into_text())
    }

    pub async fn summarize(&self, content: &str) -> Result<String> {
        Ok(self.run(TransformKind::Summary, content, &[]).await?.into_text())
    }

    pub async fn quick_read(&self, content: &str) -> Result<String> {
        Ok(self.run(TransformKind::QuickRead, content, &[]).await?.into_text())
    }

    pub async fn title(&self, content: &str) -> Result<String> {
        Ok(self.run(TransformKind::Title, content, &[]).await?.into_text())
    }

    pub async fn category(&self, content: &str, existing: &[String]) -> Result<String> {
        Ok(self.run(TransformKind::Category, content, existing).await?.into_text())
    }

    pub async fn tags(&self, content: &str, existing: &[String]) -> Result<Vec<String>> {
        Ok(self.run(TransformKind::Tags, content, existing).await?.into_tags())
    }

    /// Stream a chat reply to `history` under the configured system prompt.
    pub fn chat(&self, history: Vec<ChatMessage>) -> Result<RelayHandle> {
        validate_history(&history)?;
        let spec = TransformKind::Chat.spec();
        self.relay
            .relay(&self.chat_prompt, history, self.relay_params(spec))
    }

    /// Stream an optimized rewrite of `content`.
    pub fn optimize(&self, content: &str) -> Result<RelayHandle> {
        require_content(content)?;
        let spec = TransformKind::Optimize.spec();
        let kept = match spec.truncate_to {
            Some(max) => truncate_chars(content, max),
            None => content,
        };
        self.relay.relay(
            spec.system_prompt,
            vec![ChatMessage::user(kept)],
            self.relay_params(spec),
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
