//! Error Occurrence Model (错误去重记录)
//!
//! 一条 occurrence 代表一块看板内一个重复出现的错误身份，带重复计数。
//! `resolved` / `ignored` 是终态：退出去重池，之后同一错误再现会产生
//! 全新的 occurrence，而不是复活旧行。

use serde::{Deserialize, Serialize};

/// Occurrence lifecycle status
///
/// `open → acknowledged → resolved` (normal, human-driven) or
/// `open | acknowledged → ignored` (dismissal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OccurrenceStatus {
    Open,
    Acknowledged,
    Resolved,
    Ignored,
}

impl OccurrenceStatus {
    /// 活跃状态参与去重匹配
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::Acknowledged)
    }

    /// 终态不可再变更
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Ignored)
    }

    /// 状态机约束：允许的人工流转
    pub fn can_transition_to(&self, next: OccurrenceStatus) -> bool {
        match (self, next) {
            (Self::Open, Self::Acknowledged) => true,
            (Self::Open | Self::Acknowledged, Self::Resolved) => true,
            (Self::Open | Self::Acknowledged, Self::Ignored) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Ignored => "ignored",
        };
        write!(f, "{}", s)
    }
}

/// 最近一次目击的采样上下文（有界大小，最新覆盖旧值）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleContext {
    pub url: Option<String>,
    pub method: Option<String>,
    /// 触发错误的操作者；无认证上下文时为配置的系统操作者
    pub actor_id: Option<i64>,
    /// 堆栈帧（已按策略截断）
    #[serde(default)]
    pub stack_frames: Vec<String>,
    /// 本次采样时间（Unix 毫秒）
    pub captured_at: i64,
}

/// Deduplicated error occurrence record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ErrorOccurrence {
    pub id: i64,
    pub board_id: i64,
    /// 自动建单产生的工单
    pub ticket_id: Option<i64>,
    /// 错误身份指纹，见 capture::identity
    pub error_hash: String,
    pub exception_class: String,
    /// 人读消息（已截断；不参与身份指纹）
    pub message: String,
    pub file_path: Option<String>,
    pub line_number: Option<i64>,
    pub http_status: Option<i64>,
    /// 窗口内重复次数（≥ 1）
    pub occurrence_count: i64,
    pub first_seen_at: i64,
    pub last_seen_at: i64,
    pub status: OccurrenceStatus,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub sample_context: SampleContext,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<i64>,
}

/// Raw captured error, as handed over by request/job layers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedError {
    pub exception_class: String,
    pub message: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub line_number: Option<u32>,
    #[serde(default)]
    pub http_status: Option<u16>,
    #[serde(default)]
    pub stack_frames: Vec<String>,
}

/// Capture call context
///
/// 无登录操作者的场景（控制台、调度任务）由调用方传入
/// `actor_id = None`，管线内替换为配置的系统操作者，不做全局状态。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureContext {
    pub url: Option<String>,
    pub method: Option<String>,
    pub actor_id: Option<i64>,
    /// 是否来自非交互执行（控制台/后台任务）
    #[serde(default)]
    pub from_console: bool,
}
