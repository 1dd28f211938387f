//! Error Capture Policy Model
//!
//! 每块看板一份捕获设置：开关、可捕获状态码、状态码→优先级映射、
//! 去重窗口、自动建单开关、堆栈采样限制。引擎只读取，不创建。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use super::ticket::TicketPriority;
use crate::util::MILLIS_PER_HOUR;

/// 状态码集合为空时使用的默认集合 — 服务端错误；客户端错误需显式配置
pub const DEFAULT_CAPTURE_STATUS_CODES: &[u16] = &[500, 502, 503, 504];

/// Error capture policy record — read-only input to the capture pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ErrorCapturePolicy {
    pub id: i64,
    pub board_id: i64,
    pub enabled: bool,
    /// 是否捕获控制台/后台任务错误（无交互上下文）
    pub capture_console: bool,
    /// 可捕获的 HTTP 状态码；空 ⇒ [`DEFAULT_CAPTURE_STATUS_CODES`]
    #[cfg_attr(feature = "db", sqlx(json))]
    pub capture_status_codes: Vec<u16>,
    /// 状态码 → 工单优先级
    #[cfg_attr(feature = "db", sqlx(json))]
    pub status_priority_map: HashMap<u16, TicketPriority>,
    /// 去重滑动窗口（小时，1–720）
    pub dedupe_window_hours: i64,
    pub auto_create_ticket: bool,
    pub include_stack_trace: bool,
    /// 采样保留的最大堆栈帧数（1–200）
    pub max_stack_frames: i64,
    pub created_at: i64,
}

impl ErrorCapturePolicy {
    /// 该状态码是否落入捕获集合
    ///
    /// 无状态码的错误始终捕获（视为更严重的未分类错误）。
    pub fn captures_status(&self, status: Option<u16>) -> bool {
        let Some(status) = status else {
            return true;
        };
        if self.capture_status_codes.is_empty() {
            DEFAULT_CAPTURE_STATUS_CODES.contains(&status)
        } else {
            self.capture_status_codes.contains(&status)
        }
    }

    /// 按状态码映射工单优先级；无状态码默认 High
    pub fn priority_for(&self, status: Option<u16>) -> TicketPriority {
        match status {
            Some(s) => self
                .status_priority_map
                .get(&s)
                .copied()
                .unwrap_or_default(),
            None => TicketPriority::High,
        }
    }

    /// 去重窗口长度（毫秒）
    pub fn window_millis(&self) -> i64 {
        self.dedupe_window_hours * MILLIS_PER_HOUR
    }
}

/// Create capture policy payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ErrorCapturePolicyCreate {
    pub board_id: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub capture_console: bool,
    #[serde(default)]
    pub capture_status_codes: Vec<u16>,
    #[serde(default)]
    pub status_priority_map: HashMap<u16, TicketPriority>,
    #[serde(default = "default_window")]
    #[validate(range(min = 1, max = 720))]
    pub dedupe_window_hours: i64,
    #[serde(default)]
    pub auto_create_ticket: bool,
    #[serde(default = "default_true")]
    pub include_stack_trace: bool,
    #[serde(default = "default_frames")]
    #[validate(range(min = 1, max = 200))]
    pub max_stack_frames: i64,
}

fn default_true() -> bool {
    true
}

fn default_window() -> i64 {
    24
}

fn default_frames() -> i64 {
    50
}
