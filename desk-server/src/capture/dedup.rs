//! 滑动窗口去重判定
//!
//! 纯函数：窗口命中与否只取决于 (last_seen, window, now)。
//! 原子性由 occurrence 仓库的事务保证，这里只做判定与结果类型。

use shared::models::ErrorOccurrence;

/// `last_seen_at` 是否仍在窗口内（闭区间下界）
pub fn within_window(last_seen_at: i64, window_millis: i64, now: i64) -> bool {
    last_seen_at >= now - window_millis
}

/// find-or-create 的判定结果
#[derive(Debug, Clone)]
pub enum SightingOutcome {
    /// 首次目击（或旧行过窗/已终态）— 新 occurrence，count = 1
    New(ErrorOccurrence),
    /// 窗口内重复 — 既有 occurrence，计数已累加
    Repeat(ErrorOccurrence),
}

impl SightingOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }

    pub fn occurrence(&self) -> &ErrorOccurrence {
        match self {
            Self::New(o) | Self::Repeat(o) => o,
        }
    }

    pub fn into_occurrence(self) -> ErrorOccurrence {
        match self {
            Self::New(o) | Self::Repeat(o) => o,
        }
    }
}
